use std::time::{Duration, SystemTime};

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tracing::{error, info};

use crate::auth::crypto;
use crate::connection::{AadCredential, KustoConnectionStringBuilder};
use crate::errors::Error;
use crate::token::TokenSnapshot;
use crate::types::TokenResponse;
use crate::USER_AGENT_VALUE;

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Exchanges the configured AAD application credential for an access token.
pub struct AadTokenProvider {
    http: Client,
    connection: KustoConnectionStringBuilder,
    request_timeout: Option<Duration>,
}

impl AadTokenProvider {
    pub fn new(
        http: Client,
        connection: KustoConnectionStringBuilder,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            http,
            connection,
            request_timeout,
        }
    }

    fn form_body(&self, endpoint: &str) -> Result<String, Error> {
        let credential = self.connection.credential();
        let scope = self.connection.token_scope()?;
        let mut fields: Vec<(&str, String)> = vec![
            ("client_id", credential.app_id().to_string()),
            ("scope", scope),
            ("grant_type", "client_credentials".to_string()),
        ];
        match credential {
            AadCredential::ApplicationKey { app_key, .. } => {
                fields.push(("client_secret", app_key.clone()));
            }
            AadCredential::ApplicationCertificate {
                app_id,
                certificate_pem,
                passphrase,
                ..
            } => {
                let assertion = crypto::build_client_assertion(
                    app_id,
                    endpoint,
                    certificate_pem,
                    passphrase.as_deref(),
                )?;
                fields.push(("client_assertion_type", CLIENT_ASSERTION_TYPE.to_string()));
                fields.push(("client_assertion", assertion));
            }
        }
        Ok(fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&"))
    }

    /// One client-credentials request; retries are the caller's concern.
    pub async fn fetch(&self) -> Result<TokenSnapshot, Error> {
        let endpoint = self.connection.token_endpoint();
        let body = self.form_body(&endpoint)?;
        let resp = self
            .http
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.request_timeout))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(
                "token request failed: status={} app_id='{}'",
                status,
                self.connection.credential().app_id()
            );
            return Err(Error::Http(status, text));
        }
        let token: TokenResponse = serde_json::from_str(&text)?;
        info!(
            "access token acquired: expires_in={}s type={}",
            token.expires_in,
            token.token_type.as_deref().unwrap_or("Bearer")
        );
        Ok(TokenSnapshot::from_response(token, SystemTime::now()))
    }
}
