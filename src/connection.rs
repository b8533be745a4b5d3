use std::fmt;

use reqwest::Url;

use crate::errors::Error;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

const INGEST_HOST_PREFIX: &str = "ingest-";

/// AAD application identity used to obtain access tokens.
#[derive(Clone)]
pub enum AadCredential {
    ApplicationKey {
        app_id: String,
        app_key: String,
        authority_id: String,
    },
    ApplicationCertificate {
        app_id: String,
        /// Certificate and private key, PEM encoded.
        certificate_pem: String,
        passphrase: Option<String>,
        authority_id: String,
    },
}

impl AadCredential {
    pub fn app_id(&self) -> &str {
        match self {
            AadCredential::ApplicationKey { app_id, .. }
            | AadCredential::ApplicationCertificate { app_id, .. } => app_id,
        }
    }

    pub fn authority_id(&self) -> &str {
        match self {
            AadCredential::ApplicationKey { authority_id, .. }
            | AadCredential::ApplicationCertificate { authority_id, .. } => authority_id,
        }
    }
}

impl fmt::Debug for AadCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AadCredential::ApplicationKey {
                app_id,
                authority_id,
                ..
            } => f
                .debug_struct("ApplicationKey")
                .field("app_id", app_id)
                .field("authority_id", authority_id)
                .finish_non_exhaustive(),
            AadCredential::ApplicationCertificate {
                app_id,
                authority_id,
                ..
            } => f
                .debug_struct("ApplicationCertificate")
                .field("app_id", app_id)
                .field("authority_id", authority_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Cluster address plus the credential used to reach it.
#[derive(Clone, Debug)]
pub struct KustoConnectionStringBuilder {
    data_source: Url,
    credential: AadCredential,
    authority_host: Url,
}

impl KustoConnectionStringBuilder {
    /// Ingest endpoint for a public-cloud cluster.
    pub fn ingest_uri(cluster: &str, region: &str) -> String {
        format!("https://{INGEST_HOST_PREFIX}{cluster}.{region}.kusto.windows.net:443")
    }

    pub fn with_aad_application_key_authentication(
        uri: &str,
        app_id: impl Into<String>,
        app_key: impl Into<String>,
        authority_id: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::with_credential(
            uri,
            AadCredential::ApplicationKey {
                app_id: app_id.into(),
                app_key: app_key.into(),
                authority_id: authority_id.into(),
            },
        )
    }

    pub fn with_aad_application_certificate_authentication(
        uri: &str,
        app_id: impl Into<String>,
        certificate_pem: impl Into<String>,
        passphrase: Option<String>,
        authority_id: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::with_credential(
            uri,
            AadCredential::ApplicationCertificate {
                app_id: app_id.into(),
                certificate_pem: certificate_pem.into(),
                passphrase,
                authority_id: authority_id.into(),
            },
        )
    }

    pub fn with_credential(uri: &str, credential: AadCredential) -> Result<Self, Error> {
        if credential.app_id().trim().is_empty() {
            return Err(Error::Config("AAD application id must not be empty".into()));
        }
        if credential.authority_id().trim().is_empty() {
            return Err(Error::Config("AAD authority id must not be empty".into()));
        }
        Ok(Self {
            data_source: parse_http_url(uri, "cluster URI")?,
            credential,
            authority_host: parse_http_url(DEFAULT_AUTHORITY_HOST, "authority host")?,
        })
    }

    pub fn with_authority_host(mut self, host: &str) -> Result<Self, Error> {
        self.authority_host = parse_http_url(host, "authority host")?;
        Ok(self)
    }

    pub fn data_source(&self) -> &Url {
        &self.data_source
    }

    pub fn credential(&self) -> &AadCredential {
        &self.credential
    }

    /// Engine endpoint for the cluster: the data source with its leading
    /// `ingest-` host label removed. Streaming ingestion is served here.
    pub fn engine_uri(&self) -> Result<Url, Error> {
        let mut engine = self.data_source.clone();
        if let Some(host) = self.data_source.host_str()
            && let Some(stripped) = host.strip_prefix(INGEST_HOST_PREFIX)
        {
            engine.set_host(Some(stripped)).map_err(|e| {
                Error::Config(format!(
                    "Invalid cluster URI '{}': {}",
                    self.data_source, e
                ))
            })?;
        }
        Ok(engine)
    }

    /// OAuth2 scope requesting access to the cluster.
    pub fn token_scope(&self) -> Result<String, Error> {
        Ok(format!("{}/.default", base(&self.engine_uri()?)))
    }

    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            base(&self.authority_host),
            self.credential.authority_id()
        )
    }
}

impl fmt::Display for KustoConnectionStringBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Data Source={};AAD Federated Security=True;Application Client Id={};",
            base(&self.data_source),
            self.credential.app_id()
        )?;
        match self.credential {
            AadCredential::ApplicationKey { .. } => f.write_str("Application Key=****;")?,
            AadCredential::ApplicationCertificate { .. } => {
                f.write_str("Application Certificate=****;")?
            }
        }
        write!(f, "Authority Id={}", self.credential.authority_id())
    }
}

/// URL rendered without its trailing slash.
pub(crate) fn base(url: &Url) -> &str {
    url.as_str().trim_end_matches('/')
}

fn parse_http_url(raw: &str, what: &str) -> Result<Url, Error> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", what, raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::Config(format!(
            "Invalid {} '{}': expected an http(s) URL with a host",
            what, raw
        )));
    }
    Ok(url)
}
