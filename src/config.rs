//! read configuration from a file, the environment, or AWS Secrets Manager

use std::fmt;
use std::time::Duration;

use aws_config::BehaviorVersion;

use crate::connection::{AadCredential, KustoConnectionStringBuilder};
use crate::errors::Error;
use crate::properties::{DataFormat, IngestionProperties};
use crate::retry::RetryPlan;

pub enum ConfigLocation {
    File(String),
    Env,
    Secret,
}

/// Everything a caller supplies to reach a table: credentials, cluster
/// coordinates, and the ingestion target.
#[derive(Clone, serde::Deserialize)]
pub struct Config {
    pub authority_id: String,
    pub app_id: String,
    pub app_key: Option<String>,
    /// PEM bundle holding the application certificate and, unless
    /// `private_key` is set, its private key.
    pub certificate: Option<String>,
    pub certificate_path: Option<String>,
    pub private_key: Option<String>,
    pub private_key_passphrase: Option<String>,
    pub cluster: String,
    pub region: String,
    pub database: String,
    pub table: String,
    pub mapping: Option<String>,
    #[serde(default)]
    pub data_format: DataFormat,
    /// Full ingest URI; overrides the one derived from `cluster` and `region`.
    pub cluster_uri: Option<String>,
    pub authority_host: Option<String>,
    /// Per-request timeout in milliseconds, token requests included.
    pub request_timeout_ms: Option<u64>,
    pub retry_max_attempts: Option<u8>,
    pub retry_jitter: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("authority_id", &self.authority_id)
            .field("app_id", &self.app_id)
            .field("app_key", &self.app_key.as_ref().map(|_| "****"))
            .field("certificate_path", &self.certificate_path)
            .field("cluster", &self.cluster)
            .field("region", &self.region)
            .field("database", &self.database)
            .field("table", &self.table)
            .field("mapping", &self.mapping)
            .field("data_format", &self.data_format)
            .field("cluster_uri", &self.cluster_uri)
            .finish_non_exhaustive()
    }
}

impl Config {
    #[allow(clippy::too_many_arguments)]
    pub fn from_values(
        authority_id: impl Into<String>,
        app_id: impl Into<String>,
        app_key: Option<String>,
        cluster: impl Into<String>,
        region: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
        mapping: Option<String>,
        data_format: DataFormat,
    ) -> Self {
        Self {
            authority_id: authority_id.into(),
            app_id: app_id.into(),
            app_key,
            certificate: None,
            certificate_path: None,
            private_key: None,
            private_key_passphrase: None,
            cluster: cluster.into(),
            region: region.into(),
            database: database.into(),
            table: table.into(),
            mapping,
            data_format,
            cluster_uri: None,
            authority_host: None,
            request_timeout_ms: None,
            retry_max_attempts: None,
            retry_jitter: None,
        }
    }

    pub async fn load(location: ConfigLocation) -> Result<Self, Error> {
        match location {
            ConfigLocation::File(path) => Self::from_file(path),
            ConfigLocation::Env => Self::from_env(),
            ConfigLocation::Secret => read_config_from_secret().await,
        }
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("Missing {} env var", name)))
        };
        let data_format = match lookup("KUSTO_DATA_FORMAT") {
            Some(raw) => raw.parse()?,
            None => DataFormat::default(),
        };
        let mut config = Self::from_values(
            required("KUSTO_AUTHORITY_ID")?,
            required("KUSTO_APP_ID")?,
            Some(required("KUSTO_APP_KEY")?),
            required("KUSTO_CLUSTER")?,
            required("KUSTO_REGION")?,
            required("KUSTO_DATABASE")?,
            required("KUSTO_TABLE")?,
            lookup("KUSTO_MAPPING"),
            data_format,
        );
        config.cluster_uri = lookup("KUSTO_CLUSTER_URI");
        config.authority_host = lookup("KUSTO_AUTHORITY_HOST");
        Ok(config)
    }

    pub fn with_cluster_uri(mut self, uri: impl Into<String>) -> Self {
        self.cluster_uri = Some(uri.into());
        self
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = Some(host.into());
        self
    }

    pub fn with_certificate(mut self, pem: impl Into<String>, passphrase: Option<String>) -> Self {
        self.certificate = Some(pem.into());
        self.private_key_passphrase = passphrase;
        self
    }

    pub fn with_private_key(mut self, pem: impl Into<String>) -> Self {
        self.private_key = Some(pem.into());
        self
    }

    /// Rounded up to whole milliseconds.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.request_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    pub fn with_retry_max_attempts(mut self, attempts: u8) -> Self {
        self.retry_max_attempts = Some(attempts);
        self
    }

    pub fn request_timeout(&self) -> Result<Option<Duration>, Error> {
        match self.request_timeout_ms {
            Some(0) => Err(Error::Config(
                "request_timeout_ms must be greater than zero".into(),
            )),
            Some(ms) => Ok(Some(Duration::from_millis(ms))),
            None => Ok(None),
        }
    }

    /// Certificate PEM, read from `certificate_path` when not inline.
    fn certificate_pem(&self) -> Result<Option<String>, Error> {
        if let Some(pem) = self.certificate.as_ref() {
            return Ok(Some(pem.clone()));
        }
        match self.certificate_path.as_ref() {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }

    /// Application key wins over a certificate when both are present.
    pub fn credential(&self) -> Result<AadCredential, Error> {
        if let Some(app_key) = self.app_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(AadCredential::ApplicationKey {
                app_id: self.app_id.clone(),
                app_key: app_key.clone(),
                authority_id: self.authority_id.clone(),
            });
        }
        if let Some(certificate_pem) = self.certificate_pem()? {
            let certificate_pem = match self.private_key.as_ref() {
                Some(key) => format!("{}\n{}", certificate_pem.trim_end(), key),
                None => certificate_pem,
            };
            return Ok(AadCredential::ApplicationCertificate {
                app_id: self.app_id.clone(),
                certificate_pem,
                passphrase: self.private_key_passphrase.clone(),
                authority_id: self.authority_id.clone(),
            });
        }
        Err(Error::Config(
            "Either app_key or certificate must be configured".into(),
        ))
    }

    pub fn connection(&self) -> Result<KustoConnectionStringBuilder, Error> {
        let uri = match self.cluster_uri.as_ref() {
            Some(uri) => uri.clone(),
            None => KustoConnectionStringBuilder::ingest_uri(&self.cluster, &self.region),
        };
        let builder = KustoConnectionStringBuilder::with_credential(&uri, self.credential()?)?;
        match self.authority_host.as_ref() {
            Some(host) => builder.with_authority_host(host),
            None => Ok(builder),
        }
    }

    pub fn ingestion_properties(&self) -> IngestionProperties {
        let props = IngestionProperties::new(&self.database, &self.table, self.data_format);
        match self.mapping.as_ref() {
            Some(mapping) => props.with_mapping_reference(mapping),
            None => props,
        }
    }

    pub fn retry_plan(&self) -> Result<RetryPlan, Error> {
        let mut plan = RetryPlan::default_plan();
        if let Some(attempts) = self.retry_max_attempts {
            if attempts == 0 {
                return Err(Error::Config("retry_max_attempts must be at least 1".into()));
            }
            plan.max_attempts = attempts;
        }
        if let Some(jitter) = self.retry_jitter.as_ref() {
            plan.jitter = jitter.parse()?;
        }
        Ok(plan)
    }
}

async fn read_config_from_secret() -> Result<Config, Error> {
    let secret_arn = std::env::var("KUSTO_CONFIG_SECRET_ARN")
        .map_err(|_| Error::Config("Missing KUSTO_CONFIG_SECRET_ARN env var".to_string()))?;
    let client = aws_sdk_secretsmanager::Client::new(
        &aws_config::load_defaults(BehaviorVersion::latest()).await,
    );
    let resp = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Config(format!("Failed to get secret: {}", e)))?;
    let secret = resp
        .secret_string()
        .ok_or_else(|| Error::Config("Failed to get secret string, returned None".to_string()))?;
    let config: Config = serde_json::from_str(secret)?;
    Ok(config)
}
