use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    StreamingIngestClient, USER_AGENT_VALUE,
    auth::AadTokenProvider,
    client::payload::{MAX_STREAMING_SIZE, PayloadReader},
    config::Config,
    connection::{KustoConnectionStringBuilder, base},
    errors::Error,
    properties::IngestionProperties,
    retry::{OperationKind, RetryCoordinator, RetryPlan},
    token::{TokenGuard, TokenGuardConfig, TokenSnapshot},
    types::{IngestionResult, IngestionStatus, ServiceError},
};

impl StreamingIngestClient {
    /// Create a client with the default retry plan and no request timeout.
    /// # Arguments
    /// * `connection` - Cluster URI plus the AAD credential used for tokens
    /// * `default_properties` - Target used when `ingest_from_stream` gets no properties
    pub fn new(
        connection: KustoConnectionStringBuilder,
        default_properties: IngestionProperties,
    ) -> Result<Self, Error> {
        Self::build(
            connection,
            default_properties,
            RetryPlan::default_plan(),
            None,
        )
    }

    /// Create a client from a loaded `Config`, honouring its retry and
    /// timeout settings.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::build(
            config.connection()?,
            config.ingestion_properties(),
            config.retry_plan()?,
            config.request_timeout()?,
        )
    }

    fn build(
        connection: KustoConnectionStringBuilder,
        default_properties: IngestionProperties,
        retry_plan: RetryPlan,
        request_timeout: Option<std::time::Duration>,
    ) -> Result<Self, Error> {
        default_properties.validate()?;
        let engine = connection.engine_uri()?;
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        let auth = AadTokenProvider::new(http.clone(), connection.clone(), request_timeout);
        info!(
            "ingest client created: connection='{}' engine='{}'",
            connection,
            base(&engine)
        );
        Ok(Self {
            connection,
            default_properties,
            engine,
            http,
            auth,
            tokens: TokenGuard::empty(TokenGuardConfig::default()),
            retry: RetryCoordinator::new(retry_plan),
            request_timeout,
            max_payload_size: MAX_STREAMING_SIZE,
        })
    }

    /// Lowers the per-request body limit below the service maximum.
    pub fn with_max_payload_size(mut self, limit: usize) -> Self {
        self.max_payload_size = limit.clamp(1, MAX_STREAMING_SIZE);
        self
    }

    pub fn connection(&self) -> &KustoConnectionStringBuilder {
        &self.connection
    }

    pub fn default_properties(&self) -> &IngestionProperties {
        &self.default_properties
    }

    /// Sends everything `input` yields to the target table.
    ///
    /// The stream should separate records with `\n`. Line-delimited formats
    /// are split into several requests when the data exceeds the payload
    /// limit; other formats must fit in one request. Resolves once every
    /// request has been accepted, or with the first error that survives
    /// retries. When that error follows accepted requests it is wrapped in
    /// [`Error::PartialIngest`].
    pub async fn ingest_from_stream<R>(
        &self,
        input: R,
        properties: Option<&IngestionProperties>,
    ) -> Result<IngestionResult, Error>
    where
        R: AsyncRead + Unpin + Send,
    {
        let props = properties.unwrap_or(&self.default_properties);
        props.validate()?;
        let url = self.ingest_url(props);
        let source_id = Uuid::new_v4();

        let mut payloads = PayloadReader::new(input, props.format, self.max_payload_size);
        let mut requests = 0usize;
        let mut bytes = 0usize;
        let mut records = 0usize;
        loop {
            let sent = match payloads.next_payload().await {
                Ok(Some(payload)) => {
                    let request_id = format!("KRS.ingest;{};{}", source_id, requests);
                    self.post_payload(&url, &payload.bytes, &request_id)
                        .await
                        .map(|()| Some(payload))
                }
                Ok(None) => Ok(None),
                Err(err) => Err(err),
            };
            match sent {
                Ok(Some(payload)) => {
                    requests += 1;
                    bytes += payload.bytes.len();
                    records += payload.records;
                }
                Ok(None) => break,
                Err(err) if requests == 0 => return Err(err),
                Err(err) => {
                    warn!(
                        source_id = %source_id,
                        requests,
                        bytes,
                        "ingest stopped after accepted payloads: {}",
                        err
                    );
                    return Err(Error::PartialIngest {
                        source_id,
                        requests,
                        bytes,
                        records,
                        error: Box::new(err),
                    });
                }
            }
        }

        if requests == 0 {
            warn!(
                "ingest stream was empty; nothing sent to '{}.{}'",
                props.database, props.table
            );
        }
        info!(
            source_id = %source_id,
            requests,
            bytes,
            records,
            "ingest ok: db='{}' table='{}' format={}",
            props.database,
            props.table,
            props.format
        );
        Ok(IngestionResult {
            status: IngestionStatus::Success,
            database: props.database.clone(),
            table: props.table.clone(),
            source_id,
            requests,
            bytes,
            records,
            completed_at: jiff::Timestamp::now(),
        })
    }

    fn ingest_url(&self, props: &IngestionProperties) -> String {
        let mut url = format!(
            "{}/v1/rest/ingest/{}/{}?streamFormat={}",
            base(&self.engine),
            urlencoding::encode(&props.database),
            urlencoding::encode(&props.table),
            props.format
        );
        if let Some(mapping) = props.ingestion_mapping_reference.as_deref() {
            url.push_str("&mappingName=");
            url.push_str(&urlencoding::encode(mapping));
        }
        url
    }

    /// Cached token, refreshed when expiring or when `rejected` is set.
    /// Failures come back as [`Error::Auth`] so the ingest retry loop does
    /// not repeat them.
    async fn access_token(&self, rejected: bool) -> Result<TokenSnapshot, Error> {
        self.tokens
            .ensure_fresh(rejected, || async {
                self.retry
                    .execute(OperationKind::AcquireToken, |_attempt| self.auth.fetch())
                    .await
                    .map(|(snapshot, _)| snapshot)
            })
            .await
            .map_err(|err| Error::Auth(Box::new(err)))
    }

    async fn post_payload(&self, url: &str, body: &[u8], request_id: &str) -> Result<(), Error> {
        self.retry
            .execute(OperationKind::StreamIngest, |attempt| {
                self.post_once(url, body, request_id, attempt)
            })
            .await?;
        Ok(())
    }

    async fn post_once(
        &self,
        url: &str,
        body: &[u8],
        request_id: &str,
        attempt: u8,
    ) -> Result<(), Error> {
        let token = self.access_token(false).await?;
        debug!(
            "stream ingest attempt {}: request_id='{}' bytes={}",
            attempt,
            request_id,
            body.len()
        );
        let resp = self
            .http
            .post(url)
            .bearer_auth(&token.value)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("x-ms-client-request-id", request_id)
            .header("x-ms-app", "kusto-ingest")
            .header("x-ms-client-version", concat!("Kusto.Rust.Ingest:", env!("CARGO_PKG_VERSION")))
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.request_timeout))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            warn!(
                "stream ingest rejected with 401; refreshing token: request_id='{}'",
                request_id
            );
            self.access_token(true).await?;
        }
        Err(match ServiceError::parse(status, &text) {
            Some(service) => Error::Service(service),
            None => Error::Http(status, text),
        })
    }
}
