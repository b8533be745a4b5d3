use std::time::Duration;

use reqwest::{Client, Url};

use crate::auth::AadTokenProvider;
use crate::connection::KustoConnectionStringBuilder;
use crate::properties::IngestionProperties;
use crate::retry::RetryCoordinator;
use crate::token::TokenGuard;

mod impls;
mod payload;

pub use payload::MAX_STREAMING_SIZE;

/// Sends newline-delimited data to a table through the cluster's
/// streaming-ingest endpoint, one authenticated POST per payload.
pub struct StreamingIngestClient {
    connection: KustoConnectionStringBuilder,
    default_properties: IngestionProperties,
    engine: Url,
    http: Client,
    auth: AadTokenProvider,
    tokens: TokenGuard,
    retry: RetryCoordinator,
    request_timeout: Option<Duration>,
    max_payload_size: usize,
}
