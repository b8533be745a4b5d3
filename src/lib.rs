mod auth;
mod client;
pub mod config;
pub mod connection;
pub mod errors;
mod ingest;
pub mod properties;
pub mod records;
pub mod retry;
pub mod token;
pub mod types;

pub use auth::AadTokenProvider;
pub use client::{MAX_STREAMING_SIZE, StreamingIngestClient};
pub use config::{Config, ConfigLocation};
pub use connection::{AadCredential, KustoConnectionStringBuilder};
pub use errors::Error;
pub use ingest::KustoIngest;
pub use properties::{DataFormat, IngestionProperties};
pub use types::{IngestionResult, IngestionStatus};

pub(crate) const USER_AGENT_VALUE: &str = concat!("kusto-ingest-rust/", env!("CARGO_PKG_VERSION"));

#[cfg(test)]
mod tests;
