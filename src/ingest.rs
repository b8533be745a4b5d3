use std::io::Cursor;

use serde::Serialize;
use tokio::io::AsyncRead;
use tracing::{error, info, trace};

use crate::{
    StreamingIngestClient, config::Config, errors::Error, records, types::IngestionResult,
};

/// Entry points that take caller configuration and hide the client setup.
pub struct KustoIngest;

impl KustoIngest {
    /// Ingests `input` into the table named by `config`.
    ///
    /// `input` may be any async byte source (file, socket, HTTP body). It
    /// should separate records with `\n`.
    pub async fn ingest_from_stream<R>(input: R, config: &Config) -> Result<IngestionResult, Error>
    where
        R: AsyncRead + Unpin + Send,
    {
        let result = match StreamingIngestClient::from_config(config) {
            Ok(client) => client.ingest_from_stream(input, None).await,
            Err(err) => Err(err),
        };
        match &result {
            Ok(outcome) => info!(
                source_id = %outcome.source_id,
                requests = outcome.requests,
                records = outcome.records,
                "ingest_from_stream done"
            ),
            Err(err) => error!("ingest_from_stream failed: {}", err),
        }
        result
    }

    /// Ingests an ordered collection of records.
    ///
    /// Each record becomes one line: structured values as JSON, strings and
    /// other primitives as their plain text. The lines are then sent exactly
    /// as [`KustoIngest::ingest_from_stream`] would send them.
    pub async fn ingest_from_array<I>(records: I, config: &Config) -> Result<IngestionResult, Error>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let payload = match records::encode_lines(records) {
            Ok(payload) => payload,
            Err(err) => {
                error!("ingest_from_array failed: {}", err);
                return Err(err);
            }
        };
        trace!(
            bytes = payload.len(),
            "ingest_from_array payload:\n{}",
            String::from_utf8_lossy(&payload)
        );
        Self::ingest_from_stream(Cursor::new(payload), config).await
    }
}
