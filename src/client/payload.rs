use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::errors::Error;
use crate::properties::DataFormat;

/// Largest body the streaming endpoint accepts.
pub const MAX_STREAMING_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Default)]
pub(crate) struct Payload {
    pub bytes: Vec<u8>,
    pub records: usize,
}

impl Payload {
    fn push_line(&mut self, line: Vec<u8>) {
        if line.iter().any(|b| !b.is_ascii_whitespace()) {
            self.records += 1;
        }
        self.bytes.extend_from_slice(&line);
    }
}

/// Cuts an input stream into request bodies no larger than `limit`.
///
/// Line-delimited formats are split between lines, never inside one. Other
/// formats are sent as a single body.
pub(crate) struct PayloadReader<R> {
    reader: BufReader<R>,
    line_delimited: bool,
    limit: usize,
    pending: Option<Vec<u8>>,
    done: bool,
}

impl<R: AsyncRead + Unpin> PayloadReader<R> {
    pub fn new(reader: R, format: DataFormat, limit: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_delimited: format.is_line_delimited(),
            limit,
            pending: None,
            done: false,
        }
    }

    pub async fn next_payload(&mut self) -> Result<Option<Payload>, Error> {
        if self.line_delimited {
            self.next_lines().await
        } else {
            self.next_whole().await
        }
    }

    async fn next_lines(&mut self) -> Result<Option<Payload>, Error> {
        let mut payload = Payload::default();
        if let Some(line) = self.pending.take() {
            payload.push_line(line);
        }
        let bound = self.read_bound();
        while !self.done {
            let mut line = Vec::new();
            let read = (&mut self.reader)
                .take(bound)
                .read_until(b'\n', &mut line)
                .await?;
            if read == 0 {
                self.done = true;
                break;
            }
            if line.len() > self.limit {
                return Err(Error::DataTooLarge(line.len(), self.limit));
            }
            if payload.bytes.len() + line.len() > self.limit {
                self.pending = Some(line);
                break;
            }
            payload.push_line(line);
        }
        Ok((!payload.bytes.is_empty()).then_some(payload))
    }

    /// Reads stop one byte past the limit, so oversized input is never
    /// buffered in full. `DataTooLarge` then reports `limit + 1`.
    fn read_bound(&self) -> u64 {
        u64::try_from(self.limit).unwrap_or(u64::MAX).saturating_add(1)
    }

    async fn next_whole(&mut self) -> Result<Option<Payload>, Error> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let bound = self.read_bound();
        let mut bytes = Vec::new();
        (&mut self.reader)
            .take(bound)
            .read_to_end(&mut bytes)
            .await?;
        if bytes.len() > self.limit {
            return Err(Error::DataTooLarge(bytes.len(), self.limit));
        }
        Ok((!bytes.is_empty()).then_some(Payload { bytes, records: 0 }))
    }
}
