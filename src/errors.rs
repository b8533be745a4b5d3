use std::fmt;

use std::time::Duration;

use reqwest::StatusCode;
use uuid::Uuid;

use crate::types::ServiceError;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Reqwest(reqwest::Error),
    /// Non-success HTTP status with the raw response body.
    Http(StatusCode, String),
    /// Structured error returned by the ingestion service.
    Service(ServiceError),
    DataTooLarge(usize, usize),
    Config(String),
    Timeout(Duration),
    Key(String),
    JwtSign(String),
    /// The access token could not be obtained; the ingest request was not sent.
    Auth(Box<Error>),
    /// A later payload failed after earlier payloads of the same stream were
    /// accepted. Resending the whole stream would duplicate the accepted rows.
    PartialIngest {
        source_id: Uuid,
        /// Requests the service accepted before the failure.
        requests: usize,
        bytes: usize,
        records: usize,
        error: Box<Error>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::Reqwest(err) => write!(f, "transport error: {err}"),
            Error::Http(status, body) => write!(f, "http {status}: {body}"),
            Error::Service(err) => write!(f, "{err}"),
            Error::DataTooLarge(actual, max) => {
                write!(f, "payload of {actual} bytes exceeds the {max} byte limit")
            }
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Timeout(after) => write!(f, "timed out after {after:?}"),
            Error::Key(msg) => write!(f, "key error: {msg}"),
            Error::JwtSign(msg) => write!(f, "jwt error: {msg}"),
            Error::Auth(err) => write!(f, "token acquisition failed: {err}"),
            Error::PartialIngest {
                source_id,
                requests,
                bytes,
                error,
                ..
            } => write!(
                f,
                "ingest {source_id} stopped after {requests} accepted request(s) ({bytes} bytes): {error}"
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Reqwest(err) => Some(err),
            Error::Auth(err) => Some(err.as_ref()),
            Error::PartialIngest { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Reqwest(err)
    }
}

impl Error {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http(status, _) => Some(*status),
            Error::Service(err) => Some(err.status),
            Error::Reqwest(err) => err.status(),
            Error::Auth(err) => err.status(),
            Error::PartialIngest { error, .. } => error.status(),
            _ => None,
        }
    }

    /// Maps a send failure, reporting client-side timeouts as [`Error::Timeout`].
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(after) if err.is_timeout() => Error::Timeout(after),
            _ => Error::Reqwest(err),
        }
    }
}
