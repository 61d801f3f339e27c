//! Unified error types for linkmeta.
//!
//! Cache failures are always surfaced to the caller because they leave the
//! store in an unknown state. Provider failures are fatal to the fetch job
//! that hit them, never to the request that dispatched the job.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

use crate::provider::ProviderError;

/// Unified error types for linkmeta.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL list).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Store operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A cached payload could not be decoded.
    #[error("CACHE_DECODE: unable to decode cached data for key {key}: {reason}")]
    CacheDecode { key: String, reason: String },

    /// A value could not be encoded for the store.
    #[error("CACHE_ERROR: unable to encode value for key {key}: {reason}")]
    CacheEncode { key: String, reason: String },

    /// A queued job payload could not be decoded.
    #[error("JOB_DECODE: job {id}: {reason}")]
    JobDecode { id: i64, reason: String },

    /// Remote provider failure.
    #[error("PROVIDER_ERROR: {0}")]
    Provider(#[from] ProviderError),

    /// The requested provider has no credentials or endpoint configured.
    #[error("PROVIDER_NOT_CONFIGURED: {0}")]
    ProviderNotConfigured(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::Database(_) | Error::MigrationFailed(_) | Error::CacheEncode { .. } => -32002,
            Error::CacheDecode { .. } => -32003,
            Error::JobDecode { .. } => -32004,
            Error::Provider(_) => -32008,
            Error::ProviderNotConfigured(_) => -32009,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
