//! Client construction errors.

use std::sync::Arc;

/// Errors raised while building a provider client.
///
/// Request-time failures are reported as `linkmeta_core::ProviderError`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The provider needs an API key and none was configured.
    #[error("missing API key: {0} not set")]
    MissingApiKey(&'static str),

    /// The configured endpoint is not a usable URL.
    #[error("invalid endpoint URL {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// The HTTP client could not be built.
    #[error("unable to build HTTP client: {0}")]
    Build(Arc<reqwest::Error>),
}

impl From<ClientError> for linkmeta_core::Error {
    fn from(err: ClientError) -> Self {
        linkmeta_core::Error::ProviderNotConfigured(err.to_string())
    }
}
