//! Request validation errors for the linkmeta tools.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Rejected tool input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("INVALID_INPUT: urls must contain at least one URL")]
    NoUrls,

    #[error("INVALID_INPUT: a single request must contain at most {max} URLs, got {count}")]
    TooManyUrls { count: usize, max: usize },

    #[error("INVALID_INPUT: do not send empty URLs (index {index})")]
    EmptyUrl { index: usize },
}

impl From<RequestError> for McpError {
    fn from(err: RequestError) -> Self {
        McpError { code: ErrorCode(-32602), message: err.to_string().into(), data: None }
    }
}

/// Check a `urls` argument against the request limits.
pub fn validate_urls(urls: &[String], max: usize) -> Result<(), RequestError> {
    if urls.is_empty() {
        return Err(RequestError::NoUrls);
    }
    if urls.len() > max {
        return Err(RequestError::TooManyUrls { count: urls.len(), max });
    }
    if let Some(index) = urls.iter().position(|u| u.trim().is_empty()) {
        return Err(RequestError::EmptyUrl { index });
    }
    Ok(())
}
