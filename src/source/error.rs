//! Error types for the run service client.

use thiserror::Error;

/// Errors that can occur when talking to the run service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("API returned status {status}: {message}")]
    Http { status: u16, message: String },

    /// The requested process, run or file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The configured endpoint is not a usable base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status code, when the service produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Connection(err.to_string())
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ApiError::Connection(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = ApiError::Http {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "API returned status 500: boom");
        assert_eq!(ApiError::NotFound("run".to_string()).status(), Some(404));
        assert_eq!(ApiError::Timeout.status(), None);
    }
}
