//! Error types for conversation store writes.

use thiserror::Error;

/// Error type for all conversation writer operations.
#[derive(Debug, Error)]
pub enum ConversationSyncError {
    /// Network or transport-level HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned a non-success HTTP status.
    ///
    /// Contains the status code and response body for debugging.
    #[error("API error: {status} - {message}")]
    Api {
        /// The HTTP status code returned by the backend.
        status: u16,
        /// The response body, typically containing error details.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration or initialization error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result alias for conversation writer operations.
pub type SyncResult<T> = Result<T, ConversationSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = ConversationSyncError::Api {
            status: 401,
            message: "JWT expired".to_string(),
        };
        assert_eq!(format!("{}", err), "API error: 401 - JWT expired");
    }

    #[test]
    fn config_error_display() {
        let err = ConversationSyncError::Config("missing API URL".to_string());
        assert_eq!(format!("{}", err), "Configuration error: missing API URL");
    }

    #[test]
    fn json_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json {{{").unwrap_err();
        let err: ConversationSyncError = serde_err.into();
        assert!(format!("{}", err).starts_with("JSON error:"));
    }
}
