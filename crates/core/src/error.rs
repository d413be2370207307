//! Error types for the pmrelay domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for pmrelay operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- I/O (socket bind, serve) ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Everything that can go wrong talking to the LLM provider.
///
/// None of these are retried; they are surfaced to the immediate caller.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider answered with a non-2xx status. `body` is the raw
    /// response body, which usually carries the provider's own error object.
    #[error("API request failed (status: {status_code}): {body}")]
    ApiError { status_code: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A 2xx response whose body could not be interpreted.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The model asked for a function call whose `arguments` are not JSON.
    #[error("Invalid function call arguments for '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),
}

impl ProviderError {
    /// The caller-facing `details` payload for this error.
    ///
    /// For API errors this is the provider's body parsed as JSON, or the raw
    /// body string when it is not JSON. Every other variant renders its
    /// display message.
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::ApiError { body, .. } => serde_json::from_str(body)
                .unwrap_or_else(|_| serde_json::Value::String(body.clone())),
            other => serde_json::Value::String(other.to_string()),
        }
    }

    /// Map a `reqwest`-style transport failure message onto a variant.
    pub fn transport(message: impl Into<String>, is_timeout: bool) -> Self {
        if is_timeout {
            Self::Timeout(message.into())
        } else {
            Self::Network(message.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            body: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = Error::Config {
            message: "PORT must be a port number, got 'abc'".into(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration error: PORT must be a port number, got 'abc'"
        );
    }

    #[test]
    fn api_error_details_parses_json_body() {
        let err = ProviderError::ApiError {
            status_code: 401,
            body: r#"{"error":{"message":"Incorrect API key provided"}}"#.into(),
        };
        assert_eq!(
            err.details(),
            serde_json::json!({"error": {"message": "Incorrect API key provided"}})
        );
    }

    #[test]
    fn api_error_details_keeps_plain_text_body() {
        let err = ProviderError::ApiError {
            status_code: 502,
            body: "Bad Gateway".into(),
        };
        assert_eq!(err.details(), serde_json::json!("Bad Gateway"));
    }

    #[test]
    fn network_error_details_is_message() {
        let err = ProviderError::Network("connection refused".into());
        assert_eq!(
            err.details(),
            serde_json::json!("Network error: connection refused")
        );
    }

    #[test]
    fn transport_distinguishes_timeouts() {
        assert!(matches!(
            ProviderError::transport("slow", true),
            ProviderError::Timeout(_)
        ));
        assert!(matches!(
            ProviderError::transport("reset", false),
            ProviderError::Network(_)
        ));
    }
}
