//! Result and error types for the WMI client.

use thiserror::Error;

/// Result type for WMI client operations
pub type WmiResult<T> = Result<T, WmiError>;

/// Errors that can occur in the WMI client
#[derive(Debug, Error)]
pub enum WmiError {
    /// The request could not be sent or its body could not be read
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// Requested path or URL
        url: String,
        /// Error message
        message: String,
    },

    /// The server answered with a non-success status
    #[error("Request to {url} returned HTTP {status}")]
    Status {
        /// Requested path or URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// A push payload could not be decoded
    #[error("Malformed push payload: {message}")]
    MalformedPayload {
        /// Error message
        message: String,
    },

    /// No handler is registered under this method name
    #[error("Unknown remote method: {method}")]
    UnknownMethod {
        /// Method name received from the server
        method: String,
    },

    /// A handler rejected the arguments it was called with
    #[error("Invalid arguments for {method}: {message}")]
    InvalidArguments {
        /// Method name
        method: String,
        /// Error message
        message: String,
    },

    /// A handler could not be registered
    #[error("Cannot register handler {method}: {message}")]
    Registration {
        /// Method name
        method: String,
        /// Error message
        message: String,
    },

    /// The named list is not mounted on the current page
    #[error("No list named {name} on this page")]
    UnknownList {
        /// List name
        name: String,
    },

    /// User input rejected before anything is sent to the server
    #[error("{message}")]
    Validation {
        /// Message shown to the user
        message: String,
    },

    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The page side of the push channel went away
    #[error("Push channel closed")]
    ChannelClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl WmiError {
    /// Create a validation error
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid-arguments error for a handler
    #[must_use]
    pub fn invalid_arguments(method: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            method: method.to_string(),
            message: message.into(),
        }
    }
}
