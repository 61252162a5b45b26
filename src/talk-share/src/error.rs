//! Error types for Talk file sharing.
//!
//! Every failure aborts the whole operation; nothing is retried and no
//! partial result is returned.

use thiserror::Error;

/// Errors that can occur while sharing a file into a conversation.
#[derive(Error, Debug)]
pub enum ShareError {
    /// Configuration error (missing or invalid config).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request could not be sent or the response could not be received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The sharing API answered the share POST with a non-200 status.
    #[error("Share creation failed: unexpected status code {status}")]
    ShareCreation {
        /// HTTP status returned by the sharing endpoint.
        status: u16,
    },

    /// WebDAV reported no such file.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Storage-relative path that was looked up.
        path: String,
    },

    /// WebDAV lookup failed with a status other than 404.
    #[error("WebDAV lookup failed: unexpected status code {status}")]
    Propfind {
        /// HTTP status returned by the PROPFIND.
        status: u16,
    },

    /// A body was received but lacks expected fields or has the wrong shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The chat endpoint did not accept the message.
    #[error("Posting chat message failed: unexpected status code {status}")]
    MessagePost {
        /// HTTP status returned by the chat endpoint.
        status: u16,
    },
}

impl ShareError {
    /// Whether this error means the file does not exist on the server.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ShareError::FileNotFound { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ShareError::ShareCreation { status }
            | ShareError::Propfind { status }
            | ShareError::MessagePost { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ShareError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ShareError::Transport(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ShareError::Transport(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            ShareError::MalformedResponse(err.to_string())
        } else {
            ShareError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ShareError {
    fn from(err: serde_json::Error) -> Self {
        ShareError::MalformedResponse(format!("invalid JSON: {}", err))
    }
}

impl From<quick_xml::Error> for ShareError {
    fn from(err: quick_xml::Error) -> Self {
        ShareError::MalformedResponse(format!("invalid XML: {}", err))
    }
}

impl From<url::ParseError> for ShareError {
    fn from(err: url::ParseError) -> Self {
        ShareError::Config(format!("Invalid URL: {}", err))
    }
}

/// Result type for sharing operations.
pub type ShareResult<T> = std::result::Result<T, ShareError>;
