//! Error taxonomy for the alert pipeline
//!
//! An empty gainer list is never an error; it renders the "no gainers" email.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    /// Missing or invalid environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-2xx HTTP response
    #[error("HTTP {status} for {url}: {body}")]
    Transport { url: String, status: u16, body: String },

    /// Connection, timeout or body read failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Unexpected response from {url}: {message}")]
    Parse { url: String, message: String },

    /// Rejected credentials (HTTP 401/403 or SMTP AUTH)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Market-data API has no profile for the symbol
    #[error("Could not find company profile for {0}")]
    UnknownSymbol(String),

    /// Message build or SMTP delivery failure
    #[error("Email error: {0}")]
    Email(String),
}

pub type Result<T> = std::result::Result<T, AlertError>;

impl AlertError {
    /// Classify a failed HTTP status. 401/403 are credential problems, the rest
    /// are transport failures.
    pub fn from_status(url: &str, status: reqwest::StatusCode, body: String) -> Self {
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                AlertError::Auth(format!("HTTP {} for {}: {}", status, url, body))
            }
            _ => AlertError::Transport { url: url.to_string(), status: status.as_u16(), body },
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AlertError::Transport { .. } | AlertError::Http(_) | AlertError::Parse { .. })
    }
}
