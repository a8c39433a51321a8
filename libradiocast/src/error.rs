//! Error types for Radiocast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RadiocastError>;

#[derive(Error, Debug)]
pub enum RadiocastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Playback error: {0}")]
    Media(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RadiocastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RadiocastError::InvalidInput(_) => 3,
            RadiocastError::Fetch(_) => 2,
            RadiocastError::Config(_) => 1,
            RadiocastError::Feed(_) => 1,
            RadiocastError::Document(_) => 1,
            RadiocastError::Media(_) => 1,
        }
    }

    /// True for failures of the transport layer (rejected request or non-success status)
    pub fn is_transport(&self) -> bool {
        matches!(self, RadiocastError::Fetch(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Transport failed for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("Malformed feed document: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone)]
pub enum DocumentError {
    #[error("Element not found: #{0}")]
    MissingElement(String),

    #[error("Element {0} is no longer attached to the document")]
    Detached(u64),

    #[error("Markup could not be parsed: {0}")]
    Markup(String),
}
