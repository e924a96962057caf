//! Error types for SanketIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SanketIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding of a wire payload failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed web-app or broker URI
    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// Push attempted on a closed session
    #[error("Broker session {session} is closed")]
    SessionClosed {
        /// Session token of the closed channel
        session: String,
    },

    /// Frame larger than the broker accepts
    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge {
        /// Actual payload length
        len: usize,
        /// Maximum accepted payload length
        max: usize,
    },

    /// Frame shorter than its length prefix announces
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Beacon scan driver failure
    #[error("Scanner error: {0}")]
    Scanner(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
