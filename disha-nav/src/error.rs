//! Error types for DishaNav

use crate::engine::TaskId;
use thiserror::Error;

/// DishaNav error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Map data error: {0}")]
    MapData(String),

    /// A navigation task is already running; the new one was refused
    #[error("Navigation task {active} is already running")]
    TaskAlreadyActive { active: TaskId },

    /// Start or finish point missing
    #[error("Start/finish pair is incomplete")]
    IncompletePair,

    /// The routing engine cannot connect the pair
    #[error("No route between the selected points")]
    Unreachable,

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] sanket_io::Error),

    #[error("Invalid URI: {0}")]
    Uri(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for NavError {
    fn from(e: serde_json::Error) -> Self {
        NavError::MapData(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
