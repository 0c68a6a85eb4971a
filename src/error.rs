use thiserror::Error;

use crate::machine::MachineError;
use crate::snapshot::SnapshotError;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Machine error: {0}")]
    Machine(#[from] MachineError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Script error on line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("Bridge task has shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
