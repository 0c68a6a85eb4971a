//! The emulator seam.
//!
//! An emulator is reached through a [`MachineLauncher`], which builds one
//! [`MachineSession`] per boot. Sessions push their output bytes into the
//! [`OutputSink`] they were launched with.

pub mod boot;
pub mod catalog;
pub mod echo;
pub mod lifecycle;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub use boot::{BiosImages, BootConfig};
pub use catalog::OsImage;
pub use echo::{EchoLauncher, EchoMachine};
pub use lifecycle::{MachineController, MachineState, StatusRecord};

#[derive(Error, Debug)]
pub enum MachineError {
    #[error("Emulator is not available")]
    Unavailable,

    #[error("Machine construction failed: {0}")]
    Launch(String),

    #[error("Keyboard channel rejected input: {0}")]
    Keyboard(String),

    #[error("Saving state failed: {0}")]
    Save(String),

    #[error("Restoring state failed: {0}")]
    Restore(String),

    #[error("Halting machine failed: {0}")]
    Halt(String),

    #[error("State blob is not valid: {0}")]
    InvalidState(#[from] serde_json::Error),
}

/// One byte emitted by the emulator on a named channel (e.g. `serial0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputByte {
    pub channel: String,
    pub byte: u8,
}

/// Where a session delivers its output bytes.
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: mpsc::UnboundedSender<OutputByte>,
}

impl OutputSink {
    pub fn new(tx: mpsc::UnboundedSender<OutputByte>) -> Self {
        Self { tx }
    }

    /// Returns false once the bridge has stopped listening.
    pub fn emit(&self, channel: &str, byte: u8) -> bool {
        self.tx
            .send(OutputByte { channel: channel.to_string(), byte })
            .is_ok()
    }

    pub fn emit_all(&self, channel: &str, bytes: &[u8]) -> bool {
        bytes.iter().all(|&b| self.emit(channel, b))
    }
}

/// A running emulated machine.
#[async_trait]
pub trait MachineSession: Send {
    /// Deliver one keyboard code (a UTF-16 code unit) to the machine.
    fn send_keyboard_code(&mut self, code: u16) -> Result<(), MachineError>;

    /// Serialize the complete machine state.
    async fn save_state(&mut self) -> Result<Vec<u8>, MachineError>;

    /// Replace the machine state with a blob from [`save_state`](Self::save_state).
    async fn restore_state(&mut self, blob: &[u8]) -> Result<(), MachineError>;

    async fn halt(&mut self) -> Result<(), MachineError>;
}

/// Factory for machine sessions.
#[async_trait]
pub trait MachineLauncher: Send + Sync {
    async fn launch(
        &self,
        config: BootConfig,
        output: OutputSink,
    ) -> Result<Box<dyn MachineSession>, MachineError>;
}
