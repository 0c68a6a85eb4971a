// Serial-console loopback machine.
// Echoes every keyboard code back on its output channel the way a line
// discipline with echo enabled would, and keeps a transcript of everything
// it printed. The transcript is the whole machine state, so snapshots are
// meaningful and observable on the terminal.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::machine::{BootConfig, MachineError, MachineLauncher, MachineSession, OsImage, OutputSink};

pub const DEFAULT_CHANNEL: &str = "serial0";

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EchoState {
    os: OsImage,
    transcript: Vec<u8>,
    keys_received: u64,
}

pub struct EchoMachine {
    state: EchoState,
    output: OutputSink,
    channel: String,
    halted: bool,
}

impl EchoMachine {
    pub fn boot(os: OsImage, output: OutputSink, channel: &str) -> Self {
        let mut machine = Self {
            state: EchoState {
                os,
                transcript: Vec::new(),
                keys_received: 0,
            },
            output,
            channel: channel.to_string(),
            halted: false,
        };
        machine.print(format!("{} console ready\r\n", os.display_name()).as_bytes());
        machine
    }

    /// Everything the machine has printed since boot (or since the restored snapshot).
    pub fn transcript(&self) -> String {
        String::from_utf8_lossy(&self.state.transcript).into_owned()
    }

    pub fn keys_received(&self) -> u64 {
        self.state.keys_received
    }

    fn print(&mut self, bytes: &[u8]) {
        self.state.transcript.extend_from_slice(bytes);
        self.output.emit_all(&self.channel, bytes);
    }

    fn erase_last(&mut self) {
        let erasable = self
            .state
            .transcript
            .last()
            .is_some_and(|&b| b != b'\n' && b != b'\r');
        if erasable {
            self.state.transcript.pop();
            self.output.emit_all(&self.channel, b"\x08 \x08");
        }
    }
}

#[async_trait]
impl MachineSession for EchoMachine {
    fn send_keyboard_code(&mut self, code: u16) -> Result<(), MachineError> {
        if self.halted {
            return Err(MachineError::Keyboard("machine is halted".to_string()));
        }
        self.state.keys_received += 1;

        // Anything outside Latin-1 has no single-byte serial representation.
        let byte = u8::try_from(code).unwrap_or(b'?');
        match byte {
            b'\r' | b'\n' => self.print(b"\r\n"),
            BACKSPACE | DELETE => self.erase_last(),
            _ => self.print(&[byte]),
        }
        Ok(())
    }

    async fn save_state(&mut self) -> Result<Vec<u8>, MachineError> {
        if self.halted {
            return Err(MachineError::Save("machine is halted".to_string()));
        }
        let blob = serde_json::to_vec(&self.state).map_err(|e| MachineError::Save(e.to_string()))?;
        debug!("Echo machine saved {} bytes of state", blob.len());
        Ok(blob)
    }

    async fn restore_state(&mut self, blob: &[u8]) -> Result<(), MachineError> {
        if self.halted {
            return Err(MachineError::Restore("machine is halted".to_string()));
        }
        let state: EchoState = serde_json::from_slice(blob)?;
        if state.os != self.state.os {
            return Err(MachineError::Restore(format!(
                "snapshot was taken on {}, machine is running {}",
                state.os, self.state.os
            )));
        }
        self.state = state;

        // Repaint the console from the restored transcript.
        self.output.emit_all(&self.channel, b"\x1b[2J\x1b[H");
        self.output.emit_all(&self.channel, &self.state.transcript);
        debug!("Echo machine restored {} transcript bytes", self.state.transcript.len());
        Ok(())
    }

    async fn halt(&mut self) -> Result<(), MachineError> {
        self.halted = true;
        info!("Echo machine ({}) halted", self.state.os);
        Ok(())
    }
}

/// Launches [`EchoMachine`]s.
#[derive(Debug, Clone)]
pub struct EchoLauncher {
    channel: String,
    boot_delay: Duration,
}

impl Default for EchoLauncher {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            boot_delay: Duration::ZERO,
        }
    }
}

impl EchoLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = channel.to_string();
        self
    }

    /// Simulated construction time, to exercise the `Starting` state.
    pub fn with_boot_delay(mut self, delay: Duration) -> Self {
        self.boot_delay = delay;
        self
    }
}

#[async_trait]
impl MachineLauncher for EchoLauncher {
    async fn launch(
        &self,
        config: BootConfig,
        output: OutputSink,
    ) -> Result<Box<dyn MachineSession>, MachineError> {
        if !self.boot_delay.is_zero() {
            sleep(self.boot_delay).await;
        }
        info!("Booting echo machine for {} from {}", config.os, config.boot_image_url);
        Ok(Box::new(EchoMachine::boot(config.os, output, &self.channel)))
    }
}
