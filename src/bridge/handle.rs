use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

use crate::bridge::{BridgeNotification, HostCommand};
use crate::error::{BridgeError, Result};
use crate::escape::{self, EraseTarget};
use crate::machine::{MachineState, StatusRecord};
use crate::snapshot::StateSnapshot;
use crate::terminal::{ColorLayer, TerminalColor, TerminalMetric};
use crate::window::{Visibility, WindowState};

/// Host-facing side of a running bridge.
///
/// Cheap to clone. Every method that talks to the bridge task fails only
/// with [`BridgeError::Closed`]; everything else the host can get wrong is
/// coerced or ignored, and machine failures are reported on the terminal
/// and in the status record.
#[derive(Clone)]
pub struct BridgeHandle {
    commands: mpsc::Sender<HostCommand>,
    status: watch::Receiver<StatusRecord>,
    notifications: broadcast::Sender<BridgeNotification>,
}

impl BridgeHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<HostCommand>,
        status: watch::Receiver<StatusRecord>,
        notifications: broadcast::Sender<BridgeNotification>,
    ) -> Self {
        Self {
            commands,
            status,
            notifications,
        }
    }

    /// Send a command and wait for the bridge to apply it.
    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> HostCommand) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| BridgeError::Closed)?;
        rx.await.map_err(|_| BridgeError::Closed)
    }

    /// Boot `os`, replacing any running machine. Returns the state the
    /// attempt ended in (`Running` or `Error`).
    pub async fn start(&self, os: &str) -> Result<MachineState> {
        let os = os.to_string();
        self.call(|reply| HostCommand::Start { os, reply }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.call(|reply| HostCommand::Stop { reply }).await
    }

    pub async fn show(&self, x: i32, y: i32, width: u32, height: u32) -> Result<()> {
        self.call(|reply| HostCommand::Show { x, y, width, height, reply })
            .await
    }

    pub async fn hide(&self) -> Result<()> {
        self.call(|reply| HostCommand::Hide { reply }).await
    }

    pub async fn minimize(&self) -> Result<()> {
        self.call(|reply| HostCommand::Minimize { reply }).await
    }

    pub async fn maximize(&self) -> Result<()> {
        self.call(|reply| HostCommand::Maximize { reply }).await
    }

    /// `"show"` or `"hide"`; anything else is ignored.
    pub async fn set_visibility(&self, name: &str) -> Result<()> {
        match Visibility::parse(name) {
            Some(visibility) => {
                self.call(|reply| HostCommand::SetVisibility { visibility, reply })
                    .await
            }
            None => {
                debug!("Unknown visibility {:?}, ignoring", name);
                Ok(())
            }
        }
    }

    pub async fn window(&self) -> Result<WindowState> {
        self.call(|reply| HostCommand::Window { reply }).await
    }

    pub async fn print(&self, text: &str, newline: bool) -> Result<()> {
        let text = text.to_string();
        self.call(|reply| HostCommand::Print { text, newline, reply })
            .await
    }

    pub async fn send_command(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        self.call(|reply| HostCommand::SendCommand { text, reply })
            .await
    }

    pub async fn send_keys(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        self.call(|reply| HostCommand::SendKeys { text, reply }).await
    }

    /// Erase part of the terminal: `after`, `before`, `screen` or
    /// `scrollback`. Unknown targets are ignored.
    pub async fn clear(&self, target: &str) -> Result<()> {
        let Some(target) = EraseTarget::parse(target) else {
            debug!("Unknown clear target {:?}, ignoring", target);
            return Ok(());
        };
        self.write(escape::erase(target)).await
    }

    /// Move the cursor to a zero-based cell. Coordinates that are not
    /// non-negative integers are ignored.
    pub async fn move_cursor_to(&self, x: f64, y: f64) -> Result<()> {
        match escape::move_cursor_to(x, y) {
            Some(seq) => self.write(seq).await,
            None => {
                debug!("Ignoring cursor move to ({}, {})", x, y);
                Ok(())
            }
        }
    }

    async fn write(&self, text: String) -> Result<()> {
        self.call(|reply| HostCommand::Write { text, reply }).await
    }

    pub fn is_running(&self) -> bool {
        self.status.borrow().state == MachineState::Running
    }

    /// `"stopped"`, `"starting"` or `"running"`.
    pub fn status(&self) -> &'static str {
        self.status.borrow().state.host_status()
    }

    pub fn status_record(&self) -> StatusRecord {
        self.status.borrow().clone()
    }

    /// Watch the status record as the machine moves through its states.
    pub fn status_changes(&self) -> watch::Receiver<StatusRecord> {
        self.status.clone()
    }

    /// Wait for the next chunk of terminal input, or take whatever has been
    /// buffered so far.
    ///
    /// Input keeps flowing while this waits; the bridge is not blocked.
    pub async fn request_input(&self) -> Result<String> {
        let pending = self.call(|reply| HostCommand::RequestInput { reply }).await?;
        Ok(pending.await)
    }

    pub async fn set_input_buffering(&self, enabled: bool) -> Result<()> {
        self.call(|reply| HostCommand::SetInputBuffering { enabled, reply })
            .await
    }

    /// Terminal size or cursor position as JSON, e.g. `{"x":80,"y":12}`.
    /// Unknown metrics yield `{}`.
    pub async fn metrics(&self, name: &str) -> Result<String> {
        let Some(metric) = TerminalMetric::parse(name) else {
            return Ok("{}".to_string());
        };
        let point = self.call(|reply| HostCommand::Metrics { metric, reply }).await?;
        match serde_json::to_string(&point) {
            Ok(json) => Ok(json),
            Err(e) => {
                debug!("Could not serialize {} metric: {}", name, e);
                Ok("{}".to_string())
            }
        }
    }

    /// Capture the running machine. `None` when nothing was saved; the
    /// reason has already been written to the terminal.
    pub async fn save_state(&self) -> Result<Option<StateSnapshot>> {
        self.call(|reply| HostCommand::SaveState { reply }).await
    }

    /// Restore the saved snapshot. `false` when nothing was restored.
    pub async fn load_state(&self) -> Result<bool> {
        self.call(|reply| HostCommand::LoadState { reply }).await
    }

    pub async fn saved_snapshot(&self) -> Result<Option<StateSnapshot>> {
        self.call(|reply| HostCommand::SavedSnapshot { reply }).await
    }

    /// Wrap `text` in a 24-bit color sequence. Pure; does not touch the bridge.
    pub fn colored_text(&self, text: &str, color: &str, layer: &str) -> String {
        escape::colored_text(text, TerminalColor::parse_rgb(color), ColorLayer::parse(layer))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeNotification> {
        self.notifications.subscribe()
    }
}
