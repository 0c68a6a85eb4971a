use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::escape::{styled, Sgr};
use crate::machine::{BootConfig, MachineError, MachineLauncher, MachineSession, OsImage, OutputSink};
use crate::terminal::{Terminal, TerminalColor};

const NO_OS_LABEL: &str = "No OS loaded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Idle,
    Starting,
    Running,
    Stopping,
    Error,
}

impl MachineState {
    /// Coarse status reported to host scripts.
    pub fn host_status(self) -> &'static str {
        match self {
            MachineState::Starting => "starting",
            MachineState::Running => "running",
            MachineState::Idle | MachineState::Stopping | MachineState::Error => "stopped",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MachineState::Idle => "idle",
            MachineState::Starting => "starting",
            MachineState::Running => "running",
            MachineState::Stopping => "stopping",
            MachineState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Display projection of the controller state, republished on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub state: MachineState,
    pub status_text: String,
    pub is_healthy: bool,
    pub os_label: String,
}

impl StatusRecord {
    fn initial() -> Self {
        Self {
            state: MachineState::Idle,
            status_text: "Ready".to_string(),
            is_healthy: false,
            os_label: NO_OS_LABEL.to_string(),
        }
    }

    fn project(state: MachineState, os: Option<OsImage>) -> Self {
        let status_text = match (state, os) {
            (MachineState::Starting, Some(os)) => format!("Starting {}...", os),
            (MachineState::Running, Some(os)) => format!("Running {}", os),
            (MachineState::Stopping, Some(os)) => format!("Stopping {}...", os),
            (MachineState::Stopping, None) => "Stopping...".to_string(),
            (MachineState::Error, _) => "Error: Failed to start VM".to_string(),
            _ => "Stopped".to_string(),
        };
        let os_label = match (state, os) {
            (MachineState::Starting | MachineState::Running | MachineState::Stopping, Some(os)) => os.label(),
            _ => NO_OS_LABEL.to_string(),
        };

        Self {
            state,
            status_text,
            is_healthy: state == MachineState::Running,
            os_label,
        }
    }
}

struct ActiveSession {
    os: OsImage,
    session: Box<dyn MachineSession>,
}

/// Owns at most one machine session and drives it through
/// `Idle -> Starting -> Running -> Stopping -> Idle` (or `Starting -> Error`).
pub struct MachineController {
    launcher: Option<Arc<dyn MachineLauncher>>,
    config: Arc<BridgeConfig>,
    output: OutputSink,
    state: MachineState,
    active: Option<ActiveSession>,
    status: watch::Sender<StatusRecord>,
}

impl MachineController {
    /// `launcher` is `None` when the emulator could not be loaded; every
    /// start attempt then ends in `Error`.
    pub fn new(
        launcher: Option<Arc<dyn MachineLauncher>>,
        config: Arc<BridgeConfig>,
        output: OutputSink,
    ) -> Self {
        let (status, _) = watch::channel(StatusRecord::initial());
        Self {
            launcher,
            config,
            output,
            state: MachineState::Idle,
            active: None,
            status,
        }
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }

    /// OS of the live session, if any.
    pub fn os(&self) -> Option<OsImage> {
        self.active.as_ref().map(|a| a.os)
    }

    pub fn status(&self) -> StatusRecord {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<StatusRecord> {
        self.status.subscribe()
    }

    /// The live session, present only while `Running`.
    pub fn session_mut(&mut self) -> Option<&mut dyn MachineSession> {
        match self.active.as_mut() {
            Some(active) => Some(active.session.as_mut()),
            None => None,
        }
    }

    fn transition(&mut self, state: MachineState, os: Option<OsImage>) {
        debug!("Machine state {} -> {}", self.state, state);
        self.state = state;
        self.status.send_replace(StatusRecord::project(state, os));
    }

    /// Boot `selector`, replacing any session that is already up.
    ///
    /// Unknown selectors fall back to the configured default image.
    /// Failures leave the controller in `Error` and are reported on the
    /// terminal; the error is returned for logging only.
    pub async fn start(
        &mut self,
        selector: &str,
        terminal: &mut dyn Terminal,
    ) -> Result<OsImage, MachineError> {
        let os = match OsImage::parse(selector) {
            Some(os) => os,
            None => {
                let fallback = self.config.machine.default_image();
                warn!("Unknown OS selector {:?}, booting {} instead", selector, fallback);
                fallback
            }
        };

        if !matches!(self.state, MachineState::Idle | MachineState::Error) {
            info!("Machine already {}, stopping before restart", self.state);
            self.stop(terminal).await;
        }

        self.transition(MachineState::Starting, Some(os));
        info!("Starting {}", os);

        let launcher = match self.launcher.clone() {
            Some(launcher) => launcher,
            None => return Err(self.fail_start(os, MachineError::Unavailable, terminal)),
        };

        let boot = BootConfig::new(os, self.config.image_url(os), &self.config.machine);
        match launcher.launch(boot, self.output.clone()).await {
            Ok(session) => {
                self.active = Some(ActiveSession { os, session });
                self.transition(MachineState::Running, Some(os));
                info!("Machine running {}", os);
                write_boot_banner(terminal, os);
                Ok(os)
            }
            Err(e) => Err(self.fail_start(os, e, terminal)),
        }
    }

    fn fail_start(&mut self, os: OsImage, e: MachineError, terminal: &mut dyn Terminal) -> MachineError {
        error!("Failed to start {}: {}", os, e);
        self.active = None;
        self.transition(MachineState::Error, Some(os));
        terminal.write_line(&styled(
            &format!("[System] Failed to start VM: {}", e),
            &[Sgr::Bold, Sgr::Fg(TerminalColor::Red)],
        ));
        e
    }

    /// Halt and release the session. A no-op when already `Idle`.
    ///
    /// Halt errors are logged and otherwise ignored so the controller can
    /// never get stuck in `Stopping`.
    pub async fn stop(&mut self, terminal: &mut dyn Terminal) {
        if self.state == MachineState::Idle {
            debug!("Stop requested while idle, ignoring");
            return;
        }

        let os = self.os();
        self.transition(MachineState::Stopping, os);
        self.halt_active().await;
        self.transition(MachineState::Idle, None);
        info!("Machine stopped");

        terminal.clear();
        terminal.write_line(&styled(
            "Virtual Machine Stopped",
            &[Sgr::Bold, Sgr::Fg(TerminalColor::Red)],
        ));
    }

    /// Halt any session without touching the terminal.
    pub async fn shutdown(&mut self) {
        if self.active.is_some() {
            self.halt_active().await;
        }
        if self.state != MachineState::Idle {
            self.transition(MachineState::Idle, None);
        }
    }

    async fn halt_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            if let Err(e) = active.session.halt().await {
                warn!("Error stopping {}: {}", active.os, e);
            }
        }
    }
}

fn write_boot_banner(terminal: &mut dyn Terminal, os: OsImage) {
    let width = usize::from(terminal.size().cols.clamp(20, 80));
    let inner = width - 2;
    let title: String = "VIRTUAL MACHINE TERMINAL".chars().take(inner).collect();
    let pad = inner - title.chars().count();
    let frame = [Sgr::Bold, Sgr::Fg(TerminalColor::Green)];

    terminal.clear();
    terminal.write_line(&styled(&format!("╔{}╗", "═".repeat(inner)), &frame));
    terminal.write_line(&styled(
        &format!("║{}{}{}║", " ".repeat(pad / 2), title, " ".repeat(pad - pad / 2)),
        &frame,
    ));
    terminal.write_line(&styled(&format!("╚{}╝", "═".repeat(inner)), &frame));
    terminal.write_line("");
    terminal.write_line(&styled(
        &format!("OS: {}", os.label()),
        &[Sgr::Bold, Sgr::Fg(TerminalColor::Cyan)],
    ));
    terminal.write_line(&styled(
        "VM is booting up... This may take a moment.",
        &[Sgr::Fg(TerminalColor::Yellow)],
    ));
    terminal.write_line(&styled(
        "Type here to talk to the machine's serial console.",
        &[Sgr::Fg(TerminalColor::BrightWhite)],
    ));
    terminal.write_line("");
    terminal.write(&styled("$ ", &[Sgr::Bold, Sgr::Fg(TerminalColor::Green)]));
}
