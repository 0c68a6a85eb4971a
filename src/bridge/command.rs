//! Commands sent from [`BridgeHandle`](super::BridgeHandle)s to the bridge task.
//!
//! Each variant carries a [`oneshot::Sender`] so the caller can await the
//! moment the bridge has applied it.

use tokio::sync::oneshot;

use crate::input::PendingInput;
use crate::machine::MachineState;
use crate::snapshot::StateSnapshot;
use crate::terminal::{MetricPoint, TerminalMetric};
use crate::window::{Visibility, WindowState};

pub enum HostCommand {
    Start {
        os: String,
        reply: oneshot::Sender<MachineState>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Show {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        reply: oneshot::Sender<()>,
    },
    Hide {
        reply: oneshot::Sender<()>,
    },
    Minimize {
        reply: oneshot::Sender<()>,
    },
    Maximize {
        reply: oneshot::Sender<()>,
    },
    SetVisibility {
        visibility: Visibility,
        reply: oneshot::Sender<()>,
    },
    Window {
        reply: oneshot::Sender<WindowState>,
    },
    /// Raw terminal output, escape sequences included.
    Write {
        text: String,
        reply: oneshot::Sender<()>,
    },
    Print {
        text: String,
        newline: bool,
        reply: oneshot::Sender<()>,
    },
    SendCommand {
        text: String,
        reply: oneshot::Sender<()>,
    },
    SendKeys {
        text: String,
        reply: oneshot::Sender<()>,
    },
    RequestInput {
        reply: oneshot::Sender<PendingInput>,
    },
    SetInputBuffering {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    Metrics {
        metric: TerminalMetric,
        reply: oneshot::Sender<MetricPoint>,
    },
    SaveState {
        reply: oneshot::Sender<Option<StateSnapshot>>,
    },
    LoadState {
        reply: oneshot::Sender<bool>,
    },
    SavedSnapshot {
        reply: oneshot::Sender<Option<StateSnapshot>>,
    },
}

impl HostCommand {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::Start { .. } => "start",
            HostCommand::Stop { .. } => "stop",
            HostCommand::Show { .. } => "show",
            HostCommand::Hide { .. } => "hide",
            HostCommand::Minimize { .. } => "minimize",
            HostCommand::Maximize { .. } => "maximize",
            HostCommand::SetVisibility { .. } => "set_visibility",
            HostCommand::Window { .. } => "window",
            HostCommand::Write { .. } => "write",
            HostCommand::Print { .. } => "print",
            HostCommand::SendCommand { .. } => "send_command",
            HostCommand::SendKeys { .. } => "send_keys",
            HostCommand::RequestInput { .. } => "request_input",
            HostCommand::SetInputBuffering { .. } => "set_input_buffering",
            HostCommand::Metrics { .. } => "metrics",
            HostCommand::SaveState { .. } => "save_state",
            HostCommand::LoadState { .. } => "load_state",
            HostCommand::SavedSnapshot { .. } => "saved_snapshot",
        }
    }
}
