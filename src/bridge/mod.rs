//! The bridge task.
//!
//! One tokio task owns the machine controller, the terminal router, the
//! snapshot slot and the window state. Host calls reach it as
//! [`HostCommand`]s through a [`BridgeHandle`]; terminal events and machine
//! output bytes arrive on their own channels. Each channel is applied in
//! order from a single `select!` loop. Queued terminal events go first, and
//! machine output already queued when a host command is picked up is
//! written before the command runs, up to a fixed bound so a streaming
//! machine never holds commands back.

pub mod command;
pub mod handle;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace};

pub use command::HostCommand;
pub use handle::BridgeHandle;

use crate::config::BridgeConfig;
use crate::input::InputCaptureQueue;
use crate::machine::{MachineController, MachineLauncher, OutputByte, OutputSink};
use crate::router::TerminalRouter;
use crate::snapshot::SnapshotManager;
use crate::terminal::{measure, Terminal, TerminalEvent, TerminalSize};
use crate::window::WindowState;

const COMMAND_QUEUE_DEPTH: usize = 64;
const NOTIFICATION_CAPACITY: usize = 16;
/// Output bytes applied per wake-up of the output arm.
const OUTPUT_BATCH: usize = 4096;
/// Bound on the backlog flushed ahead of a host command.
const OUTPUT_DRAIN_LIMIT: usize = 64 * 1024;

/// Events pushed to host subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeNotification {
    TerminalResized(TerminalSize),
}

pub struct Bridge {
    config: Arc<BridgeConfig>,
    controller: MachineController,
    router: TerminalRouter,
    snapshots: SnapshotManager,
    window: WindowState,
    terminal_events: mpsc::UnboundedReceiver<TerminalEvent>,
    machine_output: mpsc::UnboundedReceiver<OutputByte>,
    notifications: broadcast::Sender<BridgeNotification>,
    refit_at: Option<Instant>,
}

impl Bridge {
    /// `launcher` is `None` when no emulator is available; start requests
    /// then fail with an error status instead of booting.
    pub fn new(
        config: BridgeConfig,
        launcher: Option<Arc<dyn MachineLauncher>>,
        terminal: Box<dyn Terminal>,
        terminal_events: mpsc::UnboundedReceiver<TerminalEvent>,
    ) -> Self {
        let config = Arc::new(config);
        let (output_tx, machine_output) = mpsc::unbounded_channel();
        let controller = MachineController::new(launcher, config.clone(), OutputSink::new(output_tx));
        let router = TerminalRouter::new(
            terminal,
            InputCaptureQueue::new(config.input.buffering),
            &config.machine.output_channel,
        );
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            window: WindowState::new(&config.window),
            config,
            controller,
            router,
            snapshots: SnapshotManager::new(),
            terminal_events,
            machine_output,
            notifications,
            refit_at: None,
        }
    }

    /// Run the bridge on the current tokio runtime.
    ///
    /// The task ends once every handle has been dropped, halting any
    /// machine that is still up.
    pub fn spawn(self) -> BridgeHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let handle = BridgeHandle::new(
            tx,
            self.controller.subscribe_status(),
            self.notifications.clone(),
        );
        tokio::spawn(self.run(rx));
        handle
    }

    async fn run(mut self, mut commands: mpsc::Receiver<HostCommand>) {
        info!("Bridge started");
        loop {
            tokio::select! {
                biased;

                Some(event) = self.terminal_events.recv() => self.on_terminal_event(event),
                command = commands.recv() => match command {
                    Some(command) => {
                        self.drain_machine_output(OUTPUT_DRAIN_LIMIT);
                        self.handle_command(command).await;
                    }
                    None => break,
                },
                Some(out) = self.machine_output.recv() => {
                    self.router.on_machine_output_byte(&out);
                    self.drain_machine_output(OUTPUT_BATCH);
                }
                _ = refit_due(self.refit_at) => {
                    self.refit_at = None;
                    trace!("Re-fitting terminal");
                    self.router.terminal_mut().fit();
                }
            }
        }

        self.controller.shutdown().await;
        info!("Bridge stopped");
    }

    /// Apply up to `limit` already queued output bytes without waiting.
    fn drain_machine_output(&mut self, limit: usize) {
        for _ in 0..limit {
            match self.machine_output.try_recv() {
                Ok(out) => self.router.on_machine_output_byte(&out),
                Err(_) => return,
            }
        }
        trace!("Output backlog exceeds {} bytes, yielding", limit);
    }

    fn on_terminal_event(&mut self, event: TerminalEvent) {
        match event {
            TerminalEvent::Input(data) => {
                self.router.on_terminal_input(&data, self.controller.session_mut());
            }
            TerminalEvent::Resized(size) => {
                debug!("Terminal resized to {}x{}", size.cols, size.rows);
                // No subscribers is fine.
                let _ = self.notifications.send(BridgeNotification::TerminalResized(size));
            }
        }
    }

    fn schedule_refit(&mut self) {
        self.refit_at = Some(Instant::now() + self.config.window.refit_delay());
    }

    async fn handle_command(&mut self, command: HostCommand) {
        trace!("Host command: {}", command.name());
        match command {
            HostCommand::Start { os, reply } => {
                if let Err(e) = self.controller.start(&os, self.router.terminal_mut()).await {
                    debug!("Start of {:?} did not complete: {}", os, e);
                }
                let _ = reply.send(self.controller.state());
            }
            HostCommand::Stop { reply } => {
                self.controller.stop(self.router.terminal_mut()).await;
                let _ = reply.send(());
            }
            HostCommand::Show { x, y, width, height, reply } => {
                if self.window.show(x, y, width, height) {
                    self.schedule_refit();
                }
                let _ = reply.send(());
            }
            HostCommand::Hide { reply } => {
                self.window.hide();
                let _ = reply.send(());
            }
            HostCommand::Minimize { reply } => {
                self.window.minimize();
                let _ = reply.send(());
            }
            HostCommand::Maximize { reply } => {
                if self.window.maximize(&self.config.window) {
                    self.schedule_refit();
                }
                let _ = reply.send(());
            }
            HostCommand::SetVisibility { visibility, reply } => {
                if self.window.set_visibility(visibility) {
                    self.schedule_refit();
                }
                let _ = reply.send(());
            }
            HostCommand::Window { reply } => {
                let _ = reply.send(self.window.clone());
            }
            HostCommand::Write { text, reply } => {
                self.router.write(&text);
                let _ = reply.send(());
            }
            HostCommand::Print { text, newline, reply } => {
                self.router.write_line(&text, newline);
                let _ = reply.send(());
            }
            HostCommand::SendCommand { text, reply } => {
                self.router.send_command(&text);
                let _ = reply.send(());
            }
            HostCommand::SendKeys { text, reply } => {
                self.router.send_keys(&text, self.controller.session_mut());
                let _ = reply.send(());
            }
            HostCommand::RequestInput { reply } => {
                let _ = reply.send(self.router.input_mut().request_next());
            }
            HostCommand::SetInputBuffering { enabled, reply } => {
                debug!("Input buffering {}", if enabled { "enabled" } else { "disabled" });
                self.router.input_mut().set_buffering_enabled(enabled);
                let _ = reply.send(());
            }
            HostCommand::Metrics { metric, reply } => {
                let _ = reply.send(measure(self.router.terminal(), metric));
            }
            HostCommand::SaveState { reply } => {
                let saved = self
                    .snapshots
                    .capture(&mut self.controller, self.router.terminal_mut())
                    .await
                    .ok()
                    .cloned();
                let _ = reply.send(saved);
            }
            HostCommand::LoadState { reply } => {
                let restored = self
                    .snapshots
                    .restore(&mut self.controller, self.router.terminal_mut())
                    .await
                    .is_ok();
                let _ = reply.send(restored);
            }
            HostCommand::SavedSnapshot { reply } => {
                let _ = reply.send(self.snapshots.saved().cloned());
            }
        }
    }
}

async fn refit_due(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
