use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::escape::{styled, Sgr};
use crate::machine::{MachineController, MachineError, OsImage};
use crate::terminal::{Terminal, TerminalColor};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("No running VM")]
    NoActiveMachine,

    #[error("No saved state found")]
    NoSavedState,

    #[error("Capture failed: {0}")]
    Capture(#[source] MachineError),

    #[error("Restore failed: {0}")]
    Restore(#[source] MachineError),
}

/// Opaque machine state plus where and when it was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub id: Uuid,
    pub os: OsImage,
    pub captured_at: DateTime<Utc>,
    pub blob: Vec<u8>,
}

/// Single-slot snapshot storage. A new capture replaces the old one.
#[derive(Debug, Default)]
pub struct SnapshotManager {
    slot: Option<StateSnapshot>,
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<&StateSnapshot> {
        self.slot.as_ref()
    }

    /// Save the running machine's state into the slot.
    ///
    /// On any failure the slot keeps its previous contents.
    pub async fn capture(
        &mut self,
        machine: &mut MachineController,
        terminal: &mut dyn Terminal,
    ) -> Result<&StateSnapshot, SnapshotError> {
        let os = match machine.os() {
            Some(os) if machine.is_running() => os,
            _ => {
                warn!("No VM running to save state");
                system_message(terminal, "No running VM to save", false);
                return Err(SnapshotError::NoActiveMachine);
            }
        };
        let Some(session) = machine.session_mut() else {
            return Err(SnapshotError::NoActiveMachine);
        };

        match session.save_state().await {
            Ok(blob) => {
                let snapshot = StateSnapshot {
                    id: Uuid::new_v4(),
                    os,
                    captured_at: Utc::now(),
                    blob,
                };
                info!("VM state saved ({} bytes, snapshot {})", snapshot.blob.len(), snapshot.id);
                system_message(terminal, "VM state saved", true);
                Ok(self.slot.insert(snapshot))
            }
            Err(e) => {
                error!("Failed to save state: {}", e);
                system_message(terminal, "Failed to save VM state", false);
                Err(SnapshotError::Capture(e))
            }
        }
    }

    /// Apply the saved state to the running machine.
    ///
    /// A failed restore is reported but leaves the machine state alone.
    pub async fn restore(
        &mut self,
        machine: &mut MachineController,
        terminal: &mut dyn Terminal,
    ) -> Result<(), SnapshotError> {
        if !machine.is_running() {
            warn!("No VM running to load state");
            system_message(terminal, "No running VM to restore into", false);
            return Err(SnapshotError::NoActiveMachine);
        }
        let Some(snapshot) = self.slot.as_ref() else {
            warn!("No saved state found");
            system_message(terminal, "No saved state found", false);
            return Err(SnapshotError::NoSavedState);
        };
        let Some(session) = machine.session_mut() else {
            return Err(SnapshotError::NoActiveMachine);
        };

        match session.restore_state(&snapshot.blob).await {
            Ok(()) => {
                info!("VM state restored from snapshot {}", snapshot.id);
                system_message(terminal, "VM state restored", true);
                Ok(())
            }
            Err(e) => {
                error!("Error loading VM state: {}", e);
                system_message(terminal, "Failed to restore VM state", false);
                Err(SnapshotError::Restore(e))
            }
        }
    }
}

fn system_message(terminal: &mut dyn Terminal, text: &str, success: bool) {
    let color = if success { TerminalColor::Yellow } else { TerminalColor::Red };
    terminal.write_line(&styled(&format!("[System] {}", text), &[Sgr::Bold, Sgr::Fg(color)]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::machine::{BootConfig, EchoLauncher, MachineLauncher, MachineSession, MachineState, OutputSink};
    use crate::terminal::HeadlessTerminal;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn controller() -> MachineController {
        controller_with(Arc::new(EchoLauncher::new()))
    }

    fn controller_with(launcher: Arc<dyn MachineLauncher>) -> MachineController {
        let (tx, _rx) = mpsc::unbounded_channel();
        MachineController::new(Some(launcher), Arc::new(BridgeConfig::default()), OutputSink::new(tx))
    }

    /// Session whose save/restore start failing once `broken` is set.
    struct FlakySession {
        broken: Arc<AtomicBool>,
        saves: u8,
    }

    #[async_trait]
    impl MachineSession for FlakySession {
        fn send_keyboard_code(&mut self, _code: u16) -> Result<(), MachineError> {
            Ok(())
        }

        async fn save_state(&mut self) -> Result<Vec<u8>, MachineError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(MachineError::Save("disk full".to_string()));
            }
            self.saves += 1;
            Ok(vec![0xAB, self.saves])
        }

        async fn restore_state(&mut self, _blob: &[u8]) -> Result<(), MachineError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(MachineError::Restore("bad blob".to_string()));
            }
            Ok(())
        }

        async fn halt(&mut self) -> Result<(), MachineError> {
            Ok(())
        }
    }

    struct FlakyLauncher {
        broken: Arc<AtomicBool>,
    }

    #[async_trait]
    impl MachineLauncher for FlakyLauncher {
        async fn launch(
            &self,
            _config: BootConfig,
            _output: OutputSink,
        ) -> Result<Box<dyn MachineSession>, MachineError> {
            Ok(Box::new(FlakySession {
                broken: self.broken.clone(),
                saves: 0,
            }))
        }
    }

    async fn flaky_running() -> (MachineController, HeadlessTerminal, Arc<AtomicBool>) {
        let broken = Arc::new(AtomicBool::new(false));
        let (mut terminal, _events) = HeadlessTerminal::new(12, 80);
        let mut machine = controller_with(Arc::new(FlakyLauncher { broken: broken.clone() }));
        machine.start("linux", &mut terminal).await.unwrap();
        (machine, terminal, broken)
    }

    #[tokio::test]
    async fn test_capture_requires_running_machine() {
        let (mut terminal, _events) = HeadlessTerminal::new(12, 80);
        let mut machine = controller();
        let mut snapshots = SnapshotManager::new();

        let err = snapshots.capture(&mut machine, &mut terminal).await.unwrap_err();
        assert!(matches!(err, SnapshotError::NoActiveMachine));
        assert!(snapshots.saved().is_none());
        assert!(terminal.screen_text().contains("No running VM to save"));
    }

    #[tokio::test]
    async fn test_restore_reports_missing_slot() {
        let (mut terminal, _events) = HeadlessTerminal::new(12, 80);
        let mut machine = controller();
        machine.start("linux", &mut terminal).await.unwrap();
        let mut snapshots = SnapshotManager::new();

        let err = snapshots.restore(&mut machine, &mut terminal).await.unwrap_err();
        assert!(matches!(err, SnapshotError::NoSavedState));
        assert!(terminal.screen_text().contains("No saved state found"));
    }

    #[tokio::test]
    async fn test_capture_replaces_slot() {
        let (mut terminal, _events) = HeadlessTerminal::new(12, 80);
        let mut machine = controller();
        machine.start("kolibri", &mut terminal).await.unwrap();
        let mut snapshots = SnapshotManager::new();

        let first = snapshots.capture(&mut machine, &mut terminal).await.unwrap().id;
        let second = snapshots.capture(&mut machine, &mut terminal).await.unwrap().id;
        assert_ne!(first, second);
        assert_eq!(snapshots.saved().unwrap().os, OsImage::Kolibri);

        snapshots.restore(&mut machine, &mut terminal).await.unwrap();
        assert!(terminal.screen_text().contains("[System] VM state restored"));
    }

    #[tokio::test]
    async fn test_idle_capture_keeps_existing_slot() {
        let (mut terminal, _events) = HeadlessTerminal::new(12, 80);
        let mut machine = controller();
        machine.start("linux", &mut terminal).await.unwrap();
        let mut snapshots = SnapshotManager::new();
        let before = snapshots.capture(&mut machine, &mut terminal).await.unwrap().clone();

        machine.stop(&mut terminal).await;
        assert!(snapshots.capture(&mut machine, &mut terminal).await.is_err());
        assert_eq!(snapshots.saved(), Some(&before));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_slot() {
        let (mut machine, mut terminal, broken) = flaky_running().await;
        let mut snapshots = SnapshotManager::new();
        let before = snapshots.capture(&mut machine, &mut terminal).await.unwrap().clone();

        broken.store(true, Ordering::SeqCst);
        let err = snapshots.capture(&mut machine, &mut terminal).await.unwrap_err();
        assert!(matches!(err, SnapshotError::Capture(MachineError::Save(_))));
        assert_eq!(snapshots.saved(), Some(&before));
        assert_eq!(snapshots.saved().unwrap().blob, vec![0xAB, 1]);
        assert!(terminal.screen_text().contains("[System] Failed to save VM state"));
    }

    #[tokio::test]
    async fn test_failed_restore_keeps_machine_running() {
        let (mut machine, mut terminal, broken) = flaky_running().await;
        let mut snapshots = SnapshotManager::new();
        snapshots.capture(&mut machine, &mut terminal).await.unwrap();

        broken.store(true, Ordering::SeqCst);
        let err = snapshots.restore(&mut machine, &mut terminal).await.unwrap_err();
        assert!(matches!(err, SnapshotError::Restore(MachineError::Restore(_))));
        assert_eq!(machine.state(), MachineState::Running);
        assert!(machine.status().is_healthy);
        assert!(snapshots.saved().is_some());
        assert!(terminal.screen_text().contains("[System] Failed to restore VM state"));
    }
}
