//! vmbridge - script an emulated machine through a terminal console
//!
//! The bridge sits between a machine emulator and a terminal widget. Host
//! scripts drive it through a [`BridgeHandle`]: start and stop the machine,
//! type into it, read what the user types, and save or restore its state.
//!
//! ## Components
//!
//! - **Escape formatter**: cursor, erase and color sequences
//! - **Input capture queue**: hands terminal input to waiting consumers
//! - **Terminal router**: keyboard and serial plumbing
//! - **Machine lifecycle**: one machine session and its status
//! - **Snapshots**: single-slot save/restore
//! - **Headless terminal / echo machine**: in-process collaborators

pub mod bridge;
pub mod config;
pub mod error;
pub mod escape;
pub mod input;
pub mod machine;
pub mod router;
pub mod script;
pub mod snapshot;
pub mod terminal;
pub mod window;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeHandle, BridgeNotification};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use input::{InputCaptureQueue, PendingInput};
pub use machine::{
    EchoLauncher, MachineController, MachineError, MachineLauncher, MachineSession, MachineState,
    OsImage, StatusRecord,
};
pub use router::TerminalRouter;
pub use snapshot::{SnapshotError, SnapshotManager, StateSnapshot};
pub use terminal::{HeadlessTerminal, Terminal, TerminalEvent, TerminalSize};
pub use window::WindowState;
