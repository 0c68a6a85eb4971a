use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::terminal::{CursorPosition, Terminal, TerminalEvent, TerminalParser, TerminalSize};

struct Screen {
    parser: TerminalParser,
    fits: usize,
}

/// An in-memory terminal widget.
///
/// Output is run through the VT parser into a text grid; input and resize
/// events are pushed onto the channel returned by [`HeadlessTerminal::new`].
/// Clones share the same screen, so a caller can keep one clone for typing
/// and inspection while the bridge owns another.
#[derive(Clone)]
pub struct HeadlessTerminal {
    screen: Arc<Mutex<Screen>>,
    events: mpsc::UnboundedSender<TerminalEvent>,
}

impl HeadlessTerminal {
    pub fn new(rows: u16, cols: u16) -> (Self, mpsc::UnboundedReceiver<TerminalEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let terminal = Self {
            screen: Arc::new(Mutex::new(Screen {
                parser: TerminalParser::new(rows, cols),
                fits: 0,
            })),
            events,
        };
        (terminal, rx)
    }

    fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Simulate the user typing or pasting `text`.
    pub fn type_text(&self, text: &str) {
        trace!("Headless input: {:?}", text);
        if self.events.send(TerminalEvent::Input(text.to_string())).is_err() {
            debug!("Terminal input dropped, no listener attached");
        }
    }

    /// Resize the viewport and notify the listener.
    pub fn resize(&self, rows: u16, cols: u16) {
        let size = {
            let mut screen = self.screen();
            screen.parser.resize(rows, cols);
            let grid = screen.parser.grid();
            TerminalSize { cols: grid.cols, rows: grid.rows }
        };
        if self.events.send(TerminalEvent::Resized(size)).is_err() {
            debug!("Resize event dropped, no listener attached");
        }
    }

    /// Visible text, one line per row with trailing blanks trimmed.
    pub fn screen_text(&self) -> String {
        self.screen().parser.grid().screen_text()
    }

    pub fn row_text(&self, row: u16) -> Option<String> {
        self.screen().parser.grid().row_text(row)
    }

    /// How many times the widget has been asked to re-fit.
    pub fn fit_count(&self) -> usize {
        self.screen().fits
    }
}

impl Terminal for HeadlessTerminal {
    fn write(&mut self, text: &str) {
        self.screen().parser.parse(text.as_bytes());
    }

    fn clear(&mut self) {
        self.screen().parser.grid_mut().reset();
    }

    fn fit(&mut self) {
        self.screen().fits += 1;
    }

    fn size(&self) -> TerminalSize {
        let screen = self.screen();
        let grid = screen.parser.grid();
        TerminalSize { cols: grid.cols, rows: grid.rows }
    }

    fn cursor(&self) -> CursorPosition {
        let (row, col) = self.screen().parser.grid().cursor_position();
        CursorPosition { col, row }
    }
}
