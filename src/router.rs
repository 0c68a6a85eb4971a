use tracing::{debug, trace, warn};

use crate::input::InputCaptureQueue;
use crate::machine::{MachineSession, OutputByte};
use crate::terminal::Terminal;

/// Moves bytes between the terminal widget, the input queue and the
/// machine's keyboard/output channels.
pub struct TerminalRouter {
    terminal: Box<dyn Terminal>,
    input: InputCaptureQueue,
    output_channel: String,
}

impl TerminalRouter {
    pub fn new(terminal: Box<dyn Terminal>, input: InputCaptureQueue, output_channel: &str) -> Self {
        Self {
            terminal,
            input,
            output_channel: output_channel.to_string(),
        }
    }

    pub fn terminal(&self) -> &dyn Terminal {
        self.terminal.as_ref()
    }

    pub fn terminal_mut(&mut self) -> &mut dyn Terminal {
        self.terminal.as_mut()
    }

    pub fn input(&self) -> &InputCaptureQueue {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputCaptureQueue {
        &mut self.input
    }

    /// Text typed or pasted into the widget: offered to input consumers
    /// first, then typed into the machine if one is running.
    pub fn on_terminal_input(&mut self, data: &str, session: Option<&mut dyn MachineSession>) {
        trace!("Terminal input: {:?}", data);
        self.input.on_input_arrived(data);
        if let Some(session) = session {
            forward_keys(data, session);
        }
    }

    /// One emulator output byte. Only the configured channel reaches the terminal.
    pub fn on_machine_output_byte(&mut self, out: &OutputByte) {
        if out.channel != self.output_channel {
            trace!("Ignoring byte on channel {}", out.channel);
            return;
        }
        // Bytes map to chars one to one (Latin-1), matching the serial line.
        let mut buf = [0u8; 4];
        self.terminal.write(char::from(out.byte).encode_utf8(&mut buf));
    }

    /// Scripted key injection; does not pass through the input queue.
    pub fn send_keys(&mut self, text: &str, session: Option<&mut dyn MachineSession>) {
        match session {
            Some(session) => forward_keys(text, session),
            None => debug!("send_keys with no running machine, ignoring {} chars", text.chars().count()),
        }
    }

    pub fn write(&mut self, text: &str) {
        self.terminal.write(text);
    }

    pub fn write_line(&mut self, text: &str, with_newline: bool) {
        if with_newline {
            self.terminal.write_line(text);
        } else {
            self.terminal.write(text);
        }
    }

    /// Echo a command line on the terminal. Display only; nothing is executed.
    pub fn send_command(&mut self, command: &str) {
        self.terminal.write_line(command);
    }
}

fn forward_keys(text: &str, session: &mut dyn MachineSession) {
    for code in text.encode_utf16() {
        if let Err(e) = session.send_keyboard_code(code) {
            warn!("Keyboard code {:#06x} rejected: {}", code, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MachineError;
    use crate::terminal::HeadlessTerminal;
    use async_trait::async_trait;
    use futures::FutureExt;

    #[derive(Default)]
    struct KeyRecorder {
        codes: Vec<u16>,
    }

    #[async_trait]
    impl MachineSession for KeyRecorder {
        fn send_keyboard_code(&mut self, code: u16) -> Result<(), MachineError> {
            self.codes.push(code);
            Ok(())
        }

        async fn save_state(&mut self) -> Result<Vec<u8>, MachineError> {
            Ok(Vec::new())
        }

        async fn restore_state(&mut self, _blob: &[u8]) -> Result<(), MachineError> {
            Ok(())
        }

        async fn halt(&mut self) -> Result<(), MachineError> {
            Ok(())
        }
    }

    fn router() -> (TerminalRouter, HeadlessTerminal) {
        let (terminal, _events) = HeadlessTerminal::new(5, 40);
        let router = TerminalRouter::new(
            Box::new(terminal.clone()),
            InputCaptureQueue::new(false),
            "serial0",
        );
        (router, terminal)
    }

    #[test]
    fn test_input_reaches_queue_and_keyboard() {
        let (mut router, _terminal) = router();
        let mut machine = KeyRecorder::default();
        let pending = router.input_mut().request_next();

        router.on_terminal_input("hé", Some(&mut machine));

        assert_eq!(pending.now_or_never().as_deref(), Some("hé"));
        assert_eq!(machine.codes, vec![u16::from(b'h'), 0xe9]);
    }

    #[test]
    fn test_input_without_machine_only_feeds_queue() {
        let (mut router, _terminal) = router();
        router.input_mut().set_buffering_enabled(true);
        router.on_terminal_input("abc", None);
        assert_eq!(router.input().buffered(), "abc");
    }

    #[test]
    fn test_send_keys_bypasses_queue() {
        let (mut router, _terminal) = router();
        router.input_mut().set_buffering_enabled(true);
        let mut machine = KeyRecorder::default();

        router.send_keys("\u{1F600}", Some(&mut machine));
        assert_eq!(machine.codes, vec![0xD83D, 0xDE00]);
        assert_eq!(router.input().buffered(), "");
    }

    #[test]
    fn test_output_bytes_in_order() {
        let (mut router, terminal) = router();
        for &byte in b"boot ok" {
            router.on_machine_output_byte(&OutputByte { channel: "serial0".to_string(), byte });
        }
        router.on_machine_output_byte(&OutputByte { channel: "serial1".to_string(), byte: b'!' });

        assert_eq!(terminal.screen_text(), "boot ok");
    }

    #[test]
    fn test_print_with_and_without_newline() {
        let (mut router, terminal) = router();
        router.write_line("a", false);
        router.write_line("b", true);
        router.send_command("ls");
        assert_eq!(terminal.screen_text(), "ab\nls");
    }
}
