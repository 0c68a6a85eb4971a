//! Line-oriented host scripts.
//!
//! One command per line, `#` starts a comment. Text arguments run to the end
//! of the line and understand `\r`, `\n`, `\t`, `\e` (ESC) and `\\`.
//!
//! ```text
//! start freedos
//! buffer on
//! type dir\r
//! wait 50
//! input
//! save
//! println \e[1mdone
//! status
//! ```
//!
//! Reporter commands (`status`, `running`, `input`, `metrics`, `color`)
//! add one line each to the script output.

use std::time::Duration;

use tracing::{debug, info};

use crate::bridge::BridgeHandle;
use crate::error::{BridgeError, Result};
use crate::terminal::HeadlessTerminal;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Start(String),
    Stop,
    Show { x: i32, y: i32, width: u32, height: u32 },
    Hide,
    Minimize,
    Maximize,
    Visibility(String),
    Print { text: String, newline: bool },
    Command(String),
    Keys(String),
    Clear(String),
    Cursor { x: f64, y: f64 },
    Status,
    Running,
    Input,
    Buffer(bool),
    Save,
    Load,
    Metrics(String),
    Color { color: String, layer: String, text: String },
    /// Simulated typing into the terminal widget.
    Type(String),
    Wait(Duration),
}

/// Parse a whole script, reporting the first bad line.
pub fn parse(source: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim_start();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step = parse_line(line).map_err(|message| BridgeError::Script {
            line: index + 1,
            message,
        })?;
        steps.push(step);
    }
    Ok(steps)
}

fn parse_line(line: &str) -> std::result::Result<Step, String> {
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let step = match name.to_ascii_lowercase().as_str() {
        "start" => Step::Start(args.first().copied().unwrap_or("linux").to_string()),
        "stop" => Step::Stop,
        "show" => match args.as_slice() {
            [x, y, w, h] => Step::Show {
                x: number(x)?,
                y: number(y)?,
                width: number(w)?,
                height: number(h)?,
            },
            _ => return Err("show takes x y width height".to_string()),
        },
        "hide" => Step::Hide,
        "minimize" => Step::Minimize,
        "maximize" => Step::Maximize,
        "visibility" => Step::Visibility(required(&args, "visibility")?.to_string()),
        "print" => Step::Print { text: unescape(rest), newline: false },
        "println" => Step::Print { text: unescape(rest), newline: true },
        "command" => Step::Command(unescape(rest)),
        "keys" => Step::Keys(unescape(rest)),
        "clear" => Step::Clear(args.first().copied().unwrap_or("screen").to_string()),
        "cursor" => match args.as_slice() {
            [x, y] => Step::Cursor { x: number(x)?, y: number(y)? },
            _ => return Err("cursor takes x y".to_string()),
        },
        "status" => Step::Status,
        "running" => Step::Running,
        "input" => Step::Input,
        "buffer" => match required(&args, "buffer")?.to_ascii_lowercase().as_str() {
            "on" | "true" => Step::Buffer(true),
            "off" | "false" => Step::Buffer(false),
            other => return Err(format!("buffer expects on or off, got {:?}", other)),
        },
        "save" => Step::Save,
        "load" => Step::Load,
        "metrics" => Step::Metrics(required(&args, "metrics")?.to_string()),
        "color" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(color), Some(layer), Some(text)) if !color.is_empty() => Step::Color {
                    color: color.to_string(),
                    layer: layer.to_string(),
                    text: unescape(text.trim_start()),
                },
                _ => return Err("color takes color layer text".to_string()),
            }
        }
        "type" => Step::Type(unescape(rest)),
        "wait" => Step::Wait(Duration::from_millis(number(required(&args, "wait")?)?)),
        other => return Err(format!("Unknown command: {}", other)),
    };
    Ok(step)
}

fn required<'a>(args: &[&'a str], command: &str) -> std::result::Result<&'a str, String> {
    args.first()
        .copied()
        .ok_or_else(|| format!("{} needs an argument", command))
}

fn number<T: std::str::FromStr>(value: &str) -> std::result::Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{:?} is not a valid number", value))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('e') => out.push('\x1b'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Runs parsed steps against a bridge.
pub struct ScriptRunner {
    bridge: BridgeHandle,
    keyboard: Option<HeadlessTerminal>,
}

impl ScriptRunner {
    pub fn new(bridge: BridgeHandle) -> Self {
        Self { bridge, keyboard: None }
    }

    /// Terminal that `type` steps are typed into.
    pub fn with_keyboard(mut self, terminal: HeadlessTerminal) -> Self {
        self.keyboard = Some(terminal);
        self
    }

    /// Execute `steps` in order and collect reporter output.
    pub async fn run(&self, steps: &[Step]) -> Result<Vec<String>> {
        let mut output = Vec::new();
        for step in steps {
            debug!("Script step: {:?}", step);
            if let Some(line) = self.execute(step).await? {
                output.push(line);
            }
        }
        info!("Script finished, {} steps", steps.len());
        Ok(output)
    }

    async fn execute(&self, step: &Step) -> Result<Option<String>> {
        let bridge = &self.bridge;
        match step {
            Step::Start(os) => {
                bridge.start(os).await?;
            }
            Step::Stop => bridge.stop().await?,
            Step::Show { x, y, width, height } => bridge.show(*x, *y, *width, *height).await?,
            Step::Hide => bridge.hide().await?,
            Step::Minimize => bridge.minimize().await?,
            Step::Maximize => bridge.maximize().await?,
            Step::Visibility(name) => bridge.set_visibility(name).await?,
            Step::Print { text, newline } => bridge.print(text, *newline).await?,
            Step::Command(text) => bridge.send_command(text).await?,
            Step::Keys(text) => bridge.send_keys(text).await?,
            Step::Clear(target) => bridge.clear(target).await?,
            Step::Cursor { x, y } => bridge.move_cursor_to(*x, *y).await?,
            Step::Status => return Ok(Some(bridge.status().to_string())),
            Step::Running => return Ok(Some(bridge.is_running().to_string())),
            Step::Input => return Ok(Some(bridge.request_input().await?)),
            Step::Buffer(enabled) => bridge.set_input_buffering(*enabled).await?,
            Step::Save => {
                bridge.save_state().await?;
            }
            Step::Load => {
                bridge.load_state().await?;
            }
            Step::Metrics(name) => return Ok(Some(bridge.metrics(name).await?)),
            Step::Color { color, layer, text } => {
                return Ok(Some(bridge.colored_text(text, color, layer)));
            }
            Step::Type(text) => match &self.keyboard {
                Some(terminal) => terminal.type_text(text),
                None => debug!("No keyboard attached, skipping typed text"),
            },
            Step::Wait(duration) => tokio::time::sleep(*duration).await,
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let steps = parse(
            "# boot it\n\
             start freedos\n\
             \n\
             show 10 20 640 480\n\
             println hello\\r\\nworld\n\
             cursor 3 5\n\
             buffer on\n\
             wait 25\n\
             color #ff0000 background alert now\n",
        )
        .unwrap();

        assert_eq!(
            steps,
            vec![
                Step::Start("freedos".to_string()),
                Step::Show { x: 10, y: 20, width: 640, height: 480 },
                Step::Print { text: "hello\r\nworld".to_string(), newline: true },
                Step::Cursor { x: 3.0, y: 5.0 },
                Step::Buffer(true),
                Step::Wait(Duration::from_millis(25)),
                Step::Color {
                    color: "#ff0000".to_string(),
                    layer: "background".to_string(),
                    text: "alert now".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = parse("start\nshow 1 2\n").unwrap_err();
        match err {
            BridgeError::Script { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("show"));
            }
            other => panic!("unexpected error: {}", other),
        }

        assert!(matches!(parse("reboot"), Err(BridgeError::Script { line: 1, .. })));
        assert!(matches!(parse("wait soon"), Err(BridgeError::Script { .. })));
    }

    #[test]
    fn test_defaults_and_escapes() {
        assert_eq!(parse_line("start"), Ok(Step::Start("linux".to_string())));
        assert_eq!(parse_line("clear"), Ok(Step::Clear("screen".to_string())));
        assert_eq!(unescape(r"\e[1m\\x\q"), "\x1b[1m\\x\\q");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }
}
