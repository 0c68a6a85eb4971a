//! Configuration for the bridge.
//!
//! Loaded from a TOML file, by default `<config dir>/vmbridge/config.toml`.
//! Every section is optional and falls back to the built-in defaults:
//!
//! ```toml
//! [machine]
//! memory_size_mb = 2048
//! video_memory_size_mb = 256
//! default_os = "linux"
//! output_channel = "serial0"
//!
//! [images]
//! linux = "https://mirror.example/linux26.img"
//!
//! [terminal]
//! cols = 80
//! rows = 12
//!
//! [input]
//! buffering = false
//!
//! [window]
//! refit_delay_ms = 100
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BridgeError, Result};
use crate::machine::OsImage;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub machine: MachineConfig,
    /// Boot image URL overrides keyed by OS selector.
    pub images: HashMap<String, String>,
    pub terminal: TerminalConfig,
    pub input: InputConfig,
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub memory_size_mb: u64,
    pub video_memory_size_mb: u64,
    pub bios_url: String,
    pub vga_bios_url: String,
    pub boot_order: u16,
    pub autostart: bool,
    pub acpi: bool,
    /// Emulator channel whose bytes are shown on the terminal.
    pub output_channel: String,
    /// Selector used when a start request names an unknown OS.
    pub default_os: String,
    pub render_target: String,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size_mb: 2048,
            video_memory_size_mb: 256,
            bios_url: "https://raw.githubusercontent.com/copy/v86/refs/heads/master/bios/seabios.bin"
                .to_string(),
            vga_bios_url: "https://raw.githubusercontent.com/copy/v86/refs/heads/master/bios/vgabios.bin"
                .to_string(),
            boot_order: 0x123,
            autostart: true,
            acpi: true,
            output_channel: "serial0".to_string(),
            default_os: "linux".to_string(),
            render_target: "screen_container".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub cols: u16,
    pub rows: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self { cols: 80, rows: 12 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Keep unconsumed terminal input until someone asks for it.
    pub buffering: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub maximized_width: u32,
    pub maximized_height: u32,
    pub refit_delay_ms: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            x: 50,
            y: 50,
            width: 900,
            height: 700,
            maximized_width: 1728,
            maximized_height: 972,
            refit_delay_ms: 100,
        }
    }
}

impl WindowConfig {
    pub fn refit_delay(&self) -> Duration {
        Duration::from_millis(self.refit_delay_ms)
    }
}

impl MachineConfig {
    /// The configured fallback image; itself falls back to Linux.
    pub fn default_image(&self) -> OsImage {
        OsImage::parse(&self.default_os).unwrap_or_default()
    }
}

impl BridgeConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vmbridge").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(BridgeError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.terminal.cols == 0 || self.terminal.rows == 0 {
            return Err(BridgeError::Config("terminal size must be non-zero".to_string()));
        }
        if self.machine.memory_size_mb == 0 {
            return Err(BridgeError::Config("memory_size_mb must be non-zero".to_string()));
        }
        for key in self.images.keys() {
            if OsImage::parse(key).is_none() {
                return Err(BridgeError::Config(format!("unknown OS in [images]: {}", key)));
            }
        }
        Ok(())
    }

    /// Boot image URL for `os`, honoring `[images]` overrides.
    pub fn image_url(&self, os: OsImage) -> String {
        self.images
            .get(os.selector())
            .cloned()
            .unwrap_or_else(|| os.default_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.terminal.cols, 80);
        assert_eq!(config.terminal.rows, 12);
        assert_eq!(config.machine.output_channel, "serial0");
        assert!(!config.input.buffering);
        assert_eq!(config.machine.default_image(), OsImage::Linux);
    }

    #[test]
    fn test_partial_toml() {
        let config = BridgeConfig::from_toml(
            r#"
            [machine]
            memory_size_mb = 64

            [images]
            freedos = "file:///images/freedos.img"

            [input]
            buffering = true
            "#,
        )
        .unwrap();

        assert_eq!(config.machine.memory_size_mb, 64);
        assert_eq!(config.machine.video_memory_size_mb, 256);
        assert!(config.input.buffering);
        assert_eq!(config.image_url(OsImage::FreeDos), "file:///images/freedos.img");
        assert_eq!(config.image_url(OsImage::Linux), OsImage::Linux.default_url());
    }

    #[test]
    fn test_rejects_unknown_image_key() {
        let err = BridgeConfig::from_toml("[images]\nbeos = \"x\"\n").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_terminal() {
        let err = BridgeConfig::from_toml("[terminal]\ncols = 0\n").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = BridgeConfig::load(Some(Path::new("/nonexistent/vmbridge.toml"))).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
