use serde::{Deserialize, Serialize};

use crate::config::MachineConfig;
use crate::machine::OsImage;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiosImages {
    pub bios_url: String,
    pub vga_bios_url: String,
}

/// Everything the emulator needs to construct a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootConfig {
    pub os: OsImage,
    pub boot_image_url: String,
    pub memory_size_bytes: u64,
    pub video_memory_size_bytes: u64,
    pub bios: BiosImages,
    /// Identifier of the element/surface the emulator draws into.
    pub render_target: String,
    pub boot_order: u16,
    pub autostart: bool,
    pub acpi: bool,
}

impl BootConfig {
    pub fn new(os: OsImage, boot_image_url: String, machine: &MachineConfig) -> Self {
        Self {
            os,
            boot_image_url,
            memory_size_bytes: machine.memory_size_mb.saturating_mul(MIB),
            video_memory_size_bytes: machine.video_memory_size_mb.saturating_mul(MIB),
            bios: BiosImages {
                bios_url: machine.bios_url.clone(),
                vga_bios_url: machine.vga_bios_url.clone(),
            },
            render_target: machine.render_target.clone(),
            boot_order: machine.boot_order,
            autostart: machine.autostart,
            acpi: machine.acpi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_are_converted_to_bytes() {
        let machine = MachineConfig::default();
        let boot = BootConfig::new(OsImage::Kolibri, "file:///k.img".to_string(), &machine);

        assert_eq!(boot.memory_size_bytes, 2048 * 1024 * 1024);
        assert_eq!(boot.video_memory_size_bytes, 256 * 1024 * 1024);
        assert_eq!(boot.boot_order, 0x123);
        assert_eq!(boot.boot_image_url, "file:///k.img");
    }
}
