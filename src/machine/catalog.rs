use std::fmt;

use serde::{Deserialize, Serialize};

/// Bootable images a host script can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsImage {
    #[default]
    Linux,
    FreeDos,
    OpenBsd,
    Kolibri,
    #[serde(rename = "dsl")]
    DamnSmallLinux,
    Windows7,
}

impl OsImage {
    pub const ALL: [OsImage; 6] = [
        OsImage::Linux,
        OsImage::FreeDos,
        OsImage::OpenBsd,
        OsImage::Kolibri,
        OsImage::DamnSmallLinux,
        OsImage::Windows7,
    ];

    /// Parse a host menu value. Case-insensitive; unknown selectors yield `None`.
    pub fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        Self::ALL
            .into_iter()
            .find(|os| os.selector().eq_ignore_ascii_case(selector))
    }

    /// Menu value used by host scripts and config keys.
    pub fn selector(self) -> &'static str {
        match self {
            OsImage::Linux => "linux",
            OsImage::FreeDos => "freedos",
            OsImage::OpenBsd => "openbsd",
            OsImage::Kolibri => "kolibri",
            OsImage::DamnSmallLinux => "dsl",
            OsImage::Windows7 => "windows7",
        }
    }

    /// Human readable menu text.
    pub fn display_name(self) -> &'static str {
        match self {
            OsImage::Linux => "Linux 2.6",
            OsImage::FreeDos => "FreeDOS",
            OsImage::OpenBsd => "OpenBSD",
            OsImage::Kolibri => "KolibriOS",
            OsImage::DamnSmallLinux => "Damn Small Linux",
            OsImage::Windows7 => "Windows 7",
        }
    }

    /// Upper-cased selector shown in the status bar.
    pub fn label(self) -> String {
        self.selector().to_ascii_uppercase()
    }

    pub fn default_url(self) -> &'static str {
        match self {
            OsImage::Linux => "https://copy.sh/v86/images/linux26.img",
            OsImage::FreeDos => "https://cdn.milosantos.com/freedos722.img",
            OsImage::OpenBsd => "https://copy.sh/v86/images/openbsd.img",
            OsImage::Kolibri => "https://copy.sh/v86/images/kolibri.img",
            OsImage::DamnSmallLinux => "https://cdn.milosantos.com/dsl-4.11.rc2.iso",
            OsImage::Windows7 => "https://cdn.milosantos.com/Win7.iso",
        }
    }
}

impl fmt::Display for OsImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}
