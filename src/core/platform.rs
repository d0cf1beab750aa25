//! Platform identity used by conditional configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of platforms a run can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Macos,
    Freebsd,
    Android,
    Ios,
}

impl Platform {
    /// Every platform tag, in declaration order.
    pub const ALL: [Platform; 6] = [
        Platform::Windows,
        Platform::Linux,
        Platform::Macos,
        Platform::Freebsd,
        Platform::Android,
        Platform::Ios,
    ];

    /// The platform this binary was compiled for.
    ///
    /// Unknown operating systems are treated as Linux, the most common
    /// non-windows toolchain layout.
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else if cfg!(target_os = "freebsd") {
            Platform::Freebsd
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Linux
        }
    }

    /// Get the platform tag as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Freebsd => "freebsd",
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    pub fn is_unix(&self) -> bool {
        !self.is_windows()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<_> = Platform::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown platform `{}` (expected one of: {})", s, known.join(", "))
            })
    }
}
