//! Operating systems a launcher can be generated for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Concrete operating system a launcher artifact targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Windows,
    Linux,
}

impl TargetOs {
    /// The OS this process was compiled for. Anything that is not Windows is
    /// treated as a Unix-like Linux target.
    pub const fn host() -> Self {
        if cfg!(target_os = "windows") {
            TargetOs::Windows
        } else {
            TargetOs::Linux
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TargetOs::Windows => "windows",
            TargetOs::Linux => "linux",
        }
    }

    /// File extension (without dot) of an executable on this OS.
    pub const fn executable_extension(self) -> Option<&'static str> {
        match self {
            TargetOs::Windows => Some("exe"),
            TargetOs::Linux => None,
        }
    }

    /// File extension (without dot) of a launcher script on this OS.
    pub const fn script_extension(self) -> Option<&'static str> {
        match self {
            TargetOs::Windows => Some("cmd"),
            TargetOs::Linux => None,
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetOs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" | "win" | "win32" | "win64" => Ok(TargetOs::Windows),
            "linux" => Ok(TargetOs::Linux),
            other => Err(format!("unsupported target OS '{}'", other)),
        }
    }
}
