//! Platform tags for the consoles EmuForge knows how to launch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Game console a ROM targets.
///
/// Closed set: adding a console means adding a variant here, an entry in the
/// detector's extension table, and at least one catalog descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ps1,
    Ps2,
    Ps3,
    Psp,
    Wii,
    #[serde(rename = "gamecube")]
    GameCube,
    #[serde(rename = "wiiu")]
    WiiU,
    Switch,
    Nds,
    #[serde(rename = "3ds")]
    N3ds,
    Xbox,
    Dreamcast,
    #[default]
    Unknown,
}

impl Platform {
    /// Every known platform, `Unknown` excluded.
    pub const ALL: [Platform; 12] = [
        Platform::Ps1,
        Platform::Ps2,
        Platform::Ps3,
        Platform::Psp,
        Platform::Wii,
        Platform::GameCube,
        Platform::WiiU,
        Platform::Switch,
        Platform::Nds,
        Platform::N3ds,
        Platform::Xbox,
        Platform::Dreamcast,
    ];

    /// Lowercase tag used on the command line and in persisted data.
    pub const fn as_str(self) -> &'static str {
        match self {
            Platform::Ps1 => "ps1",
            Platform::Ps2 => "ps2",
            Platform::Ps3 => "ps3",
            Platform::Psp => "psp",
            Platform::Wii => "wii",
            Platform::GameCube => "gamecube",
            Platform::WiiU => "wiiu",
            Platform::Switch => "switch",
            Platform::Nds => "nds",
            Platform::N3ds => "3ds",
            Platform::Xbox => "xbox",
            Platform::Dreamcast => "dreamcast",
            Platform::Unknown => "unknown",
        }
    }

    /// Human-readable console name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Platform::Ps1 => "PlayStation",
            Platform::Ps2 => "PlayStation 2",
            Platform::Ps3 => "PlayStation 3",
            Platform::Psp => "PlayStation Portable",
            Platform::Wii => "Wii",
            Platform::GameCube => "GameCube",
            Platform::WiiU => "Wii U",
            Platform::Switch => "Nintendo Switch",
            Platform::Nds => "Nintendo DS",
            Platform::N3ds => "Nintendo 3DS",
            Platform::Xbox => "Xbox",
            Platform::Dreamcast => "Dreamcast",
            Platform::Unknown => "Unknown",
        }
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, Platform::Unknown)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised platform tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform '{0}'")]
pub struct ParsePlatformError(pub String);

impl FromStr for Platform {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "ps1" | "psx" => Ok(Platform::Ps1),
            "ps2" => Ok(Platform::Ps2),
            "ps3" => Ok(Platform::Ps3),
            "psp" => Ok(Platform::Psp),
            "wii" => Ok(Platform::Wii),
            "gamecube" | "gc" | "ngc" => Ok(Platform::GameCube),
            "wiiu" => Ok(Platform::WiiU),
            "switch" => Ok(Platform::Switch),
            "nds" => Ok(Platform::Nds),
            "3ds" => Ok(Platform::N3ds),
            "xbox" => Ok(Platform::Xbox),
            "dreamcast" | "dc" => Ok(Platform::Dreamcast),
            "unknown" => Ok(Platform::Unknown),
            _ => Err(ParsePlatformError(s.to_string())),
        }
    }
}
