//! Forge request value object.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use emuforge_shared::{Platform, TargetOs};

/// Which launch conventions to use for the emulator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PluginChoice {
    /// Infer from the managed install or the binary's file name.
    #[default]
    Auto,
    /// A catalog emulator id.
    Emulator(String),
}

impl FromStr for PluginChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            Ok(PluginChoice::Auto)
        } else {
            Ok(PluginChoice::Emulator(s.to_ascii_lowercase()))
        }
    }
}

impl fmt::Display for PluginChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginChoice::Auto => f.write_str("auto"),
            PluginChoice::Emulator(id) => f.write_str(id),
        }
    }
}

/// OS the launcher is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetChoice {
    /// The OS the emulator binary is built for.
    #[default]
    Auto,
    Os(TargetOs),
}

impl FromStr for TargetChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(TargetChoice::Auto)
        } else {
            s.parse().map(TargetChoice::Os)
        }
    }
}

/// Everything one forge operation needs. Not modified once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeRequest {
    pub game_name: String,
    pub rom_path: PathBuf,
    pub emulator_path: PathBuf,
    pub bios_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub plugin: PluginChoice,
    /// Skips detection when set.
    pub platform: Option<Platform>,
    pub target_os: TargetChoice,
    pub fullscreen: bool,
    pub portable: bool,
    pub extra_args: Vec<String>,
}

impl ForgeRequest {
    /// A windowed, non-portable request with automatic plugin and target.
    pub fn new(
        game_name: impl Into<String>,
        rom_path: impl Into<PathBuf>,
        emulator_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            game_name: game_name.into(),
            rom_path: rom_path.into(),
            emulator_path: emulator_path.into(),
            bios_path: None,
            output_dir: output_dir.into(),
            plugin: PluginChoice::Auto,
            platform: None,
            target_os: TargetChoice::Auto,
            fullscreen: false,
            portable: false,
            extra_args: Vec::new(),
        }
    }

    pub fn with_bios(mut self, bios: impl Into<PathBuf>) -> Self {
        self.bios_path = Some(bios.into());
        self
    }

    pub fn with_plugin(mut self, plugin: PluginChoice) -> Self {
        self.plugin = plugin;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_target(mut self, target: TargetChoice) -> Self {
        self.target_os = target;
        self
    }

    pub fn fullscreen(mut self, on: bool) -> Self {
        self.fullscreen = on;
        self
    }

    pub fn portable(mut self, on: bool) -> Self {
        self.portable = on;
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_choice_parsing() {
        assert_eq!("auto".parse::<PluginChoice>().unwrap(), PluginChoice::Auto);
        assert_eq!("".parse::<PluginChoice>().unwrap(), PluginChoice::Auto);
        assert_eq!(
            "PPSSPP".parse::<PluginChoice>().unwrap(),
            PluginChoice::Emulator("ppsspp".into())
        );
    }

    #[test]
    fn target_choice_parsing() {
        assert_eq!("AUTO".parse::<TargetChoice>(), Ok(TargetChoice::Auto));
        assert_eq!(
            "windows".parse::<TargetChoice>(),
            Ok(TargetChoice::Os(TargetOs::Windows))
        );
        assert!("amiga".parse::<TargetChoice>().is_err());
    }

    #[test]
    fn builder_defaults() {
        let req = ForgeRequest::new("Game", "/r.iso", "/e", "/out")
            .fullscreen(true)
            .with_args(["-v"]);
        assert!(req.fullscreen);
        assert!(!req.portable);
        assert_eq!(req.extra_args, vec!["-v".to_string()]);
        assert_eq!(req.plugin, PluginChoice::Auto);
        assert_eq!(req.target_os, TargetChoice::Auto);
    }
}
