//! Per-emulator command-line conventions.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ForgeError, ForgeResult, IoContext};

/// How an emulator wants its firmware image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiosHandling {
    /// Pass the image path after this flag.
    Flag(&'static str),
    /// Copy the image into this directory, relative to the emulator's own
    /// directory (empty string: next to the binary). Portable bundles only.
    Directory(&'static str),
    /// The emulator has no way to receive a BIOS.
    None,
}

/// Fullscreen switches, split around the ROM argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullscreenArgs {
    pub before_rom: &'static [&'static str],
    pub after_rom: &'static [&'static str],
}

impl FullscreenArgs {
    pub const NONE: Self = Self::before(&[]);

    pub const fn before(args: &'static [&'static str]) -> Self {
        Self {
            before_rom: args,
            after_rom: &[],
        }
    }

    pub const fn after(args: &'static [&'static str]) -> Self {
        Self {
            before_rom: &[],
            after_rom: args,
        }
    }
}

/// Command-line conventions of one emulator ("plugin").
///
/// The argument vector is assembled as
/// `base_args, fullscreen.before_rom, bios flag, extra args, rom_prefix, ROM, fullscreen.after_rom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchProfile {
    /// Case-insensitive substrings identifying the emulator's binary name.
    pub binary_hints: &'static [&'static str],
    pub base_args: &'static [&'static str],
    pub fullscreen: FullscreenArgs,
    /// Arguments placed immediately before the ROM path.
    pub rom_prefix: &'static [&'static str],
    pub bios: BiosHandling,
    /// Environment variables set by portable bundles, valued as paths
    /// relative to the emulator's directory.
    pub portable_env: &'static [(&'static str, &'static str)],
    /// Files seeded into the emulator's directory so it starts without its
    /// first-run wizard: `/`-separated relative path and contents.
    pub config_files: &'static [(&'static str, &'static str)],
}

impl LaunchProfile {
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        self.binary_hints.iter().any(|hint| lower.contains(hint))
    }

    /// Write the seed configuration under `root`, the emulator's directory.
    ///
    /// Files that already exist are kept.
    pub fn write_config_files(&self, root: &Path) -> ForgeResult<()> {
        for (relative, contents) in self.config_files {
            let path = emuforge_shared::join_relative(root, relative)
                .map_err(|e| ForgeError::io("seeding emulator configuration", e))?;
            if path.exists() {
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .io_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(&path, contents).io_context(|| format!("writing {}", path.display()))?;
            debug!("Seeded {}", path.display());
        }
        Ok(())
    }
}

/// Profile for emulators outside the catalog.
pub const GENERIC_PROFILE: LaunchProfile = LaunchProfile {
    binary_hints: &[],
    base_args: &[],
    fullscreen: FullscreenArgs::before(&["--fullscreen"]),
    rom_prefix: &[],
    bios: BiosHandling::None,
    portable_env: &[],
    config_files: &[],
};
