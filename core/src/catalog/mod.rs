//! Emulator catalog.
//!
//! A static, read-only table of the emulators EmuForge knows: which platforms
//! each one runs, where to download it, and how to build its command line.
//! Adding an emulator means adding a row to [`descriptors::BUILTIN`].

pub mod descriptors;
pub mod profiles;

use std::fmt;
use std::path::Path;

use emuforge_shared::{Platform, TargetOs};

pub use profiles::{BiosHandling, FullscreenArgs, GENERIC_PROFILE, LaunchProfile};

/// Container format of a downloaded emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    SevenZip,
    /// Self-contained Linux executable; the download is the binary.
    AppImage,
    /// Bare executable of the target OS.
    Executable,
}

impl ArchiveKind {
    /// Whether the download is unpacked or placed as-is.
    pub const fn is_archive(self) -> bool {
        matches!(self, ArchiveKind::Zip | ArchiveKind::TarGz | ArchiveKind::SevenZip)
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::SevenZip => "7z",
            ArchiveKind::AppImage => "AppImage",
            ArchiveKind::Executable => "executable",
        })
    }
}

/// Where to fetch an emulator for one OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSource {
    pub os: TargetOs,
    pub url: &'static str,
    pub kind: ArchiveKind,
    /// Binary path relative to the install directory, `/`-separated.
    pub binary: &'static str,
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatorDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub platforms: &'static [Platform],
    pub sources: &'static [DownloadSource],
    pub profile: LaunchProfile,
}

impl EmulatorDescriptor {
    pub fn supports(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    pub fn source_for(&self, os: TargetOs) -> Option<&DownloadSource> {
        self.sources.iter().find(|s| s.os == os)
    }

    pub fn is_downloadable(&self, os: TargetOs) -> bool {
        self.source_for(os).is_some()
    }
}

/// Read-only view over a descriptor table.
#[derive(Debug, Clone, Copy)]
pub struct EmulatorCatalog {
    entries: &'static [EmulatorDescriptor],
}

impl Default for EmulatorCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EmulatorCatalog {
    pub const fn new(entries: &'static [EmulatorDescriptor]) -> Self {
        Self { entries }
    }

    pub const fn builtin() -> Self {
        Self::new(descriptors::BUILTIN)
    }

    pub fn all(&self) -> &'static [EmulatorDescriptor] {
        self.entries
    }

    /// Emulators able to run `platform`, best fit first.
    pub fn supported(&self, platform: Platform) -> Vec<&'static EmulatorDescriptor> {
        self.entries.iter().filter(|d| d.supports(platform)).collect()
    }

    pub fn by_id(&self, id: &str) -> Option<&'static EmulatorDescriptor> {
        self.entries.iter().find(|d| d.id == id)
    }

    pub fn recommended(&self, platform: Platform) -> Option<&'static EmulatorDescriptor> {
        self.entries.iter().find(|d| d.supports(platform))
    }

    /// Identify the emulator a user-supplied binary belongs to by its file name.
    pub fn match_binary(&self, path: &Path) -> Option<&'static EmulatorDescriptor> {
        let name = path.file_name()?.to_string_lossy();
        self.entries
            .iter()
            .find(|d| d.profile.matches_file_name(&name))
    }
}
