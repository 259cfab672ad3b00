//! Configuration management (`config.toml`)
//!
//! Handles loading, saving, and providing defaults for engine settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ForgeConfig {
    /// Where emulators and records live
    #[serde(default)]
    pub paths: PathsConfig,
    /// Emulator download settings
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Filesystem locations.
///
/// Unset paths fall back to the platform data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// Root directory for managed emulator installs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulators_dir: Option<PathBuf>,
    /// JSON file holding installed emulator records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_db: Option<PathBuf>,
    /// Scratch space for staging portable bundles (default: system temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    /// Self-extracting launcher stub (default: `emuforge-launcher` next to the running executable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher_stub: Option<PathBuf>,
}

/// Download transport configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Per-request timeout in seconds (default: 600)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after a failed request (default: 2)
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_timeout_secs() -> u64 {
    600
}
fn default_retries() -> u32 {
    2
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl ForgeConfig {
    pub fn emulators_dir(&self) -> Option<PathBuf> {
        self.paths
            .emulators_dir
            .clone()
            .or_else(|| data_dir().map(|d| d.join("emulators")))
    }

    pub fn installed_db(&self) -> Option<PathBuf> {
        self.paths
            .installed_db
            .clone()
            .or_else(|| data_dir().map(|d| d.join("installed.json")))
    }

    pub fn work_dir(&self) -> PathBuf {
        self.paths
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Launcher stub to embed in self-extracting bundles, if one is present.
    pub fn launcher_stub(&self) -> Option<PathBuf> {
        if let Some(path) = &self.paths.launcher_stub {
            return path.is_file().then(|| path.clone());
        }
        let exe = std::env::current_exe().ok()?;
        let mut name = String::from("emuforge-launcher");
        if cfg!(target_os = "windows") {
            name.push_str(".exe");
        }
        let candidate = exe.parent()?.join(name);
        candidate.is_file().then_some(candidate)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("io", "emuforge", "EmuForge")
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\emuforge\EmuForge\config`
/// On macOS: `~/Library/Application Support/io.emuforge.EmuForge`
/// On Linux: `~/.config/emuforge`
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Returns the platform-specific data directory for emulator installs.
///
/// On Windows: `%APPDATA%\emuforge\EmuForge\data`
/// On Linux: `~/.local/share/emuforge`
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Loads the configuration from disk.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> ForgeConfig {
    config_dir()
        .map(|dir| load_from(&dir.join("config.toml")))
        .unwrap_or_default()
}

/// Loads the configuration from an explicit file.
pub fn load_from(path: &Path) -> ForgeConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unparsable config {}: {}", path.display(), e);
            ForgeConfig::default()
        }),
        Err(_) => ForgeConfig::default(),
    }
}

/// Saves the configuration to the platform config directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &ForgeConfig) -> std::io::Result<()> {
    match config_dir() {
        Some(dir) => save_to(config, &dir.join("config.toml")),
        None => Ok(()),
    }
}

pub fn save_to(config: &ForgeConfig, path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, content)
}
