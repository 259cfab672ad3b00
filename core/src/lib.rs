//! EmuForge Core - ROM launcher forging engine
//!
//! Turns a game image, an emulator and an optional BIOS into a single
//! launchable artifact.
//!
//! # Architecture
//!
//! - [`detection`] - ROM platform detection from file names and headers
//! - [`EmulatorCatalog`] - Built-in emulator descriptors and launch profiles
//! - [`EmulatorManager`] - Download, extraction and bookkeeping of installs
//! - [`Bundler`] - Launcher scripts and portable bundles
//! - [`ForgeEngine`] - Orchestration with progress and cancellation

pub mod bundler;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod detection;
pub mod error;
pub mod forge;
pub mod manager;
pub mod progress;

pub use bundler::{Bundler, ResolvedEmulator};
pub use cancel::CancelToken;
pub use catalog::{ArchiveKind, DownloadSource, EmulatorCatalog, EmulatorDescriptor, LaunchProfile};
pub use config::ForgeConfig;
pub use error::{ForgeError, ForgeResult, InputField};
pub use forge::{ForgeEngine, ForgeRequest, PluginChoice, TargetChoice, Task};
pub use manager::{
    ArchiveFetcher, EmulatorManager, FetchError, HttpFetcher, InstalledRecord, InstalledStore,
    JsonFileStore, ManagerOptions, MemoryStore,
};
pub use progress::{ForgeProgress, ForgeStage, InstallProgress, InstallStage};

// Re-export shared types callers need to build requests
pub use emuforge_shared::{Platform, TargetOs};
