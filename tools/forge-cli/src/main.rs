//! EmuForge CLI - forge standalone launchers for emulated games
//!
//! # Commands
//!
//! - `emuforge detect` - Report the platform a ROM targets
//! - `emuforge catalog` - List the emulators EmuForge knows
//! - `emuforge installed` - List managed emulator installs
//! - `emuforge download` - Download and install an emulator
//! - `emuforge forge` - Build a launcher script or portable bundle
//!
//! # Usage
//!
//! ```bash
//! # Launcher script next to your other shortcuts
//! emuforge forge --name "Test Game" --emulator /usr/bin/ppsspp \
//!     --rom ~/roms/test.iso --output ~/Games --fullscreen
//!
//! # Self-contained bundle with the emulator and ROM inside
//! emuforge download duckstation
//! emuforge forge --name "Disc Game" --rom game.cue --output out --portable \
//!     --emulator ~/.local/share/emuforge/emulators/duckstation/DuckStation.AppImage
//! ```

mod catalog;
mod detect;
mod download;
mod forge;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use emuforge_core::{ForgeConfig, ForgeEngine, config};

/// EmuForge - forge standalone launchers for emulated games
#[derive(Parser)]
#[command(name = "emuforge")]
#[command(about = "Forge standalone launchers for emulated games")]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the platform a ROM targets
    Detect(detect::DetectArgs),

    /// List the emulators EmuForge knows
    Catalog(catalog::CatalogArgs),

    /// List managed emulator installs
    Installed,

    /// Download and install an emulator
    Download(download::DownloadArgs),

    /// Build a launcher script or portable bundle
    Forge(forge::ForgeArgs),
}

fn load_config(path: Option<&PathBuf>) -> ForgeConfig {
    match path {
        Some(path) => config::load_from(path),
        None => config::load(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let engine = || -> Result<ForgeEngine> {
        let config = load_config(cli.config.as_ref());
        Ok(ForgeEngine::from_config(&config)?)
    };

    match cli.command {
        Commands::Detect(args) => detect::execute(args),
        Commands::Catalog(args) => catalog::execute(args),
        Commands::Installed => catalog::installed(&engine()?),
        Commands::Download(args) => download::execute(args, &engine()?),
        Commands::Forge(args) => forge::execute(args, &engine()?),
    }
}
