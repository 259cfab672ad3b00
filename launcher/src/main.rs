//! EmuForge portable launcher
//!
//! Prebuilt stub that a forged portable bundle is appended to. On start it
//! verifies the attached archive, extracts it once into the user cache, and
//! runs the emulator named by the bundle's `launch.json`. Extra command-line
//! arguments are forwarded to the emulator and its exit code is returned.

mod bundle;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use emuforge_shared::LaunchManifest;

fn cache_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("io", "emuforge", "EmuForge")
        .map(|dirs| dirs.cache_dir().join("bundles"))
        .context("Could not determine a cache directory")
}

fn run() -> Result<i32> {
    let exe = env::current_exe().context("Failed to locate launcher executable")?;
    let (trailer, archive) = bundle::open_payload(&exe)?;

    let digest = trailer.digest_hex();
    let dir = cache_dir()?.join(&digest[..16]);
    bundle::unpack_once(archive, &dir)?;

    let root = bundle::find_bundle_root(&dir)?;
    let manifest_path = root.join(LaunchManifest::FILE_NAME);
    let bytes = fs::read(&manifest_path)
        .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
    let manifest = LaunchManifest::from_json(&bytes)?;
    let launch = manifest.resolve(&root)?;

    tracing::info!(
        "Launching {} with {}",
        manifest.game_name,
        launch.program.display()
    );
    let status = Command::new(&launch.program)
        .args(&launch.args)
        .args(env::args_os().skip(1))
        .envs(launch.env.iter().map(|(k, v)| (k, v)))
        .status()
        .with_context(|| format!("Failed to start {}", launch.program.display()))?;

    Ok(status.code().unwrap_or(1))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("emuforge-launcher: {:#}", e);
            std::process::exit(1);
        }
    }
}
