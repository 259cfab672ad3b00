//! Catalog and installed commands

use anyhow::Result;
use clap::Args;

use emuforge_core::{EmulatorCatalog, ForgeEngine, Platform, TargetOs};

/// Arguments for the catalog command
#[derive(Args)]
pub struct CatalogArgs {
    /// Only list emulators for this platform (e.g. ps2, gamecube, 3ds)
    #[arg(long)]
    pub platform: Option<Platform>,
}

/// Execute the catalog command
pub fn execute(args: CatalogArgs) -> Result<()> {
    let catalog = EmulatorCatalog::builtin();
    let entries = match args.platform {
        Some(platform) => catalog.supported(platform),
        None => catalog.all().iter().collect(),
    };

    let host = TargetOs::host();
    for descriptor in entries {
        let platforms: Vec<&str> = descriptor.platforms.iter().map(|p| p.as_str()).collect();
        let download = if descriptor.is_downloadable(host) {
            "downloadable"
        } else {
            "bring your own"
        };
        println!(
            "{:<12} {:<14} {:<28} {}",
            descriptor.id,
            descriptor.display_name,
            platforms.join(", "),
            download
        );
    }
    Ok(())
}

/// Execute the installed command
pub fn installed(engine: &ForgeEngine) -> Result<()> {
    let records = engine.manager().records();
    if records.is_empty() {
        println!("No emulators installed. Try `emuforge download <id>`.");
        return Ok(());
    }
    for record in records {
        let state = if record.binary_path.is_file() {
            ""
        } else {
            " (missing, run download again)"
        };
        println!(
            "{:<12} {}{}  installed {}",
            record.id,
            record.binary_path.display(),
            state,
            record.installed_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
