//! Detect command - report the platform a ROM targets

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use emuforge_core::{EmulatorCatalog, detection};

/// Arguments for the detect command
#[derive(Args)]
pub struct DetectArgs {
    /// ROM files to inspect
    #[arg(required = true)]
    pub roms: Vec<PathBuf>,
}

/// Execute the detect command
pub fn execute(args: DetectArgs) -> Result<()> {
    let catalog = EmulatorCatalog::builtin();
    for rom in &args.roms {
        let platform = detection::detect(rom);
        let recommended = catalog
            .recommended(platform)
            .map(|d| d.display_name)
            .unwrap_or("-");
        println!(
            "{}: {} ({}), recommended emulator: {}",
            rom.display(),
            platform.display_name(),
            platform,
            recommended
        );
    }
    Ok(())
}
