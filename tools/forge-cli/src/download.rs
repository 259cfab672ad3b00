//! Download command - install an emulator from the catalog

use anyhow::Result;
use clap::Args;

use emuforge_core::{CancelToken, ForgeEngine, InstallProgress, InstallStage};

/// Arguments for the download command
#[derive(Args)]
pub struct DownloadArgs {
    /// Catalog id of the emulator (see `emuforge catalog`)
    pub id: String,
}

fn print_progress(progress: &InstallProgress, last_percent: &mut Option<u32>) {
    match (progress.stage, progress.fraction()) {
        (InstallStage::Downloading, Some(fraction)) => {
            let percent = (fraction * 100.0) as u32 / 10 * 10;
            if *last_percent != Some(percent) {
                println!("  {}%", percent);
                *last_percent = Some(percent);
            }
        }
        (InstallStage::Downloading, None) if progress.bytes_received.is_some() => {}
        _ => println!("{}", progress.message),
    }
}

/// Execute the download command
pub fn execute(args: DownloadArgs, engine: &ForgeEngine) -> Result<()> {
    let mut last_percent = None;
    let binary = engine.download_emulator(&args.id, &CancelToken::new(), &mut |p| {
        print_progress(&p, &mut last_percent)
    })?;
    println!("Installed {} at {}", args.id, binary.display());
    Ok(())
}
