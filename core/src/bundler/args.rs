//! Emulator command-line assembly.

use std::path::Path;

use crate::catalog::{BiosHandling, LaunchProfile};

/// One element of the emulator's argument vector.
///
/// Paths stay symbolic so the same list renders absolute for a script
/// launcher and bundle-relative for a portable one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchArg {
    Literal(String),
    Rom,
    Bios,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArgs {
    pub args: Vec<LaunchArg>,
    /// Directory (relative to the emulator's directory) the BIOS is copied
    /// into for a portable bundle.
    pub bios_dir: Option<&'static str>,
    pub warnings: Vec<String>,
}

fn literals<'a>(args: &'a [&'a str]) -> impl Iterator<Item = LaunchArg> + 'a {
    args.iter().map(|a| LaunchArg::Literal((*a).to_string()))
}

/// Order: base args, fullscreen (before ROM), BIOS flag, extra args, ROM
/// prefix, ROM, fullscreen (after ROM).
pub fn resolve_args(
    profile: &LaunchProfile,
    fullscreen: bool,
    bios: Option<&Path>,
    extra_args: &[String],
    portable: bool,
) -> ResolvedArgs {
    let mut args: Vec<LaunchArg> = literals(profile.base_args).collect();
    let mut bios_dir = None;
    let mut warnings = Vec::new();

    if fullscreen {
        args.extend(literals(profile.fullscreen.before_rom));
    }

    if let Some(bios) = bios {
        match profile.bios {
            BiosHandling::Flag(flag) => {
                args.push(LaunchArg::Literal(flag.to_string()));
                args.push(LaunchArg::Bios);
            }
            BiosHandling::Directory(dir) if portable => bios_dir = Some(dir),
            BiosHandling::Directory(_) => warnings.push(format!(
                "BIOS {} is not passed on the command line; copy it into the emulator's BIOS directory or use portable mode",
                bios.display()
            )),
            BiosHandling::None => warnings.push(format!(
                "emulator takes no BIOS argument; ignoring {}",
                bios.display()
            )),
        }
    }

    args.extend(extra_args.iter().cloned().map(LaunchArg::Literal));
    args.extend(literals(profile.rom_prefix));
    args.push(LaunchArg::Rom);

    if fullscreen {
        args.extend(literals(profile.fullscreen.after_rom));
    }

    ResolvedArgs {
        args,
        bios_dir,
        warnings,
    }
}
