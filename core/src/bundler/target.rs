//! Launcher target OS resolution.

use std::path::Path;

use emuforge_shared::{TargetOs, read_prefix};

use crate::forge::TargetChoice;

/// OS an emulator binary is built for, judged by its image format and then
/// its extension. Unrecognised binaries are assumed to be native.
pub fn binary_os(path: &Path) -> TargetOs {
    let header = read_prefix(path, 4).unwrap_or_default();
    if header.starts_with(b"MZ") {
        return TargetOs::Windows;
    }
    if header.starts_with(b"\x7fELF") {
        return TargetOs::Linux;
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("exe" | "bat" | "cmd") => TargetOs::Windows,
        _ => TargetOs::host(),
    }
}

pub fn resolve_target(choice: TargetChoice, emulator: &Path) -> TargetOs {
    match choice {
        TargetChoice::Os(os) => os,
        TargetChoice::Auto => binary_os(emulator),
    }
}
