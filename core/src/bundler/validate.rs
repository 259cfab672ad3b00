//! Request validation, in the order fields are checked.

use std::fs;
use std::io::Read;
use std::path::Path;

use emuforge_shared::{TargetOs, sanitize_file_name};

use crate::error::{ForgeError, ForgeResult, InputField};
use crate::forge::ForgeRequest;

fn check_readable_file(path: &Path, field: InputField) -> ForgeResult<fs::File> {
    let meta = fs::metadata(path).map_err(|_| {
        ForgeError::invalid(field, format!("{} does not exist", path.display()))
    })?;
    if !meta.is_file() {
        return Err(ForgeError::invalid(
            field,
            format!("{} is not a file", path.display()),
        ));
    }
    fs::File::open(path).map_err(|e| {
        ForgeError::invalid(field, format!("{} is not readable: {}", path.display(), e))
    })
}

/// Whether `path` can be launched: a Windows PE image, or anything with an
/// execute bit on Unix.
pub fn is_executable(path: &Path, file: &mut fs::File) -> bool {
    let mut magic = [0u8; 2];
    if file.read_exact(&mut magic).is_ok() && &magic == b"MZ" {
        return true;
    }
    has_exec_bit(path)
}

#[cfg(unix)]
fn has_exec_bit(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn has_exec_bit(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ["exe", "bat", "cmd", "com"].contains(&e.to_ascii_lowercase().as_str()))
}

/// Check every caller-supplied field. Nothing is written except the output
/// directory, which is created last.
pub fn validate(request: &ForgeRequest) -> ForgeResult<()> {
    let name = request.game_name.trim();
    if name.is_empty() {
        return Err(ForgeError::invalid(InputField::GameName, "must not be empty"));
    }
    if sanitize_file_name(name, TargetOs::Linux).is_empty() {
        return Err(ForgeError::invalid(
            InputField::GameName,
            "contains no characters usable in a file name",
        ));
    }

    check_readable_file(&request.rom_path, InputField::RomPath)?;

    let mut emulator = check_readable_file(&request.emulator_path, InputField::EmulatorPath)?;
    if !is_executable(&request.emulator_path, &mut emulator) {
        return Err(ForgeError::invalid(
            InputField::EmulatorPath,
            format!("{} is not executable", request.emulator_path.display()),
        ));
    }

    if let Some(bios) = &request.bios_path {
        check_readable_file(bios, InputField::BiosPath)?;
    }

    fs::create_dir_all(&request.output_dir).map_err(|e| {
        ForgeError::invalid(
            InputField::OutputDir,
            format!("cannot create {}: {}", request.output_dir.display(), e),
        )
    })?;
    if !request.output_dir.is_dir() {
        return Err(ForgeError::invalid(
            InputField::OutputDir,
            format!("{} is not a directory", request.output_dir.display()),
        ));
    }

    Ok(())
}
