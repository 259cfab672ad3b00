//! Unpacking downloaded emulator archives.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::catalog::ArchiveKind;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
const SEVENZ_MAGIC: &[u8] = &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];
const ELF_MAGIC: &[u8] = &[0x7F, b'E', b'L', b'F'];
const PE_MAGIC: &[u8] = b"MZ";

/// How deep to search for a binary that is not at its declared path.
const BINARY_SEARCH_DEPTH: usize = 4;

/// Check the leading bytes of a download against the expected container.
pub fn verify_kind(header: &[u8], expected: ArchiveKind) -> Result<(), String> {
    let ok = match expected {
        ArchiveKind::Zip => header.starts_with(ZIP_MAGIC) || header.starts_with(ZIP_EMPTY_MAGIC),
        ArchiveKind::TarGz => header.starts_with(GZIP_MAGIC),
        ArchiveKind::SevenZip => header.starts_with(SEVENZ_MAGIC),
        ArchiveKind::AppImage => header.starts_with(ELF_MAGIC),
        ArchiveKind::Executable => header.starts_with(ELF_MAGIC) || header.starts_with(PE_MAGIC),
    };
    if ok {
        Ok(())
    } else {
        Err(format!(
            "download is not a {} (starts with {:02x?})",
            expected,
            &header[..header.len().min(8)]
        ))
    }
}

pub fn read_header(path: &Path) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(16);
    fs::File::open(path)?.take(16).read_to_end(&mut buf)?;
    Ok(buf)
}

/// `/`-separated relative path as a native path under `root`.
pub fn native_path(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// Unpack `archive` into `dest`. Bare executables are moved to `binary`.
pub fn unpack(archive: &Path, kind: ArchiveKind, dest: &Path, binary: &str) -> Result<(), String> {
    fs::create_dir_all(dest).map_err(|e| format!("failed to create {}: {e}", dest.display()))?;

    match kind {
        ArchiveKind::Zip => {
            let file = fs::File::open(archive).map_err(|e| e.to_string())?;
            let mut zip = zip::ZipArchive::new(file).map_err(|e| format!("bad zip archive: {e}"))?;
            zip.extract(dest)
                .map_err(|e| format!("zip extraction failed: {e}"))?;
        }
        ArchiveKind::TarGz => {
            let file = fs::File::open(archive).map_err(|e| e.to_string())?;
            let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
            tar.unpack(dest)
                .map_err(|e| format!("tar.gz extraction failed: {e}"))?;
        }
        ArchiveKind::SevenZip => {
            sevenz_rust::decompress_file(archive, dest)
                .map_err(|e| format!("7z extraction failed: {e}"))?;
        }
        ArchiveKind::AppImage | ArchiveKind::Executable => {
            let target = native_path(dest, binary);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            fs::rename(archive, &target)
                .map_err(|e| format!("failed to place {}: {e}", target.display()))?;
        }
    }
    Ok(())
}

/// Find the emulator binary: the declared path first, then by file name.
pub fn locate_binary(root: &Path, relative: &str) -> Option<PathBuf> {
    let declared = native_path(root, relative);
    if declared.is_file() {
        return Some(declared);
    }

    let file_name = relative.rsplit('/').next()?;
    WalkDir::new(root)
        .max_depth(BINARY_SEARCH_DEPTH)
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| e.file_type().is_file() && e.file_name() == file_name)
        .map(|e| e.into_path())
}

#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
