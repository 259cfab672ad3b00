//! Locating, verifying and unpacking the bundle appended to this executable.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use emuforge_shared::{LaunchManifest, PayloadTrailer, digest_reader};

/// Written once a bundle has been fully extracted.
const COMPLETE_MARKER: &str = ".emuforge-complete";

/// A window `[start, start + len)` of an underlying reader.
pub struct Slice<R> {
    inner: R,
    start: u64,
    len: u64,
    pos: u64,
}

impl<R: Read + Seek> Slice<R> {
    pub fn new(mut inner: R, start: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            start,
            len,
            pos: 0,
        })
    }
}

impl<R: Read> Read for Slice<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        let max = buf.len().min(remaining.min(usize::MAX as u64) as usize);
        if max == 0 {
            return Ok(0);
        }
        let n = self.inner.read(&mut buf[..max])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Seek> Seek for Slice<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(d) => self.len.checked_add_signed(d),
            SeekFrom::Current(d) => self.pos.checked_add_signed(d),
        };
        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of bundle",
            ));
        };
        self.inner.seek(SeekFrom::Start(self.start + target))?;
        self.pos = target;
        Ok(target)
    }
}

/// The bundle archive attached to `exe`, verified against its digest.
pub fn open_payload(exe: &Path) -> Result<(PayloadTrailer, Slice<File>)> {
    let mut file = File::open(exe).with_context(|| format!("Failed to open {}", exe.display()))?;
    let Some((trailer, offset)) = PayloadTrailer::read_from(&mut file)? else {
        bail!("{} carries no bundle", exe.display());
    };

    let mut archive = Slice::new(file, offset, trailer.archive_len)?;
    let digest = digest_reader(&mut archive).context("Failed to read bundle")?;
    if digest != trailer.digest {
        bail!("Bundle is corrupt (digest mismatch)");
    }
    archive.seek(SeekFrom::Start(0))?;
    Ok((trailer, archive))
}

/// Extract `archive` into `dir` unless a previous run already did.
pub fn unpack_once<R: Read + Seek>(archive: R, dir: &Path) -> Result<()> {
    if dir.join(COMPLETE_MARKER).is_file() {
        tracing::debug!("Reusing extracted bundle at {}", dir.display());
        return Ok(());
    }

    let parent = dir
        .parent()
        .context("Bundle cache directory has no parent")?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;
    let staging = parent.join(format!(
        ".{}.tmp-{}",
        dir.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        std::process::id()
    ));
    if staging.exists() {
        fs::remove_dir_all(&staging).ok();
    }

    tracing::info!("Extracting bundle to {}", dir.display());
    let mut zip = zip::ZipArchive::new(archive).context("Bundle is not a valid archive")?;
    zip.extract(&staging)
        .with_context(|| format!("Failed to extract bundle to {}", staging.display()))?;
    fs::write(staging.join(COMPLETE_MARKER), b"")
        .context("Failed to mark bundle as extracted")?;

    if dir.exists() {
        // A stale partial extraction from an older run.
        fs::remove_dir_all(dir).ok();
    }
    if let Err(e) = fs::rename(&staging, dir) {
        fs::remove_dir_all(&staging).ok();
        // Another instance may have won the race.
        if !dir.join(COMPLETE_MARKER).is_file() {
            return Err(e).with_context(|| format!("Failed to move bundle to {}", dir.display()));
        }
    }
    Ok(())
}

/// Directory holding `launch.json`: the extraction root or its single
/// top-level directory.
pub fn find_bundle_root(dir: &Path) -> Result<PathBuf> {
    if dir.join(LaunchManifest::FILE_NAME).is_file() {
        return Ok(dir.to_path_buf());
    }
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() && path.join(LaunchManifest::FILE_NAME).is_file() {
            return Ok(path);
        }
    }
    bail!("No {} in bundle", LaunchManifest::FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn sample_zip() -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("Game/launch.json", options).unwrap();
        zip.write_all(b"{}").unwrap();
        zip.start_file("Game/rom/game.iso", options).unwrap();
        zip.write_all(b"rom").unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_slice_reads_and_seeks_within_window() {
        let data = b"headerPAYLOADtrailer".to_vec();
        let mut slice = Slice::new(Cursor::new(data), 6, 7).unwrap();

        let mut out = String::new();
        slice.read_to_string(&mut out).unwrap();
        assert_eq!(out, "PAYLOAD");

        assert_eq!(slice.seek(SeekFrom::End(-4)).unwrap(), 3);
        let mut rest = String::new();
        slice.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "LOAD");
        assert!(slice.seek(SeekFrom::Current(-100)).is_err());
    }

    #[test]
    fn test_zip_inside_slice_is_readable() {
        let mut data = b"stub bytes".to_vec();
        let archive = sample_zip();
        data.extend_from_slice(&archive);
        data.extend_from_slice(b"trailing junk");

        let slice = Slice::new(Cursor::new(data), 10, archive.len() as u64).unwrap();
        let zip = zip::ZipArchive::new(slice).unwrap();
        assert_eq!(zip.len(), 2);
    }

    #[test]
    fn test_unpack_once_extracts_and_reuses() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("bundles").join("abc");

        unpack_once(Cursor::new(sample_zip()), &dir).unwrap();
        assert!(dir.join("Game/rom/game.iso").is_file());
        assert!(dir.join(COMPLETE_MARKER).is_file());

        fs::write(dir.join("Game/rom/game.iso"), b"modified").unwrap();
        unpack_once(Cursor::new(sample_zip()), &dir).unwrap();
        assert_eq!(fs::read(dir.join("Game/rom/game.iso")).unwrap(), b"modified");
    }

    #[test]
    fn test_find_bundle_root_looks_one_level_down() {
        let tmp = tempfile::TempDir::new().unwrap();
        unpack_once(Cursor::new(sample_zip()), tmp.path().join("x").as_path()).unwrap();
        assert_eq!(
            find_bundle_root(&tmp.path().join("x")).unwrap(),
            tmp.path().join("x").join("Game")
        );
        assert!(find_bundle_root(tmp.path()).is_err());
    }

    #[test]
    fn test_open_payload_rejects_tampered_bundle() {
        let tmp = tempfile::TempDir::new().unwrap();
        let archive = sample_zip();
        let trailer = PayloadTrailer {
            archive_len: archive.len() as u64,
            digest: digest_reader(&mut Cursor::new(&archive)).unwrap(),
        };

        let exe = tmp.path().join("game");
        let mut bytes = b"stub".to_vec();
        bytes.extend_from_slice(&archive);
        bytes.extend_from_slice(&trailer.to_bytes());
        fs::write(&exe, &bytes).unwrap();
        let (read, _) = open_payload(&exe).unwrap();
        assert_eq!(read, trailer);

        bytes[10] ^= 0xff;
        fs::write(&exe, &bytes).unwrap();
        assert!(open_payload(&exe).is_err());

        let bare = tmp.path().join("bare");
        fs::write(&bare, b"no payload here").unwrap();
        assert!(open_payload(&bare).is_err());
    }
}
