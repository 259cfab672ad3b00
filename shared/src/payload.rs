//! Portable payload format.
//!
//! A portable artifact is a directory tree (emulator, ROM, BIOS, launcher
//! script) described by a [`LaunchManifest`] stored at its root as
//! `launch.json`. Every path in the manifest is relative to that root, so the
//! tree keeps working wherever it is extracted.
//!
//! A self-extracting artifact is the launcher stub executable with the zipped
//! tree appended, followed by a fixed-size [`PayloadTrailer`]:
//!
//! ```text
//! [stub executable][zip archive][archive_len: u64 LE][sha256: 32 bytes][PAYLOAD_MAGIC]
//! ```

use std::ffi::OsString;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::platform::Platform;
use crate::target::TargetOs;

/// Magic bytes closing a self-extracting artifact.
pub const PAYLOAD_MAGIC: [u8; 8] = *b"EMUFRG01";

/// Size of the trailer appended after the archive.
pub const TRAILER_LEN: usize = 8 + 32 + PAYLOAD_MAGIC.len();

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("payload archive length {archive_len} exceeds executable size {file_len}")]
    ArchiveOutOfRange { archive_len: u64, file_len: u64 },

    #[error("invalid launch manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(u32),

    #[error("manifest path '{0}' is not a plain relative path")]
    UnsafePath(String),
}

/// Fixed-size record at the very end of a self-extracting artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadTrailer {
    /// Length in bytes of the zip archive preceding the trailer.
    pub archive_len: u64,
    /// SHA-256 of the archive bytes.
    pub digest: [u8; 32],
}

impl PayloadTrailer {
    pub fn to_bytes(&self) -> [u8; TRAILER_LEN] {
        let mut out = [0u8; TRAILER_LEN];
        out[..8].copy_from_slice(&self.archive_len.to_le_bytes());
        out[8..40].copy_from_slice(&self.digest);
        out[40..].copy_from_slice(&PAYLOAD_MAGIC);
        out
    }

    /// Parse a trailer from exactly [`TRAILER_LEN`] bytes.
    ///
    /// Returns `None` if the magic does not match, which is how a bare stub
    /// (no payload appended) is recognised.
    pub fn parse(tail: &[u8]) -> Option<Self> {
        if tail.len() != TRAILER_LEN || tail[40..] != PAYLOAD_MAGIC {
            return None;
        }
        let mut len = [0u8; 8];
        len.copy_from_slice(&tail[..8]);
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&tail[8..40]);
        Some(Self {
            archive_len: u64::from_le_bytes(len),
            digest,
        })
    }

    /// Locate the trailer of a self-extracting file.
    ///
    /// On success returns the trailer and the offset of the archive's first byte.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Option<(Self, u64)>, PayloadError> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        if file_len < TRAILER_LEN as u64 {
            return Ok(None);
        }

        reader.seek(SeekFrom::End(-(TRAILER_LEN as i64)))?;
        let mut tail = [0u8; TRAILER_LEN];
        reader.read_exact(&mut tail)?;

        let Some(trailer) = Self::parse(&tail) else {
            return Ok(None);
        };

        let payload_end = file_len - TRAILER_LEN as u64;
        if trailer.archive_len > payload_end {
            return Err(PayloadError::ArchiveOutOfRange {
                archive_len: trailer.archive_len,
                file_len,
            });
        }

        Ok(Some((trailer, payload_end - trailer.archive_len)))
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// SHA-256 of everything `reader` yields.
pub fn digest_reader<R: Read>(reader: &mut R) -> io::Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

/// One launch argument: either passed verbatim or a path inside the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ManifestArg {
    Literal(String),
    /// Relative path, `/`-separated, resolved against the bundle root.
    Path(String),
}

/// Description of how to start the bundled game, stored as `launch.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchManifest {
    pub format_version: u32,
    pub game_name: String,
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulator_id: Option<String>,
    pub target_os: TargetOs,
    /// Emulator executable, relative to the bundle root.
    pub emulator: String,
    /// Full argument list, ROM included, in order.
    pub args: Vec<ManifestArg>,
    #[serde(default)]
    pub env: Vec<(String, ManifestArg)>,
}

/// A manifest with every path anchored to a concrete root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLaunch {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(String, OsString)>,
}

impl LaunchManifest {
    pub const FILE_NAME: &'static str = "launch.json";

    pub fn to_json(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, PayloadError> {
        let manifest: LaunchManifest = serde_json::from_slice(bytes)?;
        if manifest.format_version != MANIFEST_VERSION {
            return Err(PayloadError::UnsupportedVersion(manifest.format_version));
        }
        Ok(manifest)
    }

    /// Anchor every relative path in the manifest to `root`.
    pub fn resolve(&self, root: &Path) -> Result<ResolvedLaunch, PayloadError> {
        let resolve_arg = |arg: &ManifestArg| -> Result<OsString, PayloadError> {
            match arg {
                ManifestArg::Literal(s) => Ok(OsString::from(s)),
                ManifestArg::Path(p) => Ok(join_relative(root, p)?.into_os_string()),
            }
        };

        Ok(ResolvedLaunch {
            program: join_relative(root, &self.emulator)?,
            args: self.args.iter().map(resolve_arg).collect::<Result<_, _>>()?,
            env: self
                .env
                .iter()
                .map(|(k, v)| Ok((k.clone(), resolve_arg(v)?)))
                .collect::<Result<_, PayloadError>>()?,
        })
    }
}

/// Join a `/`-separated relative path onto `root`, refusing anything that
/// could escape it.
pub fn join_relative(root: &Path, relative: &str) -> Result<PathBuf, PayloadError> {
    let mut out = root.to_path_buf();
    for segment in relative.split('/').filter(|s| !s.is_empty() && *s != ".") {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => out.push(part),
            _ => return Err(PayloadError::UnsafePath(relative.to_string())),
        }
    }
    Ok(out)
}
