//! ROM platform detection.
//!
//! Detection never fails: anything that cannot be identified is
//! [`Platform::Unknown`]. Files are never read past [`HEADER_PROBE_LEN`] bytes.
//!
//! Precedence:
//! 1. playlist and multi-track containers (`m3u`, `cue`, `gdi`, `cdi`)
//! 2. the static extension table
//! 3. header magic for extensions several consoles share (`iso`, `bin`, ...)

pub mod extensions;
pub mod magic;
pub mod playlist;

use std::path::Path;

use emuforge_shared::{HEADER_PROBE_LEN, Platform, read_prefix};

pub use extensions::{AMBIGUOUS_EXTENSIONS, CONTAINER_EXTENSIONS, known_extensions};

/// Playlists nest at most this deep (an `m3u` of `cue` sheets).
const MAX_CONTAINER_DEPTH: usize = 2;

/// Platform assumed for a playlist whose tracks cannot be identified.
const PLAYLIST_FALLBACK: Platform = Platform::Ps1;

fn lowercase_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Detect a platform from a file name and the leading bytes of the file.
///
/// For `cue`/`m3u` the header is the container's own text; the referenced
/// track is judged by its name only. [`detect`] follows the reference on disk.
pub fn detect_bytes(name: &str, header: &[u8]) -> Platform {
    let Some(ext) = lowercase_extension(name) else {
        return Platform::Unknown;
    };

    match ext.as_str() {
        "m3u" | "cue" => {
            let text = String::from_utf8_lossy(header);
            let first = if ext == "m3u" {
                playlist::m3u_entries(&text).into_iter().next()
            } else {
                playlist::cue_files(&text).into_iter().next()
            };
            first
                .map(|entry| detect_bytes(&entry, &[]))
                .filter(|p| p.is_known())
                .unwrap_or(PLAYLIST_FALLBACK)
        }
        "gdi" | "cdi" => Platform::Dreamcast,
        other => extensions::platform_for_extension(other)
            .or_else(|| {
                AMBIGUOUS_EXTENSIONS
                    .contains(&other)
                    .then(|| magic::sniff(other, header))
                    .flatten()
            })
            .unwrap_or(Platform::Unknown),
    }
}

/// Detect the platform of a ROM on disk.
pub fn detect(path: &Path) -> Platform {
    let platform = detect_at_depth(path, 0);
    tracing::debug!("Detected {} for {}", platform, path.display());
    platform
}

fn detect_at_depth(path: &Path, depth: usize) -> Platform {
    let name = match path.file_name() {
        Some(n) => n.to_string_lossy().into_owned(),
        None => return Platform::Unknown,
    };
    let Some(ext) = lowercase_extension(&name) else {
        return Platform::Unknown;
    };

    let wants_header = ext == "m3u" || ext == "cue" || AMBIGUOUS_EXTENSIONS.contains(&ext.as_str());
    let header = if wants_header {
        read_prefix(path, HEADER_PROBE_LEN).unwrap_or_default()
    } else {
        Vec::new()
    };

    if (ext == "m3u" || ext == "cue") && depth < MAX_CONTAINER_DEPTH {
        let text = String::from_utf8_lossy(&header);
        let first = if ext == "m3u" {
            playlist::m3u_entries(&text).into_iter().next()
        } else {
            playlist::cue_files(&text).into_iter().next()
        };
        if let Some(entry) = first {
            let target = path.parent().unwrap_or(Path::new("")).join(entry);
            let platform = detect_at_depth(&target, depth + 1);
            if platform.is_known() {
                return platform;
            }
        }
        return PLAYLIST_FALLBACK;
    }

    detect_bytes(&name, &header)
}
