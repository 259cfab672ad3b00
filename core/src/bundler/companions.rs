//! Files a ROM container references and that must travel with it.

use std::path::{Component, Path, PathBuf};

use crate::detection::playlist;

/// Containers nest at most this deep (`m3u` listing `cue` sheets).
const MAX_DEPTH: usize = 2;

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn lowercase_ext(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn references(container: &Path) -> Vec<String> {
    let Some(ext) = lowercase_ext(container) else {
        return Vec::new();
    };
    let Ok(text) = std::fs::read_to_string(container) else {
        return Vec::new();
    };
    match ext.as_str() {
        "cue" => playlist::cue_files(&text),
        "gdi" => playlist::gdi_tracks(&text),
        "m3u" => playlist::m3u_entries(&text),
        _ => Vec::new(),
    }
}

/// Paths, relative to the ROM's directory, of every existing file the ROM
/// references. References that leave the ROM's directory are skipped.
pub fn companion_files(rom: &Path) -> Vec<PathBuf> {
    let base = rom.parent().unwrap_or(Path::new(""));
    let mut out = Vec::new();
    collect(base, Path::new(""), rom, 0, &mut out);
    out
}

fn collect(base: &Path, prefix: &Path, container: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth >= MAX_DEPTH {
        return;
    }
    for reference in references(container) {
        let reference = reference.replace('\\', "/");
        let relative = prefix.join(&reference);
        if !is_plain_relative(&relative) {
            tracing::warn!(
                "Skipping {} referenced by {}: outside the ROM directory",
                reference,
                container.display()
            );
            continue;
        }
        let absolute = base.join(&relative);
        if !absolute.is_file() {
            tracing::warn!(
                "{} references missing file {}",
                container.display(),
                absolute.display()
            );
            continue;
        }
        if out.contains(&relative) {
            continue;
        }
        out.push(relative.clone());

        let nested_prefix = relative.parent().unwrap_or(Path::new("")).to_path_buf();
        collect(base, &nested_prefix, &absolute, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn cue_tracks_are_companions() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("t1.bin"), b"1").unwrap();
        fs::write(tmp.path().join("t2.bin"), b"2").unwrap();
        let cue = tmp.path().join("game.cue");
        fs::write(
            &cue,
            "FILE \"t1.bin\" BINARY\nTRACK 01 MODE2/2352\nFILE \"t2.bin\" BINARY\nTRACK 02 AUDIO\n",
        )
        .unwrap();

        assert_eq!(
            companion_files(&cue),
            vec![PathBuf::from("t1.bin"), PathBuf::from("t2.bin")]
        );
    }

    #[test]
    fn m3u_pulls_in_nested_cue_tracks() {
        let tmp = tempfile::TempDir::new().unwrap();
        let discs = tmp.path().join("discs");
        fs::create_dir_all(&discs).unwrap();
        fs::write(discs.join("d1.bin"), b"1").unwrap();
        fs::write(discs.join("d1.cue"), "FILE \"d1.bin\" BINARY\n").unwrap();
        let m3u = tmp.path().join("game.m3u");
        fs::write(&m3u, "discs/d1.cue\n").unwrap();

        assert_eq!(
            companion_files(&m3u),
            vec![
                PathBuf::from("discs").join("d1.cue"),
                PathBuf::from("discs").join("d1.bin")
            ]
        );
    }

    #[test]
    fn escaping_and_missing_references_are_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cue = tmp.path().join("game.cue");
        fs::write(
            &cue,
            "FILE \"../secret.bin\" BINARY\nFILE \"/etc/passwd\" BINARY\nFILE \"gone.bin\" BINARY\n",
        )
        .unwrap();
        assert!(companion_files(&cue).is_empty());
    }

    #[test]
    fn plain_images_have_no_companions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let iso = tmp.path().join("game.iso");
        fs::write(&iso, b"data").unwrap();
        assert!(companion_files(&iso).is_empty());
    }
}
