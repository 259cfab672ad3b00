//! Parsers for the text containers that reference other disc files.

/// `FILE` entries of a `.cue` sheet, in order.
pub fn cue_files(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let keyword = line.get(..4)?;
            if !keyword.eq_ignore_ascii_case("FILE") {
                return None;
            }
            let rest = line[4..].trim_start();
            if let Some(quoted) = rest.strip_prefix('"') {
                let end = quoted.find('"')?;
                Some(quoted[..end].to_string())
            } else {
                // Unquoted: everything up to the trailing file type token.
                let (name, _file_type) = rest.rsplit_once(char::is_whitespace)?;
                Some(name.trim().to_string())
            }
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Entries of an `.m3u` playlist, comments and blank lines skipped.
pub fn m3u_entries(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Track files of a `.gdi` descriptor.
///
/// Line format: `<track> <lba> <type> <sector size> <file> <offset>`, the file
/// name optionally quoted. The first line is the track count.
pub fn gdi_tracks(text: &str) -> Vec<String> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let line = line.trim();
            let mut rest = line;
            for _ in 0..4 {
                let (_, tail) = rest.split_once(char::is_whitespace)?;
                rest = tail.trim_start();
            }
            if let Some(quoted) = rest.strip_prefix('"') {
                let end = quoted.find('"')?;
                Some(quoted[..end].to_string())
            } else {
                rest.split_whitespace().next().map(str::to_string)
            }
        })
        .collect()
}
