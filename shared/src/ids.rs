//! Helpers for identifiers and names that end up as filesystem path components.

use crate::target::TargetOs;

/// Characters Windows refuses in file names.
const WINDOWS_RESERVED_CHARS: [char; 7] = [':', '*', '?', '"', '<', '>', '|'];

/// Device names Windows reserves regardless of extension.
const WINDOWS_RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Returns true if an emulator ID is safe to use as a single path component.
///
/// Catalog IDs are lowercase ASCII (`ppsspp`, `pcsx2`, ...), so anything outside
/// `[a-z0-9_-]` is rejected outright.
pub fn is_safe_emulator_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Strip everything from `name` that cannot appear in a file name on `os`.
///
/// Path separators and control characters are always removed. For Windows the
/// reserved punctuation is removed too, trailing dots and spaces are trimmed,
/// and reserved device names get an underscore after the stem. Surrounding whitespace
/// is trimmed. The result may be empty; callers decide whether that is an error.
pub fn sanitize_file_name(name: &str, os: TargetOs) -> String {
    let mut out: String = name
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && !c.is_control())
        .filter(|c| os != TargetOs::Windows || !WINDOWS_RESERVED_CHARS.contains(c))
        .collect();

    out = out.trim().to_string();

    if os == TargetOs::Windows {
        while out.ends_with('.') || out.ends_with(' ') {
            out.pop();
        }
        let stem_len = out.find('.').unwrap_or(out.len());
        if WINDOWS_RESERVED_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(out[..stem_len].trim_end()))
        {
            out.insert(stem_len, '_');
        }
    }

    if out == "." || out == ".." {
        out.clear();
    }

    out
}
