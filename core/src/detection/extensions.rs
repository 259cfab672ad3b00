//! Static extension to platform table.

use emuforge_shared::Platform;

/// Extensions that name a playlist or multi-track container rather than an image.
pub const CONTAINER_EXTENSIONS: &[&str] = &["m3u", "cue", "gdi", "cdi"];

/// Extensions shared by several consoles; these need a header sniff.
pub const AMBIGUOUS_EXTENSIONS: &[&str] = &["iso", "bin", "img", "rvz", "wia", "elf"];

/// Extensions that identify a platform on their own.
const EXTENSION_TABLE: &[(&str, Platform)] = &[
    ("cso", Platform::Psp),
    ("pbp", Platform::Psp),
    ("gcm", Platform::GameCube),
    ("gcz", Platform::GameCube),
    ("dol", Platform::GameCube),
    ("wbfs", Platform::Wii),
    ("wad", Platform::Wii),
    ("wua", Platform::WiiU),
    ("wud", Platform::WiiU),
    ("wux", Platform::WiiU),
    ("rpx", Platform::WiiU),
    ("nsp", Platform::Switch),
    ("xci", Platform::Switch),
    ("nca", Platform::Switch),
    ("nro", Platform::Switch),
    ("nds", Platform::Nds),
    ("srl", Platform::Nds),
    ("dsi", Platform::Nds),
    ("3ds", Platform::N3ds),
    ("cia", Platform::N3ds),
    ("cxi", Platform::N3ds),
    ("cci", Platform::N3ds),
    ("3dsx", Platform::N3ds),
    ("xiso", Platform::Xbox),
    ("pkg", Platform::Ps3),
];

/// Look up a lowercase extension in the static table.
pub fn platform_for_extension(ext: &str) -> Option<Platform> {
    EXTENSION_TABLE
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, p)| *p)
}

/// Every extension the detector recognises, in table order.
pub fn known_extensions() -> impl Iterator<Item = &'static str> {
    CONTAINER_EXTENSIONS
        .iter()
        .copied()
        .chain(EXTENSION_TABLE.iter().map(|(e, _)| *e))
        .chain(AMBIGUOUS_EXTENSIONS.iter().copied())
}
