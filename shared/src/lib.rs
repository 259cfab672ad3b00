//! Shared types for EmuForge.
//!
//! Used by both the forge engine (`emuforge-core`) and the self-extracting
//! launcher stub (`emuforge-launcher`), so everything here stays free of
//! network, archive and logging dependencies.

pub mod fs;
pub mod ids;
pub mod payload;
pub mod platform;
pub mod target;

pub use fs::{HEADER_PROBE_LEN, read_prefix, write_atomic};
pub use ids::{is_safe_emulator_id, sanitize_file_name};
pub use payload::{
    LaunchManifest, MANIFEST_VERSION, ManifestArg, PAYLOAD_MAGIC, PayloadError, PayloadTrailer,
    ResolvedLaunch, TRAILER_LEN, digest_reader, join_relative,
};
pub use platform::Platform;
pub use target::TargetOs;
