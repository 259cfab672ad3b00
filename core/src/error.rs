//! Error types surfaced by the forge engine.

use std::fmt;
use std::io;

/// Which part of a request a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    GameName,
    RomPath,
    EmulatorPath,
    BiosPath,
    OutputDir,
    Plugin,
    TargetOs,
    Platform,
}

impl InputField {
    pub const fn as_str(self) -> &'static str {
        match self {
            InputField::GameName => "game_name",
            InputField::RomPath => "rom_path",
            InputField::EmulatorPath => "emulator_path",
            InputField::BiosPath => "bios_path",
            InputField::OutputDir => "output_dir",
            InputField::Plugin => "plugin",
            InputField::TargetOs => "target_os",
            InputField::Platform => "platform",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a forge or install operation.
///
/// Payloads are plain strings so a single result can be handed to every
/// caller waiting on the same install.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForgeError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: InputField, reason: String },

    #[error("unknown emulator '{0}'")]
    UnknownEmulator(String),

    #[error("binary for emulator '{id}' not found at {path}")]
    BinaryNotFound { id: String, path: String },

    #[error("failed to extract emulator '{id}': {reason}")]
    ExtractionFailed { id: String, reason: String },

    #[error("failed to download emulator '{id}': {reason}")]
    DownloadFailed { id: String, reason: String },

    #[error("another operation is already in progress")]
    Busy,

    #[error("operation cancelled")]
    Cancelled,

    #[error("{context}: {message}")]
    IoFailure { context: String, message: String },
}

impl ForgeError {
    pub fn invalid(field: InputField, reason: impl Into<String>) -> Self {
        ForgeError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, err: impl fmt::Display) -> Self {
        ForgeError::IoFailure {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ForgeError::DownloadFailed { .. } | ForgeError::Busy | ForgeError::IoFailure { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ForgeError::Cancelled)
    }
}

/// Extension for attaching a context string to `io::Result`s.
pub(crate) trait IoContext<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> Result<T, ForgeError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> Result<T, ForgeError> {
        self.map_err(|e| ForgeError::io(context(), e))
    }
}

pub type ForgeResult<T> = Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_names_the_field() {
        let err = ForgeError::invalid(InputField::RomPath, "does not exist");
        assert_eq!(err.to_string(), "invalid rom_path: does not exist");
    }

    #[test]
    fn classification_helpers() {
        assert!(ForgeError::Cancelled.is_cancelled());
        assert!(!ForgeError::Cancelled.is_retryable());
        assert!(ForgeError::Busy.is_retryable());
        assert!(
            ForgeError::DownloadFailed {
                id: "ppsspp".into(),
                reason: "timeout".into()
            }
            .is_retryable()
        );
        assert!(!ForgeError::UnknownEmulator("x".into()).is_retryable());
    }

    #[test]
    fn io_context_wraps_the_message() {
        let res: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = res.io_context(|| "reading rom".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "reading rom: gone");
    }
}
