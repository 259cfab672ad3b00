//! Progress events streamed to callers.
//!
//! Stages are ordered; within one operation the reported stage never moves
//! backwards, although the same stage may be reported several times.

use std::fmt;

/// Steps of a forge operation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ForgeStage {
    DetectingPlatform,
    ResolvingEmulator,
    Validating,
    ResolvingArguments,
    ResolvingTarget,
    GeneratingLauncher,
    Staging,
    Packaging,
    Writing,
    Done,
}

impl ForgeStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            ForgeStage::DetectingPlatform => "detecting platform",
            ForgeStage::ResolvingEmulator => "resolving emulator",
            ForgeStage::Validating => "validating",
            ForgeStage::ResolvingArguments => "resolving arguments",
            ForgeStage::ResolvingTarget => "resolving target",
            ForgeStage::GeneratingLauncher => "generating launcher",
            ForgeStage::Staging => "staging",
            ForgeStage::Packaging => "packaging",
            ForgeStage::Writing => "writing",
            ForgeStage::Done => "done",
        }
    }
}

impl fmt::Display for ForgeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeProgress {
    pub stage: ForgeStage,
    pub message: String,
}

/// Steps of an emulator install, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstallStage {
    Downloading,
    Verifying,
    Extracting,
    Locating,
    Recording,
    Done,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallStage::Downloading => "downloading",
            InstallStage::Verifying => "verifying",
            InstallStage::Extracting => "extracting",
            InstallStage::Locating => "locating binary",
            InstallStage::Recording => "recording",
            InstallStage::Done => "done",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallProgress {
    pub stage: InstallStage,
    pub message: String,
    pub bytes_received: Option<u64>,
    pub bytes_total: Option<u64>,
}

impl InstallProgress {
    pub fn new(stage: InstallStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            bytes_received: None,
            bytes_total: None,
        }
    }

    /// Fraction of the download completed, when the size is known.
    pub fn fraction(&self) -> Option<f32> {
        match (self.bytes_received, self.bytes_total) {
            (Some(received), Some(total)) if total > 0 => {
                Some((received as f64 / total as f64).min(1.0) as f32)
            }
            _ => None,
        }
    }
}

/// Forwards forge progress to the caller's sink, holding the stage order.
///
/// Only the engine creates reporters; the bundler and the manager report
/// through the one they are handed.
pub struct ForgeReporter<'a> {
    sink: &'a mut dyn FnMut(ForgeProgress),
    last: Option<ForgeStage>,
}

impl<'a> ForgeReporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn FnMut(ForgeProgress)) -> Self {
        Self { sink, last: None }
    }

    pub fn stage(&mut self, stage: ForgeStage, message: impl Into<String>) {
        let stage = match self.last {
            Some(last) if stage < last => {
                tracing::debug!("Clamping out-of-order stage {} to {}", stage, last);
                last
            }
            _ => stage,
        };
        self.last = Some(stage);
        let message = message.into();
        tracing::info!("[{}] {}", stage, message);
        (self.sink)(ForgeProgress { stage, message });
    }

    pub fn last_stage(&self) -> Option<ForgeStage> {
        self.last
    }
}

/// Install-side counterpart of [`ForgeReporter`].
pub struct InstallReporter<'a> {
    sink: &'a mut dyn FnMut(InstallProgress),
    last: Option<InstallStage>,
}

impl<'a> InstallReporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn FnMut(InstallProgress)) -> Self {
        Self { sink, last: None }
    }

    pub fn report(&mut self, mut progress: InstallProgress) {
        if let Some(last) = self.last
            && progress.stage < last
        {
            progress.stage = last;
        }
        if self.last != Some(progress.stage) {
            tracing::info!("[install] {}", progress.message);
        }
        self.last = Some(progress.stage);
        (self.sink)(progress);
    }

    pub fn stage(&mut self, stage: InstallStage, message: impl Into<String>) {
        self.report(InstallProgress::new(stage, message));
    }

    pub fn last_stage(&self) -> Option<InstallStage> {
        self.last
    }
}
