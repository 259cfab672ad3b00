//! Launcher assembly.
//!
//! Turns a validated request into one artifact in the output directory:
//!
//! - a launcher script referencing the emulator, ROM and BIOS in place, or
//! - a portable bundle: a zip archive, or the self-extracting launcher stub
//!   with that archive appended when a stub for the host is available.
//!
//! Artifacts are written to a temporary file next to their destination and
//! renamed into place, so a failed or cancelled build leaves nothing behind.

pub mod args;
pub mod companions;
pub mod portable;
pub mod script;
pub mod target;
pub mod validate;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use emuforge_shared::{Platform, TargetOs, sanitize_file_name};

use crate::cancel::CancelToken;
use crate::catalog::{EmulatorDescriptor, LaunchProfile};
use crate::error::{ForgeError, ForgeResult, InputField, IoContext};
use crate::forge::ForgeRequest;
use crate::manager::InstalledRecord;
use crate::progress::{ForgeReporter, ForgeStage};

use args::{LaunchArg, resolve_args};
use script::{Script, Word};

/// The emulator a request will launch, as resolved by the engine.
#[derive(Debug, Clone)]
pub struct ResolvedEmulator {
    /// Catalog entry, if the binary was recognised.
    pub descriptor: Option<&'static EmulatorDescriptor>,
    pub profile: LaunchProfile,
    /// Managed install owning the binary, if any.
    pub install: Option<InstalledRecord>,
}

/// A temporary file in the output directory awaiting its final name.
struct PendingArtifact {
    tmp: NamedTempFile,
    dir: PathBuf,
}

impl PendingArtifact {
    fn create(dir: &Path) -> ForgeResult<Self> {
        let tmp = tempfile::Builder::new()
            .prefix(".emuforge-")
            .suffix(".part")
            .tempfile_in(dir)
            .io_context(|| format!("creating temporary file in {}", dir.display()))?;
        Ok(Self {
            tmp,
            dir: dir.to_path_buf(),
        })
    }

    fn file(&mut self) -> &mut File {
        self.tmp.as_file_mut()
    }

    /// Move into place as `file_name`, replacing any previous artifact.
    fn commit(mut self, file_name: &str, executable: bool) -> ForgeResult<PathBuf> {
        self.file()
            .flush()
            .and_then(|_| self.tmp.as_file().sync_all())
            .io_context(|| "flushing artifact".to_string())?;
        if executable {
            set_mode_755(self.tmp.path())?;
        }
        let dest = self.dir.join(file_name);
        self.tmp
            .persist(&dest)
            .map_err(|e| ForgeError::io(format!("writing {}", dest.display()), e.error))?;
        Ok(std::path::absolute(&dest).unwrap_or(dest))
    }
}

#[cfg(unix)]
fn set_mode_755(path: &Path) -> ForgeResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .io_context(|| format!("marking {} executable", path.display()))
}

#[cfg(not(unix))]
fn set_mode_755(_path: &Path) -> ForgeResult<()> {
    Ok(())
}

fn with_extension(name: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{name}.{ext}"),
        None => name.to_string(),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Profile environment for a managed install, anchored at its directory.
fn managed_env(emulator: &ResolvedEmulator) -> Vec<(String, Word)> {
    let Some(install) = &emulator.install else {
        return Vec::new();
    };
    emulator
        .profile
        .portable_env
        .iter()
        .filter_map(|(key, dir)| {
            let path = emuforge_shared::join_relative(&install.install_dir, dir).ok()?;
            Some(((*key).to_string(), Word::Path(absolute(&path))))
        })
        .collect()
}

pub struct Bundler {
    work_dir: PathBuf,
    launcher_stub: Option<PathBuf>,
    host: TargetOs,
}

impl Bundler {
    pub fn new(work_dir: impl Into<PathBuf>, launcher_stub: Option<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            launcher_stub,
            host: TargetOs::host(),
        }
    }

    pub fn launcher_stub(&self) -> Option<&Path> {
        self.launcher_stub.as_deref()
    }

    /// Run every bundling stage and return the absolute artifact path.
    pub fn build(
        &self,
        request: &ForgeRequest,
        platform: Platform,
        emulator: &ResolvedEmulator,
        reporter: &mut ForgeReporter<'_>,
        cancel: &CancelToken,
    ) -> ForgeResult<PathBuf> {
        cancel.checkpoint()?;
        reporter.stage(ForgeStage::Validating, "Validating request");
        validate::validate(request)?;

        cancel.checkpoint()?;
        reporter.stage(ForgeStage::ResolvingArguments, "Resolving launch arguments");
        let resolved = resolve_args(
            &emulator.profile,
            request.fullscreen,
            request.bios_path.as_deref(),
            &request.extra_args,
            request.portable,
        );
        for warning in &resolved.warnings {
            warn!("{}", warning);
            reporter.stage(ForgeStage::ResolvingArguments, format!("Warning: {warning}"));
        }

        cancel.checkpoint()?;
        reporter.stage(ForgeStage::ResolvingTarget, "Resolving target OS");
        let target = target::resolve_target(request.target_os, &request.emulator_path);
        if request.portable && target != self.host {
            return Err(ForgeError::invalid(
                InputField::TargetOs,
                format!(
                    "portable bundles can only target the host OS ({}), not {}",
                    self.host, target
                ),
            ));
        }
        let name = sanitize_file_name(request.game_name.trim(), target);
        if name.is_empty() {
            return Err(ForgeError::invalid(
                InputField::GameName,
                format!("contains no characters usable in a {target} file name"),
            ));
        }
        info!("Building {} launcher '{}'", target, name);

        cancel.checkpoint()?;
        if request.portable {
            self.build_portable(request, platform, emulator, &resolved, target, &name, reporter, cancel)
        } else {
            self.build_script(request, emulator, &resolved.args, target, &name, reporter, cancel)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_script(
        &self,
        request: &ForgeRequest,
        emulator: &ResolvedEmulator,
        args: &[LaunchArg],
        target: TargetOs,
        name: &str,
        reporter: &mut ForgeReporter<'_>,
        cancel: &CancelToken,
    ) -> ForgeResult<PathBuf> {
        reporter.stage(ForgeStage::GeneratingLauncher, format!("Generating {target} launcher"));
        let script = Script {
            program: Word::Path(absolute(&request.emulator_path)),
            args: args
                .iter()
                .filter_map(|arg| match arg {
                    LaunchArg::Literal(s) => Some(Word::Literal(s.clone())),
                    LaunchArg::Rom => Some(Word::Path(absolute(&request.rom_path))),
                    LaunchArg::Bios => request.bios_path.as_deref().map(|b| Word::Path(absolute(b))),
                })
                .collect(),
            env: managed_env(emulator),
        };
        let text = script.render(target, request.game_name.trim());

        cancel.checkpoint()?;
        reporter.stage(ForgeStage::Writing, "Writing launcher");
        let mut pending = PendingArtifact::create(&request.output_dir)?;
        pending
            .file()
            .write_all(text.as_bytes())
            .io_context(|| "writing launcher script".to_string())?;
        cancel.checkpoint()?;
        pending.commit(&with_extension(name, target.script_extension()), true)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_portable(
        &self,
        request: &ForgeRequest,
        platform: Platform,
        emulator: &ResolvedEmulator,
        resolved: &args::ResolvedArgs,
        target: TargetOs,
        name: &str,
        reporter: &mut ForgeReporter<'_>,
        cancel: &CancelToken,
    ) -> ForgeResult<PathBuf> {
        reporter.stage(ForgeStage::GeneratingLauncher, "Preparing portable launcher");
        std::fs::create_dir_all(&self.work_dir)
            .io_context(|| format!("creating {}", self.work_dir.display()))?;
        let staging = tempfile::Builder::new()
            .prefix(".emuforge-stage-")
            .tempdir_in(&self.work_dir)
            .io_context(|| format!("creating staging directory in {}", self.work_dir.display()))?;

        cancel.checkpoint()?;
        reporter.stage(ForgeStage::Staging, "Copying emulator, ROM and BIOS");
        let job = portable::PortableJob {
            name,
            request,
            platform,
            emulator,
            args: resolved,
            target,
        };
        let bundle = portable::stage(&job, staging.path(), cancel)?;

        cancel.checkpoint()?;
        match self.launcher_stub.as_deref() {
            Some(stub) => {
                reporter.stage(ForgeStage::Packaging, "Packaging bundle archive");
                let archive = staging.path().join("bundle.zip");
                let file = File::create(&archive)
                    .io_context(|| format!("creating {}", archive.display()))?;
                portable::package_zip(&bundle, file, cancel)?;

                cancel.checkpoint()?;
                reporter.stage(ForgeStage::Writing, "Writing self-extracting executable");
                let mut pending = PendingArtifact::create(&request.output_dir)?;
                portable::write_self_extracting(stub, &archive, pending.file(), cancel)?;
                cancel.checkpoint()?;
                pending.commit(&with_extension(name, target.executable_extension()), true)
            }
            None => {
                reporter.stage(ForgeStage::Packaging, "Packaging portable archive");
                let mut pending = PendingArtifact::create(&request.output_dir)?;
                portable::package_zip(&bundle, pending.file(), cancel)?;

                cancel.checkpoint()?;
                reporter.stage(ForgeStage::Writing, "Writing portable archive");
                pending.commit(&format!("{name}.zip"), false)
            }
        }
    }
}
