//! The forge orchestrator.
//!
//! [`ForgeEngine`] ties detection, the catalog, the emulator manager and the
//! bundler together. It runs at most one forge at a time; a second request
//! while one is running fails with [`ForgeError::Busy`].

mod request;
mod task;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, mpsc};

use tracing::{info, warn};

use emuforge_shared::Platform;

use crate::bundler::{Bundler, ResolvedEmulator};
use crate::cancel::CancelToken;
use crate::catalog::{EmulatorCatalog, GENERIC_PROFILE};
use crate::config::ForgeConfig;
use crate::detection;
use crate::error::{ForgeError, ForgeResult, InputField};
use crate::manager::{EmulatorManager, HttpFetcher, JsonFileStore, ManagerOptions};
use crate::progress::{
    ForgeProgress, ForgeReporter, ForgeStage, InstallProgress, InstallReporter, InstallStage,
};

pub use request::{ForgeRequest, PluginChoice, TargetChoice};
pub use task::Task;

use task::BusyGuard;

pub struct ForgeEngine {
    manager: Arc<EmulatorManager>,
    bundler: Bundler,
    busy: Arc<AtomicBool>,
}

impl ForgeEngine {
    pub fn new(manager: EmulatorManager, bundler: Bundler) -> Self {
        Self {
            manager: Arc::new(manager),
            bundler,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Engine wired to the built-in catalog, on-disk records and HTTP
    /// downloads, with directories taken from `config`.
    pub fn from_config(config: &ForgeConfig) -> ForgeResult<Self> {
        let emulators_dir = config
            .emulators_dir()
            .ok_or_else(|| ForgeError::io("resolving emulator directory", "no home directory"))?;
        let installed_db = config
            .installed_db()
            .ok_or_else(|| ForgeError::io("resolving record file", "no home directory"))?;
        info!("Emulators directory: {}", emulators_dir.display());

        let manager = EmulatorManager::new(
            EmulatorCatalog::builtin(),
            ManagerOptions::new(emulators_dir),
            Box::new(JsonFileStore::new(installed_db)),
            Arc::new(HttpFetcher::from_config(&config.download)),
        );
        let stub = config.launcher_stub();
        if stub.is_none() {
            warn!("No launcher stub found; portable bundles will be plain zip archives");
        }
        Ok(Self::new(manager, Bundler::new(config.work_dir(), stub)))
    }

    pub fn catalog(&self) -> &EmulatorCatalog {
        self.manager.catalog()
    }

    pub fn manager(&self) -> &EmulatorManager {
        &self.manager
    }

    pub fn bundler(&self) -> &Bundler {
        &self.bundler
    }

    /// Platform of the ROM at `path`; never fails.
    pub fn detect_platform(&self, path: &Path) -> Platform {
        detection::detect(path)
    }

    pub fn installed_emulators(&self) -> Vec<String> {
        self.manager.list_installed()
    }

    pub fn download_emulator(
        &self,
        id: &str,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(InstallProgress),
    ) -> ForgeResult<PathBuf> {
        self.run_install(id, cancel, on_progress)
    }

    /// Produce a launcher artifact for `request` and return its absolute
    /// path. Progress stages are reported in order.
    pub fn forge(
        &self,
        request: &ForgeRequest,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(ForgeProgress),
    ) -> ForgeResult<PathBuf> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        self.run(request, cancel, on_progress)
    }

    /// Start a forge on a worker thread.
    ///
    /// Fails immediately with `Busy` if a forge is already running.
    pub fn spawn_forge(
        self: &Arc<Self>,
        request: ForgeRequest,
    ) -> ForgeResult<Task<PathBuf, ForgeProgress>> {
        let busy = BusyGuard::acquire(&self.busy)?;
        let engine = Arc::clone(self);
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let _busy = busy;
            let mut sink = |p: ForgeProgress| {
                let _ = tx.send(p);
            };
            engine.run(&request, &worker_cancel, &mut sink)
        });
        Ok(Task::new(rx, cancel, handle))
    }

    /// Start an install on a worker thread.
    pub fn spawn_install(self: &Arc<Self>, id: &str) -> Task<PathBuf, InstallProgress> {
        let engine = Arc::clone(self);
        let id = id.to_string();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let mut sink = |p: InstallProgress| {
                let _ = tx.send(p);
            };
            engine.run_install(&id, &worker_cancel, &mut sink)
        });
        Task::new(rx, cancel, handle)
    }

    /// Every successful install ends with a `Done` event, including one
    /// that joined another caller's download.
    fn run_install(
        &self,
        id: &str,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(InstallProgress),
    ) -> ForgeResult<PathBuf> {
        let mut reporter = InstallReporter::new(on_progress);
        let binary = self.manager.install_reporting(id, cancel, &mut reporter)?;
        if reporter.last_stage() != Some(InstallStage::Done) {
            reporter.stage(InstallStage::Done, format!("{} is ready", id));
        }
        Ok(binary)
    }

    fn run(
        &self,
        request: &ForgeRequest,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(ForgeProgress),
    ) -> ForgeResult<PathBuf> {
        let mut reporter = ForgeReporter::new(on_progress);

        cancel.checkpoint()?;
        let platform = match request.platform {
            Some(platform) => {
                reporter.stage(
                    ForgeStage::DetectingPlatform,
                    format!("Using platform {}", platform.display_name()),
                );
                platform
            }
            None => {
                reporter.stage(ForgeStage::DetectingPlatform, "Detecting platform");
                let platform = detection::detect(&request.rom_path);
                info!("Detected {} for {}", platform, request.rom_path.display());
                platform
            }
        };

        cancel.checkpoint()?;
        reporter.stage(ForgeStage::ResolvingEmulator, "Resolving emulator");
        let emulator = self.resolve_emulator(request, platform)?;
        if let Some(descriptor) = emulator.descriptor {
            reporter.stage(
                ForgeStage::ResolvingEmulator,
                format!("Using {} launch conventions", descriptor.display_name),
            );
        }

        let artifact = self
            .bundler
            .build(request, platform, &emulator, &mut reporter, cancel)?;
        reporter.stage(ForgeStage::Done, format!("Created {}", artifact.display()));
        Ok(artifact)
    }

    fn resolve_emulator(
        &self,
        request: &ForgeRequest,
        platform: Platform,
    ) -> ForgeResult<ResolvedEmulator> {
        let catalog = self.manager.catalog();
        let install = self.manager.record_for_binary(&request.emulator_path);

        let descriptor = match &request.plugin {
            PluginChoice::Emulator(id) => Some(catalog.by_id(id).ok_or_else(|| {
                ForgeError::invalid(InputField::Plugin, format!("unknown emulator '{id}'"))
            })?),
            PluginChoice::Auto => install
                .as_ref()
                .and_then(|r| catalog.by_id(&r.id))
                .or_else(|| catalog.match_binary(&request.emulator_path)),
        };

        match descriptor {
            Some(d) if platform.is_known() && !d.supports(platform) => warn!(
                "{} is not listed for {}; launching anyway",
                d.display_name,
                platform.display_name()
            ),
            None => info!(
                "{} not recognised; using generic launch arguments",
                request.emulator_path.display()
            ),
            _ => {}
        }

        Ok(ResolvedEmulator {
            descriptor,
            profile: descriptor.map(|d| d.profile).unwrap_or(GENERIC_PROFILE),
            install,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{ArchiveFetcher, FetchError, MemoryStore};
    use crate::manager::fetch::FetchProgress;
    use std::fs::File;

    struct NoNetwork;

    impl ArchiveFetcher for NoNetwork {
        fn fetch(
            &self,
            _url: &str,
            _dest: &mut File,
            _cancel: &CancelToken,
            _progress: &mut FetchProgress<'_>,
        ) -> Result<u64, FetchError> {
            Err(FetchError::Failed("offline".into()))
        }
    }

    fn engine(base: &Path) -> ForgeEngine {
        let manager = EmulatorManager::new(
            EmulatorCatalog::builtin(),
            ManagerOptions::new(base.join("emulators")),
            Box::new(MemoryStore::new()),
            Arc::new(NoNetwork),
        );
        ForgeEngine::new(manager, Bundler::new(base.join("work"), None))
    }

    #[test]
    fn explicit_plugin_must_exist() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = engine(tmp.path());
        let request = ForgeRequest::new("G", "/r.iso", "/emu", "/out")
            .with_plugin(PluginChoice::Emulator("nope".into()));
        let err = engine.resolve_emulator(&request, Platform::Ps2).unwrap_err();
        assert!(matches!(
            err,
            ForgeError::InvalidInput {
                field: InputField::Plugin,
                ..
            }
        ));
    }

    #[test]
    fn auto_plugin_matches_binary_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = engine(tmp.path());
        let request = ForgeRequest::new("G", "/r.iso", "/apps/PPSSPPWindows64.exe", "/out");
        let resolved = engine.resolve_emulator(&request, Platform::Psp).unwrap();
        assert_eq!(resolved.descriptor.map(|d| d.id), Some("ppsspp"));
        assert!(resolved.install.is_none());
    }

    #[test]
    fn unknown_binary_uses_generic_profile() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = engine(tmp.path());
        let request = ForgeRequest::new("G", "/r.iso", "/apps/mystery", "/out");
        let resolved = engine.resolve_emulator(&request, Platform::Unknown).unwrap();
        assert!(resolved.descriptor.is_none());
        assert_eq!(resolved.profile, GENERIC_PROFILE);
    }

    #[test]
    fn forge_is_exclusive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = engine(tmp.path());
        let _held = BusyGuard::acquire(&engine.busy).unwrap();
        let request = ForgeRequest::new("G", "/r.iso", "/emu", tmp.path());
        let err = engine
            .forge(&request, &CancelToken::new(), &mut |_| {})
            .unwrap_err();
        assert_eq!(err, ForgeError::Busy);
    }

    #[test]
    fn cancelled_before_start_reports_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = engine(tmp.path());
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut events = 0;
        let request = ForgeRequest::new("G", "/r.iso", "/emu", tmp.path());
        let err = engine
            .forge(&request, &cancel, &mut |_| events += 1)
            .unwrap_err();
        assert_eq!(err, ForgeError::Cancelled);
        assert_eq!(events, 0);
    }
}
