//! Emulator installation manager.
//!
//! Owns the set of installed emulators. An install is all-or-nothing: the
//! archive is downloaded and unpacked under `<base>/.partial-<id>`, and only a
//! fully verified tree is moved to `<base>/<id>` and recorded.
//!
//! One install runs at a time. A second request for the same emulator waits
//! for the first and shares its result; a request for a different emulator
//! fails with [`ForgeError::Busy`].

pub mod extract;
pub mod fetch;
pub mod store;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, RwLock};

use chrono::Utc;
use tracing::{debug, info, warn};

use emuforge_shared::{TargetOs, is_safe_emulator_id};

use crate::cancel::CancelToken;
use crate::catalog::{EmulatorCatalog, EmulatorDescriptor};
use crate::error::{ForgeError, ForgeResult};
use crate::progress::{InstallProgress, InstallReporter, InstallStage};

pub use fetch::{ArchiveFetcher, FetchError, HttpFetcher};
pub use store::{InstalledRecord, InstalledStore, JsonFileStore, MemoryStore, StoreError};

/// Where and for which OS emulators are installed.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub base_dir: PathBuf,
    pub os: TargetOs,
}

impl ManagerOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            os: TargetOs::host(),
        }
    }
}

/// Result slot shared by every caller of one install.
#[derive(Default)]
struct Flight {
    result: Mutex<Option<ForgeResult<PathBuf>>>,
    done: Condvar,
}

impl Flight {
    fn finish(&self, result: ForgeResult<PathBuf>) {
        let mut slot = self.result.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(result);
        }
        self.done.notify_all();
    }

    fn wait(&self) -> ForgeResult<PathBuf> {
        let mut slot = self.result.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            slot = self.done.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
    }
}

/// Releases the in-flight slot even if the install unwinds.
struct FlightGuard<'a> {
    slot: &'a Mutex<Option<(String, Arc<Flight>)>>,
    flight: Arc<Flight>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.finish(Err(ForgeError::IoFailure {
            context: "install".to_string(),
            message: "install aborted".to_string(),
        }));
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

pub struct EmulatorManager {
    catalog: EmulatorCatalog,
    options: ManagerOptions,
    store: Box<dyn InstalledStore>,
    fetcher: Arc<dyn ArchiveFetcher>,
    records: RwLock<Vec<InstalledRecord>>,
    in_flight: Mutex<Option<(String, Arc<Flight>)>>,
}

impl EmulatorManager {
    /// Create a manager, loading the persisted record set.
    ///
    /// A corrupt record file is logged and treated as empty; it is rewritten
    /// on the next successful install.
    pub fn new(
        catalog: EmulatorCatalog,
        options: ManagerOptions,
        store: Box<dyn InstalledStore>,
        fetcher: Arc<dyn ArchiveFetcher>,
    ) -> Self {
        let records = store.load().unwrap_or_else(|e| {
            warn!("Ignoring unreadable installed emulator records: {}", e);
            Vec::new()
        });
        debug!("Loaded {} installed emulator record(s)", records.len());
        Self {
            catalog,
            options,
            store,
            fetcher,
            records: RwLock::new(records),
            in_flight: Mutex::new(None),
        }
    }

    pub fn catalog(&self) -> &EmulatorCatalog {
        &self.catalog
    }

    pub fn base_dir(&self) -> &Path {
        &self.options.base_dir
    }

    /// Ids of installed emulators, in install order.
    pub fn list_installed(&self) -> Vec<String> {
        self.read_records().iter().map(|r| r.id.clone()).collect()
    }

    pub fn records(&self) -> Vec<InstalledRecord> {
        self.read_records().clone()
    }

    pub fn record(&self, id: &str) -> Option<InstalledRecord> {
        self.read_records().iter().find(|r| r.id == id).cloned()
    }

    /// The record whose install directory contains `binary`.
    pub fn record_for_binary(&self, binary: &Path) -> Option<InstalledRecord> {
        let binary = fs::canonicalize(binary).unwrap_or_else(|_| binary.to_path_buf());
        self.read_records()
            .iter()
            .find(|r| {
                let dir = fs::canonicalize(&r.install_dir).unwrap_or_else(|_| r.install_dir.clone());
                binary.starts_with(&dir)
            })
            .cloned()
    }

    /// Binary path of an installed emulator, checked on disk.
    ///
    /// A record whose files were removed externally is not repaired here;
    /// call [`install`](Self::install) again to re-download.
    pub fn installed_binary(&self, id: &str) -> ForgeResult<PathBuf> {
        let record = self
            .record(id)
            .ok_or_else(|| ForgeError::UnknownEmulator(id.to_string()))?;
        if record.binary_path.is_file() {
            Ok(record.binary_path)
        } else {
            Err(ForgeError::BinaryNotFound {
                id: id.to_string(),
                path: record.binary_path.display().to_string(),
            })
        }
    }

    /// Install an emulator and return its absolute binary path.
    ///
    /// Idempotent: an intact existing install is returned without downloading.
    pub fn install(
        &self,
        id: &str,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(InstallProgress),
    ) -> ForgeResult<PathBuf> {
        let mut reporter = InstallReporter::new(on_progress);
        self.install_reporting(id, cancel, &mut reporter)
    }

    /// [`install`](Self::install) reporting through a caller-owned reporter.
    ///
    /// A caller that joins an in-flight install receives no progress.
    pub fn install_reporting(
        &self,
        id: &str,
        cancel: &CancelToken,
        reporter: &mut InstallReporter<'_>,
    ) -> ForgeResult<PathBuf> {
        let descriptor = self
            .catalog
            .by_id(id)
            .ok_or_else(|| ForgeError::UnknownEmulator(id.to_string()))?;

        let flight = {
            let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some((current, flight)) if current == id => {
                    let flight = Arc::clone(flight);
                    drop(slot);
                    debug!("Joining in-flight install of {}", id);
                    return flight.wait();
                }
                Some((current, _)) => {
                    debug!("Refusing install of {} while {} is in flight", id, current);
                    return Err(ForgeError::Busy);
                }
                None => {
                    let flight = Arc::new(Flight::default());
                    *slot = Some((id.to_string(), Arc::clone(&flight)));
                    flight
                }
            }
        };
        let guard = FlightGuard {
            slot: &self.in_flight,
            flight,
        };

        let result = self.install_exclusive(descriptor, cancel, reporter);
        guard.flight.finish(result.clone());
        drop(guard);
        result
    }

    fn install_exclusive(
        &self,
        descriptor: &EmulatorDescriptor,
        cancel: &CancelToken,
        reporter: &mut InstallReporter<'_>,
    ) -> ForgeResult<PathBuf> {
        let id = descriptor.id;

        if let Some(existing) = self.record(id) {
            if existing.binary_path.is_file() {
                info!("{} already installed at {}", id, existing.binary_path.display());
                reporter.stage(InstallStage::Done, format!("{} is already installed", id));
                return Ok(existing.binary_path);
            }
            warn!(
                "Installed record for {} points at missing {}; reinstalling",
                id,
                existing.binary_path.display()
            );
            self.remove_record(id)?;
        }

        if !is_safe_emulator_id(id) {
            return Err(ForgeError::UnknownEmulator(id.to_string()));
        }

        let source = descriptor.source_for(self.options.os).ok_or_else(|| {
            ForgeError::DownloadFailed {
                id: id.to_string(),
                reason: format!("no download source for {}", self.options.os),
            }
        })?;

        let partial = self.options.base_dir.join(format!(".partial-{id}"));
        let result = self.download_and_unpack(descriptor, source, &partial, cancel, reporter);
        if let Err(e) = remove_dir_if_present(&partial) {
            warn!("Failed to clean up {}: {}", partial.display(), e);
        }
        let binary = result?;

        reporter.stage(InstallStage::Recording, format!("Recording {}", id));
        let install_dir = self.options.base_dir.join(id);
        let record = InstalledRecord {
            id: id.to_string(),
            install_dir: absolute(&install_dir),
            binary_path: absolute(&binary),
            installed_at: Utc::now(),
        };
        if let Err(e) = self.add_record(record.clone()) {
            if let Err(cleanup) = remove_dir_if_present(&install_dir) {
                warn!("Failed to remove unrecorded {}: {}", install_dir.display(), cleanup);
            }
            return Err(e);
        }

        info!("Installed {} at {}", id, record.binary_path.display());
        reporter.stage(InstallStage::Done, format!("{} installed", descriptor.display_name));
        Ok(record.binary_path)
    }

    /// Everything up to and including the final move into `<base>/<id>`.
    ///
    /// The caller removes `partial` afterwards, whatever the outcome.
    fn download_and_unpack(
        &self,
        descriptor: &EmulatorDescriptor,
        source: &crate::catalog::DownloadSource,
        partial: &Path,
        cancel: &CancelToken,
        reporter: &mut InstallReporter<'_>,
    ) -> ForgeResult<PathBuf> {
        let id = descriptor.id;
        let download_failed = |reason: String| ForgeError::DownloadFailed {
            id: id.to_string(),
            reason,
        };
        let extraction_failed = |reason: String| ForgeError::ExtractionFailed {
            id: id.to_string(),
            reason,
        };

        remove_dir_if_present(partial)
            .map_err(|e| ForgeError::io(format!("clearing {}", partial.display()), e))?;
        fs::create_dir_all(partial)
            .map_err(|e| ForgeError::io(format!("creating {}", partial.display()), e))?;

        // Download
        cancel.checkpoint()?;
        reporter.stage(
            InstallStage::Downloading,
            format!("Downloading {} from {}", descriptor.display_name, source.url),
        );
        let archive = partial.join("download");
        let mut file = fs::File::create(&archive)
            .map_err(|e| ForgeError::io(format!("creating {}", archive.display()), e))?;
        let mut on_bytes = |received: u64, total: Option<u64>| {
            reporter.report(InstallProgress {
                stage: InstallStage::Downloading,
                message: format!("Downloading {}", descriptor.display_name),
                bytes_received: Some(received),
                bytes_total: total,
            });
        };
        let size = self
            .fetcher
            .fetch(source.url, &mut file, cancel, &mut on_bytes)
            .map_err(|e| match e {
                FetchError::Cancelled => ForgeError::Cancelled,
                FetchError::Failed(reason) => download_failed(reason),
            })?;
        drop(file);

        // Verify
        cancel.checkpoint()?;
        reporter.stage(InstallStage::Verifying, format!("Verifying {} download", id));
        if size == 0 {
            return Err(download_failed("downloaded archive is empty".to_string()));
        }
        let header = extract::read_header(&archive)
            .map_err(|e| download_failed(format!("cannot read download: {e}")))?;
        if header.is_empty() {
            return Err(download_failed("downloaded archive is empty".to_string()));
        }
        extract::verify_kind(&header, source.kind).map_err(extraction_failed)?;

        // Extract
        cancel.checkpoint()?;
        reporter.stage(InstallStage::Extracting, format!("Extracting {}", source.kind));
        let tree = partial.join("install");
        extract::unpack(&archive, source.kind, &tree, source.binary).map_err(extraction_failed)?;
        cancel.checkpoint()?;

        // Locate
        reporter.stage(InstallStage::Locating, format!("Locating {}", source.binary));
        let found = extract::locate_binary(&tree, source.binary).ok_or_else(|| {
            ForgeError::BinaryNotFound {
                id: id.to_string(),
                path: source.binary.to_string(),
            }
        })?;
        extract::make_executable(&found)
            .map_err(|e| ForgeError::io(format!("marking {} executable", found.display()), e))?;
        let relative = found
            .strip_prefix(&tree)
            .map(Path::to_path_buf)
            .map_err(|e| ForgeError::io("resolving binary path", e))?;

        descriptor.profile.write_config_files(&tree)?;

        cancel.checkpoint()?;
        let install_dir = self.options.base_dir.join(id);
        remove_dir_if_present(&install_dir)
            .map_err(|e| ForgeError::io(format!("replacing {}", install_dir.display()), e))?;
        fs::rename(&tree, &install_dir)
            .map_err(|e| ForgeError::io(format!("moving install to {}", install_dir.display()), e))?;

        Ok(install_dir.join(relative))
    }

    fn read_records(&self) -> std::sync::RwLockReadGuard<'_, Vec<InstalledRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn add_record(&self, record: InstalledRecord) -> ForgeResult<()> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let mut next = records.clone();
        next.retain(|r| r.id != record.id);
        next.push(record);
        self.store
            .save(&next)
            .map_err(|e| ForgeError::io("saving installed emulators", e))?;
        *records = next;
        Ok(())
    }

    fn remove_record(&self, id: &str) -> ForgeResult<()> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let mut next = records.clone();
        next.retain(|r| r.id != id);
        self.store
            .save(&next)
            .map_err(|e| ForgeError::io("saving installed emulators", e))?;
        *records = next;
        Ok(())
    }
}

fn remove_dir_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
