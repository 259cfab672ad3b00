//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};

use emuforge_core::manager::StoreError;
use emuforge_core::manager::fetch::FetchProgress;
use emuforge_core::{
    ArchiveFetcher, Bundler, CancelToken, EmulatorCatalog, EmulatorManager, FetchError,
    ForgeEngine, InstalledRecord, InstalledStore, ManagerOptions, MemoryStore, TargetOs,
};

/// An executable the bundler accepts as a native emulator binary.
pub fn fake_emulator(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, b"\x7fELF\x02\x01\x01\x00fake emulator").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

pub fn write_file(path: &Path, bytes: &[u8]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
    path.to_path_buf()
}

/// A zip holding `entries` as (path, contents).
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Serves fixed bytes for every URL, counting calls.
pub struct StaticFetcher {
    pub body: Vec<u8>,
    pub calls: Mutex<usize>,
}

impl StaticFetcher {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ArchiveFetcher for StaticFetcher {
    fn fetch(
        &self,
        _url: &str,
        dest: &mut File,
        cancel: &CancelToken,
        progress: &mut FetchProgress<'_>,
    ) -> Result<u64, FetchError> {
        *self.calls.lock().unwrap() += 1;
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        dest.write_all(&self.body)
            .map_err(|e| FetchError::Failed(e.to_string()))?;
        let len = self.body.len() as u64;
        progress(len, Some(len));
        Ok(len)
    }
}

/// Blocks inside `fetch` until released, so tests can overlap installs.
pub struct GatedFetcher {
    inner: StaticFetcher,
    state: Mutex<(bool, bool)>,
    signal: Condvar,
}

impl GatedFetcher {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            inner: StaticFetcher::new(body),
            state: Mutex::new((false, false)),
            signal: Condvar::new(),
        }
    }

    /// Wait until a fetch has started.
    pub fn wait_started(&self) {
        let mut state = self.state.lock().unwrap();
        while !state.0 {
            state = self.signal.wait(state).unwrap();
        }
    }

    pub fn release(&self) {
        self.state.lock().unwrap().1 = true;
        self.signal.notify_all();
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

impl ArchiveFetcher for GatedFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &mut File,
        cancel: &CancelToken,
        progress: &mut FetchProgress<'_>,
    ) -> Result<u64, FetchError> {
        {
            let mut state = self.state.lock().unwrap();
            state.0 = true;
            self.signal.notify_all();
            while !state.1 {
                state = self.signal.wait(state).unwrap();
            }
        }
        self.inner.fetch(url, dest, cancel, progress)
    }
}

/// Store that loads empty and refuses every write.
pub struct ReadOnlyStore;

impl InstalledStore for ReadOnlyStore {
    fn load(&self) -> Result<Vec<InstalledRecord>, StoreError> {
        Ok(Vec::new())
    }

    fn save(&self, _records: &[InstalledRecord]) -> Result<(), StoreError> {
        Err(StoreError::Io {
            path: PathBuf::from("installed.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

pub fn manager_with(base: &Path, os: TargetOs, fetcher: Arc<dyn ArchiveFetcher>) -> EmulatorManager {
    manager_with_store(base, os, fetcher, Box::new(MemoryStore::new()))
}

pub fn manager_with_store(
    base: &Path,
    os: TargetOs,
    fetcher: Arc<dyn ArchiveFetcher>,
    store: Box<dyn InstalledStore>,
) -> EmulatorManager {
    let mut options = ManagerOptions::new(base.join("emulators"));
    options.os = os;
    EmulatorManager::new(EmulatorCatalog::builtin(), options, store, fetcher)
}

/// Engine with no network and no launcher stub.
pub fn offline_engine(base: &Path) -> ForgeEngine {
    let manager = manager_with(
        base,
        TargetOs::host(),
        Arc::new(StaticFetcher::new(Vec::new())),
    );
    ForgeEngine::new(manager, Bundler::new(base.join("work"), None))
}

/// Names of the entries in `dir`, sorted.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
