//! Client-local key-value storage backing the persisted session.

use std::{
    collections::BTreeMap,
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures raised while opening file-backed storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage file exists but could not be read.
    #[error("failed to read session storage `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The storage file could not be written.
    #[error("failed to write session storage `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// String key-value storage shared by everything that touches the session.
///
/// Writes are last-writer-wins; implementations never fail on access, they
/// log and carry on.
pub trait KeyValueStore: Send + Sync {
    /// Value under `key`.
    fn get(&self, key: &str) -> Option<String>;
    /// Store `value` under `key`.
    fn set(&self, key: &str, value: &str);
    /// Delete `key`; a missing key is fine.
    fn remove(&self, key: &str);
}

/// Process-local storage that forgets everything on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Storage persisted as a flat JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: DashMap<String, String>,
    write_gate: Mutex<()>,
}

impl FileStore {
    /// Open the file at `path`. A missing file starts empty; an unreadable
    /// JSON document is discarded with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(map) => map.into_iter().collect(),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "session storage is corrupt; starting empty"
                    );
                    DashMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => DashMap::new(),
            Err(source) => return Err(StorageError::Read { path, source }),
        };

        Ok(Self {
            path,
            entries,
            write_gate: Mutex::new(()),
        })
    }

    /// File backing the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        let _gate = self.write_gate.lock();
        let snapshot = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect::<BTreeMap<_, _>>();

        if let Err(err) = write_atomically(&self.path, &snapshot) {
            warn!(error = %err, "failed to persist session storage");
        } else {
            debug!(path = %self.path.display(), keys = snapshot.len(), "session storage saved");
        }
    }
}

fn write_atomically(path: &Path, snapshot: &BTreeMap<String, String>) -> Result<(), StorageError> {
    let wrap = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    let body = serde_json::to_string_pretty(snapshot).map_err(|err| wrap(err.into()))?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, body).map_err(wrap)?;
    fs::rename(&tmp, path).map_err(wrap)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.persist();
    }

    fn remove(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.persist();
        }
    }
}
