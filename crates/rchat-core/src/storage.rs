//! Durable storage slots for the history payload

use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A single named location holding one text payload.
pub trait HistorySlot: Send + Sync {
    /// Read the payload. `Ok(None)` when nothing has been written yet.
    fn read(&self) -> io::Result<Option<String>>;

    /// Replace the payload.
    fn write(&self, payload: &str) -> io::Result<()>;
}

/// Default history file: `<data_local_dir>/rchat/history.json`
pub fn default_history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("rchat").join("history.json"))
}

/// A slot backed by a file on disk.
///
/// Writes go to a temporary sibling which is then renamed over the target,
/// so readers see either the previous payload or the new one.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl HistorySlot for FileSlot {
    fn read(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, payload: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let temp = self.temp_path();
        std::fs::write(&temp, payload)?;
        std::fs::rename(&temp, &self.path)
    }
}

/// An in-process slot. Clones share the same payload.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    payload: Arc<Mutex<Option<String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that already holds `payload`
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Arc::new(Mutex::new(Some(payload.into()))),
        }
    }

    /// Current payload
    pub fn payload(&self) -> Option<String> {
        self.payload.lock().clone()
    }
}

impl HistorySlot for MemorySlot {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.payload.lock().clone())
    }

    fn write(&self, payload: &str) -> io::Result<()> {
        *self.payload.lock() = Some(payload.to_string());
        Ok(())
    }
}
