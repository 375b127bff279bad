//! Persisted search history: every query the user has submitted

use crate::error::{Error, Result};
use crate::storage::HistorySlot;

/// Ordered list of past queries, written through to a [`HistorySlot`] on
/// every mutation. Duplicates are kept.
pub struct HistoryStore {
    entries: Vec<String>,
    slot: Box<dyn HistorySlot>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Read the slot once. A missing or unreadable payload yields an empty history.
    pub fn load(slot: impl HistorySlot + 'static) -> Self {
        let entries = match read_entries(&slot) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "starting with empty history");
                Vec::new()
            }
        };
        tracing::debug!(entries = entries.len(), "history loaded");
        Self {
            entries,
            slot: Box::new(slot),
        }
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Entry at `index`, if any
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry to the end. A failed write is logged; the entry stays in memory.
    pub fn append(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
        self.persist_logged();
    }

    /// Remove and return the entry at `index`.
    pub fn delete_at(&mut self, index: usize) -> Result<String> {
        if index >= self.entries.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        let removed = self.entries.remove(index);
        self.persist_logged();
        Ok(removed)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist_logged();
    }

    /// Write the full snapshot to the slot.
    pub fn persist(&self) -> Result<()> {
        let payload = serde_json::to_string(&self.entries)
            .map_err(|e| Error::StorageCorrupt(e.to_string()))?;
        self.slot.write(&payload)?;
        Ok(())
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            tracing::warn!(error = %e, "failed to persist history");
        }
    }
}

/// Decode the slot's payload. A slot that was never written is an empty history.
pub fn read_entries(slot: &dyn HistorySlot) -> Result<Vec<String>> {
    match slot.read()? {
        None => Ok(Vec::new()),
        Some(payload) if payload.trim().is_empty() => Ok(Vec::new()),
        Some(payload) => {
            serde_json::from_str(&payload).map_err(|e| Error::StorageCorrupt(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileSlot, MemorySlot};
    use std::io;

    struct FailingSlot;

    impl HistorySlot for FailingSlot {
        fn read(&self) -> io::Result<Option<String>> {
            Ok(None)
        }

        fn write(&self, _payload: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test]
    fn test_append_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut store = HistoryStore::load(FileSlot::new(&path));
        store.append("a");
        store.append("b");
        drop(store);

        let store = HistoryStore::load(FileSlot::new(&path));
        assert_eq!(store.entries(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_delete_then_append() {
        let slot = MemorySlot::new();
        let mut store = HistoryStore::load(slot.clone());
        store.append("a");
        store.append("b");
        store.append("c");

        assert_eq!(store.delete_at(1).unwrap(), "b");
        store.append("d");

        assert_eq!(store.entries(), &["a", "c", "d"]);
        assert_eq!(slot.payload().as_deref(), Some(r#"["a","c","d"]"#));
    }

    #[test]
    fn test_delete_out_of_range_leaves_entries() {
        let slot = MemorySlot::with_payload(r#"["a"]"#);
        let mut store = HistoryStore::load(slot.clone());

        assert!(matches!(
            store.delete_at(5),
            Err(Error::IndexOutOfRange { index: 5, len: 1 })
        ));
        assert_eq!(store.entries(), &["a"]);
        assert_eq!(slot.payload().as_deref(), Some(r#"["a"]"#));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut store = HistoryStore::load(MemorySlot::new());
        store.append("same");
        store.append("same");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_corrupt_payload_loads_empty() {
        let slot = MemorySlot::with_payload("{not a list");
        assert!(matches!(
            read_entries(&slot),
            Err(Error::StorageCorrupt(_))
        ));

        let mut store = HistoryStore::load(slot.clone());
        assert!(store.is_empty());

        store.append("fresh");
        assert_eq!(slot.payload().as_deref(), Some(r#"["fresh"]"#));
    }

    #[test]
    fn test_failed_write_keeps_memory_copy() {
        let mut store = HistoryStore::load(FailingSlot);
        store.append("kept");
        assert_eq!(store.entries(), &["kept"]);
        assert!(matches!(store.persist(), Err(Error::Io(_))));
    }

    #[test]
    fn test_clear_persists_empty_list() {
        let slot = MemorySlot::with_payload(r#"["a","b"]"#);
        let mut store = HistoryStore::load(slot.clone());
        assert_eq!(store.get(1), Some("b"));

        store.clear();
        assert!(store.is_empty());
        assert_eq!(slot.payload().as_deref(), Some("[]"));
    }
}
