//! JSON file persistence for [`MemoryStore`].
//!
//! The file is a pretty-printed array of `{id, time, message, importance,
//! current_importance}` objects in ranked order. Files written by older
//! versions (no `id`, naive timestamps) are still accepted.

use momo_core::clock::Clock;
use momo_core::error::MemoryError;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::item::{DecayCurve, MemoryItem};
use crate::store::MemoryStore;

impl MemoryStore {
    /// Load a store from `path`.
    ///
    /// A missing, empty, or unparseable file yields an empty store. Entries
    /// that cannot be read are skipped.
    pub fn load(path: &Path, capacity: usize, curve: DecayCurve, clock: Arc<dyn Clock>) -> Self {
        let items = read_items(path);
        let store = Self::from_items(items, capacity, curve, clock);
        debug!(path = %path.display(), count = store.len(), "Loaded memories");
        store
    }

    /// Rank, then write the whole store to `path`, creating parent directories.
    pub fn save(&mut self, path: &Path) -> Result<(), MemoryError> {
        self.rank();
        let items: Vec<&MemoryItem> = self.iter().collect();
        let content =
            serde_json::to_string_pretty(&items).map_err(|e| MemoryError::Encode(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write {}: {e}", path.display())))?;

        debug!(path = %path.display(), count = self.len(), "Saved memories");
        Ok(())
    }
}

fn read_items(path: &Path) -> Vec<MemoryItem> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read memory file, starting empty");
            return Vec::new();
        }
    };
    if content.trim().is_empty() {
        return Vec::new();
    }

    let entries: Vec<Value> = match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Memory file is corrupted, starting empty");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<MemoryItem>(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(index = i, error = %e, "Skipping unreadable memory entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use momo_core::clock::ManualClock;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::starting_now())
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::load(
            &dir.path().join("nope.json"),
            10,
            DecayCurve::weekly(),
            clock(),
        );
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "[{\"time\": ").unwrap();
        let store = MemoryStore::load(&path, 10, DecayCurve::weekly(), clock());
        assert!(store.is_empty());
    }

    #[test]
    fn save_then_load_keeps_items_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memory.json");
        let clock = clock();

        let mut store = MemoryStore::new(10, DecayCurve::weekly(), clock.clone());
        store.add("likes green tea", 0.0);
        clock.advance(Duration::hours(2));
        let cat = store.add("has a cat named Mochi", 1.0);
        store.save(&path).unwrap();

        let reloaded = MemoryStore::load(&path, 10, DecayCurve::weekly(), clock.clone());
        assert_eq!(reloaded.len(), 2);
        let first = reloaded.iter().next().unwrap();
        assert_eq!(first.id(), cat);
        assert_eq!(first.base_importance(), 2.0);

        let original: Vec<_> = store.iter().map(|m| (m.id().to_string(), m.time())).collect();
        let restored: Vec<_> = reloaded.iter().map(|m| (m.id().to_string(), m.time())).collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn saved_file_uses_expected_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let mut store = MemoryStore::new(10, DecayCurve::weekly(), clock());
        store.add("birthday is in May", 0.0);
        store.save(&path).unwrap();

        let raw: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0]["message"], "birthday is in May");
        assert_eq!(raw[0]["importance"], 1.0);
        assert!(raw[0]["time"].as_str().is_some());
    }

    #[test]
    fn legacy_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(
            &path,
            r#"[
                {"time": "2025-01-02T09:00:00.000001", "message": "prefers dark mode", "importance": 1.5},
                {"time": "2025-01-01T09:00:00", "message": "uses Arch"},
                {"message": "no time"},
                42
            ]"#,
        )
        .unwrap();

        let store = MemoryStore::load(&path, 10, DecayCurve::weekly(), clock());
        assert_eq!(store.len(), 2);
        let messages: Vec<&str> = store.iter().map(|m| m.message()).collect();
        assert_eq!(messages, vec!["prefers dark mode", "uses Arch"]);
        assert!(store.iter().all(|m| !m.id().is_empty()));
    }

    #[test]
    fn oversized_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let entries: Vec<Value> = (0..8)
            .map(|i| {
                serde_json::json!({
                    "time": "2025-06-01T10:00:00+00:00",
                    "message": format!("m{i}"),
                    "importance": 1.0 + i as f64,
                })
            })
            .collect();
        std::fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let at = chrono::DateTime::parse_from_rfc3339("2025-06-01T10:00:00+00:00")
            .unwrap()
            .with_timezone(&chrono::Local);
        let clock = Arc::new(ManualClock::new(at));
        let store = MemoryStore::load(&path, 3, DecayCurve::weekly(), clock);
        let kept: Vec<&str> = store.iter().map(|m| m.message()).collect();
        assert_eq!(kept, vec!["m7", "m6", "m5"]);
    }
}
