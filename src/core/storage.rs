// RatioCrab - GPL-3.0-or-later
// This file is part of RatioCrab.
//
// Copyright (C) 2026 Daniel Freiermuth
//
// RatioCrab is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// RatioCrab is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with RatioCrab.  If not, see <https://www.gnu.org/licenses/>.

//! Key-value persistence providers for the learned history.

use anyhow::{bail, Context as _};
use fs2::FileExt;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Durable key-value store.
///
/// Implementations must fail (not corrupt anything) once their owning
/// context is gone, and report that through [`Storage::is_available`].
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;
    fn is_available(&self) -> bool;
}

/// In-process storage. Clones share the same map.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, Value>>>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            entries: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the owning context going away.
    pub fn invalidate(&self) {
        self.available.store(false, Ordering::SeqCst);
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        if !self.is_available() {
            bail!("Storage context invalidated");
        }
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        if !self.is_available() {
            bail!("Storage context invalidated");
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// Storage backed by a single JSON object file.
///
/// Every access takes a file lock, so several processes may share the file.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    closed: AtomicBool,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            closed: AtomicBool::new(false),
        }
    }

    /// Default location in the user's data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("ratiocrab").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Refuse all further access.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn read_entries(file: &mut File) -> anyhow::Result<IndexMap<String, Value>> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(IndexMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        if !self.is_available() {
            bail!("Storage {} is closed", self.path.display());
        }
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", self.path.display()))
            }
        };

        FileExt::lock_shared(&file)
            .with_context(|| format!("Failed to lock {}", self.path.display()))?;
        let entries = Self::read_entries(&mut file);
        FileExt::unlock(&file)?;

        let mut entries =
            entries.with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(entries.shift_remove(key))
    }

    fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        if !self.is_available() {
            bail!("Storage {} is closed", self.path.display());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        FileExt::lock_exclusive(&file)
            .with_context(|| format!("Failed to lock {}", self.path.display()))?;

        let result = (|| -> anyhow::Result<()> {
            let mut entries = Self::read_entries(&mut file)?;
            entries.insert(key.to_string(), value);
            let json = serde_json::to_string_pretty(&entries)?;
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(json.as_bytes())?;
            file.sync_data()?;
            Ok(())
        })();
        FileExt::unlock(&file)?;

        result.with_context(|| format!("Failed to write {}", self.path.display()))
    }

    fn is_available(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_roundtrip_and_invalidate() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").expect("available"), None);
        storage.set("k", json!([1, 2])).expect("available");

        let shared = storage.clone();
        assert_eq!(shared.get("k").expect("available"), Some(json!([1, 2])));

        storage.invalidate();
        assert!(!shared.is_available());
        assert!(shared.set("k", json!([])).is_err());
        assert!(shared.get("k").is_err());
    }

    #[test]
    fn test_file_storage_keeps_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("nested").join("storage.json"));

        assert_eq!(storage.get("learnedRatios").expect("readable"), None);
        storage.set("zeta", json!("first")).expect("writable");
        storage.set("learnedRatios", json!([{ "value": 1.5, "time": 1 }])).expect("writable");
        storage.set("zeta", json!("second")).expect("writable");

        let reopened = JsonFileStorage::new(storage.path());
        assert_eq!(reopened.get("zeta").expect("readable"), Some(json!("second")));
        assert_eq!(
            reopened.get("learnedRatios").expect("readable"),
            Some(json!([{ "value": 1.5, "time": 1 }]))
        );

        // insertion order is kept on disk
        let raw = std::fs::read_to_string(storage.path()).expect("file exists");
        let zeta = raw.find("zeta").expect("key present");
        let ratios = raw.find("learnedRatios").expect("key present");
        assert!(zeta < ratios);
    }

    #[test]
    fn test_file_storage_shrinking_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("storage.json"));
        storage.set("k", json!("a much longer value than the next one")).expect("writable");
        storage.set("k", json!("x")).expect("writable");
        assert_eq!(storage.get("k").expect("readable"), Some(json!("x")));
    }

    #[test]
    fn test_closed_file_storage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("storage.json"));
        storage.close();
        assert!(!storage.is_available());
        assert!(storage.set("k", json!(1)).is_err());
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{ not json").expect("writable");
        assert!(JsonFileStorage::new(&path).get("k").is_err());
    }
}
