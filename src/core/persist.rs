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

//! Debounced write-behind of a single storage key.
//!
//! Every [`DebouncedWriter::schedule`] cancels the write still waiting and
//! starts a new quiet period, so bursts of mutations end in one write of the
//! latest value.

use super::storage::Storage;
use anyhow::Context as _;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub struct DebouncedWriter {
    storage: Arc<dyn Storage>,
    key: String,
    delay: Duration,
    runtime: Handle,
    pending: Option<JoinHandle<()>>,
}

impl DebouncedWriter {
    /// Create a writer bound to the current tokio runtime.
    pub fn new(
        storage: Arc<dyn Storage>,
        key: impl Into<String>,
        delay: Duration,
    ) -> anyhow::Result<Self> {
        let runtime = Handle::try_current().context("Debounced writer needs a tokio runtime")?;
        Ok(Self {
            storage,
            key: key.into(),
            delay,
            runtime,
            pending: None,
        })
    }

    /// Whether a write is still waiting for its quiet period to end.
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Write `value` once no further call arrives within the delay.
    pub fn schedule(&mut self, value: Value) {
        self.cancel();

        let storage = Arc::clone(&self.storage);
        let key = self.key.clone();
        let delay = self.delay;
        self.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // File storages lock and write synchronously
            let write = tokio::task::spawn_blocking(move || {
                write_through(storage.as_ref(), &key, value);
            });
            if let Err(e) = write.await {
                tracing::warn!("Save task failed: {e}");
            }
        }));
    }

    /// Drop the waiting write, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Cancel the waiting write and store `value` right away.
    pub fn flush(&mut self, value: Value) {
        self.cancel();
        write_through(self.storage.as_ref(), &self.key, value);
    }
}

impl Drop for DebouncedWriter {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Store `value`, skipping silently when the storage has gone away.
fn write_through(storage: &dyn Storage, key: &str, value: Value) {
    if !storage.is_available() {
        tracing::info!("Storage context invalidated, skipping save of {key}");
        return;
    }
    match storage.set(key, value) {
        Ok(()) => tracing::debug!("Saved {key}"),
        Err(e) => tracing::warn!("Storage error while saving {key}: {e:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStorage;
    use serde_json::json;

    const DELAY: Duration = Duration::from_millis(1_000);

    fn writer(storage: &MemoryStorage) -> DebouncedWriter {
        DebouncedWriter::new(Arc::new(storage.clone()), "learnedRatios", DELAY).expect("runtime")
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_happens_after_quiet_period() {
        let storage = MemoryStorage::new();
        let mut writer = writer(&storage);

        writer.schedule(json!([1]));
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(storage.get("learnedRatios").expect("available"), None);
        assert!(writer.has_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(storage.get("learnedRatios").expect("available"), Some(json!([1])));
        assert!(!writer.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_cancels_previous() {
        let storage = MemoryStorage::new();
        let mut writer = writer(&storage);

        writer.schedule(json!([1]));
        tokio::time::sleep(Duration::from_millis(600)).await;
        writer.schedule(json!([1, 2]));
        tokio::time::sleep(Duration::from_millis(600)).await;
        // first deadline passed, but it was cancelled
        assert_eq!(storage.get("learnedRatios").expect("available"), None);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(storage.get("learnedRatios").expect("available"), Some(json!([1, 2])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_storage_is_skipped() {
        let storage = MemoryStorage::new();
        let mut writer = writer(&storage);

        writer.schedule(json!([1]));
        storage.invalidate();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(!writer.has_pending());

        writer.flush(json!([2]));
        assert!(storage.get("learnedRatios").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_write_reaches_file_storage() {
        use crate::core::storage::JsonFileStorage;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.json");
        let mut writer =
            DebouncedWriter::new(Arc::new(JsonFileStorage::new(&path)), "learnedRatios", DELAY)
                .expect("runtime");

        writer.schedule(json!([4, 5]));
        tokio::time::sleep(Duration::from_millis(1_001)).await;
        while writer.has_pending() {
            tokio::task::yield_now().await;
        }

        let reader = JsonFileStorage::new(&path);
        assert_eq!(reader.get("learnedRatios").expect("readable"), Some(json!([4, 5])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_immediately() {
        let storage = MemoryStorage::new();
        let mut writer = writer(&storage);

        writer.schedule(json!([1]));
        writer.flush(json!([1, 2, 3]));
        assert!(!writer.has_pending());
        assert_eq!(storage.get("learnedRatios").expect("available"), Some(json!([1, 2, 3])));

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(storage.get("learnedRatios").expect("available"), Some(json!([1, 2, 3])));
    }
}
