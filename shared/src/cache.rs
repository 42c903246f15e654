//! Content-addressed persistent cache: fingerprint -> evaluation record,
//! serialized as one JSON blob.
//!
//! The unit of durability is the whole index; `save` replaces the backing
//! file atomically so a crash never corrupts the last successful save. A
//! missing or unreadable blob degrades to an empty index, never an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::dto::EvaluationRecord;
use crate::error::{EvalError, Result};

pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheIndex {
    pub version: u32,
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
    #[serde(default)]
    pub items: BTreeMap<String, EvaluationRecord>,
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            meta: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }
}

/// In-memory index plus the single backing file. All mutation goes through
/// the mutex, which gives concurrent batch tasks single-writer discipline.
pub struct CacheStore {
    path: PathBuf,
    index: Mutex<CacheIndex>,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: Mutex::new(CacheIndex::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebuild the in-memory index from the last persisted blob. Corruption
    /// is treated as "start empty".
    pub async fn load(&self) {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<CacheIndex>(&bytes) {
                Ok(index) => {
                    debug!(items = index.items.len(), "cache loaded");
                    *self.index.lock() = index;
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "cache blob unreadable; starting empty");
                    *self.index.lock() = CacheIndex::default();
                }
            },
            Err(_) => {
                debug!(path = %self.path.display(), "no cache blob; starting empty");
                *self.index.lock() = CacheIndex::default();
            }
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<EvaluationRecord> {
        self.index.lock().items.get(fingerprint).cloned()
    }

    /// Insert or replace the record for a fingerprint. At most one record
    /// per fingerprint ever exists.
    pub fn set(&self, fingerprint: &str, record: EvaluationRecord) {
        self.index.lock().items.insert(fingerprint.into(), record);
    }

    pub fn len(&self) -> usize {
        self.index.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.lock().items.is_empty()
    }

    /// Snapshot of all records, ordered by fingerprint.
    pub fn records(&self) -> Vec<EvaluationRecord> {
        self.index.lock().items.values().cloned().collect()
    }

    pub fn clear(&self) {
        let mut index = self.index.lock();
        index.items.clear();
        index.meta.clear();
    }

    pub fn set_meta(&self, key: &str, value: Value) {
        self.index.lock().meta.insert(key.into(), value);
    }

    pub fn get_meta(&self, key: &str) -> Option<Value> {
        self.index.lock().meta.get(key).cloned()
    }

    /// Serialize the whole index and atomically replace the backing file.
    pub async fn save(&self) -> Result<()> {
        let body = {
            let index = self.index.lock();
            serde_json::to_vec_pretty(&*index)
                .map_err(|e| EvalError::Persistence(e.to_string()))?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| EvalError::Persistence(e.to_string()))?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| EvalError::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| EvalError::Persistence(e.to_string()))?;
        debug!(path = %self.path.display(), "cache saved");
        Ok(())
    }
}
