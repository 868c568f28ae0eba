//! In-memory cache of live storage backends, keyed by engine id.
//!
//! The cache mirrors the active rows of `storage_engines`: every active
//! engine that could be constructed has an entry holding the engine
//! snapshot and its backend instance. Backends are built before the write
//! lock is taken, so no network or filesystem I/O ever runs under it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use imghost_core::result::AppResult;
use imghost_core::traits::storage::StorageBackend;
use imghost_entity::engine::StorageEngine;

use crate::factory::BackendFactory;

#[derive(Debug, Clone)]
struct CacheEntry {
    engine: StorageEngine,
    backend: Arc<dyn StorageBackend>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<i64, CacheEntry>,
    default_id: Option<i64>,
}

/// Summary of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub count: usize,
    pub default_engine_id: Option<i64>,
    pub engine_ids: Vec<i64>,
    pub engine_types: HashMap<i64, String>,
}

/// Shared handle to the backend cache.
#[derive(Debug, Clone)]
pub struct EngineCache {
    state: Arc<RwLock<CacheState>>,
    factory: Arc<BackendFactory>,
}

impl EngineCache {
    /// Create an empty cache that builds backends with `factory`.
    pub fn new(factory: Arc<BackendFactory>) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            factory,
        }
    }

    pub fn factory(&self) -> &Arc<BackendFactory> {
        &self.factory
    }

    fn build(&self, engine: &StorageEngine) -> AppResult<Arc<dyn StorageBackend>> {
        self.factory.create(&engine.engine_type, &engine.config.0)
    }

    /// Replace the cache contents with `engines`.
    ///
    /// Inactive engines are skipped. Engines whose backend cannot be built are
    /// logged and skipped so one broken engine does not block startup.
    pub async fn initialize(&self, engines: Vec<StorageEngine>) {
        let mut entries = HashMap::new();
        let mut default_id = None;
        let mut failed = 0usize;

        for engine in engines.into_iter().filter(|e| e.is_active) {
            match self.build(&engine) {
                Ok(backend) => {
                    if engine.is_default {
                        default_id = Some(engine.id);
                    }
                    entries.insert(engine.id, CacheEntry { engine, backend });
                }
                Err(e) => {
                    failed += 1;
                    warn!(
                        engine_id = engine.id,
                        engine = %engine.name,
                        engine_type = %engine.engine_type,
                        error = %e,
                        "Failed to load storage engine"
                    );
                }
            }
        }

        let mut state = self.state.write().await;
        state.entries = entries;
        state.default_id = default_id;
        info!(
            loaded = state.entries.len(),
            failed,
            default_engine_id = ?state.default_id,
            "Storage engine cache initialized"
        );
    }

    /// Build and insert a backend for `engine`.
    pub async fn add(&self, engine: StorageEngine) -> AppResult<()> {
        let backend = self.build(&engine)?;
        let id = engine.id;
        let is_default = engine.is_default;

        let mut state = self.state.write().await;
        state.entries.insert(id, CacheEntry { engine, backend });
        if is_default {
            state.default_id = Some(id);
        }
        info!(engine_id = id, "Storage engine added to cache");
        Ok(())
    }

    /// Rebuild the entry for `engine` after its record changed.
    ///
    /// Inactive engines are evicted. If the new backend cannot be built the
    /// old entry is evicted as well and the error is returned.
    pub async fn update(&self, engine: StorageEngine) -> AppResult<()> {
        let id = engine.id;
        let built = if engine.is_active {
            Some(self.build(&engine))
        } else {
            None
        };

        let mut state = self.state.write().await;
        state.entries.remove(&id);

        match built {
            Some(Ok(backend)) => {
                let is_default = engine.is_default;
                state.entries.insert(id, CacheEntry { engine, backend });
                if is_default {
                    state.default_id = Some(id);
                } else if state.default_id == Some(id) {
                    state.default_id = None;
                }
                info!(engine_id = id, "Storage engine refreshed in cache");
                Ok(())
            }
            Some(Err(e)) => {
                if state.default_id == Some(id) {
                    state.default_id = None;
                }
                Err(e)
            }
            None => {
                if state.default_id == Some(id) {
                    state.default_id = None;
                }
                info!(engine_id = id, "Inactive storage engine evicted from cache");
                Ok(())
            }
        }
    }

    /// Evict an engine. Returns whether it was cached.
    pub async fn delete(&self, id: i64) -> bool {
        let mut state = self.state.write().await;
        let removed = state.entries.remove(&id).is_some();
        if state.default_id == Some(id) {
            state.default_id = None;
        }
        removed
    }

    /// Make `id` the default. The engine does not have to be cached.
    pub async fn set_default(&self, id: i64) {
        let mut state = self.state.write().await;
        for (entry_id, entry) in state.entries.iter_mut() {
            entry.engine.is_default = *entry_id == id;
        }
        state.default_id = Some(id);
    }

    pub async fn get(&self, id: i64) -> Option<Arc<dyn StorageBackend>> {
        let state = self.state.read().await;
        state.entries.get(&id).map(|e| Arc::clone(&e.backend))
    }

    pub async fn get_engine(&self, id: i64) -> Option<StorageEngine> {
        let state = self.state.read().await;
        state.entries.get(&id).map(|e| e.engine.clone())
    }

    pub async fn get_default(&self) -> Option<Arc<dyn StorageBackend>> {
        let state = self.state.read().await;
        state
            .default_id
            .and_then(|id| state.entries.get(&id))
            .map(|e| Arc::clone(&e.backend))
    }

    pub async fn get_default_engine(&self) -> Option<StorageEngine> {
        let state = self.state.read().await;
        state
            .default_id
            .and_then(|id| state.entries.get(&id))
            .map(|e| e.engine.clone())
    }

    pub async fn default_engine_id(&self) -> Option<i64> {
        self.state.read().await.default_id
    }

    pub async fn exists(&self, id: i64) -> bool {
        self.state.read().await.entries.contains_key(&id)
    }

    /// Snapshot of all cached backends.
    pub async fn get_all(&self) -> HashMap<i64, Arc<dyn StorageBackend>> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .map(|(id, e)| (*id, Arc::clone(&e.backend)))
            .collect()
    }

    /// Snapshot of all cached engine records, ordered by id.
    pub async fn get_all_engines(&self) -> Vec<StorageEngine> {
        let state = self.state.read().await;
        let mut engines: Vec<StorageEngine> =
            state.entries.values().map(|e| e.engine.clone()).collect();
        engines.sort_by_key(|e| e.id);
        engines
    }

    pub async fn info(&self) -> CacheInfo {
        let state = self.state.read().await;
        let mut engine_ids: Vec<i64> = state.entries.keys().copied().collect();
        engine_ids.sort_unstable();
        CacheInfo {
            count: state.entries.len(),
            default_engine_id: state.default_id,
            engine_ids,
            engine_types: state
                .entries
                .iter()
                .map(|(id, e)| (*id, e.engine.engine_type.clone()))
                .collect(),
        }
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.default_id = None;
    }
}
