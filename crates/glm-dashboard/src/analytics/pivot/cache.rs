use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use super::table::AggregationResult;
use crate::analytics::dataset::DatasetVersion;
use crate::analytics::filter::FilterSpec;
use crate::analytics::request::AggregationRequest;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    filter: String,
    request: String,
}

#[derive(Debug, Default)]
struct CacheState {
    dataset_version: Option<u64>,
    entries: HashMap<CacheKey, Arc<AggregationResult>>,
}

/// Hit/miss counters for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Memoizes pivot results per dataset version and serialized filter + request.
///
/// Entries recorded against another dataset version are dropped on the next
/// access; when the table fills up it is cleared wholesale.
#[derive(Debug)]
pub struct PivotCache {
    capacity: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for PivotCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl PivotCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get_or_compute<F>(
        &self,
        version: DatasetVersion,
        filter: &FilterSpec,
        request: &AggregationRequest,
        compute: F,
    ) -> Arc<AggregationResult>
    where
        F: FnOnce() -> AggregationResult,
    {
        let key = match cache_key(filter, request) {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "pivot request is not cacheable; computing directly");
                return Arc::new(compute());
            }
        };

        {
            let mut state = self.lock();
            if state.dataset_version != Some(version.id) {
                if !state.entries.is_empty() {
                    debug!(
                        previous = ?state.dataset_version,
                        current = version.id,
                        "dataset version changed; dropping cached pivots"
                    );
                }
                state.entries.clear();
                state.dataset_version = Some(version.id);
            }
            if let Some(hit) = state.entries.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(rows = ?request.rows(), columns = ?request.columns(), "pivot cache hit");
                return Arc::clone(hit);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(rows = ?request.rows(), columns = ?request.columns(), "pivot cache miss");
        let result = Arc::new(compute());

        if self.capacity > 0 {
            let mut state = self.lock();
            if state.dataset_version == Some(version.id) {
                if state.entries.len() >= self.capacity {
                    debug!(capacity = self.capacity, "pivot cache full; clearing");
                    state.entries.clear();
                }
                state.entries.insert(key, Arc::clone(&result));
            }
        }

        result
    }

    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.dataset_version = None;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lock().entries.len(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cache_key(
    filter: &FilterSpec,
    request: &AggregationRequest,
) -> Result<CacheKey, serde_json::Error> {
    Ok(CacheKey {
        filter: serde_json::to_string(filter)?,
        request: serde_json::to_string(request)?,
    })
}
