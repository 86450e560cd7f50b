//! Time-bounded view cache
//!
//! Two independent slots, one for the first unfiltered list page and one for
//! the catalog tree. A slot holds an `Arc` payload and the instant it was
//! captured. Readers take the read lock only long enough to clone that pair;
//! rebuilds run with no lock held, so concurrent misses each rebuild and the
//! last writer wins. Writes elsewhere never invalidate a slot: a reader may
//! see data up to one TTL old.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::core::clock::Clock;
use crate::core::error::Result;
use crate::core::inventory::DevicePage;
use crate::core::tree::CategoryNode;

struct CacheEntry<T> {
    payload: Arc<T>,
    captured_at: Instant,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            payload: Arc::clone(&self.payload),
            captured_at: self.captured_at,
        }
    }
}

/// Counter snapshot of one slot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlotStats {
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: u64,
    /// Age of the cached entry, if any
    pub age_secs: Option<f64>,
}

/// Counter snapshot of both slots
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub list: SlotStats,
    pub tree: SlotStats,
}

/// One cached payload with its own TTL
pub struct CacheSlot<T> {
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> CacheSlot<T> {
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            clock,
            entry: RwLock::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached payload while fresh, otherwise rebuild and store it
    ///
    /// A failed rebuild is returned to the caller and the slot keeps
    /// whatever it held before.
    pub fn get_or_rebuild<F>(&self, rebuild: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let current = self
            .entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(entry) = current {
            let age = self.clock.now().saturating_duration_since(entry.captured_at);
            if age < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(slot = self.name, age_ms = age.as_millis() as u64, "view cache hit");
                return Ok(entry.payload);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(slot = self.name, "view cache miss; rebuilding");
        let payload = Arc::new(rebuild()?);

        let fresh = CacheEntry {
            payload: Arc::clone(&payload),
            captured_at: self.clock.now(),
        };
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = Some(fresh);
        Ok(payload)
    }

    pub fn stats(&self) -> SlotStats {
        let age_secs = self
            .entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|e| {
                self.clock
                    .now()
                    .saturating_duration_since(e.captured_at)
                    .as_secs_f64()
            });
        SlotStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_secs: self.ttl.as_secs(),
            age_secs,
        }
    }
}

/// The two inventory view slots
pub struct InventoryViewCache {
    pub(crate) list: CacheSlot<DevicePage>,
    pub(crate) tree: CacheSlot<Vec<CategoryNode>>,
}

impl InventoryViewCache {
    pub fn new(list_ttl: Duration, tree_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            list: CacheSlot::new("list", list_ttl, Arc::clone(&clock)),
            tree: CacheSlot::new("tree", tree_ttl, clock),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            list: self.list.stats(),
            tree: self.tree.stats(),
        }
    }
}
