// src/watch.rs
//
// Watched-variable samples peer (SPEC_FULL.md §3/§4.6 addition). Uniform
// treatment across all watch kinds: append to a per-name bounded ring, no
// further interpretation.

use std::collections::HashMap;
use std::time::Duration;

use dusa_collection_utils::core::errors::{ErrorArrayItem, Errors};
use dusa_collection_utils::core::types::rwarc::LockWithTimeout;
use serde::{Deserialize, Serialize};

use crate::ring::CircularBuffer;

const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WatchKind {
    Simple,
    Sync,
    Counter,
    Chan,
    Func,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSample {
    pub name: String,
    pub tags: Vec<String>,
    pub ts: u64,
    pub kind: WatchKind,
    pub value: String,
    pub fully_serializable: bool,
    pub length: Option<u64>,
    pub cap: Option<u64>,
    pub waiting: Option<u64>,
    pub addr: Option<String>,
    pub error: Option<String>,
}

struct Inner {
    rings: HashMap<String, CircularBuffer<WatchSample>>,
}

/// Owns, per watched variable name, a bounded ring of recent samples.
pub struct WatchPeer {
    inner: LockWithTimeout<Inner>,
    ring_capacity: u64,
}

impl WatchPeer {
    pub fn new(ring_capacity: u64) -> Self {
        WatchPeer {
            inner: LockWithTimeout::new(Inner {
                rings: HashMap::new(),
            }),
            ring_capacity,
        }
    }

    pub async fn process_watch_sample(&self, sample: WatchSample) -> Result<(), ErrorArrayItem> {
        let mut inner = self
            .inner
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        let ring_capacity = self.ring_capacity;
        let ring = inner
            .rings
            .entry(sample.name.clone())
            .or_insert_with(|| CircularBuffer::new(ring_capacity as usize));
        let next_idx = ring.last_index().map(|i| i + 1).unwrap_or(0);
        ring.write_at(next_idx, sample);
        Ok(())
    }

    pub async fn get_since(&self, name: &str, ts: u64) -> Result<Vec<WatchSample>, ErrorArrayItem> {
        let inner = self
            .inner
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        Ok(inner
            .rings
            .get(name)
            .map(|r| r.get_all().0.into_iter().filter(|s| s.ts > ts).collect())
            .unwrap_or_default())
    }

    pub async fn get_latest(&self, name: &str) -> Option<WatchSample> {
        let inner = self.inner.try_read_with_timeout(Some(LOCK_TIMEOUT)).await.ok()?;
        inner.rings.get(name).and_then(|r| r.get_last())
    }

    pub async fn names(&self) -> Vec<String> {
        self.inner
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map(|inner| inner.rings.keys().cloned().collect())
            .unwrap_or_default()
    }
}
