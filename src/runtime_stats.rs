// src/runtime_stats.rs
//
// Runtime memory/CPU stats peer (spec.md §4.5). A thin ring with no
// processing beyond append/query — the simplest of the sub-peers.

use std::time::Duration;

use dusa_collection_utils::core::errors::{ErrorArrayItem, Errors};
use dusa_collection_utils::core::types::rwarc::LockWithTimeout;
use serde::{Deserialize, Serialize};

use crate::ring::CircularBuffer;

const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryBreakdown {
    pub heap_in_use: u64,
    pub heap_idle: u64,
    pub stack_in_use: u64,
    pub m_span: u64,
    pub m_cache: u64,
    pub gc_sys: u64,
    pub other_sys: u64,
    pub total_from_os: u64,
    pub total_alloc_cumulative: u64,
    pub heap_object_count_cumulative: u64,
    pub freed_heap_object_count_cumulative: u64,
    pub gc_cycles: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeStatsSample {
    pub ts: u64,
    pub cpu_usage: f64,
    pub goroutine_count: u64,
    pub go_max_procs: u32,
    pub cpu_count: u32,
    pub os: String,
    pub arch: String,
    pub version: String,
    pub pid: u32,
    pub cwd: String,
    pub memory: MemoryBreakdown,
}

pub struct RuntimeStatsPeer {
    ring: LockWithTimeout<CircularBuffer<RuntimeStatsSample>>,
}

impl RuntimeStatsPeer {
    pub fn new(capacity: u64) -> Self {
        RuntimeStatsPeer {
            ring: LockWithTimeout::new(CircularBuffer::new(capacity as usize)),
        }
    }

    pub async fn process_runtime_stats(&self, sample: RuntimeStatsSample) -> Result<(), ErrorArrayItem> {
        let mut ring = self
            .ring
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        let next_idx = ring.last_index().map(|i| i + 1).unwrap_or(0);
        ring.write_at(next_idx, sample);
        Ok(())
    }

    pub async fn get_since(&self, since: u64) -> Result<Vec<RuntimeStatsSample>, ErrorArrayItem> {
        let ring = self
            .ring
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        let (items, _) = ring.get_all();
        Ok(items.into_iter().filter(|s| s.ts > since).collect())
    }

    pub async fn get_latest(&self) -> Option<RuntimeStatsSample> {
        self.ring
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .ok()?
            .get_last()
    }
}
