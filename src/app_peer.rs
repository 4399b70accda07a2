// src/app_peer.rs
//
// Per-app-run aggregate of the log/goroutine/runtime-stats/watch sub-peers
// plus connection lifecycle (spec.md §3 "App peer", §4.1).

use std::time::Duration;

use dusa_collection_utils::core::errors::{ErrorArrayItem, Errors};
use dusa_collection_utils::core::types::rwarc::LockWithTimeout;
use serde::{Deserialize, Serialize};

use crate::goroutine::{GoroutineInfo, GoroutinePeer};
use crate::ids::AppRunId;
use crate::log_peer::{FieldValue, LogPeer};
use crate::runtime_stats::{RuntimeStatsPeer, RuntimeStatsSample};
use crate::timestamp::current_timestamp_ms;
use crate::watch::{WatchPeer, WatchSample};
use crate::{log, logger::LogLevel};
use std::collections::HashMap;

const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppStatus {
    Running,
    Disconnected,
    Done,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildInfo {
    pub go_version: String,
    pub path: String,
    pub version: String,
    pub settings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInfo {
    pub app_name: String,
    pub start_time: u64,
    pub executable: String,
    pub module_name: String,
    pub build_info: BuildInfo,
}

/// The inbound packet kinds an app peer dispatches on (spec.md §4.1
/// `HandlePacket`).
pub enum Packet {
    AppInfo(AppInfo),
    Log {
        source: String,
        message: String,
        fields: HashMap<String, FieldValue>,
        tags: Vec<String>,
        timestamp_ms: u64,
    },
    Goroutine(GoroutineInfo),
    Watch(WatchSample),
    RuntimeStats(RuntimeStatsSample),
    AppDone,
}

pub struct AppRunInfo {
    pub app_run_id: AppRunId,
    pub running: bool,
    pub status: AppStatus,
    pub app_info: Option<AppInfo>,
    pub last_mod_time: u64,
    pub log_count: usize,
    pub goroutine_active_count: usize,
    pub goroutine_total_count: u64,
    pub watch_names: Vec<String>,
}

struct Lifecycle {
    status: AppStatus,
    ref_count: u64,
    last_mod_time: u64,
    app_info: Option<AppInfo>,
}

/// One app run's full state: immutable app-run-id, status/refcount
/// lifecycle behind a coarse lock, and the three (four, with watches)
/// sub-peers, each independently concurrency-safe.
pub struct AppPeer {
    pub app_run_id: AppRunId,
    lifecycle: LockWithTimeout<Lifecycle>,
    pub log_peer: LogPeer,
    pub goroutine_peer: GoroutinePeer,
    pub runtime_stats_peer: RuntimeStatsPeer,
    pub watch_peer: WatchPeer,
}

impl AppPeer {
    pub fn new(
        app_run_id: AppRunId,
        log_ring_capacity: u64,
        goroutine_history_capacity: u64,
        goroutine_prune_iterations: u64,
        runtime_stats_ring_capacity: u64,
    ) -> Self {
        AppPeer {
            app_run_id,
            lifecycle: LockWithTimeout::new(Lifecycle {
                status: AppStatus::Running,
                ref_count: 0,
                last_mod_time: current_timestamp_ms(),
                app_info: None,
            }),
            log_peer: LogPeer::new(log_ring_capacity),
            goroutine_peer: GoroutinePeer::new(goroutine_history_capacity, goroutine_prune_iterations),
            runtime_stats_peer: RuntimeStatsPeer::new(runtime_stats_ring_capacity),
            watch_peer: WatchPeer::new(runtime_stats_ring_capacity),
        }
    }

    /// Dispatches one inbound packet to the appropriate sub-peer and bumps
    /// `last_mod_time` on success (spec.md §4.1).
    pub async fn handle_packet(&self, packet: Packet) -> Result<(), ErrorArrayItem> {
        match packet {
            Packet::AppInfo(info) => {
                let mut lc = self
                    .lifecycle
                    .try_write_with_timeout(Some(LOCK_TIMEOUT))
                    .await
                    .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
                lc.app_info = Some(info);
            }
            Packet::Log {
                source,
                message,
                fields,
                tags,
                timestamp_ms,
            } => {
                self.log_peer
                    .process_log_line(&source, &message, fields, tags, timestamp_ms)
                    .await?;
            }
            Packet::Goroutine(info) => {
                self.goroutine_peer.process_goroutine_info(info).await?;
            }
            Packet::Watch(sample) => {
                self.watch_peer.process_watch_sample(sample).await?;
            }
            Packet::RuntimeStats(sample) => {
                self.runtime_stats_peer.process_runtime_stats(sample).await?;
            }
            Packet::AppDone => {
                let mut lc = self
                    .lifecycle
                    .try_write_with_timeout(Some(LOCK_TIMEOUT))
                    .await
                    .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
                lc.status = AppStatus::Done;
            }
        }
        self.bump_last_mod_time().await
    }

    async fn bump_last_mod_time(&self) -> Result<(), ErrorArrayItem> {
        let mut lc = self
            .lifecycle
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        let now = current_timestamp_ms();
        if now > lc.last_mod_time {
            lc.last_mod_time = now;
        }
        Ok(())
    }

    /// Increments the reference count for a newly connected client (the
    /// collector socket, or a live UI subscription).
    pub async fn acquire_ref(&self) -> Result<(), ErrorArrayItem> {
        let mut lc = self
            .lifecycle
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        lc.ref_count += 1;
        if lc.status == AppStatus::Disconnected {
            lc.status = AppStatus::Running;
        }
        Ok(())
    }

    /// Decrements the reference count; if it reaches zero and the peer
    /// isn't already `done`, transitions to `disconnected`.
    pub async fn release_ref(&self) -> Result<(), ErrorArrayItem> {
        let mut lc = self
            .lifecycle
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        lc.ref_count = lc.ref_count.saturating_sub(1);
        if lc.ref_count == 0 && lc.status != AppStatus::Done {
            lc.status = AppStatus::Disconnected;
            let now = current_timestamp_ms();
            if now > lc.last_mod_time {
                lc.last_mod_time = now;
            }
            log!(LogLevel::Debug, "app peer {} disconnected", self.app_run_id);
        }
        Ok(())
    }

    /// Projects current peer state to a UI-facing record (spec.md §4.1
    /// `AppRunInfo()`).
    pub async fn app_run_info(&self) -> Result<AppRunInfo, ErrorArrayItem> {
        let lc = self
            .lifecycle
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        let counts = self.goroutine_peer.goroutine_counts().await;
        Ok(AppRunInfo {
            app_run_id: self.app_run_id.clone(),
            running: lc.status == AppStatus::Running,
            status: lc.status.clone(),
            app_info: lc.app_info.clone(),
            last_mod_time: lc.last_mod_time,
            log_count: self.log_peer.len().await,
            goroutine_active_count: counts.active,
            goroutine_total_count: counts.total,
            watch_names: self.watch_peer.names().await,
        })
    }

    pub async fn last_mod_time(&self) -> u64 {
        self.lifecycle
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map(|lc| lc.last_mod_time)
            .unwrap_or(0)
    }
}
