// src/registry.rs
//
// Process-wide map from app-run-id to app peer (spec.md §3 "Peer
// registry", §4.1). Get-or-create takes the write lock only on the miss
// path: a read lock first, then (on miss) an upgrade to a write lock with a
// re-check, so the common case — an app run that already exists — never
// contends against a write lock (SPEC_FULL.md §5).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dusa_collection_utils::core::errors::{ErrorArrayItem, Errors};
use dusa_collection_utils::core::types::rwarc::LockWithTimeout;

use crate::app_peer::AppPeer;
use crate::config::OutrigConfig;
use crate::ids::AppRunId;
use crate::{log, logger::LogLevel};

const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

pub struct PeerRegistry {
    peers: LockWithTimeout<HashMap<AppRunId, Arc<AppPeer>>>,
    config: OutrigConfig,
}

impl PeerRegistry {
    pub fn new(config: OutrigConfig) -> Self {
        PeerRegistry {
            peers: LockWithTimeout::new(HashMap::new()),
            config,
        }
    }

    /// Returns the existing peer for `app_run_id`, or atomically creates
    /// one. `inc_ref` additionally bumps the peer's reference count, for
    /// callers representing a newly connected client.
    pub async fn get_or_create(&self, app_run_id: &AppRunId, inc_ref: bool) -> Result<Arc<AppPeer>, ErrorArrayItem> {
        {
            let peers = self
                .peers
                .try_read_with_timeout(Some(LOCK_TIMEOUT))
                .await
                .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
            if let Some(peer) = peers.get(app_run_id) {
                let peer = peer.clone();
                drop(peers);
                if inc_ref {
                    peer.acquire_ref().await?;
                }
                return Ok(peer);
            }
        }

        let mut peers = self
            .peers
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;

        if let Some(peer) = peers.get(app_run_id) {
            let peer = peer.clone();
            drop(peers);
            if inc_ref {
                peer.acquire_ref().await?;
            }
            return Ok(peer);
        }

        self.ensure_data_dir(app_run_id);

        let peer = Arc::new(AppPeer::new(
            app_run_id.clone(),
            self.config.log_ring_capacity,
            self.config.goroutine_history_capacity,
            self.config.goroutine_prune_iterations,
            self.config.runtime_stats_ring_capacity,
        ));
        peers.insert(app_run_id.clone(), peer.clone());
        drop(peers);

        if inc_ref {
            peer.acquire_ref().await?;
        }
        Ok(peer)
    }

    /// Creates `<data_dir>/<appRunId>/` on first reference. A failure here
    /// must never fail ingest (SPEC_FULL.md §6), so it is logged and
    /// swallowed.
    fn ensure_data_dir(&self, app_run_id: &AppRunId) {
        let path = Path::new(&self.config.data_dir).join(app_run_id.to_string());
        match std::fs::create_dir_all(&path) {
            Ok(()) => log!(LogLevel::Debug, "created data directory {}", path.display()),
            Err(e) => log!(LogLevel::Warn, "failed to create data directory {}: {}", path.display(), e),
        }
    }

    pub async fn keys(&self) -> Vec<AppRunId> {
        self.peers
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map(|peers| peers.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn get_all(&self) -> Vec<Arc<AppPeer>> {
        self.peers
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map(|peers| peers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// All app-run infos whose peer has been modified since `since` (spec.md
    /// §4.1 `AppRunInfosModifiedSince`).
    pub async fn app_run_infos_modified_since(
        &self,
        since: u64,
    ) -> Result<Vec<crate::app_peer::AppRunInfo>, ErrorArrayItem> {
        let peers = self.get_all().await;
        let mut out = Vec::new();
        for peer in peers {
            if peer.last_mod_time().await > since {
                out.push(peer.app_run_info().await?);
            }
        }
        Ok(out)
    }
}
