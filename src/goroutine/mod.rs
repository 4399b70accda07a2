// src/goroutine/mod.rs
//
// Goroutine delta ingest and time-indexed stack storage (spec.md §4.4). A
// single write lock covers one whole ingest cycle (spec.md §5: "one packet
// per second is tolerable"), which keeps the merge logic in
// `process_goroutine_info` straightforward at the cost of serializing
// ingest against itself — acceptable at the spec's 1 Hz cadence.

pub mod decl;
pub mod stack_parser;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use dusa_collection_utils::core::errors::{ErrorArrayItem, Errors};
use dusa_collection_utils::core::types::rwarc::LockWithTimeout;
use serde::{Deserialize, Serialize};

use crate::ring::CircularBuffer;
use crate::time_align::TimeSampleAligner;
use crate::versioned_map::VersionedMap;
use crate::{log, logger::LogLevel};

use decl::{GoDecl, GoroutineRecord, StackEntry, TimeSpan};
use stack_parser::{find_created_by_in_stack, parse_created_by_text, parse_stack, patch_self_stack, ParsedGoRoutine};

const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackUpdate {
    pub go_id: u64,
    pub state: Option<String>,
    pub stack_trace: Option<String>,
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub same: Option<bool>,
    pub ts: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoroutineInfo {
    pub ts: u64,
    pub delta: bool,
    pub stacks: Vec<StackUpdate>,
    pub decls: Vec<GoDecl>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OverallSpan {
    pub start_ts: u64,
    pub end_ts: u64,
    pub start_idx: u64,
    pub end_idx: u64,
}

pub struct GoroutineCounts {
    pub total: u64,
    pub active: usize,
    pub active_outrig_tagged: usize,
}

pub struct GoroutinesAtResult {
    pub goroutines: Vec<ParsedGoRoutine>,
    pub total_count: usize,
    pub total_non_outrig: usize,
    pub effective_ts: u64,
}

pub struct TimeSpansSinceResult {
    pub changed_spans: Vec<(u64, TimeSpan)>,
    pub full_span: Option<OverallSpan>,
    pub last_tick: u64,
    pub active_counts_per_tick: Vec<(u64, usize)>,
    pub dropped_count: u64,
}

struct Inner {
    aligner: TimeSampleAligner,
    records: HashMap<u64, GoroutineRecord>,
    stack_history: HashMap<u64, CircularBuffer<StackEntry>>,
    timespan_versions: VersionedMap<u64, TimeSpan>,
    iteration: u64,
    max_go_id: u64,
    dropped_count: u64,
    seen_full_frame: bool,
    warned_delta_before_full: bool,
    warned_same_no_history: bool,
    active_set: HashSet<u64>,
    overall_span: Option<OverallSpan>,
}

/// Owns per-goroutine stack histories, timespan map, and the
/// scheduler-iteration counter for one app.
pub struct GoroutinePeer {
    inner: LockWithTimeout<Inner>,
    history_capacity: u64,
    prune_iterations: u64,
}

impl GoroutinePeer {
    pub fn new(history_capacity: u64, prune_iterations: u64) -> Self {
        GoroutinePeer {
            inner: LockWithTimeout::new(Inner {
                aligner: TimeSampleAligner::default(),
                records: HashMap::new(),
                stack_history: HashMap::new(),
                timespan_versions: VersionedMap::new(),
                iteration: 0,
                max_go_id: 0,
                dropped_count: 0,
                seen_full_frame: false,
                warned_delta_before_full: false,
                warned_same_no_history: false,
                active_set: HashSet::new(),
                overall_span: None,
            }),
            history_capacity,
            prune_iterations,
        }
    }

    /// Steps 1-10 of spec.md §4.4.2, all under one write-lock acquisition.
    pub async fn process_goroutine_info(&self, packet: GoroutineInfo) -> Result<(), ErrorArrayItem> {
        let mut inner = self
            .inner
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;

        // 1. Bump iteration counter.
        inner.iteration += 1;
        let iteration = inner.iteration;

        // 2. Append ts to the aligner; drop frame if out of order.
        let logical_idx = match inner.aligner.append(packet.ts) {
            Some(idx) => idx,
            None => {
                log!(
                    LogLevel::Warn,
                    "dropping goroutine frame with out-of-order ts {}",
                    packet.ts
                );
                return Ok(());
            }
        };

        // 3. Advance the timespan version counter.
        inner.timespan_versions.set_version(logical_idx);

        // 4. Grow overall collection span.
        inner.overall_span = Some(match inner.overall_span {
            None => OverallSpan {
                start_ts: packet.ts,
                end_ts: packet.ts,
                start_idx: logical_idx,
                end_idx: logical_idx,
            },
            Some(prev) => OverallSpan {
                start_ts: prev.start_ts.min(packet.ts),
                end_ts: prev.end_ts.max(packet.ts),
                start_idx: prev.start_idx.min(logical_idx),
                end_idx: prev.end_idx.max(logical_idx),
            },
        });

        // 5. Reject deltas before the first full frame.
        if packet.delta && !inner.seen_full_frame {
            if !inner.warned_delta_before_full {
                log!(LogLevel::Warn, "dropping delta frame before any full frame");
                inner.warned_delta_before_full = true;
            }
            return Ok(());
        }
        if !packet.delta {
            inner.seen_full_frame = true;
        }

        // 6. Process declarations.
        for decl in &packet.decls {
            inner.max_go_id = inner.max_go_id.max(decl.go_id);
            let first_ts = inner.aligner.timestamp_of(0).unwrap_or(packet.ts);
            let record = inner
                .records
                .entry(decl.go_id)
                .or_insert_with(|| GoroutineRecord::new(decl.go_id, logical_idx, packet.ts, 0));

            if let Some(name) = &decl.name {
                record.name = name.clone();
            }
            if let Some(tags) = &decl.tags {
                record.tags = tags.clone();
            }
            if let Some(pkg) = &decl.pkg {
                record.pkg = Some(pkg.clone());
            }
            if let Some(start_ts) = decl.start_ts {
                let clamped = start_ts.max(first_ts);
                record.time_span.start_ts = clamped;
                record.time_span.start_exact = true;
            }
            if let Some(end_ts) = decl.end_ts {
                record.time_span.end_ts = end_ts;
                record.time_span.end_exact = true;
                if record.time_span.end_idx == -1 {
                    record.time_span.end_idx = logical_idx as i64;
                }
            }
            if let Some(real_created_by) = &decl.real_created_by {
                if record.created_by_go_id.is_none() {
                    record.real_created_by = Some(real_created_by.clone());
                    if let Some((creator_id, frame)) = parse_created_by_text(real_created_by) {
                        record.created_by_go_id = Some(creator_id);
                        record.created_by_frame = Some(frame);
                    }
                }
            }

            inner.timespan_versions.set(decl.go_id, record.time_span);
        }

        // 7. Process stacks.
        let mut active_this_tick = HashSet::new();
        for stack in &packet.stacks {
            inner.max_go_id = inner.max_go_id.max(stack.go_id);
            active_this_tick.insert(stack.go_id);

            if !inner.records.contains_key(&stack.go_id) {
                inner
                    .records
                    .insert(stack.go_id, GoroutineRecord::new(stack.go_id, logical_idx, packet.ts, 0));
            }

            let history = inner
                .stack_history
                .entry(stack.go_id)
                .or_insert_with(|| CircularBuffer::new(self.history_capacity as usize));

            let entry_text = if stack.same.unwrap_or(false) {
                match history.get_last() {
                    Some(prev) => {
                        let copy = StackEntry {
                            ts: packet.ts,
                            state: prev.state.clone(),
                            stack_trace: prev.stack_trace.clone(),
                        };
                        history.write_at(logical_idx, copy.clone());
                        Some(copy.stack_trace)
                    }
                    None => {
                        if !inner.warned_same_no_history {
                            log!(
                                LogLevel::Warn,
                                "dropping same=true delta for go-id {} with no prior stack",
                                stack.go_id
                            );
                            inner.warned_same_no_history = true;
                        }
                        None
                    }
                }
            } else {
                let entry = StackEntry {
                    ts: packet.ts,
                    state: stack.state.clone().unwrap_or_default(),
                    stack_trace: stack.stack_trace.clone().unwrap_or_default(),
                };
                history.write_at(logical_idx, entry.clone());
                Some(entry.stack_trace)
            };

            let record = inner.records.get_mut(&stack.go_id).expect("just inserted");
            record.last_active_iteration = iteration;
            if let Some(name) = &stack.name {
                record.name = name.clone();
            }
            if let Some(tags) = &stack.tags {
                record.tags = tags.clone();
            }
            if record.created_by_go_id.is_none() {
                if let Some(text) = &entry_text {
                    if let Some((creator_id, frame)) = find_created_by_in_stack(text) {
                        record.created_by_go_id = Some(creator_id);
                        record.created_by_frame = Some(frame);
                    }
                }
            }
            inner.timespan_versions.set(stack.go_id, record.time_span);
        }

        // 8. Mark ended-by-absence.
        let ts = packet.ts;
        for (go_id, record) in inner.records.iter_mut() {
            if active_this_tick.contains(go_id) {
                continue;
            }
            if record.time_span.end_idx == -1 && record.time_span.start_ts < ts {
                record.time_span.end_ts = ts;
                record.time_span.end_idx = logical_idx as i64;
                record.time_span.end_exact = false;
            }
        }
        for (go_id, record) in inner.records.iter() {
            if !active_this_tick.contains(go_id) {
                inner.timespan_versions.set(*go_id, record.time_span);
            }
        }

        // 9. Remember this tick's active set.
        inner.active_set = active_this_tick;

        // 10. Prune goroutines inactive past the threshold.
        let threshold = iteration.saturating_sub(self.prune_iterations);
        let stale: Vec<u64> = inner
            .records
            .iter()
            .filter(|(_, r)| r.last_active_iteration < threshold)
            .map(|(id, _)| *id)
            .collect();
        for go_id in stale {
            inner.records.remove(&go_id);
            inner.stack_history.remove(&go_id);
            inner.timespan_versions.remove(&go_id);
            inner.dropped_count += 1;
        }

        Ok(())
    }

    pub async fn goroutine_counts(&self) -> GoroutineCounts {
        let inner = match self.inner.try_read_with_timeout(Some(LOCK_TIMEOUT)).await {
            Ok(g) => g,
            Err(_) => {
                return GoroutineCounts {
                    total: 0,
                    active: 0,
                    active_outrig_tagged: 0,
                }
            }
        };
        let active_outrig_tagged = inner
            .active_set
            .iter()
            .filter(|id| {
                inner
                    .records
                    .get(id)
                    .map(|r| r.tags.iter().any(|t| t.eq_ignore_ascii_case("outrig")))
                    .unwrap_or(false)
            })
            .count();
        GoroutineCounts {
            total: inner.max_go_id,
            active: inner.active_set.len(),
            active_outrig_tagged,
        }
    }

    /// `ts = 0` means "use the latest tick" (spec.md §4.4.3).
    pub async fn goroutines_at(&self, ts: u64, active_only: bool) -> Result<GoroutinesAtResult, ErrorArrayItem> {
        let inner = self
            .inner
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;

        let effective_ts = if ts == 0 {
            inner.aligner.last_timestamp().unwrap_or(0)
        } else {
            ts
        };
        let idx = inner.aligner.index_of(effective_ts);

        let mut goroutines = Vec::new();
        let mut total_non_outrig = 0usize;
        for (go_id, record) in inner.records.iter() {
            if active_only && !record.time_span.contains(effective_ts) {
                continue;
            }
            let parsed = self.parsed_at(&inner, *go_id, record, idx);
            if !record.tags.iter().any(|t| t.eq_ignore_ascii_case("outrig")) {
                total_non_outrig += 1;
            }
            goroutines.push(parsed);
        }

        Ok(GoroutinesAtResult {
            total_count: goroutines.len(),
            total_non_outrig,
            effective_ts,
            goroutines,
        })
    }

    pub async fn goroutines_by_ids(&self, ids: &[u64], ts: u64) -> Result<Vec<ParsedGoRoutine>, ErrorArrayItem> {
        let inner = self
            .inner
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;

        let effective_ts = if ts == 0 {
            inner.aligner.last_timestamp().unwrap_or(0)
        } else {
            ts
        };
        let idx = inner.aligner.index_of(effective_ts);

        let mut out = Vec::with_capacity(ids.len());
        for go_id in ids {
            match inner.records.get(go_id) {
                Some(record) => out.push(self.parsed_at(&inner, *go_id, record, idx)),
                None => out.push(ParsedGoRoutine::inactive(*go_id)),
            }
        }
        Ok(out)
    }

    fn parsed_at(
        &self,
        inner: &Inner,
        go_id: u64,
        record: &GoroutineRecord,
        idx: Option<u64>,
    ) -> ParsedGoRoutine {
        let stack_text = idx
            .and_then(|i| inner.stack_history.get(&go_id).and_then(|h| h.get_at(i)))
            .map(|e| e.stack_trace);

        let parsed = match stack_text.as_deref().and_then(parse_stack) {
            Some(p) => p,
            None => return ParsedGoRoutine::inactive(go_id),
        };

        if record.real_created_by.is_some() {
            patch_self_stack(parsed, record.created_by_frame.clone())
        } else {
            parsed
        }
    }

    pub async fn time_spans_since(&self, tick_idx: u64) -> Result<TimeSpansSinceResult, ErrorArrayItem> {
        let inner = self
            .inner
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;

        let changed_spans = inner.timespan_versions.get_since_version(tick_idx);
        let last_tick = inner.aligner.last_index().unwrap_or(0);

        let mut active_counts_per_tick = Vec::new();
        for i in tick_idx..=last_tick {
            let count = inner.records.values().filter(|r| r.time_span.contains_idx(i)).count();
            active_counts_per_tick.push((i, count));
        }

        Ok(TimeSpansSinceResult {
            changed_spans,
            full_span: inner.overall_span,
            last_tick,
            active_counts_per_tick,
            dropped_count: inner.dropped_count,
        })
    }
}
