// src/goroutine/decl.rs
//
// The per-goroutine declaration/lifetime bookkeeping that sits underneath
// `GoroutinePeer` (spec.md §3 "Goroutine record", §4.4.2).

use serde::{Deserialize, Serialize};

use super::stack_parser::Frame;

/// One `decls[]` entry from a `GoroutineInfo` packet (spec.md §4.4.2 step
/// 6). Every field besides `go_id` is an update-if-present delta against
/// whatever the peer already has on file for that goroutine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoDecl {
    pub go_id: u64,
    pub parent_go_id: Option<u64>,
    pub start_ts: Option<u64>,
    pub end_ts: Option<u64>,
    pub real_created_by: Option<String>,
    pub pkg: Option<String>,
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub spawn_count: Option<u64>,
}

/// The active lifetime span of a goroutine (spec.md §3: "active time-span
/// {startIdx, endIdx, startTs, endTs, exact-bit}"). Start and end each carry
/// their own exactness bit since they are set independently (a `StartTs`
/// arriving on a decl does not imply anything about `EndTs`'s precision,
/// and the "ended by absence" rule in step 8 only ever marks the end
/// inexact).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start_idx: u64,
    /// `-1` means "still alive".
    pub end_idx: i64,
    pub start_ts: u64,
    pub end_ts: u64,
    pub start_exact: bool,
    pub end_exact: bool,
}

impl TimeSpan {
    pub fn new_open(start_idx: u64, start_ts: u64) -> Self {
        TimeSpan {
            start_idx,
            end_idx: -1,
            start_ts,
            end_ts: 0,
            start_exact: true,
            end_exact: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.end_idx == -1
    }

    /// Whether `ts` falls within this span, treating a still-alive span's
    /// end as unbounded.
    pub fn contains(&self, ts: u64) -> bool {
        ts >= self.start_ts && (self.is_alive() || ts <= self.end_ts)
    }

    /// Membership test against a logical index rather than a timestamp (used
    /// by `TimeSpansSince`'s per-tick active counts).
    pub fn contains_idx(&self, idx: u64) -> bool {
        idx >= self.start_idx && (self.is_alive() || idx as i64 <= self.end_idx)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    pub ts: u64,
    pub state: String,
    pub stack_trace: String,
}

/// One goroutine's accumulated state (spec.md §3 "Goroutine record").
/// `stack_history` lives in the owning peer's `CircularBuffer`, not here,
/// so the record itself stays cheaply clonable for queries; the peer
/// indexes history by `go_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoroutineRecord {
    pub go_id: u64,
    pub name: String,
    pub tags: Vec<String>,
    pub pkg: Option<String>,
    pub created_by_go_id: Option<u64>,
    pub created_by_frame: Option<Frame>,
    pub real_created_by: Option<String>,
    pub time_span: TimeSpan,
    pub last_active_iteration: u64,
    pub cs_num: u64,
}

impl GoroutineRecord {
    pub fn new(go_id: u64, start_idx: u64, start_ts: u64, cs_num: u64) -> Self {
        GoroutineRecord {
            go_id,
            name: String::new(),
            tags: Vec::new(),
            pkg: None,
            created_by_go_id: None,
            created_by_frame: None,
            real_created_by: None,
            time_span: TimeSpan::new_open(start_idx, start_ts),
            last_active_iteration: 0,
            cs_num,
        }
    }
}
