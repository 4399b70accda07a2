// src/time_align.rs
//
// Maps wall-clock sample timestamps onto a dense logical-tick timeline
// (spec.md §3, "Time-sample aligner"). Every time-indexed store in this
// crate addresses history by logical index rather than timestamp so that
// `CircularBuffer::get_at` is O(capacity) instead of a timestamp search, and
// so timespan arithmetic stays integer.

use std::collections::VecDeque;

/// Bounds how many trailing `(ts)` entries the aligner keeps in memory. Only
/// the trailing window is needed for `index_of`; older timestamps are only
/// ever looked up via their already-assigned index, never re-derived.
const DEFAULT_WINDOW: usize = 4096;

#[derive(Debug, Clone)]
pub struct TimeSampleAligner {
    window: usize,
    /// `base_index + i` is the logical index of `timestamps[i]`.
    base_index: u64,
    timestamps: VecDeque<u64>,
}

impl Default for TimeSampleAligner {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl TimeSampleAligner {
    pub fn new(window: usize) -> Self {
        TimeSampleAligner {
            window: window.max(1),
            base_index: 0,
            timestamps: VecDeque::new(),
        }
    }

    /// Appends `ts` and returns its logical index, or `None` if `ts` is not
    /// strictly newer than the last accepted timestamp ("out of order";
    /// caller must drop the sample per spec.md §3).
    pub fn append(&mut self, ts: u64) -> Option<u64> {
        if let Some(&last) = self.timestamps.back() {
            if ts <= last {
                return None;
            }
        }
        self.timestamps.push_back(ts);
        let idx = self.base_index + (self.timestamps.len() as u64 - 1);
        if self.timestamps.len() > self.window {
            self.timestamps.pop_front();
            self.base_index += 1;
        }
        Some(idx)
    }

    /// Index of the largest stored timestamp `<= ts`, if any is retained.
    pub fn index_of(&self, ts: u64) -> Option<u64> {
        let mut best: Option<u64> = None;
        for (i, &stamp) in self.timestamps.iter().enumerate() {
            if stamp <= ts {
                best = Some(self.base_index + i as u64);
            } else {
                break;
            }
        }
        best
    }

    /// Timestamp originally associated with `idx`, if still in the trailing
    /// window.
    pub fn timestamp_of(&self, idx: u64) -> Option<u64> {
        if idx < self.base_index {
            return None;
        }
        let offset = (idx - self.base_index) as usize;
        self.timestamps.get(offset).copied()
    }

    /// Index of the most recently appended timestamp, if any.
    pub fn last_index(&self) -> Option<u64> {
        if self.timestamps.is_empty() {
            None
        } else {
            Some(self.base_index + self.timestamps.len() as u64 - 1)
        }
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.timestamps.back().copied()
    }

    /// The first logical index still held in the trailing window, plus the
    /// timestamps themselves (oldest first). Bounds memory to the window
    /// size regardless of how many samples have ever been appended.
    pub fn base_and_window(&self) -> (u64, Vec<u64>) {
        (self.base_index, self.timestamps.iter().copied().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
