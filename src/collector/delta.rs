// src/collector/delta.rs
//
// spec.md §4.4.1: "For each observed goroutine the collector compares the
// current (state, stackTrace, name, tags) with the last-sent tuple."

use crate::goroutine::StackUpdate;

#[derive(Debug, Clone, PartialEq)]
pub struct ObservedTuple {
    pub go_id: u64,
    pub state: String,
    pub stack_trace: String,
    pub name: String,
    pub tags: Vec<String>,
}

/// Compares `current` against `previous` and produces the wire element to
/// send: `same: true` with no payload if every field is identical, the full
/// tuple otherwise. `previous` is `None` on the first frame after a new
/// connection, which the caller must always send as a full frame regardless
/// of this function's output (spec.md: "The first frame after any new
/// connection is forced full").
pub fn encode_delta(previous: Option<&ObservedTuple>, current: &ObservedTuple, ts: u64) -> StackUpdate {
    let unchanged = previous.is_some_and(|prev| prev == current);

    if unchanged {
        StackUpdate {
            go_id: current.go_id,
            state: None,
            stack_trace: None,
            name: None,
            tags: None,
            same: Some(true),
            ts: Some(ts),
        }
    } else {
        StackUpdate {
            go_id: current.go_id,
            state: Some(current.state.clone()),
            stack_trace: Some(current.stack_trace.clone()),
            name: Some(current.name.clone()),
            tags: Some(current.tags.clone()),
            same: Some(false),
            ts: Some(ts),
        }
    }
}

/// spec.md §4.4.1 buffer sizing: `max(MinStackBufferSize, lastStackSize *
/// 1.30)`, doubling instead when `filled_exactly` indicates the previous
/// dump may have been truncated.
pub fn next_buffer_size(min_stack_buffer_bytes: usize, last_stack_size: usize, filled_exactly: bool) -> usize {
    if filled_exactly {
        return (last_stack_size.max(min_stack_buffer_bytes)) * 2;
    }
    let grown = (last_stack_size as f64 * 1.30).ceil() as usize;
    grown.max(min_stack_buffer_bytes)
}
