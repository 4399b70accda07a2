// src/log_peer/mod.rs
//
// Per-app log ingestion and storage (spec.md §4.2). A `LogPeer` owns the
// app's log ring and the set of live search subscriptions over it; ingest
// is a single critical section that writes the line and then fans the line
// out to every still-alive subscription (IP-1: "a line is visible to a new
// search before it is visible to any notification the line triggers" would
// be backwards — notification only happens after the write commits).

use std::collections::HashMap;
use std::time::Duration;

use dusa_collection_utils::core::errors::{ErrorArrayItem, Errors};
use dusa_collection_utils::core::types::rwarc::LockWithTimeout;
use serde::{Deserialize, Serialize};

use crate::ring::CircularBuffer;
use crate::search::{MatchContext, SearchManager};
use crate::{log, logger::LogLevel};

const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// A structured field value attached to a log line (spec.md §4.2.1: "lines
/// may carry a set of caller-supplied structured fields searchable via
/// `$field:value`").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub logical_idx: u64,
    pub timestamp_ms: u64,
    pub source: String,
    pub message: String,
    pub fields: HashMap<String, FieldValue>,
    pub tags: Vec<String>,
    pub marked: bool,
}

impl MatchContext for LogLine {
    fn text(&self) -> &str {
        &self.message
    }

    fn field_text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn field_numeric(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(_) => None,
        }
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn is_marked(&self) -> bool {
        self.marked
    }

    fn is_user_query(&self) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case("userquery"))
    }
}

/// One app's log ring plus its live search subscriptions.
pub struct LogPeer {
    ring: LockWithTimeout<CircularBuffer<LogLine>>,
    next_idx: LockWithTimeout<u64>,
    subscriptions: LockWithTimeout<Vec<SearchManager<LogLine>>>,
}

impl LogPeer {
    pub fn new(capacity: u64) -> Self {
        LogPeer {
            ring: LockWithTimeout::new(CircularBuffer::new(capacity as usize)),
            next_idx: LockWithTimeout::new(1),
            subscriptions: LockWithTimeout::new(Vec::new()),
        }
    }

    /// Ingests one raw line: normalizes it (strips every `\r` and
    /// canonicalizes the trailing newline to exactly one `\n`, per spec.md
    /// §4.2.1 IP-2), assigns it the next 1-based logical line number,
    /// writes it into the ring, then notifies every live subscription.
    /// Dead subscriptions are dropped as part of the same pass.
    pub async fn process_log_line(
        &self,
        source: &str,
        message: &str,
        fields: HashMap<String, FieldValue>,
        tags: Vec<String>,
        timestamp_ms: u64,
    ) -> Result<u64, ErrorArrayItem> {
        let normalized = normalize_message(message);

        let idx = {
            let mut next = self
                .next_idx
                .try_write_with_timeout(Some(LOCK_TIMEOUT))
                .await
                .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
            let idx = *next;
            *next += 1;
            idx
        };

        let line = LogLine {
            logical_idx: idx,
            timestamp_ms,
            source: source.to_string(),
            message: normalized,
            fields,
            tags,
            marked: false,
        };

        {
            let mut ring = self
                .ring
                .try_write_with_timeout(Some(LOCK_TIMEOUT))
                .await
                .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
            ring.write_at(idx, line.clone());
        }

        self.notify_subscriptions(&line).await?;
        Ok(idx)
    }

    async fn notify_subscriptions(&self, line: &LogLine) -> Result<(), ErrorArrayItem> {
        let mut subs = self
            .subscriptions
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;

        let mut keep = Vec::with_capacity(subs.len());
        for sub in subs.drain(..) {
            if !sub.is_alive().await {
                continue;
            }
            if let Err(e) = sub.process_new_record(line).await {
                log!(LogLevel::Warn, "search subscription dropped a line: {}", e);
            }
            keep.push(sub);
        }
        *subs = keep;
        Ok(())
    }

    /// Opens a new live search subscription, backfilled from current ring
    /// contents, and adds it to the fan-out list.
    pub async fn subscribe(&self, query: &str) -> Result<(), ErrorArrayItem> {
        let manager = {
            let ring = self
                .ring
                .try_read_with_timeout(Some(LOCK_TIMEOUT))
                .await
                .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
            SearchManager::subscribe(query, &ring)
        };
        let mut subs = self
            .subscriptions
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        subs.push(manager);
        Ok(())
    }

    pub async fn get_all(&self) -> Result<Vec<LogLine>, ErrorArrayItem> {
        let ring = self
            .ring
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        Ok(ring.get_all().0)
    }

    pub async fn len(&self) -> usize {
        self.ring
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}

/// Strips every `\r` and canonicalizes the trailing newline to exactly one
/// `\n`, regardless of how many (if any) the raw line carried (spec.md
/// §4.2.1 IP-2: the stored message contains no `\r` and ends with exactly
/// one `\n`).
fn normalize_message(raw: &str) -> String {
    let stripped = raw.replace('\r', "");
    let trimmed = stripped.trim_end_matches('\n');
    format!("{trimmed}\n")
}
