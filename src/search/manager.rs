// src/search/manager.rs
//
// Live search sessions over a log peer's ring (spec.md §4.3.4). A
// `SearchManager` is created per subscribed query, holds the compiled
// matcher, and is fed every newly ingested line so it can push matches to
// its subscriber without rescanning history. Paginated history queries are
// served on demand against the backing `CircularBuffer` directly.

use crate::ring::CircularBuffer;
use dusa_collection_utils::core::errors::{ErrorArrayItem, Errors};
use dusa_collection_utils::core::types::rwarc::LockWithTimeout;
use std::time::Duration;

use super::ast::Node;
use super::matcher::{compile, Matcher, MatchContext};
use super::parser::parse;
use super::pretty::pretty;

const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// One parsed-and-compiled query, kept around so repeated evaluation
/// doesn't reparse or recompile regexes.
pub struct CompiledQuery {
    pub tree: Node,
    pub error_spans: Vec<(usize, usize)>,
    matcher: Matcher,
}

impl CompiledQuery {
    pub fn parse(query: &str) -> Self {
        let tree = parse(query);
        let error_spans = tree.error_spans();
        let matcher = compile(&tree);
        CompiledQuery {
            tree,
            error_spans,
            matcher,
        }
    }

    pub fn is_match(&self, ctx: &dyn MatchContext) -> bool {
        self.matcher.eval(ctx)
    }

    /// Round-trips the tree through the pretty-printer; used by callers
    /// that need to display a canonicalized form of what was parsed.
    pub fn canonical_text(&self) -> String {
        pretty(&self.tree)
    }
}

/// The manager's last-reported counts (spec.md §4.3: "last reported
/// counts"): `total` is every log line the owning peer has ever ingested
/// (including ones evicted before this manager could ever see them);
/// `searched` is how many lines this manager has actually had the chance
/// to test against its query (the backfilled snapshot at subscribe time,
/// plus every line ingested since).
#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    total: u64,
    searched: u64,
}

/// A live subscription to one query over one log ring. `T` is the record
/// type stored in the ring (expected to implement `MatchContext`).
pub struct SearchManager<T: Clone + MatchContext> {
    query: CompiledQuery,
    matched: LockWithTimeout<Vec<T>>,
    counts: LockWithTimeout<Counts>,
    alive: LockWithTimeout<bool>,
}

impl<T: Clone + MatchContext> SearchManager<T> {
    /// Subscribes a new query against the current contents of `source`,
    /// seeding the match set with whatever already matches (spec.md §4.3.4:
    /// "a new subscription is backfilled from history before going live").
    pub fn subscribe(query: &str, source: &CircularBuffer<T>) -> Self {
        let compiled = CompiledQuery::parse(query);
        let (items, _evicted) = source.get_all();
        let searched = items.len() as u64;
        let seeded: Vec<T> = items
            .into_iter()
            .filter(|record| compiled.is_match(record))
            .collect();

        SearchManager {
            query: compiled,
            matched: LockWithTimeout::new(seeded),
            counts: LockWithTimeout::new(Counts {
                total: source.total_written(),
                searched,
            }),
            alive: LockWithTimeout::new(true),
        }
    }

    pub fn error_spans(&self) -> &[(usize, usize)] {
        &self.query.error_spans
    }

    /// Called by the owning log peer for every newly ingested line. Appends
    /// to the live match set if the line matches, and always advances
    /// `total`/`searched` (a line the peer ingests is immediately available
    /// to every live manager, so it's searched on arrival).
    pub async fn process_new_record(&self, record: &T) -> Result<(), ErrorArrayItem> {
        {
            let mut counts = self
                .counts
                .try_write_with_timeout(Some(LOCK_TIMEOUT))
                .await
                .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
            counts.total += 1;
            counts.searched += 1;
        }

        if !self.query.is_match(record) {
            return Ok(());
        }
        let mut matched = self
            .matched
            .try_write_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;
        matched.push(record.clone());
        Ok(())
    }

    /// Returns the `page_num`-th window of `page_size` matches (spec.md
    /// §4.3/§6: page numbers in `{0, 1, …}`, or negative indices counting
    /// pages back from the end, with `-1` meaning the last page).
    pub async fn page(&self, page_num: i64, page_size: usize) -> Result<Vec<T>, ErrorArrayItem> {
        let matched = self
            .matched
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map_err(|e| ErrorArrayItem::new(Errors::GeneralError, e.to_string()))?;

        let len = matched.len();
        if len == 0 || page_size == 0 {
            return Ok(Vec::new());
        }

        let total_pages = (len + page_size - 1) / page_size;
        let page_idx = if page_num < 0 {
            let from_end = (-page_num) as usize;
            match total_pages.checked_sub(from_end) {
                Some(idx) => idx,
                None => return Ok(Vec::new()),
            }
        } else {
            page_num as usize
        };

        let start = page_idx * page_size;
        if start >= len {
            return Ok(Vec::new());
        }
        let end = (start + page_size).min(len);
        Ok(matched[start..end].to_vec())
    }

    pub async fn match_count(&self) -> usize {
        self.matched
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map(|g| g.len())
            .unwrap_or(0)
    }

    /// `totalcount`: every log line the owning peer has ever ingested.
    pub async fn total_count(&self) -> u64 {
        self.counts
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map(|c| c.total)
            .unwrap_or(0)
    }

    /// `searchedcount`: how many lines this manager has actually tested
    /// against its query.
    pub async fn searched_count(&self) -> u64 {
        self.counts
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map(|c| c.searched)
            .unwrap_or(0)
    }

    /// `filteredcount`: how many of the searched lines matched.
    pub async fn filtered_count(&self) -> u64 {
        self.match_count().await as u64
    }

    pub async fn is_alive(&self) -> bool {
        self.alive
            .try_read_with_timeout(Some(LOCK_TIMEOUT))
            .await
            .map(|g| *g)
            .unwrap_or(false)
    }

    /// Marks the subscription dead. The owning log peer drops it from its
    /// fan-out list on the next ingest once it observes this.
    pub async fn drop_subscription(&self) {
        if let Ok(mut alive) = self.alive.try_write_with_timeout(Some(LOCK_TIMEOUT)).await {
            *alive = false;
        }
    }
}
