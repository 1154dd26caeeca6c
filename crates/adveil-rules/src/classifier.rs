//! Request Classifier
//!
//! Sits inline on the host's request path. Every outgoing URL is checked
//! against the rule table before it leaves the process.
//!
//! This is the HOT PATH: synchronous, no I/O, bounded by the (small,
//! fixed) rule table. Regexes were compiled at table load.

use crate::table::{BlockRule, RuleCategory, RuleTable};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Maximum number of URLs kept in the recent-block list.
const RECENT_BLOCKED_CAP: usize = 50;

/// Result of a classification check
#[derive(Debug)]
pub enum BlockDecision<'a> {
    /// Request is allowed to proceed
    Allow,
    /// Request matched a rule and must be dropped
    Block {
        /// The first rule that matched, in declaration order
        rule: &'a BlockRule,
    },
}

impl BlockDecision<'_> {
    /// True if the request must be dropped.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    /// Category of the matched rule, if any.
    pub fn category(&self) -> Option<RuleCategory> {
        match self {
            Self::Block { rule } => Some(rule.category),
            Self::Allow => None,
        }
    }
}

/// Accumulated blocking statistics.
///
/// `sum(by_category.values()) == total_blocked` holds at all times;
/// `recent_blocked` is newest-first and capped at 50 entries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockStats {
    pub total_blocked: u64,
    pub by_category: HashMap<RuleCategory, u64>,
    pub recent_blocked: VecDeque<String>,
}

impl BlockStats {
    fn record(&mut self, url: &str, category: RuleCategory) {
        self.total_blocked += 1;
        *self.by_category.entry(category).or_insert(0) += 1;

        self.recent_blocked.push_front(url.to_string());
        self.recent_blocked.truncate(RECENT_BLOCKED_CAP);
    }
}

/// Classifies outgoing request URLs against the rule table.
pub struct RequestClassifier {
    table: RuleTable,
    enabled: AtomicBool,
    stats: Mutex<BlockStats>,
}

impl RequestClassifier {
    /// Create a classifier over a loaded rule table.
    pub fn new(table: RuleTable) -> Self {
        Self {
            table,
            enabled: AtomicBool::new(true),
            stats: Mutex::new(BlockStats::default()),
        }
    }

    /// Check whether a request should be blocked.
    ///
    /// Disabled classifiers allow everything without scanning. On a match
    /// the block is recorded before returning.
    pub fn should_block(&self, url: &str) -> BlockDecision<'_> {
        if !self.enabled.load(Ordering::Relaxed) {
            return BlockDecision::Allow;
        }

        match self.table.first_match(url) {
            Some(rule) => {
                self.stats
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .record(url, rule.category);
                debug!("Blocked [{}] {}: {}", rule.category, rule.description, url);
                BlockDecision::Block { rule }
            }
            None => BlockDecision::Allow,
        }
    }

    /// Enable network blocking. Does not reset stats.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable network blocking. Does not reset stats.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Flip the enabled flag, returning the new state.
    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_not(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Snapshot of the accumulated stats.
    ///
    /// Returns an independent copy; callers never observe live mutation.
    pub fn stats(&self) -> BlockStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of rules in the underlying table.
    pub fn rule_count(&self) -> usize {
        self.table.len()
    }
}
