//! Change detection and rule application over a live host tree.
//!
//! The reconciler keeps a seen-set of node ids. On every change
//! notification it re-enumerates the tree, processes each id it has not
//! seen yet (marking it seen *before* committing anything), and evicts ids
//! that are gone so a removed-then-reinserted id is processed again.
//!
//! Convergence: a commit may synchronously trigger another notification,
//! but every id is marked seen before its first commit, so the follow-up
//! pass finds nothing new. The number of commits is bounded by the number
//! of genuinely new ids.

mod attach;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use inner_defaults_core::{HostTree, NodeId};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::matcher;
use crate::rule::RuleStore;

pub use attach::Attachment;

/// What one notification pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Ids not seen before this pass.
    pub discovered: usize,
    /// Nodes that matched at least one rule and were committed.
    pub updated: usize,
    /// New nodes no rule matched.
    pub unmatched: usize,
    /// New ids that no longer resolved to a node.
    pub missing: usize,
    /// Commits rejected by the host.
    pub failed: usize,
    /// Ids dropped from the seen-set because they left the tree.
    pub evicted: usize,
}

impl PassReport {
    pub fn is_noop(&self) -> bool {
        self.discovered == 0 && self.evicted == 0
    }
}

/// Totals since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub passes: u64,
    pub processed: u64,
    pub updated: u64,
    pub missing: u64,
    pub failed: u64,
    pub evicted: u64,
}

impl ReconcileStats {
    fn record(&mut self, pass: &PassReport) {
        self.passes += 1;
        self.processed += pass.discovered as u64;
        self.updated += pass.updated as u64;
        self.missing += pass.missing as u64;
        self.failed += pass.failed as u64;
        self.evicted += pass.evicted as u64;
    }
}

pub struct Reconciler {
    rules: RuleStore,
    seen: HashSet<NodeId>,
    stats: ReconcileStats,
}

impl Reconciler {
    pub fn new(rules: RuleStore) -> Self {
        Self {
            rules,
            seen: HashSet::new(),
            stats: ReconcileStats::default(),
        }
    }

    /// Mark every node currently in the tree as seen. Nodes present at
    /// prime time are assumed conformant and are never processed.
    pub fn prime<T: HostTree + ?Sized>(&mut self, tree: &T) {
        self.seen.extend(tree.all_ids());
        info!(seen = self.seen.len(), rules = self.rules.len(), "reconciler primed");
    }

    /// Handle one change notification.
    pub fn handle_change<T: HostTree + ?Sized>(&mut self, tree: &T) -> PassReport {
        let ids = tree.all_ids();
        let present: HashSet<NodeId> = ids.iter().copied().collect();
        let mut report = PassReport::default();

        for id in ids {
            if !self.seen.insert(id) {
                continue;
            }
            report.discovered += 1;
            self.process(tree, id, &mut report);
        }

        report.evicted = self.retain_present(&present);

        self.stats.record(&report);
        if !report.is_noop() {
            debug!(
                discovered = report.discovered,
                updated = report.updated,
                missing = report.missing,
                evicted = report.evicted,
                "reconcile pass"
            );
        }
        report
    }

    /// Forget every seen id missing from `present`, an enumeration of the
    /// tree taken at some notification. Returns how many were dropped.
    ///
    /// Used for notifications that arrived while a pass was running, whose
    /// intermediate tree state the next pass would otherwise never see.
    pub fn evict_absent(&mut self, present: &HashSet<NodeId>) -> usize {
        let evicted = self.retain_present(present);
        self.stats.evicted += evicted as u64;
        if evicted > 0 {
            debug!(evicted, "evicted ids missing from a queued enumeration");
        }
        evicted
    }

    fn retain_present(&mut self, present: &HashSet<NodeId>) -> usize {
        let before = self.seen.len();
        self.seen.retain(|id| present.contains(id));
        before - self.seen.len()
    }

    /// Match one new node against every rule and commit the result.
    fn process<T: HostTree + ?Sized>(&self, tree: &T, id: NodeId, report: &mut PassReport) {
        let Some(node) = tree.node(id) else {
            debug!(node = %id, "node vanished before processing");
            report.missing += 1;
            return;
        };

        let include_all = self.rules.needs_full_ancestry();
        let transform = matcher::evaluate(&self.rules, &node, || {
            tree.ancestor_chain(id, include_all)
                .into_iter()
                .map(|ancestor| tree.node(ancestor))
                .collect()
        });

        let Some(transform) = transform else {
            report.unmatched += 1;
            return;
        };

        let applied = transform.applied();
        match tree.apply_attributes(id, transform.into_patch()) {
            Ok(()) => {
                trace!(node = %id, type_name = %node.type_name, rules = applied, "applied rules");
                report.updated += 1;
            }
            Err(e) => {
                warn!(node = %id, error = %e, "failed to commit rule attributes");
                report.failed += 1;
            }
        }
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn is_seen(&self, id: NodeId) -> bool {
        self.seen.contains(&id)
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }
}
