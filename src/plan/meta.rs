// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Aggregate bookkeeping carried by each plan.

use crate::graph::{NodeId, Symbol};
use crate::plan::PlanNodeId;
use crate::target::Target;
use std::collections::{BTreeMap, BTreeSet};

/// A packet path that reached a terminal module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathOutcome {
    pub branch_depth: u32,
    pub target: Target,
    pub recirculations: u8,
}

impl PathOutcome {
    /// Share of the target's capacity this path sustains, in thousandths of
    /// Mpps, assuming every branch splits traffic evenly.
    pub fn weighted_rate(&self, capacity_mpps: u64) -> u64 {
        path_rate(capacity_mpps, self.recirculations) >> self.branch_depth.min(63)
    }
}

/// Rate of a path on a target with `capacity_mpps`, in thousandths of Mpps.
/// Each recirculation is another trip through the pipeline.
pub fn path_rate(capacity_mpps: u64, recirculations: u8) -> u64 {
    capacity_mpps * 1000 / (1 + recirculations as u64)
}

#[derive(Debug, Clone, Default)]
pub struct PlanMeta {
    depth: u32,
    /// Every (graph node, target) pair mapped so far, with the plan node that
    /// maps it (`None` when the node was skipped as a no-op).
    processed: BTreeMap<(NodeId, Target), Option<PlanNodeId>>,
    modules: BTreeMap<Target, usize>,
    recirculations: u32,
    completed: Vec<PathOutcome>,
    minted: BTreeMap<PlanNodeId, Symbol>,
}

impl PlanMeta {
    /// Record that `node` is handled on `target`.
    ///
    /// # Panics
    ///
    /// Panics if the pair is already mapped. A tree-shaped graph reaches
    /// each pair along exactly one path, so a repeat is a factory defect.
    pub(crate) fn mark_processed(
        &mut self,
        node: NodeId,
        target: Target,
        plan_node: Option<PlanNodeId>,
    ) {
        if let Some(previous) = self.processed.insert((node, target), plan_node) {
            panic!(
                "Node {} on {} mapped twice (previously {:?})",
                node, target, previous
            );
        }
    }

    pub(crate) fn record_module(&mut self, target: Target, depth: u32) {
        *self.modules.entry(target).or_default() += 1;
        self.depth = self.depth.max(depth);
    }

    pub(crate) fn record_recirculation(&mut self) {
        self.recirculations += 1;
    }

    pub(crate) fn record_completed(&mut self, outcome: PathOutcome) {
        self.completed.push(outcome);
    }

    pub(crate) fn record_symbol(&mut self, plan_node: PlanNodeId, symbol: Symbol) {
        self.minted.insert(plan_node, symbol);
    }

    /// Depth of the deepest plan node.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// How `(node, target)` was handled: `None` if not yet, `Some(None)` if
    /// skipped, `Some(Some(id))` if mapped to plan node `id`.
    pub fn processed(&self, node: NodeId, target: Target) -> Option<Option<PlanNodeId>> {
        self.processed.get(&(node, target)).copied()
    }

    pub fn processed_pairs(&self) -> impl Iterator<Item = (NodeId, Target)> + '_ {
        self.processed.keys().copied()
    }

    /// Number of distinct graph nodes handled on some target.
    pub fn processed_nodes(&self) -> usize {
        self.processed
            .keys()
            .map(|(node, _)| *node)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn modules_on(&self, target: Target) -> usize {
        self.modules.get(&target).copied().unwrap_or(0)
    }

    pub fn total_modules(&self) -> usize {
        self.modules.values().sum()
    }

    /// Recirculations taken across every path.
    pub fn recirculations(&self) -> u32 {
        self.recirculations
    }

    pub fn completed(&self) -> &[PathOutcome] {
        &self.completed
    }

    /// Symbols minted by modules of this plan, by plan node.
    pub fn minted(&self) -> &BTreeMap<PlanNodeId, Symbol> {
        &self.minted
    }
}
