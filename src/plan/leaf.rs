// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Unexpanded attachment points of a plan.

use crate::graph::NodeId;
use crate::pipeline::ObjectId;
use crate::plan::PlanNodeId;
use crate::target::Target;
use std::collections::BTreeSet;

/// Where a plan continues: the graph node to map next, on which target, and
/// under which plan node the resulting module hangs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Plan node the next module attaches under; `None` before the first module.
    pub attach: Option<PlanNodeId>,
    pub next: NodeId,
    pub target: Target,
    /// Switch objects this path has already touched in the current pipeline
    /// pass. Anything placed from here on must sit in a later stage.
    pub pass_deps: BTreeSet<ObjectId>,
    pub recirculations: u8,
    pub branch_depth: u32,
}

impl Leaf {
    pub fn root(next: NodeId, target: Target) -> Self {
        Self {
            attach: None,
            next,
            target,
            pass_deps: BTreeSet::new(),
            recirculations: 0,
            branch_depth: 0,
        }
    }

    /// Continue on the same target after placing `placed`.
    pub fn advance(&self, next: NodeId, placed: &[ObjectId]) -> Self {
        let mut pass_deps = self.pass_deps.clone();
        pass_deps.extend(placed.iter().copied());
        Self {
            attach: self.attach,
            next,
            target: self.target,
            pass_deps,
            recirculations: self.recirculations,
            branch_depth: self.branch_depth,
        }
    }

    /// One side of a branch.
    pub fn branch(&self, next: NodeId, placed: &[ObjectId]) -> Self {
        let mut leaf = self.advance(next, placed);
        leaf.branch_depth += 1;
        leaf
    }

    /// Resume `next` on another target. Pipeline ordering does not carry over.
    pub fn transfer(&self, target: Target, next: NodeId) -> Self {
        Self {
            attach: self.attach,
            next,
            target,
            pass_deps: BTreeSet::new(),
            recirculations: self.recirculations,
            branch_depth: self.branch_depth,
        }
    }

    /// Revisit the same node in a fresh pipeline pass.
    pub fn recirculated(&self) -> Self {
        Self {
            attach: self.attach,
            next: self.next,
            target: self.target,
            pass_deps: BTreeSet::new(),
            recirculations: self.recirculations + 1,
            branch_depth: self.branch_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Addr;
    use crate::pipeline::ObjectRole;

    #[test]
    fn test_pass_dependencies_accumulate_and_reset() {
        let table = ObjectId::new(Addr(1), ObjectRole::Table);
        let reg = ObjectId::new(Addr(2), ObjectRole::Register);

        let leaf = Leaf::root(NodeId(0), Target::Switch);
        let next = leaf.advance(NodeId(1), &[table]);
        let side = next.branch(NodeId(2), &[reg]);
        assert_eq!(side.pass_deps, BTreeSet::from([table, reg]));
        assert_eq!(side.branch_depth, 1);

        let again = side.recirculated();
        assert!(again.pass_deps.is_empty());
        assert_eq!(again.next, NodeId(2));
        assert_eq!(again.recirculations, 1);

        let moved = side.transfer(Target::Controller, NodeId(2));
        assert!(moved.pass_deps.is_empty());
        assert_eq!(moved.branch_depth, 1);
    }
}
