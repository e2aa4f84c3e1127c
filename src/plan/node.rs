// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Nodes of the plan tree.

use crate::module::Module;
use serde::Serialize;
use std::fmt;

/// Index of a node within one plan's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PlanNodeId(pub u32);

impl fmt::Display for PlanNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// One chosen module, linked into the plan tree.
///
/// Never changed after creation except that children are appended as the
/// leaves below it are expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    pub id: PlanNodeId,
    pub module: Module,
    pub parent: Option<PlanNodeId>,
    pub children: Vec<PlanNodeId>,
    /// Distance from the root; the root has depth 1.
    pub depth: u32,
}
