// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! A matched pattern, before it is applied to any plan.

use crate::context::{ContextDelta, DSImpl};
use crate::graph::{Addr, NodeId};
use crate::module::Module;
use crate::pipeline::{ObjectId, StatefulObject};
use crate::target::Target;
use std::collections::{BTreeMap, BTreeSet};

/// How the active leaf continues after a draft is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Successor {
    /// Terminal action: the path ends.
    Stop,
    Next(NodeId),
    Branch { on_true: NodeId, on_false: NodeId },
    /// Hand the packet to another target, which resumes at `next`.
    Transfer { target: Target, next: NodeId },
    /// Leave the node unconsumed and take it again in a fresh pipeline pass.
    Revisit,
}

#[derive(Debug, Clone)]
pub(crate) struct Draft {
    /// `None` for skip expansions.
    pub module: Option<Module>,
    pub commits: ContextDelta,
    /// Objects to place, in order. Each depends on those before it.
    pub placements: Vec<(ObjectId, StatefulObject)>,
    /// Objects accessed by one fused read-modify-write action: touching
    /// them earlier in the pass does not force a later stage.
    pub fused: Vec<ObjectId>,
    pub next: Successor,
    pub params: BTreeMap<String, i64>,
}

impl Draft {
    pub fn module(module: Module, next: Successor) -> Self {
        Self {
            module: Some(module),
            commits: Vec::new(),
            placements: Vec::new(),
            fused: Vec::new(),
            next,
            params: BTreeMap::new(),
        }
    }

    pub fn skip(next: Successor) -> Self {
        Self {
            module: None,
            commits: Vec::new(),
            placements: Vec::new(),
            fused: Vec::new(),
            next,
            params: BTreeMap::new(),
        }
    }

    pub fn commit(mut self, addr: Addr, tag: DSImpl) -> Self {
        self.commits.push((addr, tag));
        self
    }

    pub fn place(mut self, object: ObjectId, request: StatefulObject) -> Self {
        self.placements.push((object, request));
        self
    }

    pub fn fuse(mut self, object: ObjectId) -> Self {
        self.fused.push(object);
        self
    }

    pub fn param(mut self, name: &str, value: i64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    /// Dependency set of the next placement: the pass's earlier objects
    /// other than fused ones, plus objects this draft already placed.
    pub fn dependencies(
        &self,
        pass_deps: &BTreeSet<ObjectId>,
        placed: &[ObjectId],
    ) -> BTreeSet<ObjectId> {
        pass_deps
            .iter()
            .filter(|dep| !self.fused.contains(dep))
            .chain(placed)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ObjectRole;

    #[test]
    fn test_fused_objects_leave_dependencies() {
        let hash = ObjectId::new(Addr(1), ObjectRole::Hash);
        let reg = ObjectId::new(Addr(1), ObjectRole::Register);
        let table = ObjectId::new(Addr(2), ObjectRole::Table);
        let draft = Draft::skip(Successor::Stop).fuse(hash).fuse(reg);

        let pass = BTreeSet::from([hash, reg, table]);
        assert_eq!(draft.dependencies(&pass, &[]), BTreeSet::from([table]));
        assert_eq!(
            draft.dependencies(&pass, &[hash]),
            BTreeSet::from([table, hash])
        );
    }
}
