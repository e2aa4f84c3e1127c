// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Execution plans: a partial mapping from behavior-graph nodes to modules.
//!
//! A plan is a tree of [`PlanNode`]s plus a frontier of [`Leaf`]s still to
//! expand. It owns its [`Context`] and [`PipelineResources`]; forking a plan
//! yields a fully independent copy, so a factory can mutate its fork without
//! any sibling candidate observing the change.
//!
//! The frontier is processed depth-first: the active leaf is always the first
//! one, and the children of an expansion are inserted at the front.

pub mod leaf;
pub mod meta;
pub mod node;

pub use leaf::Leaf;
pub use meta::{path_rate, PathOutcome, PlanMeta};
pub use node::{PlanNode, PlanNodeId};

use crate::context::{Context, Environment};
use crate::graph::{NodeId, Symbol};
use crate::module::Module;
use crate::pipeline::{PipelineResources, PlacementFailure};
use crate::target::Target;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_PLAN_ID: AtomicU64 = AtomicU64::new(0);

fn next_plan_id() -> u64 {
    NEXT_PLAN_ID.fetch_add(1, Ordering::Relaxed)
}

/// Why a plan with no leaves is not a valid finished plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanDefect {
    #[error("Plan still has {0} unexpanded leaves")]
    Unfinished(usize),

    #[error("Node {node} is reachable on {target} but not mapped")]
    Uncovered { node: NodeId, target: Target },

    #[error("Node {node} is mapped on {target} but not reachable there")]
    Extraneous { node: NodeId, target: Target },

    #[error("Pipeline placement no longer holds: {0}")]
    Placement(#[from] PlacementFailure),

    #[error("A path recirculates {recirculations} times (max {max})")]
    RecirculationBudget { recirculations: u8, max: u8 },
}

#[derive(Debug)]
pub struct ExecutionPlan {
    id: u64,
    nodes: Vec<PlanNode>,
    root: Option<PlanNodeId>,
    leaves: Vec<Leaf>,
    context: Context,
    resources: PipelineResources,
    meta: PlanMeta,
}

impl ExecutionPlan {
    /// The empty plan: one leaf at the graph root on the initial target.
    pub fn new(env: &Environment) -> Self {
        Self {
            id: next_plan_id(),
            nodes: Vec::new(),
            root: None,
            leaves: vec![Leaf::root(env.graph.root(), env.registry.initial())],
            context: Context::new(),
            resources: env.registry.baseline().clone(),
            meta: PlanMeta::default(),
        }
    }

    /// An independent copy with a fresh id.
    pub fn fork(&self) -> Self {
        Self {
            id: next_plan_id(),
            nodes: self.nodes.clone(),
            root: self.root,
            leaves: self.leaves.clone(),
            context: self.context.clone(),
            resources: self.resources.clone(),
            meta: self.meta.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    pub fn node(&self, id: PlanNodeId) -> &PlanNode {
        &self.nodes[id.0 as usize]
    }

    pub fn root(&self) -> Option<PlanNodeId> {
        self.root
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// The leaf the next expansion applies to.
    pub fn active_leaf(&self) -> Option<&Leaf> {
        self.leaves.first()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn resources(&self) -> &PipelineResources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut PipelineResources {
        &mut self.resources
    }

    pub fn meta(&self) -> &PlanMeta {
        &self.meta
    }

    pub fn is_finished(&self) -> bool {
        self.leaves.is_empty()
    }

    fn take_active_leaf(&mut self) -> Leaf {
        assert!(
            !self.leaves.is_empty(),
            "Plan {} has no leaf to expand",
            self.id
        );
        self.leaves.remove(0)
    }

    fn install(&mut self, children: Vec<Leaf>) {
        self.leaves.splice(0..0, children);
    }

    /// Replace the active leaf with `module` and continue from `children`.
    ///
    /// Each child's `attach` is set to the new plan node.
    ///
    /// # Panics
    ///
    /// Panics if there is no active leaf or `module` is not for its
    /// (node, target).
    pub fn attach(&mut self, module: Module, mut children: Vec<Leaf>) -> PlanNodeId {
        let leaf = self.take_active_leaf();
        assert!(
            module.node == leaf.next && module.target == leaf.target,
            "Module for {} on {} attached at leaf {} on {}",
            module.node,
            module.target,
            leaf.next,
            leaf.target
        );

        let id = PlanNodeId(self.nodes.len() as u32);
        let depth = leaf.attach.map_or(1, |parent| self.node(parent).depth + 1);
        match leaf.attach {
            Some(parent) => self.nodes[parent.0 as usize].children.push(id),
            None => {
                assert!(self.root.is_none(), "Plan {} already has a root", self.id);
                self.root = Some(id);
            }
        }
        self.nodes.push(PlanNode {
            id,
            module,
            parent: leaf.attach,
            children: Vec::new(),
            depth,
        });

        self.meta.mark_processed(leaf.next, leaf.target, Some(id));
        self.meta.record_module(leaf.target, depth);
        if children.is_empty() {
            self.meta.record_completed(PathOutcome {
                branch_depth: leaf.branch_depth,
                target: leaf.target,
                recirculations: leaf.recirculations,
            });
        }
        for child in &mut children {
            child.attach = Some(id);
        }
        self.install(children);
        id
    }

    /// Consume the active leaf's node without creating a plan node.
    pub fn skip(&mut self, children: Vec<Leaf>) {
        let leaf = self.take_active_leaf();
        self.meta.mark_processed(leaf.next, leaf.target, None);
        self.install(children);
    }

    /// Revisit the active leaf's node in a fresh pipeline pass.
    pub fn recirculate(&mut self) {
        let leaf = self.take_active_leaf();
        self.meta.record_recirculation();
        self.install(vec![leaf.recirculated()]);
    }

    pub(crate) fn record_symbol(&mut self, plan_node: PlanNodeId, symbol: Symbol) {
        self.meta.record_symbol(plan_node, symbol);
    }

    /// Throughput of the completed paths, in thousandths of Mpps.
    pub fn throughput(&self, env: &Environment) -> u64 {
        self.meta
            .completed()
            .iter()
            .map(|path| path.weighted_rate(env.registry.capacity_mpps(path.target)))
            .sum()
    }

    /// Check the terminal-state assertions of a finished plan.
    ///
    /// Every node reachable from the graph root is mapped exactly once on
    /// each target its path runs on, every recorded pipeline placement
    /// still holds, and no path exceeds the recirculation budget.
    pub fn verify_finished(&self, env: &Environment) -> Result<(), PlanDefect> {
        if !self.leaves.is_empty() {
            return Err(PlanDefect::Unfinished(self.leaves.len()));
        }

        let mut reached = BTreeSet::new();
        let mut stack = vec![(env.graph.root(), env.registry.initial())];
        while let Some((node, target)) = stack.pop() {
            reached.insert((node, target));
            match self.meta.processed(node, target) {
                None => return Err(PlanDefect::Uncovered { node, target }),
                Some(Some(plan_node)) => {
                    if let Some(next) = self.node(plan_node).module.transfer_target() {
                        stack.push((node, next));
                        continue;
                    }
                }
                Some(None) => {}
            }
            for child in env.graph.node(node).children() {
                stack.push((child, target));
            }
        }
        if let Some((node, target)) = self
            .meta
            .processed_pairs()
            .find(|pair| !reached.contains(pair))
        {
            return Err(PlanDefect::Extraneous { node, target });
        }

        self.resources.revalidate()?;

        let max = env.registry.max_recirculations();
        if let Some(path) = self
            .meta
            .completed()
            .iter()
            .find(|path| path.recirculations > max)
        {
            return Err(PlanDefect::RecirculationBudget {
                recirculations: path.recirculations,
                max,
            });
        }
        Ok(())
    }
}
