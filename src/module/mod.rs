// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Modules and the factories that produce them.
//!
//! A [`Module`] is one concrete implementation choice for a graph node on a
//! target. A [`Factory`] recognises one (node shape, operation, target)
//! pattern and offers three operations over it:
//!
//! - [`Factory::speculate`]: a cheap feasibility probe for lookahead scoring.
//!   It reads the plan but never forks or mutates it.
//! - [`Factory::expand`]: one forked plan per way the pattern matches, with
//!   the module attached at the active leaf.
//! - [`Factory::reconstruct`]: rebuild the module for a node from a committed
//!   [`Context`].
//!
//! All three are driven by the same list of drafts, so they agree on
//! when a pattern matches.

mod draft;
mod shared;
mod software;
mod switch;

pub(crate) use draft::{Draft, Successor};

use crate::context::{Context, ContextDelta, DSImpl, Environment, Structure};
use crate::graph::{Addr, BehaviorGraph, Expr, NodeId, Route, Symbol, SymbolSource};
use crate::pipeline::{ObjectId, PipelineResources, PlacementFailure};
use crate::plan::{ExecutionPlan, Leaf};
use crate::target::Target;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter};
use tracing::trace;

/// Every kind of module a factory can produce, plus the two skip expansions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    EnumCountMacro,
    Serialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ModuleKind {
    /// Skip a call every target can prove to be a no-op.
    Ignore,
    ParseHeader,
    If,
    Route,
    Allocate,
    TableLookup,
    TableLearn,
    RegisterRead,
    RegisterWrite,
    SketchUpdate,
    SketchQuery,
    SendToController,
    /// Revisit a node in a fresh pipeline pass.
    Recirculate,
    MapGet,
    MapPut,
    MapErase,
    VectorRead,
    VectorWrite,
    DchainAllocateIndex,
    DchainRejuvenate,
    DchainFree,
    ExpireItems,
}

impl ModuleKind {
    /// Switch modules that place objects in the pipeline.
    pub fn uses_pipeline(self) -> bool {
        matches!(
            self,
            ModuleKind::TableLookup
                | ModuleKind::TableLearn
                | ModuleKind::RegisterRead
                | ModuleKind::RegisterWrite
                | ModuleKind::SketchUpdate
                | ModuleKind::SketchQuery
        )
    }
}

/// The operation a module performs, with everything needed to emit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Op {
    ParseHeader {
        length: u64,
        chunk: Option<Expr>,
    },
    If {
        condition: Expr,
    },
    Route(Route),
    SendToController,
    Allocate {
        obj: Addr,
        structure: Structure,
        implementation: DSImpl,
        capacity: u64,
    },
    TableLookup {
        table: Addr,
        keys: Vec<Expr>,
        value: Option<Expr>,
        hit: Option<Symbol>,
    },
    TableLearn {
        table: Addr,
        key: Expr,
        value: Expr,
    },
    RegisterRead {
        register: Addr,
        index: Expr,
        value: Option<Expr>,
    },
    RegisterWrite {
        register: Addr,
        index: Expr,
        value: Expr,
    },
    SketchUpdate {
        sketch: Addr,
        key: Expr,
        implementation: DSImpl,
    },
    SketchQuery {
        sketch: Addr,
        key: Expr,
        estimate: Option<Expr>,
        implementation: DSImpl,
    },
    MapGet {
        map: Addr,
        key: Expr,
        value: Option<Expr>,
        found: Option<Symbol>,
        implementation: DSImpl,
    },
    MapPut {
        map: Addr,
        key: Expr,
        value: Expr,
        implementation: DSImpl,
    },
    MapErase {
        map: Addr,
        key: Expr,
        implementation: DSImpl,
    },
    VectorRead {
        vector: Addr,
        index: Expr,
        value: Option<Expr>,
        implementation: DSImpl,
    },
    VectorWrite {
        vector: Addr,
        index: Expr,
        value: Expr,
        implementation: DSImpl,
    },
    DchainAllocateIndex {
        chain: Addr,
        index: Option<Expr>,
        out_of_space: Option<Symbol>,
    },
    DchainRejuvenate {
        chain: Addr,
        index: Expr,
    },
    DchainFree {
        chain: Addr,
        index: Expr,
    },
    ExpireItems {
        map: Addr,
        chain: Addr,
    },
}

impl Op {
    pub fn kind(&self) -> ModuleKind {
        match self {
            Op::ParseHeader { .. } => ModuleKind::ParseHeader,
            Op::If { .. } => ModuleKind::If,
            Op::Route(_) => ModuleKind::Route,
            Op::SendToController => ModuleKind::SendToController,
            Op::Allocate { .. } => ModuleKind::Allocate,
            Op::TableLookup { .. } => ModuleKind::TableLookup,
            Op::TableLearn { .. } => ModuleKind::TableLearn,
            Op::RegisterRead { .. } => ModuleKind::RegisterRead,
            Op::RegisterWrite { .. } => ModuleKind::RegisterWrite,
            Op::SketchUpdate { .. } => ModuleKind::SketchUpdate,
            Op::SketchQuery { .. } => ModuleKind::SketchQuery,
            Op::MapGet { .. } => ModuleKind::MapGet,
            Op::MapPut { .. } => ModuleKind::MapPut,
            Op::MapErase { .. } => ModuleKind::MapErase,
            Op::VectorRead { .. } => ModuleKind::VectorRead,
            Op::VectorWrite { .. } => ModuleKind::VectorWrite,
            Op::DchainAllocateIndex { .. } => ModuleKind::DchainAllocateIndex,
            Op::DchainRejuvenate { .. } => ModuleKind::DchainRejuvenate,
            Op::DchainFree { .. } => ModuleKind::DchainFree,
            Op::ExpireItems { .. } => ModuleKind::ExpireItems,
        }
    }
}

/// One implementation choice for a graph node, scoped to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub target: Target,
    pub node: NodeId,
    pub op: Op,
}

impl Module {
    pub fn new(target: Target, node: NodeId, op: Op) -> Self {
        Self { target, node, op }
    }

    pub fn kind(&self) -> ModuleKind {
        self.op.kind()
    }

    /// The target the rest of the path continues on, if this module hands
    /// the packet over.
    pub fn transfer_target(&self) -> Option<Target> {
        match self.op {
            Op::SendToController => Some(Target::Controller),
            _ => None,
        }
    }
}

/// Provenance record of one expansion, for search introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Plan the decision was made on.
    pub plan: u64,
    pub node: NodeId,
    pub target: Target,
    pub kind: ModuleKind,
    pub params: BTreeMap<String, i64>,
}

/// Result of a successful [`Factory::speculate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speculation {
    pub decision: Decision,
    /// Bindings the decision would commit.
    pub delta: ContextDelta,
}

/// Result of [`Factory::expand`].
#[derive(Debug, Default)]
pub struct Expanded {
    pub candidates: Vec<(Decision, ExecutionPlan)>,
    /// Placement failures that ruled out otherwise matching candidates.
    pub pruned: Vec<PlacementFailure>,
}

impl Expanded {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Producer of one kind of module on one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Factory {
    pub target: Target,
    pub kind: ModuleKind,
}

const SWITCH_CATALOG: &[ModuleKind] = &[
    ModuleKind::Ignore,
    ModuleKind::ParseHeader,
    ModuleKind::If,
    ModuleKind::Route,
    ModuleKind::Allocate,
    ModuleKind::TableLookup,
    ModuleKind::TableLearn,
    ModuleKind::RegisterRead,
    ModuleKind::RegisterWrite,
    ModuleKind::SketchUpdate,
    ModuleKind::SketchQuery,
    ModuleKind::SendToController,
    ModuleKind::Recirculate,
];

const SOFTWARE_CATALOG: &[ModuleKind] = &[
    ModuleKind::Ignore,
    ModuleKind::ParseHeader,
    ModuleKind::If,
    ModuleKind::Route,
    ModuleKind::Allocate,
    ModuleKind::MapGet,
    ModuleKind::MapPut,
    ModuleKind::MapErase,
    ModuleKind::VectorRead,
    ModuleKind::VectorWrite,
    ModuleKind::DchainAllocateIndex,
    ModuleKind::DchainRejuvenate,
    ModuleKind::DchainFree,
    ModuleKind::SketchUpdate,
    ModuleKind::SketchQuery,
    ModuleKind::ExpireItems,
];

impl Factory {
    pub fn new(target: Target, kind: ModuleKind) -> Self {
        Self { target, kind }
    }

    fn kinds(target: Target) -> &'static [ModuleKind] {
        match target {
            Target::Switch => SWITCH_CATALOG,
            Target::Controller | Target::Host => SOFTWARE_CATALOG,
        }
    }

    /// Every factory available on `target`.
    pub fn catalog(target: Target) -> Vec<Factory> {
        Self::kinds(target)
            .iter()
            .map(|kind| Factory::new(target, *kind))
            .collect()
    }

    /// Every way this factory's pattern matches `node` under `ctx`.
    fn drafts(&self, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Vec<Draft> {
        let target = self.target;
        if !Self::kinds(target).contains(&self.kind) {
            return Vec::new();
        }
        let draft = match (self.kind, target) {
            (ModuleKind::Ignore, _) => shared::ignore(graph, node),
            (ModuleKind::ParseHeader, _) => shared::parse_header(target, graph, node),
            (ModuleKind::If, _) => shared::branch(target, graph, node),
            (ModuleKind::Route, _) => shared::route(target, graph, node),
            (ModuleKind::Allocate, _) => return shared::allocate(target, graph, ctx, node),

            (ModuleKind::TableLookup, Target::Switch) => switch::table_lookup(graph, ctx, node),
            (ModuleKind::TableLearn, Target::Switch) => switch::table_learn(graph, ctx, node),
            (ModuleKind::RegisterRead, Target::Switch) => switch::register_read(graph, ctx, node),
            (ModuleKind::RegisterWrite, Target::Switch) => {
                switch::register_write(graph, ctx, node)
            }
            (ModuleKind::SketchUpdate, Target::Switch) => switch::sketch_update(graph, ctx, node),
            (ModuleKind::SketchQuery, Target::Switch) => switch::sketch_query(graph, ctx, node),
            (ModuleKind::SendToController, Target::Switch) => {
                switch::send_to_controller(graph, node)
            }

            (ModuleKind::SketchUpdate, _) => software::sketch_update(target, graph, ctx, node),
            (ModuleKind::SketchQuery, _) => software::sketch_query(target, graph, ctx, node),
            (ModuleKind::MapGet, _) => software::map_get(target, graph, ctx, node),
            (ModuleKind::MapPut, _) => software::map_put(target, graph, ctx, node),
            (ModuleKind::MapErase, _) => software::map_erase(target, graph, ctx, node),
            (ModuleKind::VectorRead, _) => software::vector_read(target, graph, ctx, node),
            (ModuleKind::VectorWrite, _) => software::vector_write(target, graph, ctx, node),
            (ModuleKind::DchainAllocateIndex, _) => {
                software::dchain_allocate_index(target, graph, ctx, node)
            }
            (ModuleKind::DchainRejuvenate, _) => {
                software::dchain_rejuvenate(target, graph, ctx, node)
            }
            (ModuleKind::DchainFree, _) => software::dchain_free(target, graph, ctx, node),
            (ModuleKind::ExpireItems, _) => software::expire_items(target, graph, ctx, node),

            // Depends on the plan, not only on the node; see `recirculation`.
            (ModuleKind::Recirculate, _) => None,

            // Switch-only kinds on a software target, and the reverse.
            (ModuleKind::TableLookup, _)
            | (ModuleKind::TableLearn, _)
            | (ModuleKind::RegisterRead, _)
            | (ModuleKind::RegisterWrite, _)
            | (ModuleKind::SendToController, _) => None,
        };
        draft.into_iter().collect()
    }

    /// Offer a recirculation at the active leaf if some pipeline module for
    /// its node fails in a way a fresh pass could fix.
    fn recirculation(&self, env: &Environment, plan: &ExecutionPlan, leaf: &Leaf) -> Option<Draft> {
        if leaf.target != Target::Switch
            || leaf.recirculations >= env.registry.max_recirculations()
        {
            return None;
        }
        let blocked = env
            .registry
            .catalog(Target::Switch)
            .iter()
            .filter(|factory| factory.kind.uses_pipeline())
            .flat_map(|factory| factory.drafts(&env.graph, plan.context(), leaf.next))
            .any(|draft| {
                matches!(
                    probe(plan.resources(), &leaf.pass_deps, &draft),
                    Err(failure) if failure.fixed_by_new_pass()
                )
            });
        blocked.then(|| {
            Draft::skip(Successor::Revisit)
                .param("recirculations", leaf.recirculations as i64 + 1)
        })
    }

    /// Plan-independent gates: context consistency and target availability.
    fn admissible(&self, env: &Environment, ctx: &Context, draft: &Draft) -> bool {
        ctx.admits(&draft.commits)
            && match draft.next {
                Successor::Transfer { target, .. } => env.registry.is_enabled(target),
                _ => true,
            }
    }

    fn decision(&self, plan: &ExecutionPlan, node: NodeId, params: BTreeMap<String, i64>) -> Decision {
        Decision {
            plan: plan.id(),
            node,
            target: self.target,
            kind: self.kind,
            params,
        }
    }

    /// Probe whether this factory could map `node` given `ctx`.
    ///
    /// Pipeline feasibility is checked against `plan`'s resources without
    /// debiting them. Dependencies come from the active leaf when it sits at
    /// `node` on this factory's target, and are empty otherwise.
    pub fn speculate(
        &self,
        env: &Environment,
        plan: &ExecutionPlan,
        node: NodeId,
        ctx: &Context,
    ) -> Option<Speculation> {
        let empty = BTreeSet::new();
        let deps = plan
            .active_leaf()
            .filter(|leaf| leaf.next == node && leaf.target == self.target)
            .map_or(&empty, |leaf| &leaf.pass_deps);

        self.drafts(&env.graph, ctx, node)
            .into_iter()
            .filter(|draft| self.admissible(env, ctx, draft))
            .find_map(|mut draft| {
                let stages = probe(plan.resources(), deps, &draft).ok()?;
                if let Some(stage) = stages.first() {
                    draft.params.insert("stage".to_string(), *stage as i64);
                }
                Some(Speculation {
                    decision: self.decision(plan, node, draft.params),
                    delta: draft.commits,
                })
            })
    }

    /// Expand `plan` at its active leaf: one forked plan per match.
    ///
    /// Returns no candidates when the leaf is on another target, the pattern
    /// does not match, or every match violates a consistency or resource
    /// constraint.
    pub fn expand(
        &self,
        env: &Environment,
        plan: &ExecutionPlan,
        symbols: &mut SymbolSource,
    ) -> Expanded {
        let mut expanded = Expanded::default();
        let Some(leaf) = plan.active_leaf() else {
            return expanded;
        };
        if leaf.target != self.target {
            return expanded;
        }

        let drafts = match self.kind {
            ModuleKind::Recirculate => self.recirculation(env, plan, leaf).into_iter().collect(),
            _ => self.drafts(&env.graph, plan.context(), leaf.next),
        };
        for draft in drafts {
            if !self.admissible(env, plan.context(), &draft) {
                continue;
            }
            match self.realize(plan, leaf, draft, symbols) {
                Ok(candidate) => expanded.candidates.push(candidate),
                Err(failure) => {
                    trace!(
                        plan = plan.id(),
                        node = %leaf.next,
                        kind = %self.kind,
                        %failure,
                        "Candidate pruned by placement"
                    );
                    expanded.pruned.push(failure);
                }
            }
        }
        expanded
    }

    /// Fork `plan` and apply `draft` to the fork.
    fn realize(
        &self,
        plan: &ExecutionPlan,
        leaf: &Leaf,
        mut draft: Draft,
        symbols: &mut SymbolSource,
    ) -> Result<(Decision, ExecutionPlan), PlacementFailure> {
        let mut child = plan.fork();
        child.context_mut().apply(&draft.commits);

        let mut placed: Vec<ObjectId> = Vec::new();
        for (object, request) in &draft.placements {
            let deps = draft.dependencies(&leaf.pass_deps, &placed);
            let stage = child.resources_mut().place(*object, request, &deps)?;
            draft.params.entry("stage".to_string()).or_insert(stage as i64);
            placed.push(*object);
        }

        let node = leaf.next;
        let children = match draft.next {
            Successor::Stop => Vec::new(),
            Successor::Next(next) => vec![leaf.advance(next, &placed)],
            Successor::Branch { on_true, on_false } => vec![
                leaf.branch(on_true, &placed),
                leaf.branch(on_false, &placed),
            ],
            Successor::Transfer { target, next } => vec![leaf.transfer(target, next)],
            Successor::Revisit => Vec::new(),
        };

        match (draft.module, draft.next) {
            (Some(module), _) => {
                let transfers = module.transfer_target().is_some();
                let id = child.attach(module, children);
                if transfers {
                    child.record_symbol(id, symbols.fresh("cpu_code", 16));
                }
            }
            (None, Successor::Revisit) => child.recirculate(),
            (None, _) => child.skip(children),
        }

        Ok((self.decision(plan, node, draft.params), child))
    }

    /// Rebuild the module this factory produced for `node` from a context
    /// in which its allocation decisions are already committed.
    pub fn reconstruct(&self, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Module> {
        self.drafts(graph, ctx, node)
            .into_iter()
            .filter(|draft| {
                draft
                    .commits
                    .iter()
                    .all(|(addr, tag)| ctx.committed(*addr, *tag))
            })
            .find_map(|draft| draft.module)
    }
}

/// Stages `draft`'s objects would land in, without debiting anything.
///
/// Objects of the draft that are not placed yet are dropped from later
/// objects' dependencies, so a multi-object probe is optimistic.
fn probe(
    resources: &PipelineResources,
    pass_deps: &BTreeSet<ObjectId>,
    draft: &Draft,
) -> Result<Vec<usize>, PlacementFailure> {
    let mut stages = Vec::with_capacity(draft.placements.len());
    let mut seen: Vec<ObjectId> = Vec::new();
    for (object, request) in &draft.placements {
        let deps = draft
            .dependencies(pass_deps, &seen)
            .into_iter()
            .filter(|dep| resources.is_placed(*dep))
            .collect();
        stages.push(resources.probe(*object, request, &deps)?);
        seen.push(*object);
    }
    Ok(stages)
}
