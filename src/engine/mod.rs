// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Best-first search over execution plans.
//!
//! The engine keeps two score-ordered frontiers: `unfinished` plans that
//! still have leaves to expand, and `finished` plans that passed their
//! terminal-state checks. One step takes the best unfinished plan, offers
//! its active leaf to every registered factory, and files the resulting
//! plans by whether they are finished. A heuristic that changes its mind
//! after seeing a finished plan causes both frontiers to be re-scored
//! before the next step.
//!
//! # Example
//!
//! ```
//! use epsynth::config::Config;
//! use epsynth::engine::SearchEngine;
//! use epsynth::graph::{GraphBuilder, Route};
//!
//! let mut b = GraphBuilder::new();
//! let root = b.terminal(Route::Forward { port: 0 });
//! let graph = b.finish(root).unwrap();
//!
//! let outcome = SearchEngine::new(graph, Config::default()).unwrap().search();
//! assert_eq!(outcome.finished.len(), 1);
//! assert!(outcome.finished[0].verify_finished(&outcome.environment).is_ok());
//! ```

pub mod frontier;
pub mod heuristic;
pub mod statistics;
pub mod trace;

pub use frontier::Frontier;
pub use heuristic::{Heuristic, Metric, Objective, Score};
pub use statistics::{Counters, Statistics};
pub use trace::{SearchTrace, TraceCandidate, TraceStep};

use crate::config::Config;
use crate::context::Environment;
use crate::error::Result;
use crate::graph::{BehaviorGraph, SymbolSource};
use crate::module::{Decision, ModuleKind};
use crate::plan::ExecutionPlan;
use crate::pipeline::PlacementFailure;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

/// What one call to [`SearchEngine::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The plan `plan` was expanded into `candidates` new plans, of which
    /// `finished` were admitted as finished.
    Expanded {
        plan: u64,
        candidates: usize,
        finished: usize,
    },
    /// No unfinished plan was left to expand.
    Exhausted,
}

/// Result of a completed search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Finished plans, best first.
    pub finished: Vec<ExecutionPlan>,
    pub statistics: Statistics,
    pub trace: Option<SearchTrace>,
    /// True if the search ran out of unfinished plans. With `finished`
    /// empty this means no implementation exists under the configuration.
    pub exhausted: bool,
    pub steps: u64,
    /// The graph, registry and configuration the plans were built against.
    pub environment: Environment,
}

pub struct SearchEngine {
    env: Environment,
    heuristic: Box<dyn Heuristic>,
    rng: StdRng,
    symbols: SymbolSource,
    unfinished: Frontier,
    finished: Frontier,
    statistics: Statistics,
    trace: Option<SearchTrace>,
    steps: u64,
}

impl SearchEngine {
    /// Build an engine using the heuristic named in `config`.
    pub fn new(graph: BehaviorGraph, config: Config) -> Result<Self> {
        let env = Environment::new(graph, config)?;
        let heuristic = heuristic::by_name(&env.config.search.heuristic)?;
        Ok(Self::with_heuristic(env, heuristic))
    }

    /// Build an engine with a caller-supplied heuristic. The configured
    /// heuristic name is ignored.
    pub fn with_heuristic(env: Environment, heuristic: Box<dyn Heuristic>) -> Self {
        let rng = StdRng::seed_from_u64(env.config.search.seed);
        let trace = env.config.search.trace.then(|| {
            SearchTrace::new(
                heuristic.name(),
                heuristic.metrics().iter().map(|metric| metric.name.to_string()),
            )
        });
        let root = ExecutionPlan::new(&env);
        let mut unfinished = Frontier::new();
        unfinished.insert(heuristic.score(&env, &root), root);
        Self {
            env,
            heuristic,
            rng,
            symbols: SymbolSource::new(),
            unfinished,
            finished: Frontier::new(),
            statistics: Statistics::new(),
            trace,
            steps: 0,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn heuristic(&self) -> &dyn Heuristic {
        self.heuristic.as_ref()
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn unfinished(&self) -> &Frontier {
        &self.unfinished
    }

    pub fn finished(&self) -> &Frontier {
        &self.finished
    }

    /// Expand the best unfinished plan once.
    ///
    /// # Panics
    ///
    /// Panics if a plan with no leaves fails its terminal-state checks;
    /// that is a factory defect, not a search outcome.
    pub fn step(&mut self) -> StepOutcome {
        let tie_break = self.env.config.search.tie_break;
        let Some((score, plan)) = self.unfinished.pop_best(&mut self.rng, tie_break) else {
            return StepOutcome::Exhausted;
        };
        let leaf = plan
            .active_leaf()
            .unwrap_or_else(|| panic!("Unfinished plan {} has no active leaf", plan.id()));
        let (node, target) = (leaf.next, leaf.target);
        self.steps += 1;
        self.statistics.increment(Counters::Steps);

        let mut candidates: Vec<(Decision, ExecutionPlan)> = Vec::new();
        let mut pruned: Vec<PlacementFailure> = Vec::new();
        for enabled in self.env.registry.enabled().iter() {
            for factory in self.env.registry.catalog(enabled) {
                let expanded = factory.expand(&self.env, &plan, &mut self.symbols);
                candidates.extend(expanded.candidates);
                pruned.extend(expanded.pruned);
            }
        }
        for failure in &pruned {
            self.statistics.record_failure(failure);
        }
        self.statistics.add(Counters::Candidates, candidates.len() as u64);

        debug!(
            step = self.steps,
            plan = plan.id(),
            %node,
            %target,
            score = ?score.keys(),
            candidates = candidates.len(),
            pruned = pruned.len(),
            "Expanded plan"
        );
        if candidates.is_empty() {
            self.statistics.increment(Counters::DeadEnds);
            debug!(plan = plan.id(), %node, %target, "Dead end");
        }

        let mut trace_candidates = Vec::new();
        let mut admitted = 0;
        let mut mutated = false;
        let count = candidates.len();
        for (decision, child) in candidates {
            if matches!(decision.kind, ModuleKind::Ignore | ModuleKind::Recirculate) {
                self.statistics.increment(Counters::Skips);
            }
            let finished = child.is_finished();
            if self.trace.is_some() {
                trace_candidates.push(TraceCandidate {
                    decision,
                    plan: child.id(),
                    finished,
                });
            }
            if !finished {
                let score = self.heuristic.score(&self.env, &child);
                self.unfinished.insert(score, child);
                continue;
            }

            if let Err(defect) = child.verify_finished(&self.env) {
                panic!("Finished plan {} is invalid: {}", child.id(), defect);
            }
            if self.env.config.search.stop_on_first_solution && !self.finished.is_empty() {
                warn!(plan = child.id(), "Dropping extra solution in stop-on-first mode");
                self.statistics.increment(Counters::DroppedSolutions);
                continue;
            }
            mutated |= self.heuristic.observe_finished(&self.env, &child);
            info!(
                plan = child.id(),
                throughput = child.throughput(&self.env),
                stages = child.resources().stages_used(),
                "Finished plan admitted"
            );
            self.statistics.increment(Counters::FinishedPlans);
            let score = self.heuristic.score(&self.env, &child);
            self.finished.insert(score, child);
            admitted += 1;
        }

        if let Some(trace) = self.trace.as_mut() {
            trace.steps.push(TraceStep {
                step: self.steps,
                plan: plan.id(),
                node,
                target,
                score: score.keys().to_vec(),
                candidates: trace_candidates,
                pruned: pruned.iter().map(ToString::to_string).collect(),
            });
        }

        if mutated {
            self.rescore();
        }

        StepOutcome::Expanded {
            plan: plan.id(),
            candidates: count,
            finished: admitted,
        }
    }

    fn rescore(&mut self) {
        let env = &self.env;
        let heuristic = &self.heuristic;
        self.unfinished.rebuild(|plan| heuristic.score(env, plan));
        self.finished.rebuild(|plan| heuristic.score(env, plan));
        self.statistics.increment(Counters::Rebuilds);
        debug!(unfinished = self.unfinished.len(), "Frontiers rescored");
    }

    /// Step until a stop condition holds.
    ///
    /// Stops when a plan has finished in stop-on-first mode, when the step
    /// budget is spent, or when no unfinished plan remains.
    pub fn search(mut self) -> SearchOutcome {
        let stop_on_first = self.env.config.search.stop_on_first_solution;
        let budget = self.env.config.search.step_budget;
        let exhausted = loop {
            if stop_on_first && !self.finished.is_empty() {
                break false;
            }
            if budget.is_some_and(|budget| self.steps >= budget) {
                info!(steps = self.steps, "Step budget spent");
                break false;
            }
            if self.step() == StepOutcome::Exhausted {
                break true;
            }
        };

        info!(
            heuristic = self.heuristic.name(),
            finished = self.finished.len(),
            unfinished = self.unfinished.len(),
            exhausted,
            statistics = %self.statistics,
            "Search ended"
        );
        SearchOutcome {
            finished: self.finished.into_sorted_vec(),
            statistics: self.statistics,
            trace: self.trace,
            exhausted,
            steps: self.steps,
            environment: self.env,
        }
    }
}
