// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Multi-objective plan scoring.
//!
//! A heuristic declares an ordered list of named metrics, each to be
//! maximised or minimised, and evaluates a plan to one value per metric.
//! Plans are compared lexicographically on those values.
//!
//! ```
//! use epsynth::engine::heuristic::{Metric, Objective, Score};
//!
//! const METRICS: &[Metric] = &[
//!     Metric::new("progress", Objective::Max),
//!     Metric::new("stages", Objective::Min),
//! ];
//! let a = Score::new(METRICS, &[5, 3]);
//! let b = Score::new(METRICS, &[5, 2]);
//! let c = Score::new(METRICS, &[4, 0]);
//! assert!(b > a);
//! assert!(a > c);
//! ```

use crate::context::Environment;
use crate::error::{Error, Result};
use crate::module::ModuleKind;
use crate::plan::{path_rate, ExecutionPlan, Leaf};
use crate::target::Target;
use serde::Serialize;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum Objective {
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub name: &'static str,
    pub objective: Objective,
}

impl Metric {
    pub const fn new(name: &'static str, objective: Objective) -> Self {
        Self { name, objective }
    }
}

/// Comparable score; greater is better.
///
/// Values of `Min` metrics are stored negated so the derived lexicographic
/// order ranks every metric in the same direction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Score(Vec<i64>);

impl Score {
    /// # Panics
    ///
    /// Panics if `values` does not have one entry per metric.
    pub fn new(metrics: &[Metric], values: &[i64]) -> Self {
        assert_eq!(
            metrics.len(),
            values.len(),
            "Heuristic produced {} values for {} metrics",
            values.len(),
            metrics.len()
        );
        Score(
            metrics
                .iter()
                .zip(values)
                .map(|(metric, value)| match metric.objective {
                    Objective::Max => *value,
                    Objective::Min => -*value,
                })
                .collect(),
        )
    }

    pub fn keys(&self) -> &[i64] {
        &self.0
    }
}

/// A pluggable ranking of plans.
pub trait Heuristic {
    fn name(&self) -> &'static str;

    fn metrics(&self) -> &'static [Metric];

    /// One value per metric, in declaration order.
    fn evaluate(&self, env: &Environment, plan: &ExecutionPlan) -> Vec<i64>;

    /// Called for every finished plan the search admits. Returns true if
    /// the heuristic's internal state changed in a way that may change
    /// earlier scores.
    fn observe_finished(&mut self, _env: &Environment, _plan: &ExecutionPlan) -> bool {
        false
    }

    fn score(&self, env: &Environment, plan: &ExecutionPlan) -> Score {
        Score::new(self.metrics(), &self.evaluate(env, plan))
    }
}

/// Names accepted by [`by_name`].
pub const HEURISTICS: &[&str] = &["max-progress", "min-stages", "max-throughput"];

/// Construct a built-in heuristic from its configuration name.
pub fn by_name(name: &str) -> Result<Box<dyn Heuristic>> {
    match name {
        "max-progress" => Ok(Box::new(MaxProgress)),
        "min-stages" => Ok(Box::new(MinStages)),
        "max-throughput" => Ok(Box::new(MaxThroughput::default())),
        other => Err(Error::UnknownHeuristic(other.to_string())),
    }
}

fn progress(plan: &ExecutionPlan) -> i64 {
    plan.meta().processed_nodes() as i64
}

fn stages(plan: &ExecutionPlan) -> i64 {
    plan.resources().stages_used() as i64
}

fn recirculations(plan: &ExecutionPlan) -> i64 {
    plan.meta().recirculations() as i64
}

fn controller_modules(plan: &ExecutionPlan) -> i64 {
    plan.meta().modules_on(Target::Controller) as i64
}

/// Expected rate of the subtree below `leaf`, in thousandths of Mpps.
///
/// Walks down the first child of each node, asking the leaf's target to
/// speculate on each one. When the switch cannot map a node the walk moves
/// to the controller, if enabled; a node no target can map yields zero.
fn lookahead(env: &Environment, plan: &ExecutionPlan, leaf: &Leaf) -> u64 {
    let mut ctx = plan.context().clone();
    let mut node = leaf.next;
    let mut target = leaf.target;

    for _ in 0..env.config.search.lookahead_nodes {
        let speculation = env
            .registry
            .catalog(target)
            .iter()
            .filter(|factory| factory.kind != ModuleKind::SendToController)
            .find_map(|factory| factory.speculate(env, plan, node, &ctx));
        match speculation {
            Some(speculation) => ctx.apply(&speculation.delta),
            None if target == Target::Switch && env.registry.is_enabled(Target::Controller) => {
                target = Target::Controller;
                continue;
            }
            None => return 0,
        }
        match env.graph.node(node).children().first() {
            Some(child) => node = *child,
            None => break,
        }
    }
    path_rate(env.registry.capacity_mpps(target), leaf.recirculations) >> leaf.branch_depth.min(63)
}

/// Throughput of the completed paths plus a lookahead estimate for every
/// open leaf, in thousandths of Mpps.
pub fn speculative_throughput(env: &Environment, plan: &ExecutionPlan) -> u64 {
    plan.throughput(env)
        + plan
            .leaves()
            .iter()
            .map(|leaf| lookahead(env, plan, leaf))
            .sum::<u64>()
}

/// Go deep first: most graph nodes handled, then fewest recirculations and
/// controller modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxProgress;

impl Heuristic for MaxProgress {
    fn name(&self) -> &'static str {
        "max-progress"
    }

    fn metrics(&self) -> &'static [Metric] {
        const METRICS: &[Metric] = &[
            Metric::new("progress", Objective::Max),
            Metric::new("recirculations", Objective::Min),
            Metric::new("controller-modules", Objective::Min),
        ];
        METRICS
    }

    fn evaluate(&self, _env: &Environment, plan: &ExecutionPlan) -> Vec<i64> {
        vec![progress(plan), recirculations(plan), controller_modules(plan)]
    }
}

/// Fewest pipeline stages, then fewest recirculations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinStages;

impl Heuristic for MinStages {
    fn name(&self) -> &'static str {
        "min-stages"
    }

    fn metrics(&self) -> &'static [Metric] {
        const METRICS: &[Metric] = &[
            Metric::new("stages", Objective::Min),
            Metric::new("recirculations", Objective::Min),
            Metric::new("progress", Objective::Max),
        ];
        METRICS
    }

    fn evaluate(&self, _env: &Environment, plan: &ExecutionPlan) -> Vec<i64> {
        vec![stages(plan), recirculations(plan), progress(plan)]
    }
}

/// Highest speculative throughput.
///
/// Remembers the best finished throughput seen so far and ranks plans that
/// could still beat it above those that cannot. Finding a better plan
/// changes that split, so [`Heuristic::observe_finished`] reports it.
#[derive(Debug, Clone, Default)]
pub struct MaxThroughput {
    best_finished: Option<u64>,
}

impl MaxThroughput {
    pub fn best_finished(&self) -> Option<u64> {
        self.best_finished
    }
}

impl Heuristic for MaxThroughput {
    fn name(&self) -> &'static str {
        "max-throughput"
    }

    fn metrics(&self) -> &'static [Metric] {
        const METRICS: &[Metric] = &[
            Metric::new("beats-best", Objective::Max),
            Metric::new("throughput", Objective::Max),
            Metric::new("progress", Objective::Max),
        ];
        METRICS
    }

    fn evaluate(&self, env: &Environment, plan: &ExecutionPlan) -> Vec<i64> {
        let throughput = speculative_throughput(env, plan);
        let beats = self
            .best_finished
            .map_or(true, |best| throughput > best);
        vec![beats as i64, throughput as i64, progress(plan)]
    }

    fn observe_finished(&mut self, env: &Environment, plan: &ExecutionPlan) -> bool {
        let throughput = plan.throughput(env);
        if self.best_finished.map_or(true, |best| throughput > best) {
            self.best_finished = Some(throughput);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::ops::{self, arg};
    use crate::graph::{Call, Expr, GraphBuilder, Route};

    fn dchain_env(enabled: Vec<Target>) -> Environment {
        let mut b = GraphBuilder::new();
        let fwd = b.terminal(Route::Forward { port: 3 });
        let alloc = b.call(
            Call::new(ops::DCHAIN_ALLOCATE)
                .arg(arg::OBJ, Expr::addr(0x10))
                .arg(arg::CAPACITY, Expr::constant(64, 32)),
            fwd,
        );
        let mut config = Config::default();
        config.targets.enabled = enabled;
        Environment::new(b.finish(alloc).unwrap(), config).unwrap()
    }

    #[test]
    fn test_min_metrics_are_negated() {
        const METRICS: &[Metric] = &[Metric::new("stages", Objective::Min)];
        assert_eq!(Score::new(METRICS, &[3]).keys(), &[-3]);
        assert!(Score::new(METRICS, &[1]) > Score::new(METRICS, &[2]));
    }

    #[test]
    #[should_panic(expected = "values for")]
    fn test_score_arity_checked() {
        const METRICS: &[Metric] = &[Metric::new("progress", Objective::Max)];
        Score::new(METRICS, &[1, 2]);
    }

    #[test]
    fn test_by_name() {
        for name in HEURISTICS {
            assert_eq!(by_name(name).unwrap().name(), *name);
        }
        assert!(matches!(
            by_name("fastest"),
            Err(Error::UnknownHeuristic(name)) if name == "fastest"
        ));
    }

    #[test]
    fn test_lookahead_falls_back_to_controller() {
        let env = dchain_env(vec![Target::Switch, Target::Controller]);
        let plan = ExecutionPlan::new(&env);
        assert_eq!(speculative_throughput(&env, &plan), 20 * 1000);
    }

    #[test]
    fn test_lookahead_dead_end_is_zero() {
        let env = dchain_env(vec![Target::Switch]);
        let plan = ExecutionPlan::new(&env);
        assert_eq!(speculative_throughput(&env, &plan), 0);
    }

    #[test]
    fn test_max_throughput_tracks_best() {
        let env = dchain_env(vec![Target::Switch, Target::Controller]);
        let plan = ExecutionPlan::new(&env);
        let mut heuristic = MaxThroughput::default();
        assert_eq!(heuristic.evaluate(&env, &plan)[0], 1);

        // A plan with no completed paths has zero throughput.
        assert!(heuristic.observe_finished(&env, &plan));
        assert_eq!(heuristic.best_finished(), Some(0));
        assert!(!heuristic.observe_finished(&env, &plan));
        assert_eq!(heuristic.evaluate(&env, &plan), vec![1, 20_000, 0]);
    }
}
