// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! End-to-end searches over small network functions.

mod common;

use common::*;
use epsynth::config::Config;
use epsynth::context::DSImpl;
use epsynth::engine::heuristic::HEURISTICS;
use epsynth::engine::{Counters, SearchEngine};
use epsynth::graph::{Addr, BehaviorGraph};
use epsynth::module::ModuleKind;
use epsynth::pipeline::{ObjectId, ObjectRole};
use epsynth::{synthesize, SearchOutcome, Target};
use std::collections::BTreeSet;

fn run(graph: BehaviorGraph, config: Config) -> SearchOutcome {
    init_tracing();
    synthesize(graph, config).expect("configuration is valid")
}

fn check_finished(outcome: &SearchOutcome) {
    let env = &outcome.environment;
    for plan in &outcome.finished {
        if let Err(defect) = plan.verify_finished(env) {
            panic!("plan {} is not a valid finished plan: {}", plan.id(), defect);
        }
        assert_reconstructible(env, plan);

        let addrs: Vec<Addr> = plan.context().iter().map(|(addr, _)| addr).collect();
        let distinct: BTreeSet<Addr> = addrs.iter().copied().collect();
        assert_eq!(addrs.len(), distinct.len());
    }
}

#[test]
fn test_stop_on_first_solution_yields_exactly_one() {
    let outcome = run(learning_bridge(), Config::default());
    assert_eq!(outcome.finished.len(), 1);
    assert_eq!(outcome.statistics.get(Counters::FinishedPlans), 1);
    assert!(!outcome.exhausted);
    check_finished(&outcome);
}

#[test]
fn test_exhaustive_plans_are_complete() {
    for graph in [learning_bridge(), port_counter(), flow_allocator()] {
        let outcome = run(graph, exhaustive("max-progress", 3));
        assert!(outcome.exhausted);
        assert!(!outcome.finished.is_empty());
        assert_eq!(outcome.statistics.get(Counters::DroppedSolutions), 0);
        check_finished(&outcome);
    }
}

#[test]
fn test_learning_bridge_all_on_switch() {
    let outcome = run(learning_bridge(), exhaustive("min-stages", 0));
    let plan = outcome
        .finished
        .iter()
        .find(|plan| plan.meta().modules_on(Target::Controller) == 0)
        .expect("an all-switch plan exists");

    let table = ObjectId::new(Addr(MAC_TABLE), ObjectRole::Table);
    let digest = ObjectId::new(Addr(MAC_TABLE), ObjectRole::Digest);
    assert_eq!(plan.resources().stage_of(table), Some(0));
    assert_eq!(plan.resources().stage_of(digest), Some(1));
    assert_eq!(plan.resources().stages_used(), 2);
    assert_eq!(
        plan.context().get(Addr(MAC_TABLE)),
        Some(DSImpl::ExactMatchTable)
    );
    assert!(plan
        .nodes()
        .iter()
        .any(|node| node.module.kind() == ModuleKind::TableLearn));
}

#[test]
fn test_register_read_and_write_share_a_stage() {
    let outcome = run(port_counter(), exhaustive("min-stages", 0));
    let plan = outcome
        .finished
        .iter()
        .find(|plan| plan.meta().modules_on(Target::Controller) == 0)
        .expect("an all-switch plan exists");

    let register = ObjectId::new(Addr(COUNTERS), ObjectRole::Register);
    assert_eq!(plan.resources().stage_of(register), Some(0));
    assert_eq!(plan.resources().stages_used(), 1);
    assert!(outcome.statistics.get(Counters::Skips) > 0);
}

#[test]
fn test_host_only_bridge() {
    let mut config = exhaustive("max-throughput", 0);
    config.targets.initial = Target::Host;
    config.targets.enabled = vec![Target::Host];
    let outcome = run(learning_bridge(), config);
    assert_eq!(outcome.finished.len(), 1);

    let plan = &outcome.finished[0];
    assert_eq!(plan.meta().modules_on(Target::Host), plan.meta().total_modules());
    assert_eq!(plan.context().get(Addr(MAC_TABLE)), Some(DSImpl::InMemoryMap));
    // Two paths, each behind one branch: half the host rate each.
    assert_eq!(plan.throughput(&outcome.environment), 20 * 1000);
    check_finished(&outcome);
}

#[test]
fn test_dchain_needs_the_controller() {
    let outcome = run(flow_allocator(), Config::default());
    assert_eq!(outcome.finished.len(), 1);
    let plan = &outcome.finished[0];
    assert!(plan.meta().modules_on(Target::Controller) > 0);
    assert_eq!(plan.context().get(Addr(FLOWS)), Some(DSImpl::InMemoryDchain));
    assert_eq!(plan.meta().minted().len(), 1);

    let mut config = Config::default();
    config.targets.enabled = vec![Target::Switch];
    let outcome = run(flow_allocator(), config);
    assert!(outcome.exhausted);
    assert!(outcome.finished.is_empty());
    assert!(outcome.statistics.get(Counters::DeadEnds) > 0);
}

#[test]
fn test_same_seed_same_search() {
    let decisions = |seed: u64| {
        let mut config = exhaustive("max-progress", seed);
        config.search.trace = true;
        config.search.step_budget = Some(40);
        let outcome = run(learning_bridge(), config);
        outcome
            .trace
            .expect("trace was requested")
            .steps
            .into_iter()
            .map(|step| {
                let kinds: Vec<ModuleKind> = step
                    .candidates
                    .iter()
                    .map(|candidate| candidate.decision.kind)
                    .collect();
                (step.node, step.target, kinds)
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(decisions(7), decisions(7));
}

#[test]
fn test_every_heuristic_finds_a_plan() {
    for name in HEURISTICS {
        let mut config = Config::default();
        config.search.heuristic = name.to_string();
        let outcome = run(learning_bridge(), config);
        assert_eq!(outcome.finished.len(), 1, "{} found no plan", name);
        check_finished(&outcome);
    }
}

#[test]
fn test_walk_tie_break() {
    let mut config = exhaustive("min-stages", 11);
    config.search.tie_break = epsynth::config::TieBreak::Walk;
    let outcome = run(port_counter(), config);
    assert!(outcome.exhausted);
    check_finished(&outcome);
}

#[test]
fn test_engine_steps_manually() {
    init_tracing();
    let mut engine =
        SearchEngine::new(flow_allocator(), Config::default()).expect("configuration is valid");
    while engine.finished().is_empty() {
        assert_ne!(engine.step(), epsynth::engine::StepOutcome::Exhausted);
    }
    assert_eq!(engine.statistics().get(Counters::Steps), engine.steps());
}
