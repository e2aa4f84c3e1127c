// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Loading configuration files and searching with them.

mod common;

use common::*;
use epsynth::config::{Config, TieBreak};
use epsynth::{synthesize, Error, Target};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
        [search]
        heuristic = "max-throughput"
        seed = 42
        tie_break = "walk"
        step_budget = 500

        [targets]
        initial = "switch"
        enabled = ["switch", "controller"]

        [switch]
        stages = 2
        digest_slots = 0

        [controller]
        capacity_mpps = 5
        "#,
    );
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.search.heuristic, "max-throughput");
    assert_eq!(config.search.seed, 42);
    assert_eq!(config.search.tie_break, TieBreak::Walk);
    assert_eq!(config.search.step_budget, Some(500));
    assert_eq!(config.switch.stages, 2);
    assert_eq!(config.capacity_mpps(Target::Controller), 5);
    // Unspecified fields keep their defaults.
    assert_eq!(config.switch.max_match_keys, 8);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    match Config::load(&path) {
        Err(Error::ConfigRead { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected ConfigRead, got {:?}", other),
    }
}

#[test]
fn test_invalid_file() {
    let file = write_config(
        r#"
        [targets]
        enabled = []
        "#,
    );
    assert!(matches!(Config::load(file.path()), Err(Error::Config(_))));
}

#[test]
fn test_no_digest_slots_forces_controller_learning() {
    init_tracing();
    let file = write_config(
        r#"
        [search]
        stop_on_first_solution = false
        heuristic = "min-stages"

        [switch]
        digest_slots = 0
        "#,
    );
    let config = Config::load(file.path()).unwrap();
    let outcome = synthesize(learning_bridge(), config).unwrap();
    assert!(outcome.exhausted);
    assert!(!outcome.finished.is_empty());
    // Without digests the switch cannot learn, so every plan reaches the
    // controller on the learning path.
    for plan in &outcome.finished {
        assert!(plan.meta().modules_on(Target::Controller) > 0);
        assert!(plan.verify_finished(&outcome.environment).is_ok());
    }
    assert!(outcome.statistics.total_failures() > 0);
}

#[test]
fn test_unknown_heuristic_in_file() {
    let file = write_config(
        r#"
        [search]
        heuristic = "fastest"
        "#,
    );
    let config = Config::load(file.path()).unwrap();
    assert!(matches!(
        synthesize(port_counter(), config),
        Err(Error::UnknownHeuristic(_))
    ));
}
