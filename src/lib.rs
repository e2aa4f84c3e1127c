// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Execution-plan synthesis for packet-processing programs.
//!
//! Given a behavior graph describing every path a packet can take through a
//! verified network function, search for an execution plan that maps each
//! graph node to a module on one of several targets: a programmable switch
//! pipeline, its companion controller CPU, or a general-purpose host.
//!
//! # Architecture
//!
//! The implementation uses a two-tier memory model:
//!
//! ## Tier 1: Environment (Immutable)
//!
//! Built once per search and passed explicitly to every operation:
//! - The behavior graph
//! - The target registry: factory catalogs and the initial pipeline budget
//! - The configuration
//!
//! ## Tier 2: Plans (Mutable, forked)
//!
//! Each candidate plan owns its state outright:
//! - Context - which data-structure implementation each object commits to
//! - PipelineResources - remaining per-stage switch budgets and placements
//! - The plan tree and its frontier of leaves
//!
//! Forking is cheap because the larger parts are shared copy-on-write, and
//! no plan can observe a sibling's changes.
//!
//! # Search Algorithm
//!
//! Best-first search with a pluggable multi-objective heuristic:
//!
//! 1. Pop the best-scored unfinished plan (ties broken by a seeded RNG)
//! 2. Offer its active leaf to every factory of every enabled target
//! 3. Verify and admit plans with no leaves left; queue the rest
//! 4. Re-score everything if the heuristic's state changed
//!
//! # Example
//!
//! ```
//! use epsynth::config::Config;
//! use epsynth::graph::{GraphBuilder, Route};
//!
//! let mut b = GraphBuilder::new();
//! let root = b.terminal(Route::Drop);
//! let outcome = epsynth::synthesize(b.finish(root).unwrap(), Config::default()).unwrap();
//! assert_eq!(outcome.finished.len(), 1);
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod graph;
pub mod module;
pub mod pipeline;
pub mod plan;
pub mod target;

// Re-export commonly used types
pub use config::Config;
pub use context::{Context, Environment};
pub use engine::{SearchEngine, SearchOutcome};
pub use error::{Error, Result};
pub use graph::BehaviorGraph;
pub use plan::ExecutionPlan;
pub use target::Target;

/// Search for execution plans of `graph` under `config`.
pub fn synthesize(graph: BehaviorGraph, config: Config) -> Result<SearchOutcome> {
    Ok(SearchEngine::new(graph, config)?.search())
}
