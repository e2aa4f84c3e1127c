// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Immutable inputs shared by every plan of one search.

use crate::config::Config;
use crate::error::Result;
use crate::graph::BehaviorGraph;
use crate::target::TargetRegistry;
use tracing::debug;

/// Everything a factory or heuristic reads but never changes.
///
/// Built once per search. Plans hold no reference to it; it is passed
/// explicitly to every operation that needs it.
#[derive(Debug, Clone)]
pub struct Environment {
    pub graph: BehaviorGraph,
    pub registry: TargetRegistry,
    pub config: Config,
}

impl Environment {
    /// Validate `config` and build the target registry for `graph`.
    pub fn new(graph: BehaviorGraph, config: Config) -> Result<Self> {
        config.validate()?;
        let registry = TargetRegistry::from_config(&config)?;
        debug!(
            nodes = graph.len(),
            targets = %registry.enabled(),
            initial = %registry.initial(),
            "Environment initialized"
        );
        Ok(Self {
            graph,
            registry,
            config,
        })
    }
}
