// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Error types for recoverable input and configuration problems.
//!
//! Search-time conditions are not errors: a factory that does not apply
//! returns no candidate, and a placement that does not fit returns a
//! [`PlacementFailure`](crate::pipeline::PlacementFailure). Broken invariants
//! panic.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration is not valid TOML: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed behavior graph: {0}")]
    Graph(String),

    #[error("Unknown heuristic '{0}'. Expected one of max-progress, min-stages, max-throughput.")]
    UnknownHeuristic(String),

    #[error("Cannot serialize search trace: {0}")]
    Trace(#[from] serde_json::Error),
}
