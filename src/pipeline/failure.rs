// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Reasons a placement request cannot be satisfied.

use crate::pipeline::ObjectId;
use std::fmt;
use strum_macros::EnumCount as EnumCountMacro;
use thiserror::Error;

/// Why an object cannot be placed.
///
/// These are search-time outcomes, not errors: factories use them to prune a
/// candidate, and the distinction tells whether a fresh pipeline pass
/// (recirculation) could help.
#[derive(Debug, Clone, PartialEq, Eq, Error, EnumCountMacro)]
pub enum PlacementFailure {
    #[error("{object} does not fit in an empty stage")]
    TooLarge { object: ObjectId },

    #[error("{object} matches on {keys} keys (max {max})")]
    TooManyKeys {
        object: ObjectId,
        keys: usize,
        max: usize,
    },

    #[error("{object} needs {needed} crossbar bits (stage has {available})")]
    CrossbarExceeded {
        object: ObjectId,
        needed: u64,
        available: u64,
    },

    #[error("No stage from {earliest} onwards has room for {object}")]
    NoStageAvailable { object: ObjectId, earliest: usize },

    #[error("{object} is placed at stage {stage} but {conflict}")]
    InconsistentPlacement {
        object: ObjectId,
        stage: usize,
        conflict: Conflict,
    },

    #[error("{object} depends on itself")]
    SelfDependency { object: ObjectId },

    #[error("No digest slot left for {object}")]
    NoDigestSlots { object: ObjectId },

    #[error("{object} depends on {dependency}, which is not placed before it")]
    UnmetDependency {
        object: ObjectId,
        dependency: ObjectId,
    },
}

/// What a new request for an already-placed object asks that its stage
/// cannot give.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// The dependencies now need this stage or a later one.
    After(usize),
    /// Exactly this stage was requested.
    Exactly(usize),
    /// The request is larger than what was placed, and the stage has no room
    /// for the difference.
    NoRoom,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::After(stage) => write!(f, "now needs stage {} or later", stage),
            Conflict::Exactly(stage) => write!(f, "stage {} was requested", stage),
            Conflict::NoRoom => write!(f, "that stage has no room for it to grow"),
        }
    }
}

impl PlacementFailure {
    /// Dense index, for per-kind counters.
    pub fn index(&self) -> usize {
        match self {
            PlacementFailure::TooLarge { .. } => 0,
            PlacementFailure::TooManyKeys { .. } => 1,
            PlacementFailure::CrossbarExceeded { .. } => 2,
            PlacementFailure::NoStageAvailable { .. } => 3,
            PlacementFailure::InconsistentPlacement { .. } => 4,
            PlacementFailure::SelfDependency { .. } => 5,
            PlacementFailure::NoDigestSlots { .. } => 6,
            PlacementFailure::UnmetDependency { .. } => 7,
        }
    }

    /// True if the same request could succeed in a fresh pipeline pass.
    pub fn fixed_by_new_pass(&self) -> bool {
        matches!(
            self,
            PlacementFailure::SelfDependency { .. }
                | PlacementFailure::NoStageAvailable { .. }
                | PlacementFailure::InconsistentPlacement { .. }
        )
    }

    pub fn object(&self) -> ObjectId {
        match self {
            PlacementFailure::TooLarge { object }
            | PlacementFailure::TooManyKeys { object, .. }
            | PlacementFailure::CrossbarExceeded { object, .. }
            | PlacementFailure::NoStageAvailable { object, .. }
            | PlacementFailure::InconsistentPlacement { object, .. }
            | PlacementFailure::SelfDependency { object }
            | PlacementFailure::NoDigestSlots { object }
            | PlacementFailure::UnmetDependency { object, .. } => *object,
        }
    }
}
