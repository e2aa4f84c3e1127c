// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Implementation tags for abstract stateful objects.

use crate::target::{Target, TargetSet};
use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// The abstract data structure a program allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum Structure {
    Map,
    Vector,
    Dchain,
    Sketch,
}

/// A concrete physical representation for one abstract object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, Serialize,
)]
#[strum(serialize_all = "kebab-case")]
pub enum DSImpl {
    /// Switch exact-match table; the controller writes entries through the control plane.
    ExactMatchTable,
    /// Switch register array; readable and writable from the control plane.
    RegisterArray,
    /// Sketch built from switch hash units and register rows.
    CountMinSketch,
    InMemoryMap,
    InMemoryVector,
    InMemoryDchain,
    InMemorySketch,
}

impl DSImpl {
    pub fn structure(self) -> Structure {
        match self {
            DSImpl::ExactMatchTable | DSImpl::InMemoryMap => Structure::Map,
            DSImpl::RegisterArray | DSImpl::InMemoryVector => Structure::Vector,
            DSImpl::CountMinSketch | DSImpl::InMemorySketch => Structure::Sketch,
            DSImpl::InMemoryDchain => Structure::Dchain,
        }
    }

    /// Targets able to operate on an object with this representation.
    pub fn accessible_from(self) -> TargetSet {
        match self {
            DSImpl::ExactMatchTable | DSImpl::RegisterArray | DSImpl::CountMinSketch => {
                TargetSet::from_targets(&[Target::Switch, Target::Controller])
            }
            DSImpl::InMemoryMap
            | DSImpl::InMemoryVector
            | DSImpl::InMemoryDchain
            | DSImpl::InMemorySketch => TargetSet::from_targets(&[Target::Controller, Target::Host]),
        }
    }

    /// True if the representation occupies switch pipeline resources.
    pub fn is_switch_resident(self) -> bool {
        matches!(
            self,
            DSImpl::ExactMatchTable | DSImpl::RegisterArray | DSImpl::CountMinSketch
        )
    }
}

impl Structure {
    /// Representations `target` may choose when allocating this structure,
    /// in order of preference.
    pub fn candidates(self, target: Target) -> &'static [DSImpl] {
        match (target, self) {
            (Target::Switch, Structure::Map) => &[DSImpl::ExactMatchTable],
            (Target::Switch, Structure::Vector) => &[DSImpl::RegisterArray],
            (Target::Switch, Structure::Sketch) => &[DSImpl::CountMinSketch],
            (Target::Switch, Structure::Dchain) => &[],
            (Target::Controller, Structure::Map) => &[DSImpl::InMemoryMap, DSImpl::ExactMatchTable],
            (Target::Controller, Structure::Vector) => {
                &[DSImpl::InMemoryVector, DSImpl::RegisterArray]
            }
            (Target::Controller, Structure::Sketch) => {
                &[DSImpl::InMemorySketch, DSImpl::CountMinSketch]
            }
            (Target::Controller, Structure::Dchain) => &[DSImpl::InMemoryDchain],
            (Target::Host, Structure::Map) => &[DSImpl::InMemoryMap],
            (Target::Host, Structure::Vector) => &[DSImpl::InMemoryVector],
            (Target::Host, Structure::Sketch) => &[DSImpl::InMemorySketch],
            (Target::Host, Structure::Dchain) => &[DSImpl::InMemoryDchain],
        }
    }
}
