// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Compute targets a plan can spread across.

pub mod registry;
pub mod set;

pub use registry::TargetRegistry;
pub use set::TargetSet;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// A compute target.
///
/// The discriminant is the bit position in a [`TargetSet`].
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
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Target {
    /// Programmable switch pipeline.
    Switch = 0,
    /// The switch's companion CPU.
    Controller = 1,
    /// A general-purpose host process.
    Host = 2,
}

impl Target {
    /// True for targets that run ordinary software.
    pub fn is_software(self) -> bool {
        !matches!(self, Target::Switch)
    }
}
