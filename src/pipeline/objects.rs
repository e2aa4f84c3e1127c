// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Stateful switch objects and their resource footprints.

use crate::graph::Addr;
use serde::Serialize;
use std::fmt;
use strum_macros::Display;

/// The role a switch object plays for its abstract object.
///
/// One abstract object may need several switch objects (a sketch uses a hash
/// unit and a register row), so objects are keyed by address and role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum ObjectRole {
    Table,
    Register,
    Meter,
    Hash,
    Digest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ObjectId {
    pub addr: Addr,
    pub role: ObjectRole,
}

impl ObjectId {
    pub fn new(addr: Addr, role: ObjectRole) -> Self {
        Self { addr, role }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.role, self.addr)
    }
}

/// Budgets of one pipeline stage, or the demand of one object on a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StageBudget {
    pub sram_bits: u64,
    pub tcam_bits: u64,
    pub xbar_bits: u64,
    pub logical_ids: u32,
}

impl StageBudget {
    /// True if every dimension of `need` fits in `self`.
    pub fn covers(&self, need: &StageBudget) -> bool {
        self.sram_bits >= need.sram_bits
            && self.tcam_bits >= need.tcam_bits
            && self.xbar_bits >= need.xbar_bits
            && self.logical_ids >= need.logical_ids
    }

    /// Subtract `need`.
    ///
    /// # Panics
    ///
    /// Panics if `need` does not fit; callers check [`StageBudget::covers`] first.
    pub fn debit(&mut self, need: &StageBudget) {
        assert!(self.covers(need), "Stage budget overdrawn: {:?} < {:?}", self, need);
        self.sram_bits -= need.sram_bits;
        self.tcam_bits -= need.tcam_bits;
        self.xbar_bits -= need.xbar_bits;
        self.logical_ids -= need.logical_ids;
    }

    /// Per-dimension amount by which `self` exceeds `other` (zero where it does not).
    pub fn excess_over(&self, other: &StageBudget) -> StageBudget {
        StageBudget {
            sram_bits: self.sram_bits.saturating_sub(other.sram_bits),
            tcam_bits: self.tcam_bits.saturating_sub(other.tcam_bits),
            xbar_bits: self.xbar_bits.saturating_sub(other.xbar_bits),
            logical_ids: self.logical_ids.saturating_sub(other.logical_ids),
        }
    }

    /// Per-dimension maximum of `self` and `other`.
    pub fn max(&self, other: &StageBudget) -> StageBudget {
        StageBudget {
            sram_bits: self.sram_bits.max(other.sram_bits),
            tcam_bits: self.tcam_bits.max(other.tcam_bits),
            xbar_bits: self.xbar_bits.max(other.xbar_bits),
            logical_ids: self.logical_ids.max(other.logical_ids),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == StageBudget::default()
    }
}

/// A concrete stateful object requested by a switch module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StatefulObject {
    Table {
        key_widths: Vec<u32>,
        value_width: u32,
        capacity: u64,
        ternary: bool,
    },
    Register {
        width: u32,
        capacity: u64,
    },
    Meter {
        capacity: u64,
    },
    Hash {
        input_bits: u32,
    },
    Digest {
        bits: u32,
    },
}

/// Bits of SRAM one meter entry occupies.
const METER_ENTRY_BITS: u64 = 128;

impl StatefulObject {
    /// Stage resources this object consumes. Digests consume a global slot
    /// instead and report an empty footprint.
    ///
    /// `None` if the demand does not fit in 64 bits, which no stage can hold.
    pub fn footprint(&self) -> Option<StageBudget> {
        let budget = match self {
            StatefulObject::Table {
                key_widths,
                value_width,
                capacity,
                ternary,
            } => {
                let key_bits: u64 = key_widths.iter().map(|w| *w as u64).sum();
                let value_bits = *value_width as u64;
                let (sram_bits, tcam_bits) = if *ternary {
                    (capacity.checked_mul(value_bits)?, capacity.checked_mul(key_bits)?)
                } else {
                    (capacity.checked_mul(key_bits.checked_add(value_bits)?)?, 0)
                };
                StageBudget {
                    sram_bits,
                    tcam_bits,
                    xbar_bits: key_bits,
                    logical_ids: 1,
                }
            }
            StatefulObject::Register { width, capacity } => StageBudget {
                sram_bits: capacity.checked_mul(*width as u64)?,
                logical_ids: 1,
                ..StageBudget::default()
            },
            StatefulObject::Meter { capacity } => StageBudget {
                sram_bits: capacity.checked_mul(METER_ENTRY_BITS)?,
                logical_ids: 1,
                ..StageBudget::default()
            },
            StatefulObject::Hash { input_bits } => StageBudget {
                xbar_bits: *input_bits as u64,
                ..StageBudget::default()
            },
            StatefulObject::Digest { .. } => StageBudget::default(),
        };
        Some(budget)
    }

    pub fn match_keys(&self) -> usize {
        match self {
            StatefulObject::Table { key_widths, .. } => key_widths.len(),
            _ => 0,
        }
    }

    pub fn is_digest(&self) -> bool {
        matches!(self, StatefulObject::Digest { .. })
    }
}
