// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Statistics
//!
//! Counters kept by the search engine, plus one counter per kind of
//! placement failure that pruned a candidate.

use crate::pipeline::PlacementFailure;
use std::fmt;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter};

#[derive(EnumCountMacro, EnumIter, Display, Debug, Copy, Clone, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum Counters {
    Steps,
    Candidates,
    FinishedPlans,
    /// Plans no factory could expand.
    DeadEnds,
    Skips,
    /// Finished plans discarded because one was already admitted.
    DroppedSolutions,
    Rebuilds,
}

const COUNT: usize = Counters::COUNT + PlacementFailure::COUNT;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    stats: [u64; COUNT],
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    /// Increment the specified counter by 1.
    pub fn increment(&mut self, counter: Counters) {
        self.add(counter, 1);
    }

    pub fn add(&mut self, counter: Counters, amount: u64) {
        self.stats[counter as usize] += amount;
    }

    /// Count one candidate pruned by `failure`.
    pub fn record_failure(&mut self, failure: &PlacementFailure) {
        self.stats[Counters::COUNT + failure.index()] += 1;
    }

    /// Get the current value of the specified counter.
    pub fn get(&self, counter: Counters) -> u64 {
        self.stats[counter as usize]
    }

    /// Candidates pruned by failures of the same kind as `failure`.
    pub fn failures_like(&self, failure: &PlacementFailure) -> u64 {
        self.stats[Counters::COUNT + failure.index()]
    }

    pub fn total_failures(&self) -> u64 {
        self.stats[Counters::COUNT..].iter().sum()
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, counter) in Counters::iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={}", counter, self.get(counter))?;
        }
        write!(f, " placement_failures={}", self.total_failures())
    }
}
