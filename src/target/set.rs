// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! TargetSet type for representing sets of targets as bitsets.
//!
//! # Examples
//!
//! ```
//! use epsynth::target::{Target, TargetSet};
//!
//! let mut set = TargetSet::empty();
//! set.insert(Target::Switch);
//! set.insert(Target::Host);
//!
//! assert_eq!(set.len(), 2);
//! assert_eq!(format!("{}", set), "{switch,host}");
//! assert!(!set.contains(Target::Controller));
//! ```

use crate::target::Target;
use std::fmt;
use strum::IntoEnumIterator;

/// A set of targets represented as a bitset.
///
/// Bit i is set if the target with discriminant i is in the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TargetSet(u8);

impl TargetSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every known target.
    pub fn full() -> Self {
        Self::from_targets(&Target::iter().collect::<Vec<_>>())
    }

    pub fn from_targets(targets: &[Target]) -> Self {
        let mut set = Self::empty();
        for &target in targets {
            set.insert(target);
        }
        set
    }

    pub fn contains(self, target: Target) -> bool {
        (self.0 >> target as u8) & 1 != 0
    }

    pub fn insert(&mut self, target: Target) {
        self.0 |= 1 << target as u8;
    }

    pub fn remove(&mut self, target: Target) {
        self.0 &= !(1 << target as u8);
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over targets in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Target> {
        Target::iter().filter(move |t| self.contains(*t))
    }
}

impl FromIterator<Target> for TargetSet {
    fn from_iter<I: IntoIterator<Item = Target>>(iter: I) -> Self {
        let mut set = Self::empty();
        for target in iter {
            set.insert(target);
        }
        set
    }
}

impl fmt::Display for TargetSet {
    /// Format as "{switch,host}".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, target) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", target)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_full() {
        assert!(TargetSet::empty().is_empty());
        assert_eq!(TargetSet::full().len(), 3);
    }

    #[test]
    fn test_insert_remove() {
        let mut set = TargetSet::empty();
        set.insert(Target::Controller);
        assert!(set.contains(Target::Controller));
        set.remove(Target::Controller);
        assert!(!set.contains(Target::Controller));
    }

    #[test]
    fn test_iteration_order() {
        let set: TargetSet = [Target::Host, Target::Switch].into_iter().collect();
        let targets: Vec<Target> = set.iter().collect();
        assert_eq!(targets, vec![Target::Switch, Target::Host]);
    }
}
