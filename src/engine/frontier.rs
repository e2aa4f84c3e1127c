// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Score-ordered multiset of plans.

use crate::config::TieBreak;
use crate::engine::heuristic::Score;
use crate::plan::ExecutionPlan;
use rand::Rng;
use std::collections::BTreeMap;

/// Plans grouped by score. Plans with equal scores keep insertion order.
#[derive(Debug, Default)]
pub struct Frontier {
    buckets: BTreeMap<Score, Vec<ExecutionPlan>>,
    len: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, score: Score, plan: ExecutionPlan) {
        self.buckets.entry(score).or_default().push(plan);
        self.len += 1;
    }

    /// Remove one of the best-scored plans, choosing among ties with `rng`.
    pub fn pop_best<R: Rng>(&mut self, rng: &mut R, tie_break: TieBreak) -> Option<(Score, ExecutionPlan)> {
        let mut entry = self.buckets.last_entry()?;
        let tied = entry.get_mut();
        let index = match tie_break {
            TieBreak::Uniform => rng.gen_range(0..tied.len()),
            TieBreak::Walk => {
                let mut index = 0;
                while index + 1 < tied.len() && rng.gen_bool(0.5) {
                    index += 1;
                }
                index
            }
        };
        let plan = tied.remove(index);
        let score = if tied.is_empty() {
            entry.remove_entry().0
        } else {
            entry.key().clone()
        };
        self.len -= 1;
        Some((score, plan))
    }

    /// The best score present.
    pub fn best_score(&self) -> Option<&Score> {
        self.buckets.keys().next_back()
    }

    /// Plans from best to worst score.
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionPlan> {
        self.buckets.values().rev().flatten()
    }

    /// Re-score every plan, after the comparator's output may have changed.
    pub fn rebuild(&mut self, mut score: impl FnMut(&ExecutionPlan) -> Score) {
        let plans = std::mem::take(&mut self.buckets);
        self.len = 0;
        for plan in plans.into_values().flatten() {
            let score = score(&plan);
            self.insert(score, plan);
        }
    }

    /// Take every plan, best first.
    pub fn into_sorted_vec(self) -> Vec<ExecutionPlan> {
        self.buckets.into_values().rev().flatten().collect()
    }
}
