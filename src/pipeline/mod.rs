// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Switch pipeline resource placement.
//!
//! A packet traverses the stages in increasing order, so an object must sit
//! in a later stage than every object it depends on. Placement picks the
//! earliest stage after the dependencies with room in every resource
//! dimension, debits it, and remembers the request so a finished plan can be
//! re-validated.
//!
//! # Example
//!
//! ```
//! use epsynth::config::SwitchConfig;
//! use epsynth::graph::Addr;
//! use epsynth::pipeline::{ObjectId, ObjectRole, PipelineResources, StatefulObject};
//! use std::collections::BTreeSet;
//!
//! let mut pipeline = PipelineResources::new(&SwitchConfig::default());
//! let reg = ObjectId::new(Addr(1), ObjectRole::Register);
//! let table = ObjectId::new(Addr(2), ObjectRole::Table);
//!
//! let register = StatefulObject::Register { width: 32, capacity: 1024 };
//! assert_eq!(pipeline.place(reg, &register, &BTreeSet::new()), Ok(0));
//!
//! let lookup = StatefulObject::Table {
//!     key_widths: vec![32],
//!     value_width: 16,
//!     capacity: 256,
//!     ternary: false,
//! };
//! assert_eq!(pipeline.place(table, &lookup, &BTreeSet::from([reg])), Ok(1));
//! ```

pub mod failure;
pub mod objects;

pub use failure::{Conflict, PlacementFailure};
pub use objects::{ObjectId, ObjectRole, StageBudget, StatefulObject};

use crate::config::SwitchConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// One pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub index: usize,
    pub remaining: StageBudget,
    pub objects: BTreeSet<ObjectId>,
}

/// Where an object was placed and what it occupies there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub stage: usize,
    pub footprint: StageBudget,
}

/// Outcome of locating a stage for a request, before anything is debited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Located {
    /// Already placed at this stage. `growth` is the extra demand to debit
    /// and `footprint` what the object occupies afterwards.
    Existing {
        stage: usize,
        growth: StageBudget,
        footprint: StageBudget,
    },
    Fresh { stage: usize, need: StageBudget },
}

/// Remaining resources of the switch pipeline for one plan.
///
/// Stage, placement, and request storage is shared between clones until one
/// of them places something.
#[derive(Debug, Clone)]
pub struct PipelineResources {
    capacity: StageBudget,
    max_match_keys: usize,
    stages: Rc<Vec<Stage>>,
    digests_remaining: u32,
    placements: Rc<BTreeMap<ObjectId, Placement>>,
    requests: Rc<Vec<(ObjectId, BTreeSet<ObjectId>)>>,
}

impl PipelineResources {
    pub fn new(config: &SwitchConfig) -> Self {
        let capacity = StageBudget {
            sram_bits: config.sram_bits_per_stage,
            tcam_bits: config.tcam_bits_per_stage,
            xbar_bits: config.xbar_bits_per_stage,
            logical_ids: config.logical_ids_per_stage,
        };
        let stages = (0..config.stages)
            .map(|index| Stage {
                index,
                remaining: capacity,
                objects: BTreeSet::new(),
            })
            .collect();
        Self {
            capacity,
            max_match_keys: config.max_match_keys,
            stages: Rc::new(stages),
            digests_remaining: config.digest_slots,
            placements: Rc::new(BTreeMap::new()),
            requests: Rc::new(Vec::new()),
        }
    }

    /// Place `object` in the earliest feasible stage after `deps`.
    ///
    /// An already-placed object keeps its stage: the call succeeds if that
    /// stage still satisfies `deps`, and fails with
    /// [`PlacementFailure::InconsistentPlacement`] otherwise. The object then
    /// occupies the per-dimension maximum of every request made for it, and
    /// only the excess over what it already held is debited.
    pub fn place(
        &mut self,
        object: ObjectId,
        request: &StatefulObject,
        deps: &BTreeSet<ObjectId>,
    ) -> Result<usize, PlacementFailure> {
        let located = self.locate(object, request, deps, None)?;
        Ok(self.commit(object, request, deps, located))
    }

    /// Place `object` in exactly `stage`.
    pub fn place_at(
        &mut self,
        object: ObjectId,
        request: &StatefulObject,
        deps: &BTreeSet<ObjectId>,
        stage: usize,
    ) -> Result<usize, PlacementFailure> {
        let located = self.locate(object, request, deps, Some(stage))?;
        Ok(self.commit(object, request, deps, located))
    }

    /// The stage `place` would choose, without changing anything.
    pub fn probe(
        &self,
        object: ObjectId,
        request: &StatefulObject,
        deps: &BTreeSet<ObjectId>,
    ) -> Result<usize, PlacementFailure> {
        match self.locate(object, request, deps, None)? {
            Located::Existing { stage, .. } | Located::Fresh { stage, .. } => Ok(stage),
        }
    }

    fn locate(
        &self,
        object: ObjectId,
        request: &StatefulObject,
        deps: &BTreeSet<ObjectId>,
        requested: Option<usize>,
    ) -> Result<Located, PlacementFailure> {
        if deps.contains(&object) {
            return Err(PlacementFailure::SelfDependency { object });
        }

        let keys = request.match_keys();
        if keys > self.max_match_keys {
            return Err(PlacementFailure::TooManyKeys {
                object,
                keys,
                max: self.max_match_keys,
            });
        }

        let need = request
            .footprint()
            .ok_or(PlacementFailure::TooLarge { object })?;
        if need.xbar_bits > self.capacity.xbar_bits {
            return Err(PlacementFailure::CrossbarExceeded {
                object,
                needed: need.xbar_bits,
                available: self.capacity.xbar_bits,
            });
        }
        if !self.capacity.covers(&need) {
            return Err(PlacementFailure::TooLarge { object });
        }

        // Earliest stage strictly after every dependency, and the dependency
        // that forces it.
        let mut earliest = 0;
        let mut binding_dep = None;
        for dep in deps {
            let placed = self.placements.get(dep).ok_or(PlacementFailure::UnmetDependency {
                object,
                dependency: *dep,
            })?;
            if placed.stage + 1 > earliest {
                earliest = placed.stage + 1;
                binding_dep = Some(*dep);
            }
        }

        if let Some(existing) = self.placements.get(&object) {
            let stage = existing.stage;
            let conflict = if stage < earliest {
                Some(Conflict::After(earliest))
            } else {
                requested.filter(|r| *r != stage).map(Conflict::Exactly)
            };
            if let Some(conflict) = conflict {
                return Err(PlacementFailure::InconsistentPlacement {
                    object,
                    stage,
                    conflict,
                });
            }
            let growth = need.excess_over(&existing.footprint);
            if !self.stages[stage].remaining.covers(&growth) {
                return Err(PlacementFailure::InconsistentPlacement {
                    object,
                    stage,
                    conflict: Conflict::NoRoom,
                });
            }
            return Ok(Located::Existing {
                stage,
                growth,
                footprint: existing.footprint.max(&need),
            });
        }

        if request.is_digest() && self.digests_remaining == 0 {
            return Err(PlacementFailure::NoDigestSlots { object });
        }

        if let Some(stage) = requested {
            if stage < earliest {
                // A requested stage below `earliest` implies some dependency.
                let dependency = binding_dep.unwrap_or(object);
                return Err(PlacementFailure::UnmetDependency { object, dependency });
            }
            return match self.stages.get(stage) {
                Some(s) if s.remaining.covers(&need) => Ok(Located::Fresh { stage, need }),
                _ => Err(PlacementFailure::NoStageAvailable {
                    object,
                    earliest: stage,
                }),
            };
        }

        self.stages
            .iter()
            .skip(earliest)
            .find(|s| s.remaining.covers(&need))
            .map(|s| Located::Fresh {
                stage: s.index,
                need,
            })
            .ok_or(PlacementFailure::NoStageAvailable { object, earliest })
    }

    fn commit(
        &mut self,
        object: ObjectId,
        request: &StatefulObject,
        deps: &BTreeSet<ObjectId>,
        located: Located,
    ) -> usize {
        let stage = match located {
            Located::Existing {
                stage,
                growth,
                footprint,
            } => {
                if !growth.is_zero() {
                    Rc::make_mut(&mut self.stages)[stage].remaining.debit(&growth);
                    if let Some(placement) = Rc::make_mut(&mut self.placements).get_mut(&object) {
                        placement.footprint = footprint;
                    }
                }
                stage
            }
            Located::Fresh { stage, need } => {
                let entry = &mut Rc::make_mut(&mut self.stages)[stage];
                entry.remaining.debit(&need);
                entry.objects.insert(object);
                if request.is_digest() {
                    self.digests_remaining -= 1;
                }
                Rc::make_mut(&mut self.placements).insert(
                    object,
                    Placement {
                        stage,
                        footprint: need,
                    },
                );
                stage
            }
        };

        if !self
            .requests
            .iter()
            .any(|(o, d)| *o == object && d == deps)
        {
            Rc::make_mut(&mut self.requests).push((object, deps.clone()));
        }
        stage
    }

    /// Check that every recorded request still holds.
    pub fn revalidate(&self) -> Result<(), PlacementFailure> {
        for (object, deps) in self.requests.iter() {
            let stage = self
                .stage_of(*object)
                .expect("recorded request for an unplaced object");
            for dep in deps {
                match self.stage_of(*dep) {
                    Some(d) if d < stage => {}
                    Some(d) => {
                        return Err(PlacementFailure::InconsistentPlacement {
                            object: *object,
                            stage,
                            conflict: Conflict::After(d + 1),
                        })
                    }
                    None => {
                        return Err(PlacementFailure::UnmetDependency {
                            object: *object,
                            dependency: *dep,
                        })
                    }
                }
            }
        }
        Ok(())
    }

    pub fn stage_of(&self, object: ObjectId) -> Option<usize> {
        self.placements.get(&object).map(|p| p.stage)
    }

    pub fn is_placed(&self, object: ObjectId) -> bool {
        self.placements.contains_key(&object)
    }

    /// Number of stages up to and including the last one holding an object.
    pub fn stages_used(&self) -> usize {
        self.stages
            .iter()
            .rposition(|s| !s.objects.is_empty())
            .map_or(0, |last| last + 1)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn digests_remaining(&self) -> u32 {
        self.digests_remaining
    }

    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }

    /// Full budget of one empty stage.
    pub fn stage_capacity(&self) -> StageBudget {
        self.capacity
    }
}
