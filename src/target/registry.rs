// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Per-target factory catalogs and resource baselines.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::module::Factory;
use crate::pipeline::PipelineResources;
use crate::target::{Target, TargetSet};
use std::collections::BTreeMap;

/// What the search knows about each enabled target.
///
/// Built once from configuration and shared, read-only, by every plan.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    enabled: TargetSet,
    initial: Target,
    catalogs: BTreeMap<Target, Vec<Factory>>,
    baseline: PipelineResources,
    capacities: BTreeMap<Target, u64>,
    max_recirculations: u8,
}

impl TargetRegistry {
    pub fn from_config(config: &Config) -> Result<Self> {
        let enabled: TargetSet = config.targets.enabled.iter().copied().collect();
        if !enabled.contains(config.targets.initial) {
            return Err(Error::Config(format!(
                "initial target '{}' is not enabled",
                config.targets.initial
            )));
        }

        let catalogs = enabled
            .iter()
            .map(|target| (target, Factory::catalog(target)))
            .collect();
        let capacities = enabled
            .iter()
            .map(|target| (target, config.capacity_mpps(target)))
            .collect();

        Ok(Self {
            enabled,
            initial: config.targets.initial,
            catalogs,
            baseline: PipelineResources::new(&config.switch),
            capacities,
            max_recirculations: config.switch.max_recirculations,
        })
    }

    pub fn enabled(&self) -> TargetSet {
        self.enabled
    }

    pub fn is_enabled(&self, target: Target) -> bool {
        self.enabled.contains(target)
    }

    /// Target every packet path starts on.
    pub fn initial(&self) -> Target {
        self.initial
    }

    /// Factories that may expand a leaf on `target`; empty if it is not enabled.
    pub fn catalog(&self, target: Target) -> &[Factory] {
        self.catalogs.get(&target).map_or(&[], Vec::as_slice)
    }

    /// Pipeline resources of an empty plan.
    pub fn baseline(&self) -> &PipelineResources {
        &self.baseline
    }

    /// Packet-rate capacity in Mpps; zero for a disabled target.
    pub fn capacity_mpps(&self, target: Target) -> u64 {
        self.capacities.get(&target).copied().unwrap_or(0)
    }

    pub fn max_recirculations(&self) -> u8 {
        self.max_recirculations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleKind;

    #[test]
    fn test_catalogs_follow_enabled_targets() {
        let registry = TargetRegistry::from_config(&Config::default()).unwrap();
        assert!(registry.is_enabled(Target::Switch));
        assert!(registry.is_enabled(Target::Controller));
        assert!(!registry.is_enabled(Target::Host));
        assert!(registry.catalog(Target::Host).is_empty());

        let switch: Vec<ModuleKind> = registry
            .catalog(Target::Switch)
            .iter()
            .map(|f| f.kind)
            .collect();
        assert!(switch.contains(&ModuleKind::TableLookup));
        assert!(switch.contains(&ModuleKind::Recirculate));
        assert!(!switch.contains(&ModuleKind::MapGet));
    }

    #[test]
    fn test_capacity_of_disabled_target_is_zero() {
        let registry = TargetRegistry::from_config(&Config::default()).unwrap();
        assert_eq!(registry.capacity_mpps(Target::Switch), 3200);
        assert_eq!(registry.capacity_mpps(Target::Host), 0);
    }

    #[test]
    fn test_baseline_matches_switch_config() {
        let mut config = Config::default();
        config.switch.stages = 3;
        config.switch.digest_slots = 2;
        let registry = TargetRegistry::from_config(&config).unwrap();
        assert_eq!(registry.baseline().stages().len(), 3);
        assert_eq!(registry.baseline().digests_remaining(), 2);
        assert_eq!(registry.baseline().stages_used(), 0);
    }
}
