// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Search and target configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```
//! use epsynth::config::{Config, TieBreak};
//! use epsynth::target::Target;
//!
//! let config = Config::from_toml_str(r#"
//!     [search]
//!     heuristic = "min-stages"
//!     tie_break = "walk"
//!
//!     [switch]
//!     stages = 4
//! "#).unwrap();
//!
//! assert_eq!(config.search.heuristic, "min-stages");
//! assert_eq!(config.search.tie_break, TieBreak::Walk);
//! assert_eq!(config.switch.stages, 4);
//! assert_eq!(config.targets.initial, Target::Switch);
//! ```

use crate::error::{Error, Result};
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub targets: TargetsConfig,
    pub switch: SwitchConfig,
    pub controller: SoftwareConfig,
    pub host: SoftwareConfig,
}

/// How ties between equally scored plans are broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Uniform choice among the tied plans.
    #[default]
    Uniform,
    /// Walk forward through the tied run, stopping on a coin flip.
    Walk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub stop_on_first_solution: bool,
    pub heuristic: String,
    pub seed: u64,
    pub tie_break: TieBreak,
    /// Maximum number of search steps `search()` takes; unbounded if absent.
    pub step_budget: Option<u64>,
    /// Record every step's decisions for later inspection.
    pub trace: bool,
    /// Graph nodes the speculative lookahead may visit per leaf.
    pub lookahead_nodes: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            stop_on_first_solution: true,
            heuristic: "max-progress".to_string(),
            seed: 0,
            tie_break: TieBreak::Uniform,
            step_budget: None,
            trace: false,
            lookahead_nodes: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetsConfig {
    /// Target every packet path starts on.
    pub initial: Target,
    pub enabled: Vec<Target>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            initial: Target::Switch,
            enabled: vec![Target::Switch, Target::Controller],
        }
    }
}

/// Per-stage budgets and global limits of the switch pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub stages: usize,
    pub sram_bits_per_stage: u64,
    pub tcam_bits_per_stage: u64,
    pub xbar_bits_per_stage: u64,
    pub logical_ids_per_stage: u32,
    pub digest_slots: u32,
    pub max_match_keys: usize,
    pub max_recirculations: u8,
    pub capacity_mpps: u64,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            stages: 12,
            // 80 blocks of 1024 x 128 bits.
            sram_bits_per_stage: 80 * 1024 * 128,
            // 24 blocks of 512 x 44 bits.
            tcam_bits_per_stage: 24 * 512 * 44,
            xbar_bits_per_stage: 1024,
            logical_ids_per_stage: 16,
            digest_slots: 8,
            max_match_keys: 8,
            max_recirculations: 1,
            capacity_mpps: 3200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftwareConfig {
    pub capacity_mpps: u64,
}

impl Default for SoftwareConfig {
    fn default() -> Self {
        Self { capacity_mpps: 20 }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.targets.enabled.is_empty() {
            return Err(Error::Config("no target is enabled".to_string()));
        }
        if !self.targets.enabled.contains(&self.targets.initial) {
            return Err(Error::Config(format!(
                "initial target '{}' is not enabled",
                self.targets.initial
            )));
        }
        if self.targets.enabled.contains(&Target::Switch) && self.switch.stages == 0 {
            return Err(Error::Config("switch pipeline has no stages".to_string()));
        }
        Ok(())
    }

    /// Packet-rate capacity of a target, in millions of packets per second.
    pub fn capacity_mpps(&self, target: Target) -> u64 {
        match target {
            Target::Switch => self.switch.capacity_mpps,
            Target::Controller => self.controller.capacity_mpps,
            Target::Host => self.host.capacity_mpps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.search.stop_on_first_solution);
    }

    #[test]
    fn test_initial_must_be_enabled() {
        let err = Config::from_toml_str(
            r#"
            [targets]
            initial = "host"
            enabled = ["switch"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("host")));
    }

    #[test]
    fn test_bad_toml() {
        let err = Config::from_toml_str("[switch\nstages = ").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let err = Config::from_toml_str(
            r#"
            [targets]
            enabled = ["fpga"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_capacity_lookup() {
        let mut config = Config::default();
        config.host.capacity_mpps = 55;
        assert_eq!(config.capacity_mpps(Target::Host), 55);
        assert_eq!(config.capacity_mpps(Target::Switch), 3200);
    }
}
