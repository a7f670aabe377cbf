//! Host-facing configuration surface (spec.md §6), in the shape of the
//! teacher's `performance::config::PerfConfig`: nested serde-default
//! structs, each independently defaultable, with optional TOML file I/O.
//!
//! The core itself never calls `load`/`from_env`/`save` — embedding hosts
//! that want file-based configuration are free to use them; hosts that
//! construct an [`crate::engine::Engine`] programmatically can ignore this module
//! entirely.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::efficiency::EfficiencyConfig;
use crate::governor::{Governor, Intervals, Profile};

/// Top-level configuration, matching spec.md §6's table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_true")]
    pub extrapolation_enabled: bool,

    #[serde(default)]
    pub performance_profile: ProfileName,

    #[serde(default)]
    pub custom_intervals: Option<Intervals>,

    #[serde(default = "default_death_penalty")]
    pub death_penalty_seconds: f64,

    #[serde(default = "default_boss_weight")]
    pub boss_weight_default: f64,
}

fn default_true() -> bool {
    true
}

fn default_death_penalty() -> f64 {
    crate::efficiency::DEFAULT_DEATH_PENALTY_SECONDS
}

fn default_boss_weight() -> f64 {
    crate::efficiency::DEFAULT_BOSS_WEIGHT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extrapolation_enabled: true,
            performance_profile: ProfileName::Balanced,
            custom_intervals: None,
            death_penalty_seconds: default_death_penalty(),
            boss_weight_default: default_boss_weight(),
        }
    }
}

/// Serializable stand-in for [`Profile`] (which carries a closure-free but
/// non-serde-friendly `Custom(Intervals)` payload only when matched against
/// `custom_intervals`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    Low,
    Balanced,
    High,
    Custom,
}

impl Default for ProfileName {
    fn default() -> Self {
        Self::Balanced
    }
}

impl EngineConfig {
    /// Resolve into a runnable [`Governor`], falling back to `Balanced` if
    /// `performance_profile = Custom` but no `custom_intervals` were
    /// supplied.
    pub fn governor(&self) -> Governor {
        let profile = match self.performance_profile {
            ProfileName::Low => Profile::Low,
            ProfileName::Balanced => Profile::Balanced,
            ProfileName::High => Profile::High,
            ProfileName::Custom => match self.custom_intervals {
                Some(intervals) => Profile::Custom(intervals),
                None => {
                    tracing::warn!("performance_profile=Custom with no custom_intervals set; falling back to Balanced");
                    Profile::Balanced
                }
            },
        };
        Governor::new(profile)
    }

    pub fn efficiency_config(&self) -> EfficiencyConfig {
        EfficiencyConfig {
            death_penalty_seconds: self.death_penalty_seconds,
            boss_weight_default: self.boss_weight_default,
        }
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `PACEKEEPER_CONFIG_PATH`, or `pacekeeper.toml` by default;
    /// falls back to [`Default`] on any I/O or parse error.
    pub fn from_env() -> Self {
        let path = std::env::var("PACEKEEPER_CONFIG_PATH").unwrap_or_else(|_| "pacekeeper.toml".to_string());
        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("using default engine config ({}): {}", path, e);
            Self::default()
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = EngineConfig::default();
        assert!(config.extrapolation_enabled);
        assert_eq!(config.performance_profile, ProfileName::Balanced);
        assert_eq!(config.death_penalty_seconds, 15.0);
        assert_eq!(config.boss_weight_default, 20.0);
    }

    #[test]
    fn toml_roundtrip_in_memory() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn save_then_load_roundtrips_through_a_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pacekeeper.toml");

        let mut config = EngineConfig::default();
        config.death_penalty_seconds = 20.0;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn custom_profile_without_intervals_falls_back_to_balanced() {
        let config = EngineConfig {
            performance_profile: ProfileName::Custom,
            custom_intervals: None,
            ..EngineConfig::default()
        };
        assert_eq!(config.governor().profile(), Profile::Balanced);
    }

    #[test]
    fn custom_profile_with_intervals_is_used_as_is() {
        let intervals = Intervals {
            trash_min_interval: 1.0,
            boss_min_interval: 1.0,
            calc_min_interval: 3.0,
            interpolation_samples: 8,
            smoothing: true,
        };
        let config = EngineConfig {
            performance_profile: ProfileName::Custom,
            custom_intervals: Some(intervals),
            ..EngineConfig::default()
        };
        assert_eq!(config.governor().profile(), Profile::Custom(intervals));
    }
}
