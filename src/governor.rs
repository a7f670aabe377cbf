//! C4: per-profile rate limiting for the three independently-throttled
//! activities in the pipeline (trash-sample ingestion, boss-event ingestion,
//! comparison recomputation).
//!
//! The Governor is stateless — it only decides; the caller ([`crate::engine::Engine`])
//! owns the "last time" variables, per the "throttling as cross-cutting
//! concern" design note (spec.md §9).

use serde::{Deserialize, Serialize};

/// Which of the three throttled activities a caller is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottleKind {
    Trash,
    Boss,
    Calc,
}

/// The tunable intervals for one profile, in seconds, plus the two
/// informational knobs the UI side cares about (`interpolation_samples`,
/// `smoothing`) — carried here because they are part of the same closed
/// per-profile table in spec.md §4.4, even though the Governor itself never
/// consults them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intervals {
    pub trash_min_interval: f64,
    pub boss_min_interval: f64,
    pub calc_min_interval: f64,
    pub interpolation_samples: u32,
    pub smoothing: bool,
}

const LOW: Intervals = Intervals {
    trash_min_interval: 0.50,
    boss_min_interval: 0.50,
    calc_min_interval: 2.00,
    interpolation_samples: 5,
    smoothing: false,
};

const BALANCED: Intervals = Intervals {
    trash_min_interval: 0.25,
    boss_min_interval: 0.50,
    calc_min_interval: 1.00,
    interpolation_samples: 10,
    smoothing: true,
};

const HIGH: Intervals = Intervals {
    trash_min_interval: 0.10,
    boss_min_interval: 0.25,
    calc_min_interval: 0.50,
    interpolation_samples: 20,
    smoothing: true,
};

/// The closed set of built-in profiles, plus a host-supplied `Custom`
/// variant carrying its own [`Intervals`]. An unknown profile name (when
/// deserializing host config) falls back to `Balanced` (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Profile {
    Low,
    Balanced,
    High,
    Custom(Intervals),
}

impl Profile {
    pub fn intervals(&self) -> Intervals {
        match self {
            Self::Low => LOW,
            Self::Balanced => BALANCED,
            Self::High => HIGH,
            Self::Custom(intervals) => *intervals,
        }
    }

    /// Parse a free-form profile name as the host config surface might
    /// receive it; unrecognized names fall back to `Balanced` rather than
    /// failing (§4.4).
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Balanced,
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Stateless rate-limit decision function.
#[derive(Debug, Clone, Copy, Default)]
pub struct Governor {
    profile: Profile,
}

impl Governor {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    fn min_interval(&self, kind: ThrottleKind) -> f64 {
        let intervals = self.profile.intervals();
        match kind {
            ThrottleKind::Trash => intervals.trash_min_interval,
            ThrottleKind::Boss => intervals.boss_min_interval,
            ThrottleKind::Calc => intervals.calc_min_interval,
        }
    }

    /// `true` iff `now - last_time >= min_interval(kind)`.
    pub fn allow(&self, kind: ThrottleKind, last_time: f64, now: f64) -> bool {
        now - last_time >= self.min_interval(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_profile_name_falls_back_to_balanced() {
        assert_eq!(Profile::from_name("nonsense"), Profile::Balanced);
        assert_eq!(Profile::from_name("Low"), Profile::Low);
        assert_eq!(Profile::from_name("HIGH"), Profile::High);
    }

    #[test]
    fn allow_respects_each_profiles_calc_interval() {
        let low = Governor::new(Profile::Low);
        assert!(!low.allow(ThrottleKind::Calc, 0.0, 1.0));
        assert!(low.allow(ThrottleKind::Calc, 0.0, 2.0));

        let high = Governor::new(Profile::High);
        assert!(high.allow(ThrottleKind::Calc, 0.0, 0.5));
        assert!(!high.allow(ThrottleKind::Calc, 0.0, 0.3));
    }

    #[test]
    fn custom_profile_uses_supplied_intervals() {
        let custom = Governor::new(Profile::Custom(Intervals {
            trash_min_interval: 1.0,
            boss_min_interval: 1.0,
            calc_min_interval: 5.0,
            interpolation_samples: 1,
            smoothing: false,
        }));
        assert!(!custom.allow(ThrottleKind::Trash, 0.0, 0.5));
        assert!(custom.allow(ThrottleKind::Trash, 0.0, 1.0));
    }

    #[test]
    fn governor_is_stateless_across_calls() {
        let gov = Governor::new(Profile::Balanced);
        // Same inputs always produce the same decision; the Governor does
        // not remember prior `allow` calls.
        assert_eq!(
            gov.allow(ThrottleKind::Trash, 10.0, 10.2),
            gov.allow(ThrottleKind::Trash, 10.0, 10.2)
        );
    }
}
