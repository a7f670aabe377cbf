//! Core data model for the pace analyzer.
//!
//! These are plain, serde-derived value types shared by every other module:
//! the raw [`Observation`] a host pushes in, the [`Sample`] a [`crate::timeline::Timeline`]
//! stores, the [`BestRun`] record a [`crate::store::Store`] keeps, and the
//! [`Comparison`] an [`crate::engine::Engine`] hands back to a caller.

use serde::{Deserialize, Serialize};

/// Canonical trash-clear milestone spacing, in percentage points.
pub const MILESTONE_STEP: f64 = 5.0;

/// One raw progress tick pushed by the host event source.
///
/// `boss_event` is populated only on the tick where a boss kill actually
/// landed; most observations carry `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub elapsed_seconds: f64,
    pub trash_pct: f64,
    pub bosses_killed: u32,
    pub deaths: u32,
    pub boss_event: Option<BossKillEvent>,
}

impl Observation {
    pub fn new(elapsed_seconds: f64, trash_pct: f64, bosses_killed: u32, deaths: u32) -> Self {
        Self {
            elapsed_seconds,
            trash_pct,
            bosses_killed,
            deaths,
            boss_event: None,
        }
    }

    /// True when every field is within its documented domain (§3).
    pub fn is_valid(&self) -> bool {
        self.elapsed_seconds >= 0.0 && (0.0..=100.0).contains(&self.trash_pct)
    }
}

/// A boss kill carried inline on an [`Observation`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossKillEvent {
    pub boss_index: u32,
    pub kill_time: f64,
}

/// A stored point on a [`crate::timeline::Timeline`].
///
/// Invariant (enforced by `Timeline::append`, not by this type itself):
/// within one timeline, `time` is strictly increasing and `trash`/`bosses`/
/// `deaths` are each monotonically non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub trash: f64,
    pub bosses: f64,
    pub deaths: u32,
}

impl Sample {
    pub fn new(time: f64, trash: f64, bosses: f64, deaths: u32) -> Self {
        Self {
            time,
            trash,
            bosses,
            deaths,
        }
    }

    /// True when `trash` lands exactly on a canonical 5%-multiple threshold.
    pub fn is_milestone(&self) -> bool {
        let steps = self.trash / MILESTONE_STEP;
        (steps - steps.round()).abs() < 1e-9 && self.trash > 0.0
    }
}

/// A recorded boss kill, opaque beyond its index/name/time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossKill {
    pub boss_index: u32,
    pub name: String,
    pub kill_time: f64,
}

/// A frozen, sampled run timeline plus the completion-level facts about it.
///
/// `is_extrapolated`/`source_level` are set only by [`crate::extrapolator::Extrapolator`];
/// a record read straight out of the [`crate::store::Store`] via exact match always has
/// `is_extrapolated = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestRun {
    pub dungeon_id: u32,
    pub level: u32,
    pub total_time: f64,
    pub completed_in_time: bool,
    pub timeline: crate::timeline::Timeline,
    pub boss_kills: Vec<BossKill>,
    pub deaths: u32,
    pub stored_at: f64,
    pub is_extrapolated: bool,
    pub source_level: Option<u32>,
}

impl BestRun {
    /// Construct a non-extrapolated record as it would come fresh off a
    /// completed run. `stored_at` is a host-supplied timestamp (unix
    /// seconds or any monotonically meaningful clock reading) — the core
    /// never reads a wall clock itself.
    pub fn new(
        dungeon_id: u32,
        level: u32,
        total_time: f64,
        completed_in_time: bool,
        timeline: crate::timeline::Timeline,
        boss_kills: Vec<BossKill>,
        deaths: u32,
        stored_at: f64,
    ) -> Self {
        Self {
            dungeon_id,
            level,
            total_time,
            completed_in_time,
            timeline,
            boss_kills,
            deaths,
            stored_at,
            is_extrapolated: false,
            source_level: None,
        }
    }
}

/// Per-currently-engaged-boss bookkeeping used only for fractional credit
/// (§4.6). Never exposed outside [`crate::tracker::RunTracker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossProgress {
    pub boss_index: u32,
    pub engage_time: f64,
    pub expected_duration: f64,
    pub last_quarter_credited: f64,
}

impl BossProgress {
    pub fn new(boss_index: u32, engage_time: f64, expected_duration: f64) -> Self {
        Self {
            boss_index,
            engage_time,
            expected_duration,
            last_quarter_credited: 0.0,
        }
    }

    /// Credit stepped to 0.25/0.5/0.75/1.0 as `now - engage_time` crosses
    /// the corresponding fraction of `expected_duration`. Monotonic: never
    /// steps back down.
    pub fn credit_at(&self, now: f64) -> f64 {
        if self.expected_duration <= 0.0 {
            return self.last_quarter_credited;
        }
        let elapsed_frac = (now - self.engage_time) / self.expected_duration;
        let stepped = if elapsed_frac >= 1.0 {
            1.0
        } else if elapsed_frac >= 0.75 {
            0.75
        } else if elapsed_frac >= 0.5 {
            0.5
        } else if elapsed_frac >= 0.25 {
            0.25
        } else {
            0.0
        };
        stepped.max(self.last_quarter_credited)
    }
}

/// The active run's live state, held exclusively by the [`crate::engine::Engine`].
#[derive(Debug, Clone)]
pub struct RunState {
    pub dungeon_id: u32,
    pub level: u32,
    pub start_wall_time: f64,
    pub current_sample: Sample,
    pub boss_progress: Vec<BossProgress>,
    pub last_update_wall: f64,
    pub reference: Option<BestRun>,
}

/// The read-only result of a comparison query, returned by
/// [`crate::engine::Engine::get_comparison`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub dungeon_id: u32,
    pub level: u32,
    pub trash_delta: f64,
    pub boss_delta: f64,
    pub death_delta: i64,
    pub efficiency: f64,
    pub time_delta_seconds: f64,
    pub confidence: u8,
    pub is_extrapolated: bool,
    pub source_level: Option<u32>,
}
