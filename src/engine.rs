//! C7: the public facade. This is the only surface a host event source and
//! UI need to know about — it owns the [`crate::tracker::RunTracker`] and holds
//! references to the [`crate::store::Store`], [`crate::governor::Governor`], and the
//! comparison math in [`crate::efficiency`] (§4.7).
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            Engine                               │
//! │  owns: RunTracker, Store, Governor, EfficiencyConfig             │
//! │  caches: last Comparison + its computed-at elapsed time          │
//! └────────────────────────────────────────────────────────────────┘
//!            │                    │                   │
//!            ▼                    ▼                   ▼
//!      RunTracker (C6)       Store (C3)         efficiency (C5)
//! ```

use crate::efficiency::{self, CurrentProgress, EfficiencyConfig};
use crate::extrapolator::Extrapolator;
use crate::governor::{Governor, Profile, ThrottleKind};
use crate::model::{BestRun, Comparison};
use crate::store::Store;
use crate::tracker::{RunPhase, RunTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    AlreadyActive,
    NotActive,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "a run is already active"),
            Self::NotActive => write!(f, "no run is active"),
        }
    }
}

impl std::error::Error for EngineError {}

#[derive(Debug, Clone, Copy)]
struct CachedComparison {
    value: Comparison,
    computed_at_elapsed: f64,
}

/// Facade over the whole pace-analyzer core.
#[derive(Debug)]
pub struct Engine {
    store: Store,
    governor: Governor,
    efficiency_config: EfficiencyConfig,
    extrapolation_enabled: bool,
    tracker: RunTracker,
    dungeon_id: u32,
    level: u32,
    reference: Option<BestRun>,
    last_trash_update: f64,
    last_boss_update: f64,
    cache: Option<CachedComparison>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            governor: Governor::new(Profile::Balanced),
            efficiency_config: EfficiencyConfig::default(),
            extrapolation_enabled: true,
            tracker: RunTracker::new(),
            dungeon_id: 0,
            level: 0,
            reference: None,
            last_trash_update: f64::NEG_INFINITY,
            last_boss_update: f64::NEG_INFINITY,
            cache: None,
        }
    }

    pub fn with_governor(mut self, governor: Governor) -> Self {
        self.governor = governor;
        self
    }

    pub fn with_efficiency_config(mut self, config: EfficiencyConfig) -> Self {
        self.efficiency_config = config;
        self
    }

    pub fn with_extrapolation_enabled(mut self, enabled: bool) -> Self {
        self.extrapolation_enabled = enabled;
        self
    }

    /// Install a host-supplied scale policy (§4.2's "must remain pure"
    /// override). Replaces the Store's extrapolator in place; existing
    /// records are untouched.
    pub fn with_extrapolator(mut self, extrapolator: Extrapolator) -> Self {
        self.store.set_extrapolator(extrapolator);
        self
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.phase() == RunPhase::Active
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Reset the tracker, bind the reference via `Store::get_reference`, and
    /// clear caches. Fails with `AlreadyActive` if a run is in progress.
    pub fn start_run(&mut self, dungeon_id: u32, level: u32) -> Result<(), EngineError> {
        if self.is_tracking() {
            tracing::warn!(dungeon_id, level, "start_run rejected: a run is already active");
            return Err(EngineError::AlreadyActive);
        }
        self.reference = self.store.get_reference(dungeon_id, level, self.extrapolation_enabled);
        self.dungeon_id = dungeon_id;
        self.level = level;
        self.last_trash_update = f64::NEG_INFINITY;
        self.last_boss_update = f64::NEG_INFINITY;
        self.cache = None;

        let reference_kills: Vec<_> = self
            .reference
            .as_ref()
            .map(|r| r.boss_kills.clone())
            .unwrap_or_default();
        self.tracker
            .start(&reference_kills)
            .expect("is_tracking() checked above, tracker must be Idle");

        tracing::info!(
            dungeon_id,
            level,
            has_reference = self.reference.is_some(),
            is_extrapolated = self.reference.as_ref().map(|r| r.is_extrapolated).unwrap_or(false),
            "run started"
        );
        Ok(())
    }

    /// No-op if no run is active. Validates the observation, asks the
    /// Governor whether a trash/boss update is allowed, and feeds the
    /// tracker if so.
    pub fn update_progress(&mut self, elapsed: f64, trash_pct: f64, bosses_killed: u32, deaths: u32) {
        let _ = bosses_killed; // boss count is derived from tracker credit/kills, not echoed back in.
        if !self.is_tracking() {
            return;
        }
        if elapsed < 0.0 || !(0.0..=100.0).contains(&trash_pct) {
            tracing::warn!(elapsed, trash_pct, "rejecting out-of-domain observation");
            return;
        }
        if !self.governor.allow(ThrottleKind::Trash, self.last_trash_update, elapsed) {
            tracing::debug!(elapsed, "governor denied trash update");
            return;
        }
        self.last_trash_update = elapsed;
        if let Err(err) = self.tracker.observe(elapsed, trash_pct, deaths) {
            tracing::warn!(%err, "observation rejected, run continues with last good state");
            return;
        }
        self.cache = None;
    }

    pub fn record_boss_engage(&mut self, boss_index: u32, elapsed: f64) {
        if !self.is_tracking() {
            return;
        }
        if !self.governor.allow(ThrottleKind::Boss, self.last_boss_update, elapsed) {
            tracing::debug!(elapsed, "governor denied boss engage update");
            return;
        }
        self.last_boss_update = elapsed;
        if let Err(err) = self.tracker.engage_boss(boss_index, elapsed) {
            tracing::warn!(%err, boss_index, "boss engage rejected");
            return;
        }
        self.cache = None;
    }

    pub fn record_boss_kill(&mut self, boss_index: u32, name: String, elapsed: f64) {
        if !self.is_tracking() {
            return;
        }
        if let Err(err) = self.tracker.kill_boss(boss_index, name, elapsed) {
            tracing::warn!(%err, boss_index, "boss kill rejected");
            return;
        }
        self.cache = None;
    }

    pub fn record_death(&mut self) {
        if !self.is_tracking() {
            return;
        }
        let elapsed = self.tracker.current_sample().time;
        if let Err(err) = self.tracker.record_death(elapsed) {
            tracing::warn!(%err, "death record rejected");
            return;
        }
        self.cache = None;
    }

    /// Returns the cached comparison if its age is within `max(1.0,
    /// Governor::calc_min_interval)`; otherwise recomputes, caches, and
    /// returns. `None` if no run is active or no reference is bound.
    pub fn get_comparison(&mut self) -> Option<Comparison> {
        if !self.is_tracking() {
            return None;
        }
        let reference = self.reference.as_ref()?;
        let elapsed = self.tracker.current_sample().time;

        let cache_window = self.governor.profile().intervals().calc_min_interval.max(1.0);
        if let Some(cached) = &self.cache {
            if elapsed - cached.computed_at_elapsed < cache_window {
                return Some(cached.value);
            }
        }

        let current_sample = self.tracker.current_sample();
        let current = CurrentProgress {
            elapsed,
            trash: current_sample.trash,
            bosses: current_sample.bosses,
            deaths: current_sample.deaths,
        };

        let result = efficiency::compare(current, reference, &self.efficiency_config).ok()?;
        let comparison = Comparison {
            dungeon_id: self.dungeon_id,
            level: self.level,
            trash_delta: result.trash_delta,
            boss_delta: result.boss_delta,
            death_delta: result.death_delta,
            efficiency: result.efficiency,
            time_delta_seconds: result.time_delta_seconds,
            confidence: result.confidence,
            is_extrapolated: reference.is_extrapolated,
            source_level: reference.source_level,
        };
        self.cache = Some(CachedComparison {
            value: comparison,
            computed_at_elapsed: elapsed,
        });
        Some(comparison)
    }

    /// Freeze the timeline; if `completed && in_time`, hand it to the Store
    /// (which decides whether it is a new best). Clears active state either
    /// way.
    pub fn end_run(&mut self, completed: bool, in_time: bool, elapsed: f64) -> Result<bool, EngineError> {
        if !self.is_tracking() {
            return Err(EngineError::NotActive);
        }
        let (timeline, boss_kills, deaths) = self
            .tracker
            .end(completed, in_time, elapsed)
            .map_err(|_| EngineError::NotActive)?;

        let stored = if completed && in_time {
            let total_time = timeline.last().map(|s| s.time).unwrap_or(elapsed);
            let run = BestRun::new(self.dungeon_id, self.level, total_time, true, timeline, boss_kills, deaths, elapsed);
            self.store.put(self.dungeon_id, self.level, run)
        } else {
            false
        };

        self.reference = None;
        self.cache = None;
        Ok(stored)
    }

    /// Unconditional cancel; no write to the Store.
    pub fn reset_run(&mut self) {
        self.tracker.reset();
        self.reference = None;
        self.cache = None;
        tracing::info!("run reset");
    }
}
