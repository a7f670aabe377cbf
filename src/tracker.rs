//! C6: the active-run state machine.
//!
//! ```text
//! ┌──────┐  Start   ┌────────┐  End(true,true)   ┌───────────────────┐
//! │ Idle │────────▶│ Active │──────────────────▶│ Completed-in-time  │
//! └──────┘         └────────┘                    └───────────────────┘
//!     ▲                 │
//!     │                 │ End(_,false) or End(false,_)
//!     │                 ▼
//!     │           ┌────────────────┐
//!     └───────────│ Completed-failed│
//!                 └────────────────┘
//! ```
//!
//! `RunTracker` owns milestone recording, fractional boss credit, death
//! accounting, and boss-kill bookkeeping (§4.6). It never touches the
//! [`crate::store::Store`] or the [`crate::governor::Governor`] — those are the
//! [`crate::engine::Engine`]'s job.

use crate::model::{BossKill, BossProgress, Sample, MILESTONE_STEP};
use crate::timeline::Timeline;

/// Milestone debounce threshold (§4.6, §9): observations arriving within
/// this many seconds of the previously recorded sample are ignored.
pub const MILESTONE_DEBOUNCE_SECS: f64 = 0.1;

/// Default expected boss fight duration when no reference is bound (§4.6).
pub const DEFAULT_BOSS_DURATION_SECS: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Active,
    CompletedInTime,
    CompletedFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Start called while already active.
    AlreadyActive,
    /// A mutating call arrived while not active.
    NotActive,
    /// An observation or event failed domain validation; the run continues
    /// with its last good state (§7) — this is returned so the Engine can
    /// log a diagnostic, not to abort the run.
    InvalidInput { reason: String },
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "a run is already active"),
            Self::NotActive => write!(f, "no run is active"),
            Self::InvalidInput { reason } => write!(f, "invalid input: {reason}"),
        }
    }
}

impl std::error::Error for TrackerError {}

/// The active-run state machine and its recorded timeline.
#[derive(Debug)]
pub struct RunTracker {
    phase: RunPhase,
    timeline: Timeline,
    boss_kills: Vec<BossKill>,
    next_threshold: f64,
    current: Sample,
    boss_progress: Vec<BossProgress>,
    reference_boss_durations: Vec<f64>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            timeline: Timeline::new(),
            boss_kills: Vec::new(),
            next_threshold: MILESTONE_STEP,
            current: Sample::new(0.0, 0.0, 0.0, 0),
            boss_progress: Vec::new(),
            reference_boss_durations: Vec::new(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn current_sample(&self) -> Sample {
        self.current
    }

    pub fn cumulative_bosses(&self) -> f64 {
        let killed = self.boss_kills.len() as f64;
        let engaged_credit: f64 = self.boss_progress.iter().map(|bp| bp.last_quarter_credited).sum();
        killed + engaged_credit
    }

    /// Reset to `Idle` and start a fresh `Active` run, recording each boss's
    /// expected duration from the reference (kill_time minus the previous
    /// boss's kill_time, or minus 0 for boss 1) if one is bound.
    pub fn start(&mut self, reference_boss_kills: &[BossKill]) -> Result<(), TrackerError> {
        if self.phase == RunPhase::Active {
            return Err(TrackerError::AlreadyActive);
        }
        self.phase = RunPhase::Active;
        self.timeline = Timeline::new();
        self.boss_kills.clear();
        self.next_threshold = MILESTONE_STEP;
        self.current = Sample::new(0.0, 0.0, 0.0, 0);
        self.boss_progress.clear();

        self.reference_boss_durations.clear();
        let mut prev_time = 0.0;
        for kill in reference_boss_kills {
            self.reference_boss_durations.push((kill.kill_time - prev_time).max(0.0));
            prev_time = kill.kill_time;
        }
        Ok(())
    }

    fn require_active(&self) -> Result<(), TrackerError> {
        if self.phase != RunPhase::Active {
            return Err(TrackerError::NotActive);
        }
        Ok(())
    }

    /// Process one raw observation: validate, update live boss credit from
    /// elapsed time, record any crossed milestones, and track the current
    /// sample. Debounces observations arriving `< MILESTONE_DEBOUNCE_SECS`
    /// after the previously recorded sample.
    pub fn observe(
        &mut self,
        elapsed: f64,
        trash_pct: f64,
        deaths: u32,
    ) -> Result<(), TrackerError> {
        self.require_active()?;
        if elapsed < 0.0 || !(0.0..=100.0).contains(&trash_pct) {
            return Err(TrackerError::InvalidInput {
                reason: format!("elapsed={elapsed}, trash_pct={trash_pct} out of domain"),
            });
        }
        if trash_pct < self.current.trash || deaths < self.current.deaths {
            return Err(TrackerError::InvalidInput {
                reason: "trash/deaths may not regress within a run".into(),
            });
        }

        self.tick_boss_credit(elapsed);

        let bosses = self.cumulative_bosses();
        self.current = Sample::new(elapsed, trash_pct, bosses, deaths);

        while trash_pct >= self.next_threshold && self.next_threshold <= 100.0 {
            let threshold = self.next_threshold;
            self.record_sample_if_not_debounced(Sample::new(elapsed, threshold, bosses, deaths));
            self.next_threshold += MILESTONE_STEP;
        }
        Ok(())
    }

    fn record_sample_if_not_debounced(&mut self, sample: Sample) {
        if let Some(last) = self.timeline.last() {
            if (sample.time - last.time).abs() < MILESTONE_DEBOUNCE_SECS {
                tracing::debug!(time = sample.time, "debouncing milestone sample");
                return;
            }
        }
        if self.timeline.append(sample).is_err() {
            tracing::warn!(time = sample.time, "dropped milestone sample: would violate timeline invariants");
            return;
        }
        tracing::debug!(trash = sample.trash, time = sample.time, "recorded milestone sample");
    }

    /// Sweep every currently-engaged boss's credit forward to `now`.
    fn tick_boss_credit(&mut self, now: f64) {
        for bp in &mut self.boss_progress {
            let credited = bp.credit_at(now);
            bp.last_quarter_credited = credited;
        }
    }

    /// Begin a boss engagement, snapshotting its expected duration from the
    /// bound reference (or the 90s default).
    pub fn engage_boss(&mut self, boss_index: u32, elapsed: f64) -> Result<(), TrackerError> {
        self.require_active()?;
        let expected_duration = self
            .reference_boss_durations
            .get((boss_index.saturating_sub(1)) as usize)
            .copied()
            .filter(|d| *d > 0.0)
            .unwrap_or(DEFAULT_BOSS_DURATION_SECS);

        if let Some(existing) = self.boss_progress.iter_mut().find(|bp| bp.boss_index == boss_index) {
            existing.engage_time = elapsed;
        } else {
            self.boss_progress.push(BossProgress::new(boss_index, elapsed, expected_duration));
        }
        Ok(())
    }

    /// Record a boss kill: `boss_index` must be `previous_kill_count + 1`.
    /// Credit jumps to 1.0 regardless of elapsed-time-derived credit.
    pub fn kill_boss(&mut self, boss_index: u32, name: String, elapsed: f64) -> Result<(), TrackerError> {
        self.require_active()?;
        let expected_index = self.boss_kills.len() as u32 + 1;
        if boss_index != expected_index {
            return Err(TrackerError::InvalidInput {
                reason: format!(
                    "boss_index {boss_index} is not the expected next kill index {expected_index}"
                ),
            });
        }
        self.boss_progress.retain(|bp| bp.boss_index != boss_index);
        self.boss_kills.push(BossKill {
            boss_index,
            name,
            kill_time: elapsed,
        });

        let bosses = self.cumulative_bosses();
        self.current = Sample::new(elapsed, self.current.trash, bosses, self.current.deaths);
        Ok(())
    }

    /// Increment the death counter. Unbounded above.
    pub fn record_death(&mut self, elapsed: f64) -> Result<(), TrackerError> {
        self.require_active()?;
        let deaths = self.current.deaths + 1;
        self.current = Sample::new(elapsed.max(self.current.time), self.current.trash, self.current.bosses, deaths);
        Ok(())
    }

    /// Freeze the timeline at `elapsed`, appending a final sample if one
    /// isn't already recorded there, and transition to the terminal phase.
    /// Returns the frozen timeline and boss kills to the caller (the
    /// Engine), which decides whether to hand them to the Store.
    pub fn end(
        &mut self,
        completed: bool,
        in_time: bool,
        elapsed: f64,
    ) -> Result<(Timeline, Vec<BossKill>, u32), TrackerError> {
        self.require_active()?;

        // Only append if it would actually extend the timeline; otherwise
        // the existing last sample already represents completion.
        if self.timeline.last().map(|l| l.time).unwrap_or(-1.0) < elapsed {
            let final_sample = Sample::new(elapsed, self.current.trash, self.current.bosses, self.current.deaths);
            let _ = self.timeline.append(final_sample);
        }

        self.phase = if completed && in_time {
            RunPhase::CompletedInTime
        } else {
            RunPhase::CompletedFailed
        };

        Ok((self.timeline.clone(), self.boss_kills.clone(), self.current.deaths))
    }

    /// Unconditional cancel; discards all state and returns to `Idle`.
    pub fn reset(&mut self) {
        self.phase = RunPhase::Idle;
        self.timeline = Timeline::new();
        self.boss_kills.clear();
        self.next_threshold = MILESTONE_STEP;
        self.current = Sample::new(0.0, 0.0, 0.0, 0);
        self.boss_progress.clear();
        self.reference_boss_durations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestones_recorded_every_five_percent() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();

        for i in 1..=20 {
            tracker.observe(i as f64 * 10.0, i as f64 * 5.0, 0).unwrap();
        }
        assert_eq!(tracker.timeline().len(), 20);
        let thresholds: Vec<f64> = tracker.timeline().iter().map(|s| s.trash).collect();
        let expected: Vec<f64> = (1..=20).map(|i| i as f64 * 5.0).collect();
        assert_eq!(thresholds, expected);
    }

    #[test]
    fn milestone_debounce_ignores_bursty_ticks() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();
        tracker.observe(100.0, 5.0, 0).unwrap();
        // Arrives 0.05s later, crossing straight into the 10% threshold.
        // Still within the debounce window of the previously recorded
        // sample, so this crossing is dropped rather than double-recorded.
        tracker.observe(100.05, 10.0, 0).unwrap();
        assert_eq!(tracker.timeline().len(), 1, "10% crossing arrived within the debounce window of the 5% sample");
    }

    #[test]
    fn reject_observation_while_idle() {
        let mut tracker = RunTracker::new();
        assert_eq!(tracker.observe(10.0, 5.0, 0), Err(TrackerError::NotActive));
    }

    #[test]
    fn reject_invalid_observation_domain() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();
        assert!(matches!(
            tracker.observe(-1.0, 5.0, 0),
            Err(TrackerError::InvalidInput { .. })
        ));
        assert!(matches!(
            tracker.observe(10.0, 101.0, 0),
            Err(TrackerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn boss_credit_steps_with_elapsed_time_and_jumps_to_one_on_kill() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();
        tracker.engage_boss(1, 0.0).unwrap();

        tracker.observe(30.0, 0.0, 0).unwrap(); // 30/90 = 0.33 -> 0.25 credit
        assert!((tracker.cumulative_bosses() - 0.25).abs() < 1e-9);

        tracker.kill_boss(1, "Boss One".to_string(), 45.0).unwrap();
        assert!((tracker.cumulative_bosses() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn kill_boss_rejects_out_of_sequence_index() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();
        assert!(matches!(
            tracker.kill_boss(2, "Skip".to_string(), 10.0),
            Err(TrackerError::InvalidInput { .. })
        ));
        tracker.kill_boss(1, "First".to_string(), 10.0).unwrap();
        assert!(matches!(
            tracker.kill_boss(1, "Dup".to_string(), 20.0),
            Err(TrackerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn deaths_accumulate_without_upper_bound() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();
        for i in 0..10 {
            tracker.record_death(i as f64).unwrap();
        }
        assert_eq!(tracker.current_sample().deaths, 10);
    }

    #[test]
    fn end_completed_in_time_transitions_and_freezes_timeline() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();
        tracker.observe(500.0, 50.0, 0).unwrap();

        let (timeline, _kills, _deaths) = tracker.end(true, true, 1000.0).unwrap();
        assert_eq!(tracker.phase(), RunPhase::CompletedInTime);
        assert_eq!(timeline.last().unwrap().time, 1000.0);
    }

    #[test]
    fn end_failed_run_transitions_to_completed_failed() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();
        let _ = tracker.end(false, false, 500.0).unwrap();
        assert_eq!(tracker.phase(), RunPhase::CompletedFailed);

        let mut tracker2 = RunTracker::new();
        tracker2.start(&[]).unwrap();
        let _ = tracker2.end(true, false, 500.0).unwrap();
        assert_eq!(tracker2.phase(), RunPhase::CompletedFailed);
    }

    #[test]
    fn reset_returns_to_idle_and_discards_state() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();
        tracker.observe(100.0, 10.0, 0).unwrap();
        tracker.reset();
        assert_eq!(tracker.phase(), RunPhase::Idle);
        assert_eq!(tracker.timeline().len(), 0);
    }

    #[test]
    fn start_while_active_is_rejected() {
        let mut tracker = RunTracker::new();
        tracker.start(&[]).unwrap();
        assert_eq!(tracker.start(&[]), Err(TrackerError::AlreadyActive));
    }

    #[test]
    fn boss_expected_duration_derives_from_reference_kill_gaps() {
        let mut tracker = RunTracker::new();
        let reference_kills = vec![
            BossKill { boss_index: 1, name: "A".into(), kill_time: 100.0 },
            BossKill { boss_index: 2, name: "B".into(), kill_time: 250.0 },
        ];
        tracker.start(&reference_kills).unwrap();
        tracker.engage_boss(2, 200.0).unwrap();
        // Boss 2's expected duration = 250 - 100 = 150s; at +75s we should
        // be at 50% credit.
        tracker.observe(275.0, 0.0, 0).unwrap();
        assert!((tracker.cumulative_bosses() - 0.5).abs() < 1e-9);
    }
}
