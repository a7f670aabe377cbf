//! C5: pure comparison math — deltas, the efficiency scalar, the signed
//! time delta, and its confidence score. Nothing in this module touches
//! mutable state; every function takes its inputs by value/reference and
//! returns a result.

use crate::model::BestRun;

pub const DEFAULT_DEATH_PENALTY_SECONDS: f64 = 15.0;
pub const DEFAULT_BOSS_WEIGHT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EfficiencyError {
    /// No reference, an empty reference timeline, or `total_time <= 0`.
    NoComparison,
}

impl std::fmt::Display for EfficiencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoComparison => write!(f, "no usable reference to compare against"),
        }
    }
}

impl std::error::Error for EfficiencyError {}

/// The current run's live progress, as the Engine would have it at query
/// time (before the death penalty is folded in).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentProgress {
    pub elapsed: f64,
    pub trash: f64,
    pub bosses: f64,
    pub deaths: u32,
}

/// Tunable constants for the comparison math, separated from the Governor's
/// throttling config because these affect *values*, not *cadence* (§6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyConfig {
    pub death_penalty_seconds: f64,
    pub boss_weight_default: f64,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            death_penalty_seconds: DEFAULT_DEATH_PENALTY_SECONDS,
            boss_weight_default: DEFAULT_BOSS_WEIGHT,
        }
    }
}

/// The full, signed comparison result (mirrors [`crate::model::Comparison`] minus the
/// dungeon/level/extrapolation bookkeeping the Engine layers on top).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyResult {
    pub trash_delta: f64,
    pub boss_delta: f64,
    pub death_delta: i64,
    pub efficiency: f64,
    pub time_delta_seconds: f64,
    pub confidence: u8,
}

/// `elapsed + deaths * death_penalty_seconds` (§4.5 / glossary "effective time").
pub fn effective_time(elapsed: f64, deaths: u32, config: &EfficiencyConfig) -> f64 {
    elapsed + deaths as f64 * config.death_penalty_seconds
}

/// Combined progress scalar `trash + W_boss * bosses`, used to map between
/// progress and reference time for the time-delta computation.
fn combined_progress(trash: f64, bosses: f64, boss_weight: f64) -> f64 {
    trash + boss_weight * bosses
}

/// Compare `current` against `reference` at the current query time.
///
/// §4.5 describes an optional per-boss-weight override of the efficiency
/// scalar's `W_boss * boss_delta` term (`Σ_i w_i * Δ_i`, each boss's own
/// weight times its own this-run-minus-reference credit). This crate's data
/// model (§3) tracks only cumulative fractional boss credit on a
/// `Timeline`, not a per-boss credit series for either the current run or
/// a stored reference, so there is no `Δ_i` to weight individually —
/// `compare` therefore always uses the single `boss_weight_default` term
/// and does not accept a per-boss override. A host that wants true
/// per-boss weighting needs to track and diff per-boss credit itself.
pub fn compare(
    current: CurrentProgress,
    reference: &BestRun,
    config: &EfficiencyConfig,
) -> Result<EfficiencyResult, EfficiencyError> {
    if reference.timeline.is_empty() || reference.total_time <= 0.0 {
        return Err(EfficiencyError::NoComparison);
    }

    let effective = effective_time(current.elapsed, current.deaths, config);
    let ref_point = reference.timeline.at(effective);

    let trash_delta = current.trash - ref_point.trash;
    let boss_delta = current.bosses - ref_point.bosses;
    let death_delta = current.deaths as i64 - ref_point.deaths as i64;

    let efficiency = (trash_delta + config.boss_weight_default * boss_delta) / 2.0;

    let (time_delta_seconds, extrapolated_past_end) =
        time_delta(current, reference, effective, config.boss_weight_default);

    let confidence = confidence_score(current.elapsed, current.trash, current.bosses, config.boss_weight_default, extrapolated_past_end);

    Ok(EfficiencyResult {
        trash_delta,
        boss_delta,
        death_delta,
        efficiency,
        time_delta_seconds,
        confidence,
    })
}

/// Step 1-3 of §4.5: interpolate the reference time at which combined
/// progress reached `P_cur`, then `time_delta = effective - t_ref`. Returns
/// whether the lookup had to extrapolate past the reference's last sample
/// (used to cap confidence).
fn time_delta(
    current: CurrentProgress,
    reference: &BestRun,
    effective: f64,
    boss_weight: f64,
) -> (f64, bool) {
    let p_cur = combined_progress(current.trash, current.bosses, boss_weight);

    let samples: Vec<_> = reference.timeline.iter().collect();
    let first = samples.first();
    let last = samples.last();

    let (Some(first), Some(last)) = (first, last) else {
        return (effective, false);
    };

    let p_last = combined_progress(last.trash, last.bosses, boss_weight);
    let p_first = combined_progress(first.trash, first.bosses, boss_weight);

    if p_cur > p_last {
        let rate = if p_last > 0.0 {
            reference.total_time / p_last
        } else {
            0.0
        };
        let t_ref = p_cur * rate;
        return (effective - t_ref, true);
    }

    if p_cur <= p_first {
        let t_ref = if p_first > 0.0 {
            first.time * (p_cur / p_first)
        } else {
            0.0
        };
        return (effective - t_ref, false);
    }

    // Bracket P_cur between two consecutive samples and interpolate.
    let mut t_ref = last.time;
    for pair in samples.windows(2) {
        let a = pair[0];
        let b = pair[1];
        let p_a = combined_progress(a.trash, a.bosses, boss_weight);
        let p_b = combined_progress(b.trash, b.bosses, boss_weight);
        if p_a <= p_cur && p_cur <= p_b {
            let span = p_b - p_a;
            let frac = if span > 0.0 { (p_cur - p_a) / span } else { 0.0 };
            t_ref = a.time + (b.time - a.time) * frac;
            break;
        }
    }
    (effective - t_ref, false)
}

/// Confidence scoring per §4.5: starts at 50, +20/+15/+10 thresholds,
/// clamped to [0, 95], capped at 60 when the time-delta lookup extrapolated
/// past the reference's last sample.
fn confidence_score(elapsed: f64, trash: f64, bosses: f64, boss_weight: f64, extrapolated_past_end: bool) -> u8 {
    let mut score: i32 = 50;
    if elapsed >= 300.0 {
        score += 20;
    }
    if elapsed >= 600.0 {
        score += 15;
    }
    if combined_progress(trash, bosses, boss_weight) >= 50.0 {
        score += 10;
    }
    score = score.clamp(0, 95);
    if extrapolated_past_end {
        score = score.min(60);
    }
    score as u8
}
