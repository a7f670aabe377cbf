//! C2: synthesize a reference timeline for a higher level from a stored
//! lower-level completion.
//!
//! Extrapolation only dilates time; trash percentages, boss/fractional
//! counts, and death counts are carried through unchanged (§4.2).

use crate::model::{BestRun, BossKill};

/// A pure function of (source level, destination level) -> time multiplier.
/// Must satisfy `scale(L, L) == 1.0` and, for the default policy, be
/// multiplicative: `scale(a, c) == scale(a, b) * scale(b, c)`.
pub type ScaleFn = fn(u32, u32) -> f64;

/// The reference policy: roughly +10% time per key level.
pub fn default_scale(l_src: u32, l_dst: u32) -> f64 {
    1.10_f64.powi(l_dst as i32 - l_src as i32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrapolatorError {
    /// No source timeline was supplied.
    NoSource,
    /// `l_dst <= l_src`.
    InvalidScale,
}

impl std::fmt::Display for ExtrapolatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSource => write!(f, "no source timeline to extrapolate from"),
            Self::InvalidScale => write!(f, "destination level must be strictly greater than source level"),
        }
    }
}

impl std::error::Error for ExtrapolatorError {}

/// Dilates a stored [`BestRun`] in time to approximate a higher difficulty
/// level. Host overrides of the scale policy must remain pure functions of
/// the two levels (§4.2).
#[derive(Debug, Clone, Copy)]
pub struct Extrapolator {
    scale_fn: ScaleFn,
}

impl Default for Extrapolator {
    fn default() -> Self {
        Self {
            scale_fn: default_scale,
        }
    }
}

impl Extrapolator {
    pub fn new(scale_fn: ScaleFn) -> Self {
        Self { scale_fn }
    }

    pub fn scale_ratio(&self, l_src: u32, l_dst: u32) -> f64 {
        (self.scale_fn)(l_src, l_dst)
    }

    /// Produce a synthetic `BestRun` for `l_dst`, dilating `source`'s
    /// timeline, total time, and boss kill times by `scale(l_src, l_dst)`.
    pub fn scale(&self, source: &BestRun, l_dst: u32) -> Result<BestRun, ExtrapolatorError> {
        let l_src = source.level;
        if l_dst <= l_src {
            return Err(ExtrapolatorError::InvalidScale);
        }
        Ok(self.scale_unchecked(source, l_dst))
    }

    /// Same as [`Self::scale`] but also accepts `l_dst == l_src` (used by the
    /// idempotence property test — not part of the public contract, which
    /// requires `l_dst > l_src`).
    fn scale_unchecked(&self, source: &BestRun, l_dst: u32) -> BestRun {
        let l_src = source.level;
        let ratio = self.scale_ratio(l_src, l_dst);

        let scaled_samples: Vec<_> = source
            .timeline
            .iter()
            .map(|s| crate::model::Sample::new(s.time * ratio, s.trash, s.bosses, s.deaths))
            .collect();
        let timeline = crate::timeline::Timeline::from_persisted(scaled_samples);

        let boss_kills: Vec<BossKill> = source
            .boss_kills
            .iter()
            .map(|k| BossKill {
                boss_index: k.boss_index,
                name: k.name.clone(),
                kill_time: k.kill_time * ratio,
            })
            .collect();

        let mut result = BestRun::new(
            source.dungeon_id,
            l_dst,
            source.total_time * ratio,
            source.completed_in_time,
            timeline,
            boss_kills,
            source.deaths,
            source.stored_at,
        );
        result.is_extrapolated = true;
        result.source_level = Some(l_src);
        result
    }

    /// `scale(R, L, L) == R` modulo `is_extrapolated` (§8 idempotence
    /// property). Exposed for callers (and tests) that want to compare a
    /// same-level "extrapolation" against the untouched source.
    pub fn scale_same_level(&self, source: &BestRun) -> BestRun {
        self.scale_unchecked(source, source.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sample;
    use crate::timeline::Timeline;

    fn sample_best_run(level: u32, total_time: f64) -> BestRun {
        let mut tl = Timeline::new();
        tl.append(Sample::new(total_time * 0.5, 50.0, 1.0, 0)).unwrap();
        tl.append(Sample::new(total_time, 100.0, 2.0, 0)).unwrap();
        BestRun::new(
            100,
            level,
            total_time,
            true,
            tl,
            vec![
                BossKill {
                    boss_index: 1,
                    name: "Boss One".into(),
                    kill_time: total_time * 0.5,
                },
                BossKill {
                    boss_index: 2,
                    name: "Boss Two".into(),
                    kill_time: total_time,
                },
            ],
            0,
            0.0,
        )
    }

    #[test]
    fn default_scale_is_ten_percent_per_level() {
        let ratio = default_scale(10, 13);
        assert!((ratio - 1.10_f64.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn scale_rejects_non_increasing_levels() {
        let run = sample_best_run(10, 1200.0);
        let extrap = Extrapolator::default();
        assert_eq!(extrap.scale(&run, 10), Err(ExtrapolatorError::InvalidScale));
        assert_eq!(extrap.scale(&run, 9), Err(ExtrapolatorError::InvalidScale));
    }

    #[test]
    fn scale_dilates_time_but_preserves_progress_shape() {
        let run = sample_best_run(10, 1200.0);
        let extrap = Extrapolator::default();
        let scaled = extrap.scale(&run, 13).unwrap();

        assert!(scaled.is_extrapolated);
        assert_eq!(scaled.source_level, Some(10));
        assert_eq!(scaled.level, 13);

        let expected_ratio = 1.10_f64.powi(3);
        assert!((scaled.total_time - 1200.0 * expected_ratio).abs() < 1e-6);
        assert_eq!(scaled.timeline.len(), run.timeline.len());
        for (orig, scaled_sample) in run.timeline.iter().zip(scaled.timeline.iter()) {
            assert!((scaled_sample.time - orig.time * expected_ratio).abs() < 1e-6);
            assert_eq!(scaled_sample.trash, orig.trash);
            assert_eq!(scaled_sample.bosses, orig.bosses);
        }
        assert!(
            (scaled.boss_kills[0].kill_time - run.boss_kills[0].kill_time * expected_ratio).abs()
                < 1e-6
        );
    }

    #[test]
    fn idempotence_at_matching_level() {
        let run = sample_best_run(10, 1200.0);
        let extrap = Extrapolator::default();
        let same = extrap.scale_same_level(&run);

        assert_eq!(same.total_time, run.total_time);
        assert_eq!(same.timeline, run.timeline);
        assert_eq!(same.level, run.level);
    }

    #[test]
    fn linearity_of_multiplicative_scale() {
        let run = sample_best_run(5, 1000.0);
        let extrap = Extrapolator::default();

        let direct = extrap.scale(&run, 10).unwrap();
        let via_intermediate = extrap.scale(&extrap.scale(&run, 7).unwrap(), 10).unwrap();

        assert!((direct.total_time - via_intermediate.total_time).abs() < 1e-6);
    }
}
