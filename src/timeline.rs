//! C1: the sorted sample store and interpolator.
//!
//! A `Timeline` is the backbone every other component reads from: the active
//! run appends to one as it progresses, a [`crate::store::BestRun`] freezes one on
//! completion, and [`crate::efficiency`] samples one at arbitrary query times.

use serde::{Deserialize, Serialize};

use crate::model::Sample;

/// Errors from mutating a timeline. Both should never escape the
/// [`crate::engine::Engine`] in normal operation — the engine validates before
/// calling `append` — but may surface while rehydrating a persisted
/// timeline from an older, less careful version (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineError {
    /// `sample.time <= last.time`.
    OutOfOrder,
    /// `trash`, `bosses`, or `deaths` decreased relative to the prior sample.
    MonotonicityViolation,
}

impl std::fmt::Display for TimelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfOrder => write!(f, "sample time does not strictly increase"),
            Self::MonotonicityViolation => {
                write!(f, "trash/bosses/deaths decreased relative to prior sample")
            }
        }
    }
}

impl std::error::Error for TimelineError {}

/// The interpolated values `Timeline::at` returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub trash: f64,
    pub bosses: f64,
    pub deaths: u32,
}

impl TimelinePoint {
    pub const ZERO: Self = Self {
        trash: 0.0,
        bosses: 0.0,
        deaths: 0,
    };
}

/// A strictly-ordered, monotone sample sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    samples: Vec<Sample>,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Append a sample, enforcing strictly-increasing `time` and
    /// non-decreasing `trash`/`bosses`/`deaths`.
    pub fn append(&mut self, sample: Sample) -> Result<(), TimelineError> {
        if let Some(last) = self.samples.last() {
            if sample.time <= last.time {
                return Err(TimelineError::OutOfOrder);
            }
            if sample.trash < last.trash || sample.bosses < last.bosses || sample.deaths < last.deaths
            {
                return Err(TimelineError::MonotonicityViolation);
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Rehydrate a timeline from a possibly-imperfect persisted sample list,
    /// dropping (and, at the caller's discretion, logging) anything that
    /// violates ordering or monotonicity instead of failing outright (§7).
    /// When two consecutive samples share an identical `time`, the earlier
    /// one is discarded (§4.1 tie-break).
    pub fn from_persisted(mut raw: Vec<Sample>) -> Self {
        raw.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
        let mut timeline = Self::new();
        for sample in raw {
            if let Some(last) = timeline.samples.last() {
                if sample.time == last.time {
                    timeline.samples.pop();
                }
            }
            if timeline.append(sample).is_err() {
                tracing::warn!(
                    time = sample.time,
                    "dropping timeline sample that violates ordering or monotonicity on load"
                );
                continue;
            }
        }
        timeline
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Interpolate `{trash, bosses, deaths}` at time `t` (§4.1).
    pub fn at(&self, t: f64) -> TimelinePoint {
        let Some(first) = self.samples.first() else {
            return TimelinePoint::ZERO;
        };
        if t <= first.time {
            return TimelinePoint::ZERO;
        }
        let last = self.samples.last().expect("non-empty checked above");
        if t >= last.time {
            return TimelinePoint {
                trash: last.trash,
                bosses: last.bosses,
                deaths: last.deaths,
            };
        }
        // Find the unique bracketing pair: before.time <= t < after.time.
        let idx = self
            .samples
            .partition_point(|s| s.time <= t);
        let before = &self.samples[idx - 1];
        let after = &self.samples[idx];
        let span = after.time - before.time;
        let frac = if span > 0.0 { (t - before.time) / span } else { 0.0 };
        TimelinePoint {
            trash: before.trash + (after.trash - before.trash) * frac,
            bosses: before.bosses + (after.bosses - before.bosses) * frac,
            deaths: before.deaths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(time: f64, trash: f64, bosses: f64, deaths: u32) -> Sample {
        Sample::new(time, trash, bosses, deaths)
    }

    #[test]
    fn append_rejects_out_of_order_and_non_monotone() {
        let mut tl = Timeline::new();
        tl.append(s(10.0, 5.0, 0.0, 0)).unwrap();
        assert_eq!(tl.append(s(10.0, 10.0, 0.0, 0)), Err(TimelineError::OutOfOrder));
        assert_eq!(tl.append(s(5.0, 10.0, 0.0, 0)), Err(TimelineError::OutOfOrder));
        assert_eq!(
            tl.append(s(20.0, 4.0, 0.0, 0)),
            Err(TimelineError::MonotonicityViolation)
        );
    }

    #[test]
    fn at_on_empty_timeline_is_zero() {
        let tl = Timeline::new();
        assert_eq!(tl.at(100.0), TimelinePoint::ZERO);
    }

    #[test]
    fn at_before_first_and_after_last() {
        let mut tl = Timeline::new();
        tl.append(s(10.0, 5.0, 0.0, 0)).unwrap();
        tl.append(s(20.0, 10.0, 1.0, 1)).unwrap();

        assert_eq!(tl.at(0.0), TimelinePoint::ZERO);
        assert_eq!(tl.at(10.0), TimelinePoint::ZERO);
        assert_eq!(
            tl.at(20.0),
            TimelinePoint {
                trash: 10.0,
                bosses: 1.0,
                deaths: 1
            }
        );
        assert_eq!(
            tl.at(999.0),
            TimelinePoint {
                trash: 10.0,
                bosses: 1.0,
                deaths: 1
            }
        );
    }

    #[test]
    fn at_interpolates_trash_and_bosses_but_steps_deaths() {
        let mut tl = Timeline::new();
        tl.append(s(10.0, 0.0, 0.0, 0)).unwrap();
        tl.append(s(20.0, 10.0, 2.0, 1)).unwrap();

        let mid = tl.at(15.0);
        assert!((mid.trash - 5.0).abs() < 1e-9);
        assert!((mid.bosses - 1.0).abs() < 1e-9);
        // deaths is a step function: only `before`'s value, not interpolated.
        assert_eq!(mid.deaths, 0);
    }

    #[test]
    fn from_persisted_drops_duplicate_time_keeping_the_later_sample() {
        // append() forbids equal-time samples outright; from_persisted must
        // tolerate them from older data by discarding the earlier one (§4.1).
        let raw = vec![s(10.0, 5.0, 0.0, 0), s(10.0, 6.0, 0.0, 0), s(20.0, 10.0, 1.0, 0)];
        let tl = Timeline::from_persisted(raw);
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.iter().next().unwrap().trash, 6.0);
    }

    #[test]
    fn from_persisted_drops_entries_that_violate_monotonicity() {
        let raw = vec![s(10.0, 10.0, 0.0, 0), s(20.0, 5.0, 0.0, 0), s(30.0, 20.0, 0.0, 0)];
        let tl = Timeline::from_persisted(raw);
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.iter().map(|s| s.time).collect::<Vec<_>>(), vec![10.0, 30.0]);
    }
}
