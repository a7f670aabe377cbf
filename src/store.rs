//! C3: per-(dungeon, level) best-run store.
//!
//! At most one [`BestRun`] is kept per key. `get_reference` is the only
//! component allowed to synthesize a value that was never `put` — via the
//! [`Extrapolator`] — and such synthesized records are never written back
//! (§4.3).

use std::collections::HashMap;

use crate::extrapolator::Extrapolator;
use crate::model::BestRun;

/// `(dungeon_id, level)` — the Store's key type.
pub type StoreKey = (u32, u32);

/// A per-(dungeon, level) best-run store, owned exclusively by the
/// [`crate::engine::Engine`].
#[derive(Debug, Default)]
pub struct Store {
    records: HashMap<StoreKey, BestRun>,
    extrapolator: Extrapolator,
}

impl Store {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            extrapolator: Extrapolator::default(),
        }
    }

    pub fn with_extrapolator(extrapolator: Extrapolator) -> Self {
        Self {
            records: HashMap::new(),
            extrapolator,
        }
    }

    /// Swap the scale policy used by `get_reference`, keeping existing
    /// records in place.
    pub fn set_extrapolator(&mut self, extrapolator: Extrapolator) {
        self.extrapolator = extrapolator;
    }

    /// Write `run` iff the slot is empty, or `run.total_time` is strictly
    /// lower than the existing record's `total_time` and `run.completed_in_time`
    /// is true. Returns whether the write happened. Never stores a record
    /// with `is_extrapolated = true` — such a run is rejected unconditionally.
    pub fn put(&mut self, dungeon_id: u32, level: u32, run: BestRun) -> bool {
        if run.is_extrapolated {
            tracing::debug!(dungeon_id, level, "refusing to store an extrapolated run");
            return false;
        }
        if !run.completed_in_time {
            tracing::debug!(dungeon_id, level, "refusing to store a run that did not complete in time");
            return false;
        }
        let key = (dungeon_id, level);
        let replace = match self.records.get(&key) {
            None => true,
            Some(existing) => run.total_time < existing.total_time,
        };
        if replace {
            tracing::info!(
                dungeon_id,
                level,
                new_time = run.total_time,
                previous_time = self.records.get(&key).map(|r| r.total_time),
                "storing new best run"
            );
            self.records.insert(key, run);
        } else {
            tracing::debug!(
                dungeon_id,
                level,
                attempted_time = run.total_time,
                "put rejected: not an improvement"
            );
        }
        replace
    }

    /// Exact-match read only.
    pub fn get_best(&self, dungeon_id: u32, level: u32) -> Option<BestRun> {
        self.records.get(&(dungeon_id, level)).cloned()
    }

    /// Exact match if present; otherwise, when `extrapolation_enabled`, the
    /// highest stored level below `level` for the same dungeon, scaled up
    /// via the [`Extrapolator`]. Pure function of store state + the flag:
    /// repeated calls with identical inputs yield equal records (modulo
    /// `stored_at`, which the extrapolator carries through from the source).
    pub fn get_reference(
        &self,
        dungeon_id: u32,
        level: u32,
        extrapolation_enabled: bool,
    ) -> Option<BestRun> {
        if let Some(exact) = self.get_best(dungeon_id, level) {
            return Some(exact);
        }
        if !extrapolation_enabled {
            return None;
        }
        let source_level = self
            .records
            .keys()
            .filter(|(d, l)| *d == dungeon_id && *l < level)
            .map(|(_, l)| *l)
            .max()?;
        let source = self.records.get(&(dungeon_id, source_level))?;
        self.extrapolator.scale(source, level).ok()
    }

    pub fn delete(&mut self, dungeon_id: u32, level: u32) -> Option<BestRun> {
        self.records.remove(&(dungeon_id, level))
    }

    pub fn delete_all(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
