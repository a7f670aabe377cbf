//! pacekeeper
//!
//! Real-time pace analysis for timed dungeon runs: tracks a run's live
//! progress against its best prior completion (exact match, or an
//! extrapolated estimate at a higher difficulty level) and reports a
//! throttled, confidence-scored comparison.
//!
//! Host integration shape:
//!
//! ```text
//! event source ──▶ Engine::update_progress/record_boss_engage/record_boss_kill/record_death
//!                        │
//!                        ▼
//!                  Engine::get_comparison ──▶ UI
//! ```
//!
//! Most callers only need [`Engine`]; the individual components
//! ([`Timeline`], [`Extrapolator`], [`Store`], [`Governor`], [`efficiency`])
//! are public for hosts that want to assemble their own pipeline or persist
//! state between processes.

pub mod config;
pub mod efficiency;
pub mod engine;
pub mod extrapolator;
pub mod governor;
pub mod model;
pub mod store;
pub mod timeline;
pub mod tracker;

pub use config::EngineConfig;
pub use engine::{Engine, EngineError};
pub use extrapolator::Extrapolator;
pub use governor::{Governor, Profile};
pub use model::{BestRun, BossKill, Comparison, Observation};
pub use store::Store;
pub use timeline::Timeline;
pub use tracker::{RunPhase, RunTracker};
