//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be deterministic:
//! - Fixed physics timestep only
//! - Seeded RNG only
//! - Single-threaded, driven by one external frame callback
//! - Deferred work (settle judgments, chaos expiries) re-validates identity
//!   and game state when it fires; a stale firing is a silent no-op

pub mod chaos;
pub mod scoring;
pub mod state;
pub mod tick;

pub use chaos::{ChaosContext, ChaosDirector, ChaosEventDef, ChaosKind};
pub use scoring::{PlacementScorer, Tier, classify_tier};
pub use state::{
    Axis, Block, BlockPhase, Footprint, GameEvent, GamePhase, Oscillation, PlacementResult,
    SpawnParams,
};
pub use tick::StackController;
