//! Chaos Stacker - a vertical block-stacking arcade game core
//!
//! Core modules:
//! - `sim`: Deterministic gameplay (block lifecycle, scoring, chaos events)
//! - `physics`: Rigid-body world adapter (fixed timestep, contact events)
//! - `materials`: Static block material catalog
//! - `progression`: Lifetime score and cosmetic unlocks
//!
//! Rendering, audio, particles, camera and UI are external collaborators:
//! they drive [`sim::StackController::update`] from a frame callback, issue
//! commands (`drop_block`, `hold`, `start`, `reset`) and consume the queued
//! [`sim::GameEvent`]s. The core never calls back into them.

pub mod materials;
pub mod physics;
pub mod progression;
pub mod sim;

pub use materials::{Material, MaterialCatalog};
pub use progression::Progression;
pub use sim::{GameEvent, GamePhase, PlacementResult, StackController, Tier};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum physics substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 3;

    /// World gravity (strong pull for a punchy arcade feel)
    pub const GRAVITY_Y: f32 = -20.0;

    /// Default block footprint (x and z extent)
    pub const BLOCK_FOOTPRINT: f32 = 4.0;
    /// Block height, also the height of one tower floor
    pub const BLOCK_HEIGHT: f32 = 1.0;
    /// Base slab half extents (x, y, z)
    pub const BASE_HALF_EXTENTS: [f32; 3] = [3.0, 2.0, 3.0];
    /// Base slab center height (top face sits at y = 0)
    pub const BASE_Y: f32 = -2.0;
    /// Vertical clearance between the stack top and a freshly spawned block
    pub const SPAWN_CLEARANCE: f32 = 4.0;

    /// Oscillation sweep half-width
    pub const OSC_AMPLITUDE: f32 = 8.0;
    /// Oscillation angular speed for the first block (radians/sec)
    pub const OSC_ANGULAR_BASE: f32 = 3.0;
    /// Angular speed gain per spawned floor (difficulty ramp)
    pub const OSC_ANGULAR_PER_FLOOR: f32 = 0.2;

    /// Downward launch velocity applied on drop
    pub const DROP_VELOCITY_Y: f32 = -10.0;

    /// Wall-clock delay before a dropped block is judged settled/collapsed
    pub const SETTLE_DELAY_MS: f64 = 1000.0;
    /// A judged block this far below its resting layer has fallen off
    pub const SETTLE_DROP_MARGIN: f32 = 10.0;
    /// Any non-base block below this world height ends the run immediately
    pub const FLOOR_Y: f32 = -5.0;

    /// A chaos event triggers every Nth spawned floor
    pub const CHAOS_CADENCE: u32 = 5;
    /// Minimum relative normal speed for a contact to be reported
    pub const IMPACT_SPEED_MIN: f32 = 1.0;

    // Chaos effect magnitudes. Keep these bounded: extreme masses or forces
    // destabilize the solver.
    /// "heavy" spawn modifier mass factor
    pub const HEAVY_MASS_MULT: f32 = 5.0;
    /// "tiny" spawn modifier footprint factor (both horizontal axes)
    pub const TINY_FOOTPRINT_MULT: f32 = 0.5;
    /// "wind" horizontal force on the current falling block
    pub const WIND_FORCE_X: f32 = 10.0;
    /// "wind" effect duration
    pub const WIND_DURATION_MS: f64 = 4000.0;
    /// "earthquake" per-axis impulse range (+/-)
    pub const QUAKE_IMPULSE: f32 = 2.5;
    /// "high-gravity" gravity factor
    pub const HIGH_GRAVITY_SCALE: f32 = 1.8;
    /// "high-gravity" effect duration
    pub const HIGH_GRAVITY_DURATION_MS: f64 = 5000.0;
    /// "glitch" inverted-controls duration
    pub const GLITCH_DURATION_MS: f64 = 4000.0;
}
