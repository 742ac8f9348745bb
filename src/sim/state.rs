//! Game state and core simulation types

use glam::{Quat, Vec3};
use rapier3d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::sim::scoring::Tier;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for `start()`
    Ready,
    /// Active gameplay
    Playing,
    /// Run ended (tower collapsed or a block fell off)
    GameOver,
}

/// Lifecycle of a single block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockPhase {
    /// Just created, not yet swinging (instantaneous)
    Spawning,
    /// Kinematic, swinging over the stack, waiting for the drop command
    Oscillating,
    /// Dynamic, dropped but not yet judged
    Falling,
    /// Judged part of the standing tower
    Settled,
    /// Judged fallen off the tower
    Collapsed,
}

/// Horizontal oscillation axis; alternates per floor so each layer stacks
/// crosswise to the one below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Z,
}

impl Axis {
    pub fn flipped(self) -> Self {
        match self {
            Axis::X => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Z => Vec3::Z,
        }
    }

    /// Component of a vector along this axis
    pub fn component(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Z => v.z,
        }
    }
}

/// Analytic swing state, present only while a block oscillates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Oscillation {
    pub axis: Axis,
    /// Sine phase (radians)
    pub phase: f32,
    /// Phase advance per second; grows with stack height
    pub angular_speed: f32,
    /// Sweep half-width
    pub amplitude: f32,
}

impl Oscillation {
    /// Current offset from the swing center along the axis
    pub fn offset(&self) -> f32 {
        self.amplitude * self.phase.sin()
    }
}

/// Horizontal footprint extents of a block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub x: f32,
    pub z: f32,
}

impl Footprint {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            z: self.z * factor,
        }
    }
}

/// Everything needed to generate a block: the reserve slot stores one of
/// these, and chaos spawn modifiers rewrite them before the body exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpawnParams {
    /// Material catalog index
    pub material: usize,
    pub footprint: Footprint,
    /// Chaos mass factor applied on top of the material
    pub mass_multiplier: f32,
}

/// Pose handed to render collaborators, synced from the physics body
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VisualTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

/// One stacking unit: a rigid body plus its game metadata
#[derive(Debug, Clone)]
pub struct Block {
    pub id: u32,
    /// Material catalog index
    pub material: usize,
    pub footprint: Footprint,
    pub height: f32,
    pub body: RigidBodyHandle,
    pub visual: VisualTransform,
    pub phase: BlockPhase,
    pub oscillation: Option<Oscillation>,
    /// Mass the body assumes once dynamic: footprint volume x material
    /// density x material multiplier x chaos multiplier
    pub target_mass: f32,
    /// Chaos mass factor this block was generated with
    pub mass_multiplier: f32,
    /// Height the block is expected to rest at if the tower holds
    pub rest_y: f32,
    /// Swing center while oscillating
    pub spawn_center: Vec3,
}

/// Outcome of one drop, handed to feedback collaborators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementResult {
    pub tier: Tier,
    /// Absolute offset from the supporting block along the swing axis
    pub offset: f32,
    pub combo_after: u32,
    pub points: u64,
    pub total_after: u64,
}

/// Events queued by the core and drained by collaborators (audio, particles,
/// camera, UI). The core never calls into them.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A new contact between two blocks above the impact-speed threshold
    Contact {
        block_a: u32,
        block_b: u32,
        impact_speed: f32,
    },
    Placement(PlacementResult),
    PerfectPlacement {
        combo: u32,
    },
    ChaosStarted {
        id: &'static str,
        name: &'static str,
        description: &'static str,
    },
    ChaosEnded {
        id: &'static str,
    },
    GameOver {
        final_score: u64,
        floors: u32,
    },
}

/// A settle judgment waiting to fire, stamped with the block it belongs to.
/// At fire time the controller re-validates that the block is still the
/// active drop; a stale judgment is a no-op.
#[derive(Debug, Clone, Copy)]
pub struct PendingJudgment {
    pub block_id: u32,
    pub due_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_alternates() {
        assert_eq!(Axis::X.flipped(), Axis::Z);
        assert_eq!(Axis::Z.flipped().flipped(), Axis::Z);
    }

    #[test]
    fn test_oscillation_offset_bounds() {
        let mut osc = Oscillation {
            axis: Axis::X,
            phase: 0.0,
            angular_speed: 3.0,
            amplitude: 8.0,
        };
        for i in 0..100 {
            osc.phase = i as f32 * 0.37;
            assert!(osc.offset().abs() <= osc.amplitude + 1e-6);
        }
    }

    #[test]
    fn test_footprint_scaling() {
        let fp = Footprint::new(4.0, 4.0).scaled(0.5);
        assert_eq!(fp, Footprint::new(2.0, 2.0));
    }
}
