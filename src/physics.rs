//! Rigid-body world adapter
//!
//! Thin wrapper around the Rapier3D pipeline exposing exactly what the stack
//! simulation needs: fixed-timestep stepping with bounded catch-up, box body
//! creation in the three flavors the game uses (fixed base, kinematic
//! oscillator, dynamic faller), per-material-pair contact properties, and
//! started-contact events with the impact speed along the contact normal.
//!
//! Contact properties are applied through a solver-contact modification hook
//! keyed off the material index stored in each collider's `user_data`. Every
//! unordered material pair must be registered before bodies using those
//! materials exist; `assert_pairs_registered` is the startup check that turns
//! a missing pair into a fatal error instead of a silent engine default.

use std::collections::{HashMap, HashSet};

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::consts::*;

/// A newly started contact between two bodies
#[derive(Debug, Clone, Copy)]
pub struct ContactHit {
    pub body_a: RigidBodyHandle,
    pub body_b: RigidBodyHandle,
    /// Relative speed along the contact normal at impact time
    pub impact_speed: f32,
}

fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Registered contact properties per unordered material pair.
///
/// Lives outside the world struct so it can be borrowed as the physics hook
/// while the pipeline mutably borrows everything else.
#[derive(Debug, Default)]
struct ContactTable {
    pairs: HashMap<(usize, usize), (f32, f32)>,
}

impl PhysicsHooks for ContactTable {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        let m1 = context.colliders[context.collider1].user_data as usize;
        let m2 = context.colliders[context.collider2].user_data as usize;
        if let Some(&(friction, restitution)) = self.pairs.get(&pair_key(m1, m2)) {
            for contact in context.solver_contacts.iter_mut() {
                contact.friction = friction;
                contact.restitution = restitution;
            }
        }
    }
}

/// The rigid-body simulation world
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    baseline_gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    contact_table: ContactTable,
    /// Real-time backlog not yet consumed by fixed steps
    accumulator: f32,
    /// Collider pairs in contact after the last step (for started-contact detection)
    touching: HashSet<(ColliderHandle, ColliderHandle)>,
    hits: Vec<ContactHit>,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let baseline = vector![0.0, GRAVITY_Y, 0.0];
        Self {
            gravity: baseline,
            baseline_gravity: baseline,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            contact_table: ContactTable::default(),
            accumulator: 0.0,
            touching: HashSet::new(),
            hits: Vec::new(),
        }
    }

    /// Record contact properties for an unordered material pair.
    pub fn register_material_pair(&mut self, a: usize, b: usize, friction: f32, restitution: f32) {
        self.contact_table
            .pairs
            .insert(pair_key(a, b), (friction, restitution));
    }

    /// Startup check: every unordered pair over `material_count` indices
    /// (self-pairs included) must be registered, otherwise contact resolution
    /// would silently fall back to engine defaults.
    pub fn assert_pairs_registered(&self, material_count: usize) -> anyhow::Result<()> {
        for a in 0..material_count {
            for b in a..material_count {
                anyhow::ensure!(
                    self.contact_table.pairs.contains_key(&pair_key(a, b)),
                    "uninitialized contact pair ({a}, {b})"
                );
            }
        }
        Ok(())
    }

    /// Scale gravity relative to the baseline. Always derived from the
    /// baseline constant so repeated chaos effects cannot compound.
    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity = self.baseline_gravity * scale;
    }

    /// Advance the simulation by up to `max_substeps` fixed increments,
    /// absorbing `elapsed_real_dt` of frame time. Leftover backlog beyond one
    /// step is dropped so a long stall cannot trigger unbounded catch-up.
    pub fn step(&mut self, fixed_dt: f32, elapsed_real_dt: f32, max_substeps: u32) {
        self.accumulator += elapsed_real_dt;
        self.integration_parameters.dt = fixed_dt;

        let mut substeps = 0;
        while self.accumulator >= fixed_dt && substeps < max_substeps {
            let pre_step_velocities: HashMap<RigidBodyHandle, Vector<Real>> = self
                .bodies
                .iter()
                .map(|(handle, body)| (handle, *body.linvel()))
                .collect();

            self.pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                None,
                &self.contact_table,
                &(),
            );

            self.collect_started_contacts(&pre_step_velocities);
            self.accumulator -= fixed_dt;
            substeps += 1;
        }
        self.accumulator = self.accumulator.min(fixed_dt);
    }

    /// Diff the narrow phase against the previous step's contact set and
    /// queue an event for each newly started contact. Impact speed uses the
    /// velocities captured before the solver resolved the collision.
    fn collect_started_contacts(
        &mut self,
        pre_step_velocities: &HashMap<RigidBodyHandle, Vector<Real>>,
    ) {
        let mut current = HashSet::new();
        for pair in self.narrow_phase.contact_pairs() {
            if !pair.has_any_active_contact {
                continue;
            }
            let key = if pair.collider1.into_raw_parts() <= pair.collider2.into_raw_parts() {
                (pair.collider1, pair.collider2)
            } else {
                (pair.collider2, pair.collider1)
            };
            current.insert(key);
            if self.touching.contains(&key) {
                continue;
            }

            let parent_a = self.colliders[pair.collider1].parent();
            let parent_b = self.colliders[pair.collider2].parent();
            let (Some(body_a), Some(body_b)) = (parent_a, parent_b) else {
                continue;
            };

            let zero = Vector::zeros();
            let va = pre_step_velocities.get(&body_a).unwrap_or(&zero);
            let vb = pre_step_velocities.get(&body_b).unwrap_or(&zero);
            let relative = va - vb;
            let impact_speed = match pair.manifolds.iter().find(|m| !m.points.is_empty()) {
                Some(manifold) => relative.dot(&manifold.data.normal).abs(),
                None => relative.norm(),
            };

            if impact_speed >= IMPACT_SPEED_MIN {
                self.hits.push(ContactHit {
                    body_a,
                    body_b,
                    impact_speed,
                });
            }
        }
        self.touching = current;
    }

    /// Take the contact events queued since the last drain.
    pub fn drain_contacts(&mut self) -> Vec<ContactHit> {
        std::mem::take(&mut self.hits)
    }

    fn add_box(
        &mut self,
        builder: RigidBodyBuilder,
        position: Vec3,
        half_extents: Vec3,
        material: usize,
        density: f32,
        friction: f32,
        restitution: f32,
    ) -> RigidBodyHandle {
        let body = builder
            .translation(vector![position.x, position.y, position.z])
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .density(density)
            .friction(friction)
            .restitution(restitution)
            .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS)
            .user_data(material as u128)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Immovable base slab.
    pub fn add_fixed_box(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        material: usize,
        friction: f32,
        restitution: f32,
    ) -> RigidBodyHandle {
        self.add_box(
            RigidBodyBuilder::fixed(),
            position,
            half_extents,
            material,
            1.0,
            friction,
            restitution,
        )
    }

    /// Kinematic oscillator body. Collider density is set up front so the
    /// engine derives the target mass the moment the body turns dynamic.
    pub fn add_kinematic_box(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        material: usize,
        density: f32,
        friction: f32,
        restitution: f32,
    ) -> RigidBodyHandle {
        self.add_box(
            RigidBodyBuilder::kinematic_position_based(),
            position,
            half_extents,
            material,
            density,
            friction,
            restitution,
        )
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Drive a kinematic body toward a target position for the next step.
    pub fn set_kinematic_position(&mut self, handle: RigidBodyHandle, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            if body.is_kinematic() {
                body.set_next_kinematic_translation(vector![position.x, position.y, position.z]);
            }
        }
    }

    /// The single kinematic-to-dynamic transition: flip the body type, apply
    /// the launch velocity, and force the body awake so a previously slept
    /// island re-simulates deterministically.
    pub fn activate_dynamic(&mut self, handle: RigidBodyHandle, launch_velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_body_type(RigidBodyType::Dynamic, true);
            body.set_linvel(
                vector![launch_velocity.x, launch_velocity.y, launch_velocity.z],
                true,
            );
            body.wake_up(true);
        }
    }

    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            if body.is_dynamic() {
                body.apply_impulse(vector![impulse.x, impulse.y, impulse.z], true);
            }
        }
    }

    /// Replace the persistent force on a body (zero clears it).
    pub fn set_force(&mut self, handle: RigidBodyHandle, force: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            if body.is_dynamic() {
                body.reset_forces(true);
                if force != Vec3::ZERO {
                    body.add_force(vector![force.x, force.y, force.z], true);
                }
            }
        }
    }

    pub fn position(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|body| {
            let t = body.translation();
            Vec3::new(t.x, t.y, t.z)
        })
    }

    pub fn rotation(&self, handle: RigidBodyHandle) -> Option<Quat> {
        self.bodies.get(handle).map(|body| {
            let r = body.rotation();
            Quat::from_xyzw(r.i, r.j, r.k, r.w)
        })
    }

    pub fn mass(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(|body| body.mass())
    }

    /// Dynamic body handles, in insertion order.
    pub fn dynamic_bodies(&self) -> Vec<RigidBodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.is_dynamic())
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Teleport a body (used by collapse checks in tests and by reset).
    pub fn set_translation(&mut self, handle: RigidBodyHandle, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(vector![position.x, position.y, position.z], true);
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_default_pair() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.register_material_pair(0, 0, 0.5, 0.1);
        world
    }

    #[test]
    fn test_pair_registration_check() {
        let mut world = PhysicsWorld::new();
        world.register_material_pair(0, 0, 0.5, 0.1);
        world.register_material_pair(0, 1, 0.5, 0.1);
        assert!(world.assert_pairs_registered(1).is_ok());
        // (1, 1) missing
        let err = world.assert_pairs_registered(2).unwrap_err();
        assert!(err.to_string().contains("uninitialized contact pair"));
    }

    #[test]
    fn test_dynamic_box_falls() {
        let mut world = world_with_default_pair();
        let handle = world.add_kinematic_box(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
            0,
            1.0,
            0.5,
            0.1,
        );
        world.activate_dynamic(handle, Vec3::ZERO);

        for _ in 0..30 {
            world.step(SIM_DT, SIM_DT, MAX_SUBSTEPS);
        }
        assert!(world.position(handle).unwrap().y < 10.0);
    }

    #[test]
    fn test_kinematic_box_ignores_gravity() {
        let mut world = world_with_default_pair();
        let handle = world.add_kinematic_box(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
            0,
            1.0,
            0.5,
            0.1,
        );
        for _ in 0..30 {
            world.step(SIM_DT, SIM_DT, MAX_SUBSTEPS);
        }
        assert!((world.position(handle).unwrap().y - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_box_lands_on_fixed_slab() {
        let mut world = world_with_default_pair();
        world.add_fixed_box(
            Vec3::new(0.0, -2.0, 0.0),
            Vec3::new(3.0, 2.0, 3.0),
            0,
            0.5,
            0.1,
        );
        let block = world.add_kinematic_box(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(2.0, 0.5, 2.0),
            0,
            0.6,
            0.5,
            0.1,
        );
        world.activate_dynamic(block, Vec3::new(0.0, -10.0, 0.0));

        for _ in 0..180 {
            world.step(SIM_DT, SIM_DT, MAX_SUBSTEPS);
        }
        // Resting on the slab top (y = 0) at half the block height
        let y = world.position(block).unwrap().y;
        assert!((y - 0.5).abs() < 0.2, "block rest height was {y}");
        // The landing produced at least one contact above the report threshold
        assert!(world.drain_contacts().iter().any(|hit| hit.impact_speed > 1.0));
    }

    #[test]
    fn test_derived_mass_from_density() {
        let mut world = world_with_default_pair();
        // 4x1x4 box with density 0.6 -> mass 9.6
        let handle = world.add_kinematic_box(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(2.0, 0.5, 2.0),
            0,
            0.6,
            0.5,
            0.1,
        );
        world.activate_dynamic(handle, Vec3::ZERO);
        let mass = world.mass(handle).unwrap();
        assert!((mass - 9.6).abs() < 1e-3, "mass was {mass}");
    }

    #[test]
    fn test_gravity_scale_restores_to_baseline() {
        let mut world = world_with_default_pair();
        world.set_gravity_scale(HIGH_GRAVITY_SCALE);
        world.set_gravity_scale(HIGH_GRAVITY_SCALE); // repeated scaling must not compound
        world.set_gravity_scale(1.0);
        assert!((world.gravity.y - GRAVITY_Y).abs() < 1e-6);
    }
}
