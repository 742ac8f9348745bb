//! The stack controller: spawn, swing, drop, judge
//!
//! Owns the block list and drives the whole placement cycle against the
//! physics world. Driven by one external frame callback (`update`) plus the
//! synchronous input commands; everything mutable lives here, so there is no
//! locking and no shared state with collaborators.

use glam::{Quat, Vec3};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use rapier3d::prelude::RigidBodyHandle;

use crate::consts::*;
use crate::materials::{BASE_MATERIAL, MaterialCatalog};
use crate::physics::PhysicsWorld;
use crate::sim::chaos::{ChaosDirector, ChaosEventDef, ChaosKind, pick_weighted};
use crate::sim::scoring::{PlacementScorer, Tier};
use crate::sim::state::{
    Axis, Block, BlockPhase, Footprint, GameEvent, GamePhase, Oscillation, PendingJudgment,
    SpawnParams, VisualTransform,
};

/// Orchestrates the spawn -> oscillate -> drop -> judge cycle
pub struct StackController {
    physics: PhysicsWorld,
    catalog: MaterialCatalog,
    /// Index 0 is the immovable base; exclusively owned and mutated here
    blocks: Vec<Block>,
    /// Id of the active block (oscillating or falling)
    current: Option<u32>,
    scorer: PlacementScorer,
    director: ChaosDirector,
    rng: Pcg32,
    phase: GamePhase,
    /// Floors spawned this run; drives the chaos cadence and difficulty ramp
    spawned: u32,
    /// Floors judged settled this run
    floors: u32,
    judgments: Vec<PendingJudgment>,
    /// Spawn parameters parked by `hold`
    reserve: Option<SpawnParams>,
    hold_used: bool,
    events: Vec<GameEvent>,
    last_ms: Option<f64>,
    /// Monotonic across runs, so a stale judgment can never match a block
    /// from a later run
    next_block_id: u32,
}

impl StackController {
    /// Build the world and validate all configuration. Any missing material
    /// pair or malformed catalog entry is fatal here, before the first tick.
    pub fn new(seed: u64) -> anyhow::Result<Self> {
        let catalog = MaterialCatalog::new();
        catalog.validate()?;
        ChaosDirector::validate()?;

        let mut physics = PhysicsWorld::new();
        for a in 0..catalog.len() {
            for b in a..catalog.len() {
                let (friction, restitution) = catalog.pair_properties(a, b);
                physics.register_material_pair(a, b, friction, restitution);
            }
        }
        physics.assert_pairs_registered(catalog.len())?;

        let base_material = catalog.get(BASE_MATERIAL);
        let base_position = Vec3::new(0.0, BASE_Y, 0.0);
        let base_body = physics.add_fixed_box(
            base_position,
            Vec3::from(BASE_HALF_EXTENTS),
            BASE_MATERIAL,
            base_material.friction,
            base_material.restitution,
        );
        let base = Block {
            id: 0,
            material: BASE_MATERIAL,
            footprint: Footprint::new(BASE_HALF_EXTENTS[0] * 2.0, BASE_HALF_EXTENTS[2] * 2.0),
            height: BASE_HALF_EXTENTS[1] * 2.0,
            body: base_body,
            visual: VisualTransform {
                position: base_position,
                rotation: Quat::IDENTITY,
            },
            phase: BlockPhase::Settled,
            oscillation: None,
            target_mass: 0.0,
            mass_multiplier: 1.0,
            rest_y: BASE_Y,
            spawn_center: base_position,
        };

        Ok(Self {
            physics,
            catalog,
            blocks: vec![base],
            current: None,
            scorer: PlacementScorer::new(),
            director: ChaosDirector::new(),
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Ready,
            spawned: 0,
            floors: 0,
            judgments: Vec::new(),
            reserve: None,
            hold_used: false,
            events: Vec::new(),
            last_ms: None,
            next_block_id: 1,
        })
    }

    // --- Commands -------------------------------------------------------

    /// Begin a run (also restarts mid-run)
    pub fn start(&mut self) {
        self.begin_run();
    }

    /// Tear down and restart
    pub fn reset(&mut self) {
        self.begin_run();
    }

    fn begin_run(&mut self) {
        // Remove every non-base body synchronously, so nothing scheduled in
        // a previous run can observe post-reset state as a live block
        for block in self.blocks.drain(1..).collect::<Vec<_>>() {
            self.physics.remove_body(block.body);
        }
        self.judgments.clear();
        self.director.reset();
        self.physics.set_gravity_scale(1.0);
        self.scorer.reset();
        self.events.clear();
        self.current = None;
        self.reserve = None;
        self.hold_used = false;
        self.spawned = 0;
        self.floors = 0;
        self.phase = GamePhase::Playing;
        log::info!("run started");
        self.spawn_next(None);
    }

    /// Drop the oscillating block. Silently ignored unless a block is
    /// actually oscillating.
    pub fn drop_block(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        let Some(id) = self.current else {
            return;
        };
        let Some(index) = self.index_of(id) else {
            return;
        };
        if self.blocks[index].phase != BlockPhase::Oscillating {
            return;
        }

        let axis = match self.blocks[index].oscillation {
            Some(osc) => osc.axis,
            None => return,
        };

        // Pre-drop offset along the swing axis, relative to the block below
        // (the base sits at the origin, so the first floor measures from 0)
        let body = self.blocks[index].body;
        let my_pos = self
            .physics
            .position(body)
            .unwrap_or(self.blocks[index].visual.position);
        let support = &self.blocks[index - 1];
        let support_pos = self
            .physics
            .position(support.body)
            .unwrap_or(support.visual.position);
        let offset = axis.component(my_pos) - axis.component(support_pos);

        let result = self.scorer.register_drop(offset);
        log::debug!(
            "drop: offset {:.3} -> {:?}, +{} points",
            offset,
            result.tier,
            result.points
        );
        if result.tier == Tier::Perfect {
            self.events.push(GameEvent::PerfectPlacement {
                combo: result.combo_after,
            });
        }
        self.events.push(GameEvent::Placement(result));

        let block = &mut self.blocks[index];
        block.phase = BlockPhase::Falling;
        block.oscillation = None;
        self.physics
            .activate_dynamic(body, Vec3::new(0.0, DROP_VELOCITY_Y, 0.0));

        let now = self.last_ms.unwrap_or(0.0);
        self.judgments.push(PendingJudgment {
            block_id: id,
            due_ms: now + SETTLE_DELAY_MS,
        });
    }

    /// Swap the active block's parameters into the reserve slot and re-spawn
    /// from whatever was parked there. Once per placement cycle; silently
    /// ignored otherwise.
    pub fn hold(&mut self) {
        if self.phase != GamePhase::Playing || self.hold_used {
            return;
        }
        let Some(id) = self.current else {
            return;
        };
        let Some(index) = self.index_of(id) else {
            return;
        };
        if !matches!(
            self.blocks[index].phase,
            BlockPhase::Oscillating | BlockPhase::Falling
        ) {
            return;
        }

        let held = &self.blocks[index];
        let stashed = SpawnParams {
            material: held.material,
            footprint: held.footprint,
            mass_multiplier: held.mass_multiplier,
        };
        self.physics.remove_body(held.body);
        self.blocks.remove(index);
        self.current = None;
        // The replacement takes over this floor slot
        self.spawned = self.spawned.saturating_sub(1);

        let params = match self.reserve.take() {
            Some(parked) => parked,
            None => self.draw_spawn_params(),
        };
        self.reserve = Some(stashed);
        self.spawn_next(Some(params));
        self.hold_used = true;
        log::debug!("hold: parked '{}'", self.catalog.get(stashed.material).name);
    }

    // --- Frame callback -------------------------------------------------

    /// Advance one frame. `now_ms` is the caller's monotonically increasing
    /// timestamp; frame-to-frame deltas are clamped so a long stall cannot
    /// fast-forward the simulation.
    pub fn update(&mut self, now_ms: f64) {
        let dt = match self.last_ms {
            Some(last) => (((now_ms - last) / 1000.0) as f32).clamp(0.0, 0.1),
            None => 0.0,
        };
        self.last_ms = Some(now_ms);

        if self.phase != GamePhase::Playing {
            return;
        }

        // 1. Physics, then surface new contacts to collaborators
        self.physics.step(SIM_DT, dt, MAX_SUBSTEPS);
        for hit in self.physics.drain_contacts() {
            let a = self.block_id_for(hit.body_a);
            let b = self.block_id_for(hit.body_b);
            if let (Some(block_a), Some(block_b)) = (a, b) {
                self.events.push(GameEvent::Contact {
                    block_a,
                    block_b,
                    impact_speed: hit.impact_speed,
                });
            }
        }

        // 2. Sync visual transforms and scan for a full tower collapse:
        // any non-base block under the world floor ends the run
        let mut breached = false;
        for block in self.blocks.iter_mut().skip(1) {
            if let Some(position) = self.physics.position(block.body) {
                block.visual.position = position;
            }
            if let Some(rotation) = self.physics.rotation(block.body) {
                block.visual.rotation = rotation;
            }
            if block.visual.position.y < FLOOR_Y {
                breached = true;
            }
        }
        if breached {
            self.game_over();
            return;
        }

        // 3. Fire due settle judgments
        let mut due = Vec::new();
        self.judgments.retain(|judgment| {
            if judgment.due_ms <= now_ms {
                due.push(*judgment);
                false
            } else {
                true
            }
        });
        for judgment in due {
            self.judge(judgment);
            if self.phase != GamePhase::Playing {
                return;
            }
        }

        // 4. Chaos effect tick: expire timers, apply continuous modifiers
        for (kind, id) in self.director.take_expired(now_ms) {
            if kind == ChaosKind::HighGravity {
                self.physics.set_gravity_scale(1.0);
            }
            log::debug!("chaos '{id}' expired");
            self.events.push(GameEvent::ChaosEnded { id });
        }
        let context = self.director.context(now_ms);

        if let Some(id) = self.current {
            if let Some(index) = self.index_of(id) {
                let body = self.blocks[index].body;
                if self.blocks[index].phase == BlockPhase::Falling {
                    self.physics.set_force(body, context.wind);
                }

                // 5. Drive the oscillating block's kinematic target
                let block = &mut self.blocks[index];
                if block.phase == BlockPhase::Oscillating {
                    if let Some(osc) = block.oscillation.as_mut() {
                        osc.phase += osc.angular_speed * dt * context.control_sign;
                        let target = block.spawn_center + osc.axis.unit() * osc.offset();
                        block.visual.position = target;
                        self.physics.set_kinematic_position(body, target);
                    }
                }
            }
        }
    }

    // --- Internals ------------------------------------------------------

    fn index_of(&self, id: u32) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }

    fn block_id_for(&self, handle: RigidBodyHandle) -> Option<u32> {
        self.blocks
            .iter()
            .find(|block| block.body == handle)
            .map(|block| block.id)
    }

    /// Draw fresh spawn parameters: weighted material pick plus the active
    /// chaos spawn modifier
    fn draw_spawn_params(&mut self) -> SpawnParams {
        let weights = self.catalog.spawn_weights();
        let material = pick_weighted(&mut self.rng, &weights);
        self.director.modify_spawn(SpawnParams {
            material,
            footprint: Footprint::new(BLOCK_FOOTPRINT, BLOCK_FOOTPRINT),
            mass_multiplier: 1.0,
        })
    }

    /// Spawn the next block. `forced` carries re-spawn parameters from
    /// `hold`; a fresh cycle clears the previous spawn modifier, checks the
    /// chaos cadence and draws new parameters.
    fn spawn_next(&mut self, forced: Option<SpawnParams>) {
        self.spawned += 1;
        let params = match forced {
            Some(params) => params,
            None => {
                if let Some(cleared) = self.director.clear_spawn_mod() {
                    self.events.push(GameEvent::ChaosEnded { id: cleared.id });
                }
                if self.spawned.is_multiple_of(CHAOS_CADENCE) {
                    let now = self.last_ms.unwrap_or(0.0);
                    let event = self.director.trigger_random(&mut self.rng, now);
                    self.apply_chaos_start(event);
                }
                self.draw_spawn_params()
            }
        };

        let material = self.catalog.get(params.material);
        let spawn_y = self.blocks.len() as f32 * BLOCK_HEIGHT + SPAWN_CLEARANCE;
        let rest_y = self.blocks.len() as f32 * BLOCK_HEIGHT - BLOCK_HEIGHT / 2.0;
        let center = Vec3::new(0.0, spawn_y, 0.0);
        // Each layer swings crosswise to the one below
        let axis = if self.spawned.is_multiple_of(2) {
            Axis::X
        } else {
            Axis::Z
        };

        // Collider density carries every mass factor, so the engine derives
        // the target mass the moment the body turns dynamic
        let density = material.density * material.mass_multiplier * params.mass_multiplier;
        let target_mass = params.footprint.x * BLOCK_HEIGHT * params.footprint.z * density;
        let half_extents = Vec3::new(
            params.footprint.x / 2.0,
            BLOCK_HEIGHT / 2.0,
            params.footprint.z / 2.0,
        );
        let body = self.physics.add_kinematic_box(
            center,
            half_extents,
            params.material,
            density,
            material.friction,
            material.restitution,
        );

        let id = self.next_block_id;
        self.next_block_id += 1;
        let mut block = Block {
            id,
            material: params.material,
            footprint: params.footprint,
            height: BLOCK_HEIGHT,
            body,
            visual: VisualTransform {
                position: center,
                rotation: Quat::IDENTITY,
            },
            phase: BlockPhase::Spawning,
            oscillation: Some(Oscillation {
                axis,
                phase: 0.0,
                angular_speed: OSC_ANGULAR_BASE + self.spawned as f32 * OSC_ANGULAR_PER_FLOOR,
                amplitude: OSC_AMPLITUDE,
            }),
            target_mass,
            mass_multiplier: params.mass_multiplier,
            rest_y,
            spawn_center: center,
        };
        // Spawning is instantaneous; the block starts swinging right away
        block.phase = BlockPhase::Oscillating;
        log::debug!(
            "spawned block {id} ({}, floor {}, mass {:.2})",
            material.name,
            self.spawned,
            target_mass
        );
        self.blocks.push(block);
        self.current = Some(id);
    }

    /// Immediate world-side effects of a freshly triggered chaos event
    fn apply_chaos_start(&mut self, event: &'static ChaosEventDef) {
        log::info!("chaos event: {}", event.name);
        self.events.push(GameEvent::ChaosStarted {
            id: event.id,
            name: event.name,
            description: event.description,
        });
        match event.kind {
            ChaosKind::Earthquake => {
                for handle in self.physics.dynamic_bodies() {
                    let impulse = Vec3::new(
                        self.rng.random_range(-QUAKE_IMPULSE..QUAKE_IMPULSE),
                        0.0,
                        self.rng.random_range(-QUAKE_IMPULSE..QUAKE_IMPULSE),
                    );
                    self.physics.apply_impulse(handle, impulse);
                }
            }
            ChaosKind::HighGravity => {
                self.physics.set_gravity_scale(HIGH_GRAVITY_SCALE);
            }
            _ => {}
        }
    }

    /// Resolve a settle judgment. Stale judgments (block no longer the
    /// active drop, or the run already ended) are silent no-ops.
    fn judge(&mut self, judgment: PendingJudgment) {
        if self.phase != GamePhase::Playing {
            return;
        }
        if self.current != Some(judgment.block_id) {
            log::debug!("stale judgment for block {} ignored", judgment.block_id);
            return;
        }
        let Some(index) = self.index_of(judgment.block_id) else {
            return;
        };

        let body = self.blocks[index].body;
        let y = self
            .physics
            .position(body)
            .map(|p| p.y)
            .unwrap_or(f32::MIN);

        if y < self.blocks[index].rest_y - SETTLE_DROP_MARGIN {
            log::info!(
                "block {} fell off (y {:.2}, expected {:.2})",
                judgment.block_id,
                y,
                self.blocks[index].rest_y
            );
            self.blocks[index].phase = BlockPhase::Collapsed;
            self.game_over();
        } else {
            self.blocks[index].phase = BlockPhase::Settled;
            self.physics.set_force(body, Vec3::ZERO);
            self.floors += 1;
            self.hold_used = false;
            self.current = None;
            self.spawn_next(None);
        }
    }

    fn game_over(&mut self) {
        if self.phase == GamePhase::GameOver {
            return;
        }
        self.phase = GamePhase::GameOver;
        let final_score = self.scorer.score();
        log::info!("game over: {} points, {} floors", final_score, self.floors);
        self.events.push(GameEvent::GameOver {
            final_score,
            floors: self.floors,
        });
    }

    // --- Accessors ------------------------------------------------------

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> u64 {
        self.scorer.score()
    }

    pub fn combo_streak(&self) -> u32 {
        self.scorer.combo_streak()
    }

    /// Floors judged settled this run
    pub fn floors(&self) -> u32 {
        self.floors
    }

    /// All blocks, base first
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The active (oscillating or falling) block
    pub fn current_block(&self) -> Option<&Block> {
        self.current.and_then(|id| {
            self.index_of(id).map(|index| &self.blocks[index])
        })
    }

    /// Spawn parameters parked by `hold`
    pub fn reserve(&self) -> Option<&SpawnParams> {
        self.reserve.as_ref()
    }

    /// Take the events queued since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
