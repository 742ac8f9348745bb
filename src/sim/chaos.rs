//! Chaos events: randomized gameplay perturbations
//!
//! The director owns which disruptions are live and for how long; it never
//! touches the physics world itself. The controller asks it three questions:
//! - at spawn time: how should the next block's parameters change?
//!   ([`ChaosDirector::modify_spawn`])
//! - each tick: what continuous modifiers apply right now?
//!   ([`ChaosDirector::context`])
//! - each tick: which timed effects just expired? ([`ChaosDirector::take_expired`])
//!
//! Spawn-modifying effects (heavy, tiny) persist until the next placement
//! cycle explicitly clears them, and at most one is active: triggering a new
//! event overrides the previous one. World-mutating effects (earthquake,
//! high-gravity, wind, glitch) carry their own expiry timers.

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::sim::state::SpawnParams;

/// The disruption archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaosKind {
    /// Continuous sideways force on the current falling block
    Wind,
    /// Next block is much heavier
    Heavy,
    /// One-shot random impulse on every dynamic block
    Earthquake,
    /// Next block has a shrunken footprint
    Tiny,
    /// Gravity is scaled up for a while
    HighGravity,
    /// Horizontal controls are inverted for a while
    Glitch,
}

/// One catalog entry; weights are data so rebalancing never touches code
#[derive(Debug, Clone, Copy)]
pub struct ChaosEventDef {
    pub kind: ChaosKind,
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub weight: u32,
    /// Expiry timer for world-mutating effects; None for spawn modifiers
    /// and one-shot impulses
    pub duration_ms: Option<f64>,
}

const EVENTS: &[ChaosEventDef] = &[
    ChaosEventDef {
        kind: ChaosKind::Wind,
        id: "wind",
        name: "WIND",
        description: "Gusts from the West!",
        weight: 1,
        duration_ms: Some(WIND_DURATION_MS),
    },
    ChaosEventDef {
        kind: ChaosKind::Heavy,
        id: "heavy",
        name: "HEAVY",
        description: "Next block is Lead!",
        weight: 1,
        duration_ms: None,
    },
    ChaosEventDef {
        kind: ChaosKind::Earthquake,
        id: "earthquake",
        name: "EARTHQUAKE",
        description: "Hold on tight!",
        weight: 1,
        duration_ms: None,
    },
    ChaosEventDef {
        kind: ChaosKind::Tiny,
        id: "tiny",
        name: "TINY",
        description: "Precision mode activated!",
        weight: 1,
        duration_ms: None,
    },
    ChaosEventDef {
        kind: ChaosKind::HighGravity,
        id: "high-gravity",
        name: "HIGH GRAVITY",
        description: "Everything weighs double!",
        weight: 1,
        duration_ms: Some(HIGH_GRAVITY_DURATION_MS),
    },
    ChaosEventDef {
        kind: ChaosKind::Glitch,
        id: "glitch",
        name: "GLITCH",
        description: "Controls scrambled!",
        weight: 1,
        duration_ms: Some(GLITCH_DURATION_MS),
    },
];

/// The chaos event catalog
pub fn catalog() -> &'static [ChaosEventDef] {
    EVENTS
}

/// Draw an index from a weighted table. Zero-weight entries are never
/// picked; the total weight must be nonzero (guaranteed by catalog
/// validation at startup).
pub fn pick_weighted(rng: &mut Pcg32, weights: &[u32]) -> usize {
    let total: u32 = weights.iter().sum();
    debug_assert!(total > 0, "weighted table has no mass");
    let mut roll = rng.random_range(0..total);
    for (index, &weight) in weights.iter().enumerate() {
        if roll < weight {
            return index;
        }
        roll -= weight;
    }
    weights.len() - 1
}

/// Continuous modifiers live this tick, produced fresh by the director each
/// frame so nothing reads stale shared flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaosContext {
    /// +1 normally, -1 while controls are inverted
    pub control_sign: f32,
    /// Force to apply to the current falling block (zero when calm)
    pub wind: Vec3,
}

impl Default for ChaosContext {
    fn default() -> Self {
        Self {
            control_sign: 1.0,
            wind: Vec3::ZERO,
        }
    }
}

/// A world-mutating effect waiting to expire
#[derive(Debug, Clone, Copy)]
struct LiveEffect {
    kind: ChaosKind,
    id: &'static str,
    expires_ms: f64,
}

/// Selects, tracks and expires chaos events
#[derive(Debug, Default)]
pub struct ChaosDirector {
    /// Most recently triggered spawn modifier, if any (at most one)
    spawn_mod: Option<ChaosKind>,
    live: Vec<LiveEffect>,
}

impl ChaosDirector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Startup check: every event needs either a spawn-modifying or a
    /// world-mutating interpretation, and the table must have weight.
    pub fn validate() -> anyhow::Result<()> {
        anyhow::ensure!(
            EVENTS.iter().any(|e| e.weight > 0),
            "chaos catalog has no weighted events"
        );
        for event in EVENTS {
            let is_spawn_mod = matches!(event.kind, ChaosKind::Heavy | ChaosKind::Tiny);
            let is_world_mut = event.duration_ms.is_some()
                || matches!(event.kind, ChaosKind::Earthquake);
            anyhow::ensure!(
                is_spawn_mod || is_world_mut,
                "chaos event '{}' has no effect",
                event.id
            );
        }
        Ok(())
    }

    /// Forget everything (game reset)
    pub fn reset(&mut self) {
        self.spawn_mod = None;
        self.live.clear();
    }

    /// Clear the spawn modifier at the start of a placement cycle; returns
    /// the catalog entry that was active, if any.
    pub fn clear_spawn_mod(&mut self) -> Option<&'static ChaosEventDef> {
        self.spawn_mod
            .take()
            .and_then(|kind| EVENTS.iter().find(|e| e.kind == kind))
    }

    /// Draw one event from the weighted catalog
    pub fn pick(rng: &mut Pcg32) -> &'static ChaosEventDef {
        let weights: Vec<u32> = EVENTS.iter().map(|e| e.weight).collect();
        &EVENTS[pick_weighted(rng, &weights)]
    }

    /// Activate a catalog event. Overrides any previous spawn modifier;
    /// timed effects get their own expiry entry.
    pub fn activate(&mut self, event: &'static ChaosEventDef, now_ms: f64) {
        match event.kind {
            ChaosKind::Heavy | ChaosKind::Tiny => {
                self.spawn_mod = Some(event.kind);
            }
            _ => {}
        }
        if let Some(duration) = event.duration_ms {
            // Re-triggering a live effect restarts its window instead of
            // stacking a second timer
            self.live.retain(|effect| effect.kind != event.kind);
            self.live.push(LiveEffect {
                kind: event.kind,
                id: event.id,
                expires_ms: now_ms + duration,
            });
        }
    }

    /// Pick and activate in one step
    pub fn trigger_random(&mut self, rng: &mut Pcg32, now_ms: f64) -> &'static ChaosEventDef {
        let event = Self::pick(rng);
        self.activate(event, now_ms);
        event
    }

    /// Apply the active spawn modifier (if any) to the next block's params
    pub fn modify_spawn(&self, mut params: SpawnParams) -> SpawnParams {
        match self.spawn_mod {
            Some(ChaosKind::Heavy) => params.mass_multiplier *= HEAVY_MASS_MULT,
            Some(ChaosKind::Tiny) => params.footprint = params.footprint.scaled(TINY_FOOTPRINT_MULT),
            _ => {}
        }
        params
    }

    /// Continuous modifiers for this tick
    pub fn context(&self, _now_ms: f64) -> ChaosContext {
        let mut context = ChaosContext::default();
        for effect in &self.live {
            match effect.kind {
                ChaosKind::Glitch => context.control_sign = -1.0,
                ChaosKind::Wind => context.wind = Vec3::new(WIND_FORCE_X, 0.0, 0.0),
                _ => {}
            }
        }
        context
    }

    /// Remove and return effects whose timers have elapsed
    pub fn take_expired(&mut self, now_ms: f64) -> Vec<(ChaosKind, &'static str)> {
        let mut expired = Vec::new();
        self.live.retain(|effect| {
            if effect.expires_ms <= now_ms {
                expired.push((effect.kind, effect.id));
                false
            } else {
                true
            }
        });
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::consts::BLOCK_FOOTPRINT;
    use crate::sim::state::Footprint;

    fn base_params() -> SpawnParams {
        SpawnParams {
            material: 0,
            footprint: Footprint::new(BLOCK_FOOTPRINT, BLOCK_FOOTPRINT),
            mass_multiplier: 1.0,
        }
    }

    #[test]
    fn test_catalog_validates() {
        ChaosDirector::validate().unwrap();
    }

    #[test]
    fn test_weighted_pick_skips_zero_weights() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            let index = pick_weighted(&mut rng, &[0, 3, 0, 5]);
            assert!(index == 1 || index == 3);
        }
    }

    #[test]
    fn test_weighted_pick_deterministic() {
        let weights = [2, 1, 4];
        let mut a = Pcg32::seed_from_u64(99);
        let mut b = Pcg32::seed_from_u64(99);
        for _ in 0..50 {
            assert_eq!(pick_weighted(&mut a, &weights), pick_weighted(&mut b, &weights));
        }
    }

    #[test]
    fn test_spawn_modifiers() {
        let mut director = ChaosDirector::new();
        director.spawn_mod = Some(ChaosKind::Heavy);
        let heavy = director.modify_spawn(base_params());
        assert!((heavy.mass_multiplier - 5.0).abs() < 1e-6);
        assert_eq!(heavy.footprint, Footprint::new(4.0, 4.0));

        director.spawn_mod = Some(ChaosKind::Tiny);
        let tiny = director.modify_spawn(base_params());
        assert!((tiny.mass_multiplier - 1.0).abs() < 1e-6);
        assert_eq!(tiny.footprint, Footprint::new(2.0, 2.0));
    }

    #[test]
    fn test_latest_spawn_mod_wins() {
        let mut director = ChaosDirector::new();
        director.spawn_mod = Some(ChaosKind::Heavy);
        director.spawn_mod = Some(ChaosKind::Tiny);
        let params = director.modify_spawn(base_params());
        assert!((params.mass_multiplier - 1.0).abs() < 1e-6);
        assert_eq!(params.footprint, Footprint::new(2.0, 2.0));
    }

    #[test]
    fn test_clear_spawn_mod() {
        let mut director = ChaosDirector::new();
        director.spawn_mod = Some(ChaosKind::Heavy);
        director.clear_spawn_mod();
        let params = director.modify_spawn(base_params());
        assert!((params.mass_multiplier - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_timed_effect_expires() {
        let mut director = ChaosDirector::new();
        director.live.push(LiveEffect {
            kind: ChaosKind::Glitch,
            id: "glitch",
            expires_ms: 4000.0,
        });

        assert_eq!(director.context(0.0).control_sign, -1.0);
        assert!(director.take_expired(3999.0).is_empty());
        assert_eq!(director.context(3999.0).control_sign, -1.0);

        let expired = director.take_expired(4000.0);
        assert_eq!(expired, vec![(ChaosKind::Glitch, "glitch")]);
        assert_eq!(director.context(4000.0).control_sign, 1.0);
        // Already drained
        assert!(director.take_expired(9999.0).is_empty());
    }

    #[test]
    fn test_wind_context() {
        let mut director = ChaosDirector::new();
        assert_eq!(director.context(0.0).wind, Vec3::ZERO);
        director.live.push(LiveEffect {
            kind: ChaosKind::Wind,
            id: "wind",
            expires_ms: 1000.0,
        });
        assert!(director.context(0.0).wind.x > 0.0);
    }
}
