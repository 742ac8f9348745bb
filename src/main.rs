//! Headless autoplay entry point
//!
//! Runs a full game session without any renderer: a synthetic 60 Hz clock
//! drives the controller, a trivial bot drops each block near the center
//! crossing, and the interesting events are logged. Useful for smoke-testing
//! the whole loop and for eyeballing balance changes.

use chaos_stacker::consts::*;
use chaos_stacker::sim::{GameEvent, GamePhase, StackController};
use chaos_stacker::Progression;

/// Frames to simulate before giving up on the bot (two minutes)
const MAX_FRAMES: u32 = 2 * 60 * 60;

/// Drop when the swing is within this distance of the center
const BOT_DROP_WINDOW: f32 = 0.25;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(0x5EED);
    log::info!("autoplay session, seed {seed}");

    let mut controller = StackController::new(seed)?;
    controller.start();

    let frame_ms = f64::from(SIM_DT) * 1000.0;
    let mut now_ms = 0.0;

    for _ in 0..MAX_FRAMES {
        now_ms += frame_ms;
        controller.update(now_ms);

        // The bot: let the block swing out once, then release it as it
        // sweeps back past the tower center
        if let Some(block) = controller.current_block() {
            if let Some(osc) = block.oscillation {
                if osc.phase.abs() > 1.0 && osc.offset().abs() < BOT_DROP_WINDOW {
                    controller.drop_block();
                }
            }
        }

        for event in controller.drain_events() {
            match event {
                GameEvent::Placement(result) => {
                    log::info!(
                        "placed: {} (offset {:.2}) +{} -> {} [combo {}]",
                        result.tier.label(),
                        result.offset,
                        result.points,
                        result.total_after,
                        result.combo_after,
                    );
                }
                GameEvent::ChaosStarted { name, description, .. } => {
                    log::info!("!! {name}: {description}");
                }
                GameEvent::ChaosEnded { id } => {
                    log::info!("chaos '{id}' over");
                }
                GameEvent::Contact { impact_speed, .. } => {
                    log::debug!("impact at {impact_speed:.1} u/s");
                }
                GameEvent::PerfectPlacement { .. } | GameEvent::GameOver { .. } => {}
            }
        }

        if controller.phase() == GamePhase::GameOver {
            break;
        }
    }

    let final_score = controller.score();
    log::info!(
        "session over: {} points, {} floors (simulated {:.1}s)",
        final_score,
        controller.floors(),
        now_ms / 1000.0,
    );

    let mut progression = Progression::new();
    for unlock in progression.register_game_end(final_score) {
        log::info!("unlocked: {} - {}", unlock.name, unlock.description);
    }
    log::debug!(
        "progression snapshot: {}",
        progression.to_json().unwrap_or_default()
    );

    Ok(())
}
