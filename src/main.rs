//! Bounce Mania headless driver
//!
//! Runs autopilot sessions at the reference frame rate, logs lifecycle events
//! and keeps the persisted high score up to date. Configure with:
//! - `BOUNCE_TUNING`: tuning JSON path (defaults built in)
//! - `BOUNCE_HIGHSCORE`: high score file (default `highscore.json`)
//! - `BOUNCE_SEED`, `BOUNCE_SESSIONS`, `BOUNCE_MAX_TICKS`

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
use bounce_mania::consts::FRAME_DT;
#[cfg(not(target_arch = "wasm32"))]
use bounce_mania::sim::{Field, GameEvent, GameState, autopilot_input, tick};
#[cfg(not(target_arch = "wasm32"))]
use bounce_mania::{HighScore, Tuning};

#[cfg(not(target_arch = "wasm32"))]
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparsable {key}={raw}");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Bounce Mania (headless) starting...");

    let tuning = match std::env::var("BOUNCE_TUNING") {
        Ok(path) => Tuning::load_from(&PathBuf::from(path)),
        Err(_) => Tuning::default(),
    };
    let hs_path = PathBuf::from(env_or("BOUNCE_HIGHSCORE", "highscore.json".to_string()));
    let seed: u64 = env_or("BOUNCE_SEED", 0x5EED);
    let sessions: u32 = env_or("BOUNCE_SESSIONS", 3);
    let max_ticks: u64 = env_or("BOUNCE_MAX_TICKS", 60 * 60 * 10);

    let mut high_score = HighScore::load_from(&hs_path);
    let mut state = GameState::new(seed, tuning, Field::default(), high_score.best);

    for session in 1..=sessions {
        if session > 1 {
            state.restart();
        }

        let mut ticks = 0;
        let final_score = loop {
            let input = autopilot_input(&state);
            tick(&mut state, &input, FRAME_DT);
            ticks += 1;

            let mut over = None;
            for event in state.drain_events() {
                match event {
                    GameEvent::CountdownTick { remaining } => log::info!("{remaining}..."),
                    GameEvent::GameOver { final_score, .. } => over = Some(final_score),
                    GameEvent::PaddleHit { .. } => {}
                    other => log::debug!("{other:?}"),
                }
            }
            if let Some(score) = over {
                break score;
            }
            if ticks >= max_ticks {
                log::info!("Tick limit reached");
                break state.score;
            }
        };

        println!(
            "Session {session}: score {final_score} after {ticks} ticks ({} balls)",
            state.balls.len()
        );

        if high_score.record(final_score) {
            if let Err(e) = high_score.save_to(&hs_path) {
                log::warn!("Could not save high score: {e}");
            }
        }
    }

    println!("High score: {}", high_score.best);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host page on the web; nothing to run here
}
