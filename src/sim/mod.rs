//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Elapsed time passed in explicitly, constants scaled per reference frame
//! - Seeded RNG only
//! - Stable iteration order (by ball index)
//! - No rendering or platform dependencies

pub mod collision;
pub mod snapshot;
pub mod state;
pub mod tick;

pub use collision::{
    PaddleContact, WallHit, clamp_speed, paddle_hit_test, resolve_all_pairs, resolve_ball_pair,
    resolve_paddle_hit, resolve_walls,
};
pub use snapshot::{BallView, PaddleView, PowerUpView, Snapshot};
pub use state::{
    ActiveEffect, Ball, Field, GameEvent, GamePhase, GameState, MAX_PENDING_EVENTS, Paddle, PowerUp,
    PowerUpKind,
};
pub use tick::{TickInput, autopilot_input, tick};
