//! Bounce Mania - multi-ball paddle arcade physics
//!
//! Core modules:
//! - `sim`: Deterministic simulation (integration, collisions, session state)
//! - `tuning`: Data-driven physics constants
//! - `highscores`: Persisted best score

pub mod highscores;
pub mod sim;
pub mod tuning;

pub use highscores::HighScore;
pub use tuning::{PaddlePreset, Tuning};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Frame rate every per-frame tuning value is expressed against
    pub const REFERENCE_FPS: f32 = 60.0;
    /// Duration of one reference frame in seconds
    pub const FRAME_DT: f32 = 1.0 / REFERENCE_FPS;
    /// Largest `dt` a single tick will honour (slower frames are clamped)
    pub const MAX_TICK_DT: f32 = 0.1;

    /// Default play field size (pixels)
    pub const DEFAULT_FIELD_WIDTH: f32 = 800.0;
    pub const DEFAULT_FIELD_HEIGHT: f32 = 600.0;

    /// Distance from the field floor to the paddle's bottom edge
    pub const PADDLE_BOTTOM_MARGIN: f32 = 50.0;
    /// Spawn height for new balls (top-center)
    pub const BALL_SPAWN_Y: f32 = 50.0;
}

/// Rotate a vector into a frame whose x axis points along `angle`
///
/// `sin`/`cos` are those of the axis angle. Used by ball-ball resolution to
/// turn a 2D contact into a 1D exchange along the contact normal.
#[inline]
pub fn rotate_into(v: Vec2, sin: f32, cos: f32) -> Vec2 {
    Vec2::new(v.x * cos + v.y * sin, v.y * cos - v.x * sin)
}

/// Inverse of [`rotate_into`]
#[inline]
pub fn rotate_out(v: Vec2, sin: f32, cos: f32) -> Vec2 {
    Vec2::new(v.x * cos - v.y * sin, v.y * cos + v.x * sin)
}

/// Direction of travel, or zero for a stationary vector
#[inline]
pub fn heading(v: Vec2) -> Vec2 {
    v.normalize_or_zero()
}
