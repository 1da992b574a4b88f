//! Read-only per-frame output for the renderer and score display

use glam::Vec2;
use serde::Serialize;

use super::state::{ActiveEffect, GamePhase, PowerUpKind};

#[derive(Debug, Clone, Serialize)]
pub struct BallView {
    pub pos: Vec2,
    pub radius: f32,
    pub color: String,
    /// Flash intensity, 0 when idle
    pub glow: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaddleView {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerUpView {
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub size: f32,
}

/// Everything a frame needs to draw
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub balls: Vec<BallView>,
    pub paddle: PaddleView,
    pub powerups: Vec<PowerUpView>,
    pub score: u64,
    pub high_score: u64,
    pub phase: GamePhase,
    /// Active power-up and seconds remaining
    pub effect: Option<ActiveEffect>,
}
