//! Game state and core simulation types
//!
//! Everything a session owns lives in [`GameState`]; the tick mutates it and
//! nothing else does.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::snapshot::{BallView, PaddleView, PowerUpView, Snapshot};
use crate::consts::*;
use crate::tuning::{Tuning, deserialize_sanitized};

/// Most lifecycle events held between drains; older ones are dropped first
pub const MAX_PENDING_EVENTS: usize = 256;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting to start, seconds remaining
    Countdown { remaining: f32 },
    /// Active simulation
    Playing,
    /// A ball reached the floor
    GameOver,
}

/// Lifecycle signals for the collaborator layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Whole seconds left before play starts
    CountdownTick { remaining: u32 },
    Started,
    PaddleHit { ball_id: u32, score: u64 },
    BallSpawned { ball_id: u32 },
    PaddleTierChanged { tier: usize },
    PowerUpSpawned { kind: PowerUpKind },
    PowerUpActivated { kind: PowerUpKind, duration: f32 },
    PowerUpExpired { kind: PowerUpKind },
    GameOver { final_score: u64, new_high_score: bool },
}

/// Play field dimensions (origin top-left, y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub width: f32,
    pub height: f32,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            width: DEFAULT_FIELD_WIDTH,
            height: DEFAULT_FIELD_HEIGHT,
        }
    }
}

impl Field {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    /// Position delta per reference frame
    pub vel: Vec2,
    pub radius: f32,
    /// Decaying lateral perturbation from off-center paddle hits
    pub spin: Vec2,
    /// Decaying extra speed along the heading, from paddle motion
    pub speed_boost: f32,
    /// Render flash intensity; no physical effect
    pub glow: u32,
    pub color: String,
}

impl Ball {
    pub fn new(id: u32, pos: Vec2, vel: Vec2, radius: f32, color: &str) -> Self {
        Self {
            id,
            pos,
            vel,
            radius,
            spin: Vec2::ZERO,
            speed_boost: 0.0,
            glow: 0,
            color: color.to_string(),
        }
    }

    /// Advance position by `steps` reference frames and decay perturbations
    ///
    /// The boost is added along the current heading, never subtracted.
    pub fn integrate(&mut self, steps: f32, decay_factor: f32) {
        self.pos += self.displacement(steps);

        let decay = decay_factor.powf(steps);
        self.spin *= decay;
        self.speed_boost *= decay;
    }

    /// Movement over `steps` frames: velocity plus spin plus boost along the heading
    pub fn displacement(&self, steps: f32) -> Vec2 {
        let boost = crate::heading(self.vel) * self.speed_boost;
        (self.vel + self.spin + boost) * steps
    }

    /// Step the glow counter toward zero
    pub fn decay_glow(&mut self, step: u32) {
        self.glow = self.glow.saturating_sub(step);
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// The player's paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    /// Left edge
    pub x: f32,
    /// Position delta per reference frame over the last tick
    pub velocity: f32,
    /// Index into the tuning's preset list; only increases within a session
    pub tier: usize,
}

impl Paddle {
    pub fn centered(field_width: f32, width: f32) -> Self {
        Self {
            x: ((field_width - width) / 2.0).max(0.0),
            velocity: 0.0,
            tier: 0,
        }
    }

    /// Move so the paddle is centred on `target_x`, clamped to the field
    ///
    /// `None` keeps the paddle still. Velocity is derived from the move.
    pub fn track(&mut self, target_x: Option<f32>, width: f32, field_width: f32, steps: f32) {
        let previous = self.x;
        if let Some(target) = target_x.filter(|t| t.is_finite()) {
            self.x = target - width / 2.0;
        }
        self.clamp(width, field_width);
        self.velocity = if steps > 0.0 {
            (self.x - previous) / steps
        } else {
            0.0
        };
    }

    pub fn clamp(&mut self, width: f32, field_width: f32) {
        self.x = self.x.clamp(0.0, (field_width - width).max(0.0));
    }

    pub fn center_x(&self, width: f32) -> f32 {
        self.x + width / 2.0
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    PaddleEnlarge,
    ScoreMultiplier,
}

/// A falling power-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    /// Top-left corner
    pub pos: Vec2,
    pub size: f32,
}

/// The single time-limited modifier in force
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    /// Seconds left
    pub remaining: f32,
}

/// RNG state wrapper for serialization
///
/// Each draw uses a fresh stream so the state stays two integers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn next_rng(&mut self) -> Pcg32 {
        let rng = Pcg32::seed_from_u64(self.seed ^ self.stream.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.stream += 1;
        rng
    }

    pub fn unit(&mut self) -> f32 {
        self.next_rng().random::<f32>()
    }

    pub fn coin(&mut self) -> bool {
        self.next_rng().random_bool(0.5)
    }
}

/// Complete session state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    #[serde(deserialize_with = "deserialize_sanitized")]
    pub tuning: Tuning,
    pub field: Field,
    pub rng_state: RngState,
    pub phase: GamePhase,
    pub score: u64,
    /// Best score seen, carried across sessions
    pub high_score: u64,
    pub paddle: Paddle,
    /// Active balls (sorted by id for determinism)
    pub balls: Vec<Ball>,
    pub powerups: Vec<PowerUp>,
    pub effect: Option<ActiveEffect>,
    /// Simulation tick counter for the current session
    pub time_ticks: u64,
    /// Pending lifecycle signals
    ///
    /// Hosts drain these once per frame with [`GameState::drain_events`].
    /// Undrained events are capped at [`MAX_PENDING_EVENTS`], oldest dropped.
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Create a new session in countdown
    pub fn new(seed: u64, tuning: Tuning, field: Field, high_score: u64) -> Self {
        let tuning = tuning.sanitized();
        let paddle = Paddle::centered(field.width, tuning.preset(0).width);
        let mut state = Self {
            phase: GamePhase::Countdown {
                remaining: tuning.countdown_secs,
            },
            tuning,
            field,
            rng_state: RngState::new(seed),
            score: 0,
            high_score,
            paddle,
            balls: Vec::new(),
            powerups: Vec::new(),
            effect: None,
            time_ticks: 0,
            events: Vec::new(),
            next_id: 1,
        };

        state.serve();
        state.announce_countdown();
        log::info!("Session created (seed {seed}, high score {high_score})");
        state
    }

    /// Start a new session, keeping high score, tuning, field and RNG stream
    ///
    /// Any pending countdown or power-up timer is dropped.
    pub fn restart(&mut self) {
        self.phase = GamePhase::Countdown {
            remaining: self.tuning.countdown_secs,
        };
        self.score = 0;
        self.paddle = Paddle::centered(self.field.width, self.tuning.preset(0).width);
        self.balls.clear();
        self.powerups.clear();
        self.effect = None;
        self.time_ticks = 0;
        self.events.clear();
        self.serve();
        self.announce_countdown();
        log::info!("Session restarted (high score {})", self.high_score);
    }

    /// Change the play field, keeping paddle and balls inside it
    pub fn resize(&mut self, width: f32, height: f32) {
        self.field = Field::new(width, height);
        let paddle_width = self.paddle_width();
        self.paddle.clamp(paddle_width, self.field.width);
        for ball in &mut self.balls {
            let r = ball.radius;
            ball.pos.x = ball.pos.x.clamp(r, (self.field.width - r).max(r));
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// True while the simulation runs (not in countdown or game over)
    pub fn is_active(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop the oldest events beyond [`MAX_PENDING_EVENTS`]
    pub(crate) fn trim_events(&mut self) {
        let excess = self.events.len().saturating_sub(MAX_PENDING_EVENTS);
        if excess > 0 {
            self.events.drain(..excess);
            log::debug!("Dropped {excess} undrained event(s)");
        }
    }

    fn announce_countdown(&mut self) {
        match self.phase {
            GamePhase::Countdown { remaining } if remaining > 0.0 => {
                self.events.push(GameEvent::CountdownTick {
                    remaining: remaining.ceil() as u32,
                });
            }
            _ => {}
        }
    }

    /// Place the first ball at top-center with a random horizontal direction
    fn serve(&mut self) {
        let (vx, vy) = self.tuning.initial_velocity;
        let vx = if self.rng_state.coin() { vx } else { -vx };
        let id = self.next_entity_id();
        let pos = Vec2::new(self.field.width / 2.0, self.tuning.spawn_y);
        let ball = Ball::new(
            id,
            pos,
            Vec2::new(vx, vy),
            self.tuning.ball_radius,
            self.tuning.ball_color(0),
        );
        self.balls.push(ball);
    }

    /// Spawn an extra ball at top-center, launched down at an angle in the tuning's band
    pub fn spawn_ball(&mut self) -> u32 {
        let min = self.tuning.launch_angle_min_deg.to_radians();
        let max = self.tuning.launch_angle_max_deg.to_radians();
        // Keep strictly inside the band
        let t = self.rng_state.unit().clamp(0.01, 0.99);
        let angle = min + (max - min) * t;
        let dir_x = if self.rng_state.coin() { 1.0 } else { -1.0 };

        let speed = self.tuning.base_speed(self.score);
        let vel = Vec2::new(dir_x * angle.cos(), angle.sin()) * speed;
        let pos = Vec2::new(self.field.width / 2.0, self.tuning.spawn_y);

        let id = self.next_entity_id();
        let color = self.tuning.ball_color(self.balls.len()).to_string();
        self.balls
            .push(Ball::new(id, pos, vel, self.tuning.ball_radius, &color));
        id
    }

    /// Effective paddle width (preset, enlarged while the power-up is active)
    pub fn paddle_width(&self) -> f32 {
        let base = self.tuning.preset(self.paddle.tier).width;
        match self.effect {
            Some(ActiveEffect {
                kind: PowerUpKind::PaddleEnlarge,
                ..
            }) => base * self.tuning.paddle_enlarge_factor,
            _ => base,
        }
    }

    pub fn paddle_height(&self) -> f32 {
        self.tuning.preset(self.paddle.tier).height
    }

    /// y of the paddle's top edge
    pub fn paddle_top(&self) -> f32 {
        self.field.height - self.paddle_height() - self.tuning.paddle_bottom_margin
    }

    /// Points awarded per paddle hit
    pub fn score_multiplier(&self) -> u64 {
        match self.effect {
            Some(ActiveEffect {
                kind: PowerUpKind::ScoreMultiplier,
                ..
            }) => self.tuning.score_multiplier,
            _ => 1,
        }
    }

    /// Read-only view for rendering and score display
    pub fn snapshot(&self) -> Snapshot {
        let preset = self.tuning.preset(self.paddle.tier);
        Snapshot {
            balls: self
                .balls
                .iter()
                .map(|b| BallView {
                    pos: b.pos,
                    radius: b.radius,
                    color: b.color.clone(),
                    glow: b.glow,
                })
                .collect(),
            paddle: PaddleView {
                x: self.paddle.x,
                y: self.paddle_top(),
                width: self.paddle_width(),
                height: preset.height,
                color: preset.color.clone(),
            },
            powerups: self
                .powerups
                .iter()
                .map(|p| PowerUpView {
                    kind: p.kind,
                    pos: p.pos,
                    size: p.size,
                })
                .collect(),
            score: self.score,
            high_score: self.high_score,
            phase: self.phase,
            effect: self.effect,
        }
    }
}
