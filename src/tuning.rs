//! Data-driven game balance
//!
//! Every physics constant lives in [`Tuning`]. Values are per reference frame
//! (see [`crate::consts::REFERENCE_FPS`]); the tick scales them by elapsed time.
//! Loaded from JSON with `#[serde(default)]`, so a file only needs the fields
//! it overrides.

use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Deserializer, Serialize};

/// Tier used when a tuning carries no presets at all
static FALLBACK_PRESET: LazyLock<PaddlePreset> =
    LazyLock::new(|| PaddlePreset::new(100.0, 16.0, "magenta", 0));

/// Paddle size and colour for one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddlePreset {
    pub width: f32,
    pub height: f32,
    pub color: String,
    /// Score at which this tier becomes active
    pub min_score: u64,
}

impl PaddlePreset {
    pub fn new(width: f32, height: f32, color: &str, min_score: u64) -> Self {
        Self {
            width,
            height,
            color: color.to_string(),
            min_score,
        }
    }
}

/// How a paddle hit recomputes the ball's velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BouncePolicy {
    /// Speed magnitude kept, direction set from impact offset (edge hits deflect sharply)
    #[default]
    Angled,
    /// Vertical component flipped, both components grown by `speed_increment`
    Increment,
}

/// Physics and gameplay constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Ball ===
    pub ball_radius: f32,
    /// Velocity of the first ball (x sign randomised at serve)
    pub initial_velocity: (f32, f32),
    /// Colours assigned to balls in spawn order (last one repeats)
    pub ball_colors: Vec<String>,
    /// Hard ceiling on velocity magnitude
    pub max_speed: f32,
    /// Speed gained per point for newly spawned balls and angled bounces
    pub speed_per_point: f32,

    // === Perturbations ===
    /// Geometric per-frame decay applied to spin and speed boost
    pub decay_factor: f32,
    /// Spin imparted per unit of normalised impact offset
    pub spin_factor: f32,
    /// Largest spin magnitude a paddle hit can impart
    pub max_spin: f32,
    /// Speed boost per unit of paddle velocity at contact
    pub boost_factor: f32,
    pub max_speed_boost: f32,
    /// Flip spin on side/top wall bounces
    pub reverse_spin_on_wall: bool,

    // === Glow ===
    pub wall_glow: u32,
    pub ball_glow: u32,
    pub paddle_glow: u32,
    pub glow_decay_step: u32,

    // === Paddle ===
    pub bounce_policy: BouncePolicy,
    /// Largest deflection from vertical for an edge hit (degrees)
    pub max_bounce_angle_deg: f32,
    /// Per-hit growth used by `BouncePolicy::Increment`
    pub speed_increment: f32,
    /// No more increments once the score reaches this
    pub increment_score_cap: u64,
    /// Ordered tiers; `min_score` must be non-decreasing
    pub paddle_presets: Vec<PaddlePreset>,
    pub paddle_bottom_margin: f32,

    // === Spawning ===
    /// Score thresholds that each add one ball
    pub ball_spawn_scores: Vec<u64>,
    pub max_balls: usize,
    pub launch_angle_min_deg: f32,
    pub launch_angle_max_deg: f32,
    pub spawn_y: f32,

    // === Session ===
    pub countdown_secs: f32,

    // === Power-ups ===
    pub powerups_enabled: bool,
    /// Chance per paddle hit of dropping a power-up
    pub powerup_chance: f32,
    pub powerup_fall_speed: f32,
    pub powerup_size: f32,
    pub powerup_duration_secs: f32,
    pub paddle_enlarge_factor: f32,
    pub score_multiplier: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            ball_radius: 7.65,
            initial_velocity: (1.5, 1.5),
            ball_colors: vec!["cyan".into(), "lime".into(), "yellow".into()],
            max_speed: 12.0,
            speed_per_point: 0.05,

            decay_factor: 0.97,
            spin_factor: 1.5,
            max_spin: 2.0,
            boost_factor: 0.1,
            max_speed_boost: 3.0,
            reverse_spin_on_wall: true,

            wall_glow: 10,
            ball_glow: 15,
            paddle_glow: 20,
            glow_decay_step: 1,

            bounce_policy: BouncePolicy::Angled,
            max_bounce_angle_deg: 45.0,
            speed_increment: 0.05,
            increment_score_cap: 30,
            paddle_presets: vec![
                PaddlePreset::new(100.0, 16.0, "magenta", 0),
                PaddlePreset::new(95.0, 16.0, "lime", 30),
                PaddlePreset::new(90.0, 16.0, "blue", 40),
            ],
            paddle_bottom_margin: crate::consts::PADDLE_BOTTOM_MARGIN,

            ball_spawn_scores: vec![10, 20],
            max_balls: 3,
            launch_angle_min_deg: 30.0,
            launch_angle_max_deg: 45.0,
            spawn_y: crate::consts::BALL_SPAWN_Y,

            countdown_secs: 3.0,

            powerups_enabled: true,
            powerup_chance: 0.1,
            powerup_fall_speed: 2.0,
            powerup_size: 20.0,
            powerup_duration_secs: 15.0,
            paddle_enlarge_factor: 1.5,
            score_multiplier: 2,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Tuning>(json).map(Tuning::sanitized)
    }

    /// Load tuning from a file, falling back to defaults when absent or malformed
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path.display());
                    tuning
                }
                Err(e) => {
                    log::warn!("Malformed tuning file {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read tuning file {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Repair values that would break invariants (empty tiers, zero radius, ...)
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.ball_radius.is_nan() || self.ball_radius <= 0.0 {
            self.ball_radius = defaults.ball_radius;
        }
        if self.max_speed.is_nan() || self.max_speed <= 0.0 {
            self.max_speed = defaults.max_speed;
        }
        self.decay_factor = if self.decay_factor.is_finite() {
            self.decay_factor.clamp(0.0, 1.0)
        } else {
            defaults.decay_factor
        };
        if self.paddle_presets.is_empty() {
            self.paddle_presets = defaults.paddle_presets;
        }
        // Tiers only move forward, so thresholds must not go backwards
        let mut floor = 0;
        for preset in &mut self.paddle_presets {
            preset.min_score = preset.min_score.max(floor);
            floor = preset.min_score;
        }
        if self.ball_colors.is_empty() {
            self.ball_colors = defaults.ball_colors;
        }
        self.max_balls = self.max_balls.max(1);
        if self.launch_angle_min_deg > self.launch_angle_max_deg {
            std::mem::swap(&mut self.launch_angle_min_deg, &mut self.launch_angle_max_deg);
        }
        self.max_bounce_angle_deg = self.max_bounce_angle_deg.clamp(0.0, 89.0);
        // Timers and per-frame rates must be real, non-negative numbers
        for (value, default) in [
            (&mut self.countdown_secs, defaults.countdown_secs),
            (&mut self.powerup_duration_secs, defaults.powerup_duration_secs),
            (&mut self.powerup_fall_speed, defaults.powerup_fall_speed),
            (&mut self.speed_increment, defaults.speed_increment),
            (&mut self.speed_per_point, defaults.speed_per_point),
            (&mut self.spin_factor, defaults.spin_factor),
            (&mut self.max_spin, defaults.max_spin),
            (&mut self.boost_factor, defaults.boost_factor),
            (&mut self.max_speed_boost, defaults.max_speed_boost),
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = default;
            }
        }
        self.powerup_chance = if self.powerup_chance.is_finite() {
            self.powerup_chance.clamp(0.0, 1.0)
        } else {
            defaults.powerup_chance
        };
        self.score_multiplier = self.score_multiplier.max(1);
        self
    }

    /// Speed magnitude for a freshly launched ball at the given score
    pub fn base_speed(&self, score: u64) -> f32 {
        let (vx, vy) = self.initial_velocity;
        let start = (vx * vx + vy * vy).sqrt();
        (start + self.speed_per_point * score as f32).min(self.max_speed)
    }

    /// Highest tier whose threshold the score has reached
    pub fn tier_for_score(&self, score: u64) -> usize {
        self.paddle_presets
            .iter()
            .rposition(|p| score >= p.min_score)
            .unwrap_or(0)
    }

    /// Number of balls the session should hold at this score
    pub fn balls_for_score(&self, score: u64) -> usize {
        let extra = self.ball_spawn_scores.iter().filter(|&&s| score >= s).count();
        (1 + extra).min(self.max_balls)
    }

    /// Colour for the n-th spawned ball
    pub fn ball_color(&self, index: usize) -> &str {
        self.ball_colors
            .get(index)
            .or(self.ball_colors.last())
            .map(String::as_str)
            .unwrap_or("white")
    }

    /// Preset for a tier; tiers past the end use the last one
    pub fn preset(&self, tier: usize) -> &PaddlePreset {
        self.paddle_presets
            .get(tier)
            .or(self.paddle_presets.last())
            .unwrap_or(&*FALLBACK_PRESET)
    }
}

/// Deserialize a [`Tuning`] and repair it, for records embedded in saved state
pub fn deserialize_sanitized<'de, D>(deserializer: D) -> Result<Tuning, D::Error>
where
    D: Deserializer<'de>,
{
    Tuning::deserialize(deserializer).map(Tuning::sanitized)
}
