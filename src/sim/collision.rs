//! Collision detection and response
//!
//! Walls, the paddle and ball pairs. Every function works on one ball (or one
//! pair) and leaves scoring and lifecycle decisions to the tick.

use glam::Vec2;

use super::state::{Ball, Field};
use crate::tuning::{BouncePolicy, Tuning};
use crate::{rotate_into, rotate_out};

/// Slowest upward speed a paddle hit may leave behind
const MIN_RISE_SPEED: f32 = 0.5;

/// Which boundaries a ball touched this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallHit {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    /// Bottom edge crossed; terminal for the session
    pub floor: bool,
}

impl WallHit {
    /// A bounce happened (the floor does not bounce)
    pub fn bounced(&self) -> bool {
        self.left || self.right || self.top
    }
}

/// Bounce off the side and top walls, report a floor crossing
///
/// Side and top hits clamp the ball back inside, point the velocity away from
/// the wall and optionally reverse spin. The floor is only reported.
pub fn resolve_walls(ball: &mut Ball, field: &Field, tuning: &Tuning) -> WallHit {
    let mut hit = WallHit::default();
    let r = ball.radius;

    if ball.pos.x - r < 0.0 {
        ball.pos.x = r;
        ball.vel.x = ball.vel.x.abs();
        hit.left = true;
    } else if ball.pos.x + r > field.width {
        ball.pos.x = field.width - r;
        ball.vel.x = -ball.vel.x.abs();
        hit.right = true;
    }
    if (hit.left || hit.right) && tuning.reverse_spin_on_wall {
        ball.spin.x = -ball.spin.x;
    }

    if ball.pos.y - r < 0.0 {
        ball.pos.y = r;
        ball.vel.y = ball.vel.y.abs();
        if tuning.reverse_spin_on_wall {
            ball.spin.y = -ball.spin.y;
        }
        hit.top = true;
    }

    if ball.pos.y + r > field.height {
        hit.floor = true;
    }

    if hit.bounced() {
        ball.glow = tuning.wall_glow;
    }
    hit
}

/// Paddle geometry at the moment of a hit test
#[derive(Debug, Clone, Copy)]
pub struct PaddleContact {
    /// Left edge
    pub x: f32,
    pub width: f32,
    /// y of the top edge
    pub top: f32,
    /// Paddle movement per frame
    pub velocity: f32,
}

impl PaddleContact {
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Whether a descending ball is landing on the paddle this tick
///
/// The ball's bottom edge must have passed the paddle top by no more than the
/// distance it travels in one tick, so fast balls cannot tunnel through.
pub fn paddle_hit_test(ball: &Ball, paddle: &PaddleContact, steps: f32) -> bool {
    if ball.vel.y <= 0.0 {
        return false;
    }
    let lookahead = ball.displacement(steps).y.max(ball.vel.y * steps);
    let bottom = ball.pos.y + ball.radius;
    let top = ball.pos.y - ball.radius;

    bottom > paddle.top
        && top < paddle.top + lookahead
        && bottom <= paddle.top + lookahead
        && ball.pos.x > paddle.x
        && ball.pos.x < paddle.x + paddle.width
}

/// Bounce a ball off the paddle; returns the points earned
///
/// Afterwards the ball moves upward, carries spin from the impact offset and a
/// boost from the paddle's motion, and its speed is within `max_speed`.
pub fn resolve_paddle_hit(
    ball: &mut Ball,
    paddle: &PaddleContact,
    tuning: &Tuning,
    score: u64,
    multiplier: u64,
) -> u64 {
    let half_width = (paddle.width / 2.0).max(f32::EPSILON);
    let offset = ((ball.pos.x - paddle.center_x()) / half_width).clamp(-1.0, 1.0);

    match tuning.bounce_policy {
        BouncePolicy::Angled => {
            let angle = offset * tuning.max_bounce_angle_deg.to_radians();
            let speed = ball
                .speed()
                .max(tuning.base_speed(score))
                .clamp(MIN_RISE_SPEED, tuning.max_speed.max(MIN_RISE_SPEED));
            ball.vel = Vec2::new(angle.sin(), -angle.cos()) * speed;
        }
        BouncePolicy::Increment => {
            let mut vel = Vec2::new(ball.vel.x, -ball.vel.y.abs().max(MIN_RISE_SPEED));
            // The point for this hit counts toward the cap
            if score.saturating_add(multiplier) < tuning.increment_score_cap {
                if vel.x != 0.0 {
                    vel.x += tuning.speed_increment.copysign(vel.x);
                }
                vel.y -= tuning.speed_increment;
            }
            ball.vel = vel;
        }
    }
    clamp_speed(ball, tuning.max_speed);

    ball.spin.x = offset * tuning.spin_factor;
    ball.spin = ball.spin.clamp_length_max(tuning.max_spin);
    ball.speed_boost = (paddle.velocity.abs() * tuning.boost_factor).min(tuning.max_speed_boost);

    // Sit on the paddle so the next tick starts clear of it
    ball.pos.y = paddle.top - ball.radius;
    ball.glow = tuning.paddle_glow;

    log::debug!(
        "Ball {} paddle hit: offset {offset:.2}, vel ({:.2}, {:.2})",
        ball.id,
        ball.vel.x,
        ball.vel.y
    );
    multiplier
}

/// Scale velocity down to `max_speed` if it exceeds it
pub fn clamp_speed(ball: &mut Ball, max_speed: f32) {
    ball.vel = ball.vel.clamp_length_max(max_speed);
}

/// Detect and resolve a collision between two balls; returns whether they touched
///
/// Works in the frame of the contact normal: both velocities are rotated onto
/// the axis, exchanged with a radius-weighted 1D elastic rule (radius stands in
/// for mass), the balls are advanced apart along the axis, then everything is
/// rotated back. Each ball's spin is folded into its new velocity and then
/// inverted. The separated pair is kept inside the side and top walls.
pub fn resolve_ball_pair(a: &mut Ball, b: &mut Ball, field: &Field, tuning: &Tuning) -> bool {
    let delta = b.pos - a.pos;
    let dist = delta.length();
    let min_dist = a.radius + b.radius;
    if dist >= min_dist {
        return false;
    }

    // Coincident centers have no normal; pick one
    let axis = if dist > f32::EPSILON { delta } else { Vec2::X };
    let angle = axis.y.atan2(axis.x);
    let (sin, cos) = angle.sin_cos();

    let mut pos_a = Vec2::ZERO;
    let mut pos_b = rotate_into(delta, sin, cos);
    let mut vel_a = rotate_into(a.vel, sin, cos);
    let mut vel_b = rotate_into(b.vel, sin, cos);

    // Only exchange when closing; overlapping balls already moving apart keep their motion
    if vel_a.x > vel_b.x {
        let (ra, rb) = (a.radius, b.radius);
        let closing = vel_a.x - vel_b.x;
        vel_a.x = ((ra - rb) * vel_a.x + 2.0 * rb * vel_b.x) / (ra + rb);
        vel_b.x = closing + vel_a.x;
    }

    pos_a.x += vel_a.x;
    pos_b.x += vel_b.x;

    // Push out whatever overlap the velocity step did not clear
    let overlap = min_dist - (pos_b.x - pos_a.x);
    if overlap > 0.0 {
        let total = a.radius + b.radius;
        pos_a.x -= overlap * b.radius / total;
        pos_b.x += overlap * a.radius / total;
    }
    pos_a.y = 0.0;
    pos_b.y = 0.0;

    let origin = a.pos;
    a.pos = origin + rotate_out(pos_a, sin, cos);
    b.pos = origin + rotate_out(pos_b, sin, cos);
    keep_pair_inside(a, b, field);

    a.vel = rotate_out(vel_a, sin, cos) + a.spin;
    b.vel = rotate_out(vel_b, sin, cos) + b.spin;
    a.spin = -a.spin;
    b.spin = -b.spin;
    clamp_speed(a, tuning.max_speed);
    clamp_speed(b, tuning.max_speed);

    a.glow = tuning.ball_glow;
    b.glow = tuning.ball_glow;
    true
}

/// Shift a separated pair back inside the side and top walls
///
/// Both balls move by the same offset, so the gap between them is unchanged.
/// A field narrower than the pair favours the left wall.
fn keep_pair_inside(a: &mut Ball, b: &mut Ball, field: &Field) {
    let lo_x = (a.radius - a.pos.x).max(b.radius - b.pos.x);
    let hi_x = (field.width - a.radius - a.pos.x).min(field.width - b.radius - b.pos.x);
    let shift_x = if lo_x > 0.0 {
        lo_x
    } else if hi_x < 0.0 {
        hi_x
    } else {
        0.0
    };

    let shift_y = (a.radius - a.pos.y).max(b.radius - b.pos.y).max(0.0);

    let shift = Vec2::new(shift_x, shift_y);
    a.pos += shift;
    b.pos += shift;
}

/// Resolve every overlapping pair once, in index order
///
/// Three or more mutually overlapping balls are handled pair by pair, so the
/// outcome depends on ordering. Returns the number of pairs that collided.
pub fn resolve_all_pairs(balls: &mut [Ball], field: &Field, tuning: &Tuning) -> usize {
    let mut hits = 0;
    for i in 0..balls.len() {
        let (head, tail) = balls.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail.iter_mut() {
            if resolve_ball_pair(a, b, field, tuning) {
                hits += 1;
            }
        }
    }
    hits
}
