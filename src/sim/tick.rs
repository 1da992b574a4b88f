//! Simulation tick
//!
//! Advances a session by an explicit elapsed time. Per-frame tuning values are
//! scaled by `dt * REFERENCE_FPS`, so one call with `FRAME_DT` is one classic frame.

use glam::Vec2;

use super::collision::{PaddleContact, paddle_hit_test, resolve_all_pairs, resolve_paddle_hit, resolve_walls};
use super::state::{ActiveEffect, GameEvent, GamePhase, GameState, PowerUp, PowerUpKind};
use crate::consts::*;

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer/touch x the paddle should centre on; the latest sample wins
    pub pointer_x: Option<f32>,
}

/// Advance the game state by `dt` seconds
///
/// Lifecycle signals collect in `state.events`; drain them once per frame with
/// [`GameState::drain_events`]. Beyond
/// [`MAX_PENDING_EVENTS`](super::state::MAX_PENDING_EVENTS) the oldest are dropped.
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    advance(state, input, dt);
    state.trim_events();
}

fn advance(state: &mut GameState, input: &TickInput, dt: f32) {
    if !dt.is_finite() {
        return;
    }
    let dt = dt.clamp(0.0, MAX_TICK_DT);
    let steps = dt * REFERENCE_FPS;

    match state.phase {
        GamePhase::GameOver => return,
        GamePhase::Countdown { remaining } => {
            track_paddle(state, input, steps);
            advance_countdown(state, remaining, dt);
            return;
        }
        GamePhase::Playing => {}
    }

    state.time_ticks += 1;
    track_paddle(state, input, steps);
    update_effect(state, dt);

    if !step_balls(state, steps) {
        end_session(state);
        return;
    }

    let pairs = resolve_all_pairs(&mut state.balls, &state.field, &state.tuning);
    if pairs > 0 {
        log::debug!("{pairs} ball pair(s) collided");
    }

    update_powerups(state, steps);
    apply_progression(state);
}

fn advance_countdown(state: &mut GameState, remaining: f32, dt: f32) {
    let next = remaining - dt;
    if next <= 0.0 {
        state.phase = GamePhase::Playing;
        state.events.push(GameEvent::Started);
        log::info!("Session started");
        return;
    }

    let shown = next.ceil() as u32;
    if shown < remaining.ceil() as u32 {
        state.events.push(GameEvent::CountdownTick { remaining: shown });
    }
    state.phase = GamePhase::Countdown { remaining: next };
}

fn track_paddle(state: &mut GameState, input: &TickInput, steps: f32) {
    let width = state.paddle_width();
    state
        .paddle
        .track(input.pointer_x, width, state.field.width, steps);
}

/// Move every ball, bounce walls and paddle; false once a ball reaches the floor
fn step_balls(state: &mut GameState, steps: f32) -> bool {
    let contact = PaddleContact {
        x: state.paddle.x,
        width: state.paddle_width(),
        top: state.paddle_top(),
        velocity: state.paddle.velocity,
    };
    let multiplier = state.score_multiplier();
    let tuning = &state.tuning;
    let mut paddle_hits = 0;

    for ball in &mut state.balls {
        ball.integrate(steps, tuning.decay_factor);
        ball.decay_glow(tuning.glow_decay_step);

        let walls = resolve_walls(ball, &state.field, tuning);

        if paddle_hit_test(ball, &contact, steps) {
            state.score += resolve_paddle_hit(ball, &contact, tuning, state.score, multiplier);
            state.events.push(GameEvent::PaddleHit {
                ball_id: ball.id,
                score: state.score,
            });
            paddle_hits += 1;
        } else if walls.floor {
            log::info!("Ball {} reached the floor", ball.id);
            return false;
        }
    }

    for _ in 0..paddle_hits {
        maybe_spawn_powerup(state);
    }
    true
}

/// Terminal transition: stop play, record a high score, drop pending timers
fn end_session(state: &mut GameState) {
    state.phase = GamePhase::GameOver;
    let new_high_score = state.score > state.high_score;
    if new_high_score {
        state.high_score = state.score;
        log::info!("New high score: {}", state.high_score);
    }
    state.effect = None;
    state.powerups.clear();
    state.events.push(GameEvent::GameOver {
        final_score: state.score,
        new_high_score,
    });
    log::info!("Game over, final score {}", state.score);
}

/// Add balls and advance the paddle tier as the score crosses thresholds
fn apply_progression(state: &mut GameState) {
    let wanted = state.tuning.balls_for_score(state.score);
    while state.balls.len() < wanted {
        let ball_id = state.spawn_ball();
        state.events.push(GameEvent::BallSpawned { ball_id });
        log::info!("Ball {ball_id} spawned at score {}", state.score);
    }

    let tier = state.tuning.tier_for_score(state.score).max(state.paddle.tier);
    if tier != state.paddle.tier {
        state.paddle.tier = tier;
        let width = state.paddle_width();
        state.paddle.clamp(width, state.field.width);
        state.events.push(GameEvent::PaddleTierChanged { tier });
        log::info!("Paddle tier {tier} at score {}", state.score);
    }
}

fn maybe_spawn_powerup(state: &mut GameState) {
    let tuning = &state.tuning;
    if !tuning.powerups_enabled || !state.powerups.is_empty() || state.effect.is_some() {
        return;
    }
    let chance = tuning.powerup_chance;
    let size = tuning.powerup_size;
    if state.rng_state.unit() >= chance {
        return;
    }

    let x = state.rng_state.unit() * (state.field.width - size).max(0.0);
    let kind = if state.rng_state.coin() {
        PowerUpKind::PaddleEnlarge
    } else {
        PowerUpKind::ScoreMultiplier
    };
    state.powerups.push(PowerUp {
        kind,
        pos: Vec2::new(x, 0.0),
        size,
    });
    state.events.push(GameEvent::PowerUpSpawned { kind });
    log::debug!("Power-up {kind:?} dropped at x {x:.1}");
}

/// Drop power-ups, collect those touching the paddle, discard those off the field
fn update_powerups(state: &mut GameState, steps: f32) {
    if state.powerups.is_empty() {
        return;
    }
    let fall = state.tuning.powerup_fall_speed * steps;
    let (px, pw) = (state.paddle.x, state.paddle_width());
    let (top, bottom) = (state.paddle_top(), state.paddle_top() + state.paddle_height());
    let floor = state.field.height;

    let mut collected = Vec::new();
    state.powerups.retain_mut(|p| {
        p.pos.y += fall;
        let touches = p.pos.x < px + pw
            && p.pos.x + p.size > px
            && p.pos.y + p.size >= top
            && p.pos.y <= bottom;
        if touches {
            collected.push(p.kind);
            false
        } else {
            p.pos.y <= floor
        }
    });

    for kind in collected {
        activate_powerup(state, kind);
    }
}

/// Install a time-limited modifier, replacing any that is running
fn activate_powerup(state: &mut GameState, kind: PowerUpKind) {
    if let Some(previous) = state.effect.take() {
        state
            .events
            .push(GameEvent::PowerUpExpired { kind: previous.kind });
    }
    let duration = state.tuning.powerup_duration_secs;
    state.effect = Some(ActiveEffect {
        kind,
        remaining: duration,
    });
    let width = state.paddle_width();
    state.paddle.clamp(width, state.field.width);
    state
        .events
        .push(GameEvent::PowerUpActivated { kind, duration });
    log::info!("Power-up {kind:?} active for {duration}s");
}

/// Count down the active modifier and revert it on expiry
fn update_effect(state: &mut GameState, dt: f32) {
    let Some(effect) = state.effect.as_mut() else {
        return;
    };
    effect.remaining -= dt;
    if effect.remaining <= 0.0 {
        let kind = effect.kind;
        state.effect = None;
        state.events.push(GameEvent::PowerUpExpired { kind });
        log::info!("Power-up {kind:?} expired");
    }
}

/// Paddle input that tracks the most urgent ball (for demos and soak tests)
///
/// Picks the lowest descending ball, predicts where it meets the paddle line
/// including side-wall reflections, and aims slightly off-center so bounces vary.
pub fn autopilot_input(state: &GameState) -> TickInput {
    let paddle_line = state.paddle_top();
    let target = state
        .balls
        .iter()
        .filter(|b| b.vel.y > 0.0)
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
        .or_else(|| state.balls.iter().max_by(|a, b| a.pos.y.total_cmp(&b.pos.y)));

    let Some(ball) = target else {
        return TickInput::default();
    };

    let x = if ball.vel.y > 0.0 {
        let frames = ((paddle_line - ball.radius - ball.pos.y) / ball.vel.y).max(0.0);
        fold_into_field(
            ball.pos.x + ball.vel.x * frames,
            ball.radius,
            state.field.width,
        )
    } else {
        ball.pos.x
    };

    let time_factor = state.time_ticks as f32 * 0.01;
    let offset = (time_factor.sin() * 0.3 + (time_factor * 0.7).sin() * 0.15) * state.paddle_width() / 2.0;
    TickInput {
        pointer_x: Some(x + offset),
    }
}

/// Reflect an unbounded x back between the side walls
fn fold_into_field(x: f32, radius: f32, width: f32) -> f32 {
    let span = (width - 2.0 * radius).max(f32::EPSILON);
    let period = 2.0 * span;
    let t = (x - radius).rem_euclid(period);
    let folded = if t > span { period - t } else { t };
    folded + radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Ball, Field, MAX_PENDING_EVENTS};
    use crate::tuning::Tuning;

    fn quiet_tuning() -> Tuning {
        Tuning {
            powerups_enabled: false,
            ..Default::default()
        }
    }

    /// Session already past its countdown with events cleared
    fn playing_state(tuning: Tuning) -> GameState {
        let mut state = GameState::new(42, tuning, Field::new(800.0, 600.0), 0);
        state.phase = GamePhase::Playing;
        state.drain_events();
        state
    }

    fn place(state: &mut GameState, pos: Vec2, vel: Vec2) {
        let ball = &mut state.balls[0];
        ball.pos = pos;
        ball.vel = vel;
        ball.spin = Vec2::ZERO;
        ball.speed_boost = 0.0;
        ball.radius = 7.5;
    }

    #[test]
    fn test_countdown_then_play() {
        let mut state = GameState::new(1, quiet_tuning(), Field::default(), 0);
        assert!(!state.is_active());
        let ball_before = state.balls[0].pos;

        let mut events = state.drain_events();
        for _ in 0..100 {
            tick(&mut state, &TickInput::default(), 0.05);
            events.extend(state.drain_events());
            if state.is_active() {
                break;
            }
        }
        assert!(state.is_active());
        assert_eq!(state.balls[0].pos, ball_before);
        assert_eq!(events[0], GameEvent::CountdownTick { remaining: 3 });
        assert!(events.contains(&GameEvent::CountdownTick { remaining: 2 }));
        assert!(events.contains(&GameEvent::CountdownTick { remaining: 1 }));
        assert_eq!(events.last(), Some(&GameEvent::Started));
    }

    #[test]
    fn test_nan_countdown_still_starts() {
        let tuning = Tuning {
            countdown_secs: f32::NAN,
            ..quiet_tuning()
        };
        let mut state = GameState::new(1, tuning, Field::default(), 0);
        for _ in 0..100 {
            tick(&mut state, &TickInput::default(), 0.05);
        }
        assert!(state.is_active());
    }

    #[test]
    fn test_undrained_events_are_capped() {
        let mut state = playing_state(Tuning {
            ball_spawn_scores: Vec::new(),
            ..quiet_tuning()
        });
        for _ in 0..(MAX_PENDING_EVENTS + 20) {
            // Bounce on the paddle every tick
            place(&mut state, Vec2::new(410.0, 526.0), Vec2::new(0.0, 2.0));
            tick(&mut state, &TickInput::default(), FRAME_DT);
        }
        assert!(state.is_active());
        assert_eq!(state.events.len(), MAX_PENDING_EVENTS);
        assert!(matches!(state.events.last(), Some(GameEvent::PaddleHit { .. })));
    }

    #[test]
    fn test_free_flight_one_frame() {
        let mut state = playing_state(quiet_tuning());
        place(&mut state, Vec2::new(100.0, 100.0), Vec2::new(3.0, 4.0));

        tick(&mut state, &TickInput::default(), FRAME_DT);
        let ball = &state.balls[0];
        assert!((ball.pos - Vec2::new(103.0, 104.0)).length() < 1e-3);
        assert_eq!(ball.glow, 0);
        assert!(state.is_active());
    }

    #[test]
    fn test_right_wall_bounce() {
        let mut state = playing_state(quiet_tuning());
        place(&mut state, Vec2::new(801.0, 200.0), Vec2::new(3.0, 1.0));

        tick(&mut state, &TickInput::default(), FRAME_DT);
        let ball = &state.balls[0];
        assert_eq!(ball.pos.x, 800.0 - 7.5);
        assert!(ball.vel.x < 0.0);
        assert_eq!(ball.glow, state.tuning.wall_glow);
    }

    #[test]
    fn test_touching_pair_at_wall_ends_apart() {
        let mut state = playing_state(quiet_tuning());
        let radius = state.tuning.ball_radius;
        place(&mut state, Vec2::new(780.0, 300.0), Vec2::new(3.0, 0.0));
        state.balls[0].radius = radius;
        let id = state.next_entity_id();
        state
            .balls
            .push(Ball::new(id, Vec2::new(789.0, 300.0), Vec2::new(1.0, 0.0), radius, "lime"));

        tick(&mut state, &TickInput::default(), FRAME_DT);
        let (a, b) = (&state.balls[0], &state.balls[1]);
        assert!(a.pos.distance(b.pos) >= 2.0 * radius - 1e-3, "{} {}", a.pos, b.pos);
        for ball in [a, b] {
            assert!(ball.pos.x >= radius && ball.pos.x <= 800.0 - radius + 1e-3);
            assert_eq!(ball.glow, state.tuning.ball_glow);
        }
        // The exchange left them moving apart
        assert!(a.vel.x < b.vel.x);
    }

    #[test]
    fn test_paddle_hit_scores() {
        let mut state = playing_state(quiet_tuning());
        // Paddle is centred at 400 with its top at 534
        place(&mut state, Vec2::new(410.0, 526.0), Vec2::new(0.0, 2.0));

        tick(&mut state, &TickInput { pointer_x: Some(400.0) }, FRAME_DT);
        assert_eq!(state.score, 1);
        assert!(state.balls[0].vel.y < 0.0);
        assert!(state.balls[0].spin.x > 0.0);
        assert_eq!(state.balls[0].glow, state.tuning.paddle_glow);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::PaddleHit { ball_id: 1, score: 1 }));
    }

    #[test]
    fn test_moving_paddle_boosts_ball() {
        let mut state = playing_state(quiet_tuning());
        place(&mut state, Vec2::new(400.0, 526.0), Vec2::new(0.0, 2.0));

        // Paddle slides 20px right this frame
        tick(&mut state, &TickInput { pointer_x: Some(420.0) }, FRAME_DT);
        assert_eq!(state.score, 1);
        assert!(state.balls[0].speed_boost > 0.0);
    }

    #[test]
    fn test_score_multiplier_applies() {
        let mut state = playing_state(quiet_tuning());
        state.effect = Some(ActiveEffect {
            kind: PowerUpKind::ScoreMultiplier,
            remaining: 10.0,
        });
        place(&mut state, Vec2::new(400.0, 526.0), Vec2::new(0.0, 2.0));

        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.score, 2);
    }

    #[test]
    fn test_second_ball_at_ten() {
        let mut state = playing_state(quiet_tuning());
        place(&mut state, Vec2::new(200.0, 300.0), Vec2::new(1.0, -1.0));
        state.score = 10;

        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.balls.len(), 2);
        let spawned = state.balls[1].clone();
        assert_eq!(spawned.pos, Vec2::new(400.0, state.tuning.spawn_y));
        assert_eq!(spawned.color, "lime");
        let angle = spawned.vel.y.atan2(spawned.vel.x.abs()).to_degrees();
        assert!(angle > 30.0 && angle < 45.0, "angle {angle}");

        let events = state.drain_events();
        assert!(events.contains(&GameEvent::BallSpawned { ball_id: spawned.id }));

        // Still two on the next tick; the count never shrinks or overshoots
        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.balls.len(), 2);
    }

    #[test]
    fn test_ball_cap() {
        let mut state = playing_state(quiet_tuning());
        place(&mut state, Vec2::new(200.0, 300.0), Vec2::new(1.0, -1.0));
        state.score = 500;
        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.balls.len(), state.tuning.max_balls);
    }

    #[test]
    fn test_tier_is_monotonic() {
        let mut state = playing_state(quiet_tuning());
        place(&mut state, Vec2::new(200.0, 300.0), Vec2::new(0.0, -1.0));
        state.score = 45;
        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.paddle.tier, 2);
        assert_eq!(state.paddle_width(), 90.0);

        state.score = 31;
        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.paddle.tier, 2);
    }

    #[test]
    fn test_floor_ends_session_with_high_score() {
        let mut state = playing_state(quiet_tuning());
        state.high_score = 15;
        state.score = 20;
        place(&mut state, Vec2::new(100.0, 590.0), Vec2::new(0.0, 4.0));

        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert!(!state.is_active());
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.high_score, 20);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::GameOver {
            final_score: 20,
            new_high_score: true
        }));

        // Frozen until restart
        let pos = state.balls[0].pos;
        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.balls[0].pos, pos);

        state.restart();
        assert!(matches!(state.phase, GamePhase::Countdown { .. }));
        assert_eq!(state.high_score, 20);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_low_score_keeps_high_score() {
        let mut state = playing_state(quiet_tuning());
        state.high_score = 15;
        state.score = 3;
        place(&mut state, Vec2::new(100.0, 590.0), Vec2::new(0.0, 4.0));
        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.high_score, 15);
    }

    #[test]
    fn test_powerup_enlarge_and_expire() {
        let mut state = playing_state(quiet_tuning());
        place(&mut state, Vec2::new(100.0, 100.0), Vec2::ZERO);
        let base_width = state.paddle_width();
        state.powerups.push(PowerUp {
            kind: PowerUpKind::PaddleEnlarge,
            pos: Vec2::new(390.0, 520.0),
            size: 20.0,
        });

        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert!(state.powerups.is_empty());
        assert_eq!(state.paddle_width(), base_width * 1.5);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::PowerUpActivated {
            kind: PowerUpKind::PaddleEnlarge,
            duration: 15.0
        }));

        for _ in 0..200 {
            tick(&mut state, &TickInput::default(), 0.1);
        }
        assert!(state.effect.is_none());
        assert_eq!(state.paddle_width(), base_width);
        let expired: Vec<_> = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::PowerUpExpired { .. }))
            .collect();
        assert_eq!(expired.len(), 1);
    }

    #[test]
    fn test_missed_powerup_falls_away() {
        let mut state = playing_state(quiet_tuning());
        place(&mut state, Vec2::new(100.0, 100.0), Vec2::ZERO);
        state.powerups.push(PowerUp {
            kind: PowerUpKind::ScoreMultiplier,
            pos: Vec2::new(10.0, 590.0),
            size: 20.0,
        });
        for _ in 0..10 {
            tick(&mut state, &TickInput::default(), FRAME_DT);
        }
        assert!(state.powerups.is_empty());
        assert!(state.effect.is_none());
    }

    #[test]
    fn test_powerups_drop_from_hits() {
        let tuning = Tuning {
            powerup_chance: 1.0,
            ..Default::default()
        };
        let mut state = playing_state(tuning);
        place(&mut state, Vec2::new(400.0, 526.0), Vec2::new(0.0, 2.0));
        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.powerups.len(), 1);
        assert!(state.powerups[0].pos.y < state.tuning.powerup_fall_speed + 1e-3);
    }

    #[test]
    fn test_fold_into_field() {
        assert!((fold_into_field(100.0, 10.0, 800.0) - 100.0).abs() < 1e-4);
        assert!((fold_into_field(850.0, 10.0, 800.0) - 730.0).abs() < 1e-4);
        assert!((fold_into_field(-40.0, 10.0, 800.0) - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_determinism() {
        let mut a = GameState::new(99999, Tuning::default(), Field::default(), 0);
        let mut b = GameState::new(99999, Tuning::default(), Field::default(), 0);

        for _ in 0..2000 {
            let input = autopilot_input(&a);
            tick(&mut a, &input, FRAME_DT);
            let input = autopilot_input(&b);
            tick(&mut b, &input, FRAME_DT);
        }

        assert_eq!(a.score, b.score);
        assert_eq!(a.balls.len(), b.balls.len());
        for (x, y) in a.balls.iter().zip(&b.balls) {
            assert_eq!(x.pos, y.pos);
            assert_eq!(x.vel, y.vel);
        }
    }

    #[test]
    fn test_autopilot_soak_invariants() {
        let mut state = GameState::new(7, Tuning::default(), Field::default(), 0);
        for _ in 0..20_000 {
            let input = autopilot_input(&state);
            let before = state.score;
            let balls_before = state.balls.len();
            tick(&mut state, &input, FRAME_DT);
            if !state.is_active() {
                break;
            }

            assert!(state.score >= before);
            assert!(state.balls.len() >= balls_before);
            for ball in &state.balls {
                assert!(ball.pos.x >= ball.radius - 1e-3);
                assert!(ball.pos.x <= state.field.width - ball.radius + 1e-3);
                assert!(ball.speed() <= state.tuning.max_speed + 1e-3);
                assert!(ball.vel.is_finite());
            }
        }
    }
}
