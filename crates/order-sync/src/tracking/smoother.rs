//! Display smoothing for accepted fixes.
//!
//! The displayed position chases the latest accepted fix in fixed ticks. Each tick decays the
//! velocity, then pulls it toward the target with a gain that shrinks as the target gets
//! close: far targets are approached fast, near ones gently. A step that would pass the target
//! lands on it instead.
//!
//! Ticks are not driven by a timer. They are evaluated lazily up to the instant the position
//! is read, so an idle track costs nothing.

use super::geo::{from_local, to_local};
use crate::config::GeoConfig;
use crate::model::{GeoPoint, SmoothedPosition, Velocity};
use std::time::Duration;
use tokio::time::Instant;

/// Gaps longer than this many ticks snap to the target instead of replaying every tick.
const MAX_CATCH_UP_TICKS: u32 = 200;

/// Below this distance (meters) the position is considered arrived.
const ARRIVED_M: f64 = 0.05;

#[derive(Debug, Clone, Copy)]
struct Vec2 {
    e: f64,
    n: f64,
}

impl Vec2 {
    const ZERO: Vec2 = Vec2 { e: 0.0, n: 0.0 };

    fn len(self) -> f64 {
        self.e.hypot(self.n)
    }
}

#[derive(Debug, Clone)]
struct State {
    /// Anchor of the local east/north frame.
    origin: GeoPoint,
    pos: Vec2,
    vel: Vec2,
    target: Vec2,
    clock: Instant,
}

#[derive(Debug, Clone)]
pub struct Smoother {
    tick: Duration,
    damping: f64,
    base_gain: f64,
    proximity_ref_m: f64,
    state: Option<State>,
}

impl Smoother {
    pub fn new(cfg: &GeoConfig) -> Self {
        Self {
            tick: cfg.tick().max(Duration::from_millis(1)),
            damping: cfg.damping,
            base_gain: cfg.base_gain,
            proximity_ref_m: cfg.proximity_ref_m,
            state: None,
        }
    }

    /// Sets a new target. The first target is adopted immediately.
    pub fn push(&mut self, target: GeoPoint, now: Instant) {
        self.advance(now);
        match &mut self.state {
            Some(state) => {
                let (e, n) = to_local(state.origin, target);
                state.target = Vec2 { e, n };
            }
            None => {
                self.state = Some(State {
                    origin: target,
                    pos: Vec2::ZERO,
                    vel: Vec2::ZERO,
                    target: Vec2::ZERO,
                    clock: now,
                });
            }
        }
    }

    /// Position after evaluating every tick up to `now`. `None` before the first target.
    pub fn current(&mut self, now: Instant) -> Option<SmoothedPosition> {
        self.advance(now);
        self.state.as_ref().map(|state| {
            let point = from_local(state.origin, state.pos.e, state.pos.n);
            SmoothedPosition {
                lat: point.lat,
                lng: point.lng,
                velocity: Velocity {
                    east_mps: state.vel.e,
                    north_mps: state.vel.n,
                },
            }
        })
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    fn advance(&mut self, now: Instant) {
        let tick = self.tick;
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let pending = now.saturating_duration_since(state.clock).as_nanos() / tick.as_nanos();
        if pending == 0 {
            return;
        }
        if pending > u128::from(MAX_CATCH_UP_TICKS) {
            state.pos = state.target;
            state.vel = Vec2::ZERO;
            state.clock = now;
            return;
        }

        let dt = tick.as_secs_f64();
        for _ in 0..pending {
            step(state, dt, self.damping, self.base_gain, self.proximity_ref_m);
        }
        // pending <= MAX_CATCH_UP_TICKS, so the cast is lossless.
        state.clock += tick * pending as u32;
    }
}

fn step(state: &mut State, dt: f64, damping: f64, base_gain: f64, proximity_ref_m: f64) {
    let err = Vec2 {
        e: state.target.e - state.pos.e,
        n: state.target.n - state.pos.n,
    };
    let dist = err.len();
    if dist < ARRIVED_M {
        state.pos = state.target;
        state.vel = Vec2::ZERO;
        return;
    }

    let gain = base_gain * dist / (dist + proximity_ref_m);
    state.vel = Vec2 {
        e: state.vel.e * damping + err.e * gain,
        n: state.vel.n * damping + err.n * gain,
    };

    let moved = Vec2 {
        e: state.vel.e * dt,
        n: state.vel.n * dt,
    };
    // Progress along the line to the target; never past it.
    let along = (moved.e * err.e + moved.n * err.n) / dist;
    if along >= dist {
        state.pos = state.target;
        state.vel = Vec2::ZERO;
    } else {
        state.pos.e += moved.e;
        state.pos.n += moved.n;
    }
}
