//! # Driver Tracking
//!
//! Every driver has one [`DriverTrack`] actor. Raw fixes go through [`FixValidator`] and, if
//! accepted, become the new target of a [`Smoother`]. Consumers read the smoothed position,
//! never the raw fix.
//!
//! ```text
//!  device fix ──► FixValidator ──rejected──► dropped (logged)
//!                     │
//!                  accepted ──► Smoother ──current_position()──► map
//! ```
//!
//! Per-driver state lives in the actor, so two drivers never contend and a single driver's
//! fixes are applied in arrival order.

mod entity;
pub mod geo;
mod smoother;
mod validator;

pub use entity::{DriverTrack, Ingestion, TrackAction, TrackReply};
pub use smoother::Smoother;
pub use validator::{FixValidator, Rejection};

use crate::config::GeoConfig;
use crate::model::{PositionSample, SmoothedPosition};
use tokio::time::Instant;

/// Validation and smoothing for one driver, without the actor around it.
#[derive(Debug, Clone)]
pub struct Track {
    validator: FixValidator,
    smoother: Smoother,
}

impl Track {
    pub fn new(cfg: &GeoConfig) -> Self {
        Self {
            validator: FixValidator::new(cfg),
            smoother: Smoother::new(cfg),
        }
    }

    /// Validates `sample` and, if it passes, retargets the smoother.
    pub fn ingest(&mut self, sample: &PositionSample, now: Instant) -> Result<(), Rejection> {
        self.validator.check(sample)?;
        self.smoother.push(sample.point(), now);
        Ok(())
    }

    pub fn current_position(&mut self, now: Instant) -> Option<SmoothedPosition> {
        self.smoother.current(now)
    }

    /// Drops all history. Used when a driver starts a new delivery.
    pub fn reset(&mut self) {
        self.validator.reset();
        self.smoother.reset();
    }
}
