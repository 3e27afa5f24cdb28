//! Physical plausibility checks for raw fixes.

use super::geo::{haversine_m, is_valid};
use crate::config::GeoConfig;
use crate::model::PositionSample;
use serde::Serialize;
use thiserror::Error;

/// Why a fix was refused. Checks run in declaration order and stop at the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("coordinates out of range")]
    Malformed,

    #[error("accuracy {accuracy_m:.1} m is worse than the limit")]
    LowAccuracy { accuracy_m: f64 },

    #[error("timestamp is not after the last accepted fix")]
    Stale,

    #[error("implied speed {speed_mps:.1} m/s is not plausible")]
    TooFast { speed_mps: f64 },

    #[error("jump of {distance_m:.0} m from the last accepted fix")]
    Jump { distance_m: f64 },
}

#[derive(Debug, Clone)]
pub struct FixValidator {
    max_accuracy_m: f64,
    max_speed_mps: f64,
    max_jump_m: f64,
    last_accepted: Option<PositionSample>,
}

impl FixValidator {
    pub fn new(cfg: &GeoConfig) -> Self {
        Self {
            max_accuracy_m: cfg.max_accuracy_m,
            max_speed_mps: cfg.max_speed_mps,
            max_jump_m: cfg.max_jump_m,
            last_accepted: None,
        }
    }

    /// Accepts or rejects `sample`. Only an accepted sample becomes the new reference.
    pub fn check(&mut self, sample: &PositionSample) -> Result<(), Rejection> {
        if !is_valid(sample.point()) || !sample.accuracy_m.is_finite() {
            return Err(Rejection::Malformed);
        }
        if sample.accuracy_m > self.max_accuracy_m {
            return Err(Rejection::LowAccuracy {
                accuracy_m: sample.accuracy_m,
            });
        }

        let Some(last) = self.last_accepted else {
            // Bootstrap.
            self.last_accepted = Some(*sample);
            return Ok(());
        };

        let elapsed = (sample.timestamp - last.timestamp).num_milliseconds() as f64 / 1_000.0;
        if elapsed <= 0.0 {
            return Err(Rejection::Stale);
        }
        let distance_m = haversine_m(last.point(), sample.point());
        let speed_mps = distance_m / elapsed;
        if speed_mps > self.max_speed_mps {
            return Err(Rejection::TooFast { speed_mps });
        }
        if distance_m > self.max_jump_m {
            return Err(Rejection::Jump { distance_m });
        }

        self.last_accepted = Some(*sample);
        Ok(())
    }

    /// Forgets the reference fix; the next valid sample bootstraps again.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }

    pub fn last_accepted(&self) -> Option<&PositionSample> {
        self.last_accepted.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn at(t0: DateTime<Utc>, secs: i64, lat: f64, lng: f64, acc: f64) -> PositionSample {
        PositionSample::new(lat, lng, acc, t0 + Duration::seconds(secs))
    }

    #[test]
    fn test_accuracy_checked_before_bootstrap() {
        let mut v = FixValidator::new(&GeoConfig::default());
        let t0 = Utc::now();
        assert!(matches!(
            v.check(&at(t0, 0, 0.0, 0.0, 31.0)),
            Err(Rejection::LowAccuracy { .. })
        ));
        assert!(v.last_accepted().is_none());
        assert!(v.check(&at(t0, 0, 0.0, 0.0, 30.0)).is_ok());
    }

    #[test]
    fn test_too_fast_fix_is_rejected_and_reference_kept() {
        let mut v = FixValidator::new(&GeoConfig::default());
        let t0 = Utc::now();
        v.check(&at(t0, 0, 0.0, 0.0, 5.0)).unwrap();
        let err = v.check(&at(t0, 1, 0.01, 0.0, 5.0)).unwrap_err();
        match err {
            Rejection::TooFast { speed_mps } => assert!(speed_mps > 1_000.0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(v.last_accepted().map(|s| s.lat), Some(0.0));
    }

    #[test]
    fn test_slow_but_far_fix_is_a_jump() {
        let mut v = FixValidator::new(&GeoConfig::default());
        let t0 = Utc::now();
        v.check(&at(t0, 0, 0.0, 0.0, 5.0)).unwrap();
        // ~1.1 km after an hour: 0.3 m/s, but beyond the jump limit.
        assert!(matches!(
            v.check(&at(t0, 3_600, 0.01, 0.0, 5.0)),
            Err(Rejection::Jump { .. })
        ));
    }

    #[test]
    fn test_plausible_motion_and_stale_fixes() {
        let mut v = FixValidator::new(&GeoConfig::default());
        let t0 = Utc::now();
        v.check(&at(t0, 0, 0.0, 0.0, 5.0)).unwrap();
        // ~111 m in 10 s.
        assert!(v.check(&at(t0, 10, 0.001, 0.0, 5.0)).is_ok());
        assert_eq!(
            v.check(&at(t0, 10, 0.0011, 0.0, 5.0)),
            Err(Rejection::Stale)
        );

        v.reset();
        assert!(v.check(&at(t0, 0, 1.0, 1.0, 5.0)).is_ok());
    }
}
