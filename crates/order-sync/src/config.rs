//! Runtime configuration.
//!
//! Defaults are usable as-is. `SyncConfig::from_env()` reads a `.env` file if one exists and
//! then applies `ORDER_SYNC_*` overrides, e.g.
//!
//! ```text
//! ORDER_SYNC_ADMISSION_WAIT_MS=5000
//! ORDER_SYNC_QUEUE_RETENTION_DAYS=3
//! ORDER_SYNC_GEO_MAX_SPEED_MPS=45
//! ```

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Geolocation plausibility and smoothing parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub max_accuracy_m: f64,
    pub max_speed_mps: f64,
    pub max_jump_m: f64,
    pub tick_ms: u64,
    pub damping: f64,
    pub base_gain: f64,
    /// Distance at which the proximity gain reaches half of `base_gain`.
    pub proximity_ref_m: f64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            max_accuracy_m: 30.0,
            max_speed_mps: 40.0,
            max_jump_m: 500.0,
            tick_ms: 50,
            damping: 0.95,
            base_gain: 0.6,
            proximity_ref_m: 20.0,
        }
    }
}

impl GeoConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Mailbox capacity of every tenant desk and driver track.
    pub mailbox_size: usize,
    /// Bounded wait for the tenant serialization point.
    pub admission_wait_ms: u64,
    pub dedup_window_secs: u64,
    pub code_length: usize,
    pub code_attempts: u32,
    pub persistence_attempts: u32,
    pub persistence_base_delay_ms: u64,
    pub persistence_max_delay_ms: u64,
    pub queue_base_delay_ms: u64,
    pub queue_max_delay_ms: u64,
    pub queue_retention_days: u32,
    pub subscriber_buffer: usize,
    pub liveness_window_secs: u64,
    pub sweep_interval_secs: u64,
    pub geo: GeoConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mailbox_size: 64,
            admission_wait_ms: 3_000,
            dedup_window_secs: 600,
            code_length: 6,
            code_attempts: 8,
            persistence_attempts: 3,
            persistence_base_delay_ms: 50,
            persistence_max_delay_ms: 1_000,
            queue_base_delay_ms: 500,
            queue_max_delay_ms: 60_000,
            queue_retention_days: 7,
            subscriber_buffer: 64,
            liveness_window_secs: 60,
            sweep_interval_secs: 15,
            geo: GeoConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Defaults, then `.env`, then process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development.
        dotenvy::dotenv().ok();

        let mut cfg = Self::default();
        override_from_env("ORDER_SYNC_MAILBOX_SIZE", &mut cfg.mailbox_size)?;
        override_from_env("ORDER_SYNC_ADMISSION_WAIT_MS", &mut cfg.admission_wait_ms)?;
        override_from_env("ORDER_SYNC_DEDUP_WINDOW_SECS", &mut cfg.dedup_window_secs)?;
        override_from_env("ORDER_SYNC_CODE_LENGTH", &mut cfg.code_length)?;
        override_from_env("ORDER_SYNC_CODE_ATTEMPTS", &mut cfg.code_attempts)?;
        override_from_env("ORDER_SYNC_PERSISTENCE_ATTEMPTS", &mut cfg.persistence_attempts)?;
        override_from_env(
            "ORDER_SYNC_PERSISTENCE_BASE_DELAY_MS",
            &mut cfg.persistence_base_delay_ms,
        )?;
        override_from_env(
            "ORDER_SYNC_PERSISTENCE_MAX_DELAY_MS",
            &mut cfg.persistence_max_delay_ms,
        )?;
        override_from_env("ORDER_SYNC_QUEUE_BASE_DELAY_MS", &mut cfg.queue_base_delay_ms)?;
        override_from_env("ORDER_SYNC_QUEUE_MAX_DELAY_MS", &mut cfg.queue_max_delay_ms)?;
        override_from_env(
            "ORDER_SYNC_QUEUE_RETENTION_DAYS",
            &mut cfg.queue_retention_days,
        )?;
        override_from_env("ORDER_SYNC_SUBSCRIBER_BUFFER", &mut cfg.subscriber_buffer)?;
        override_from_env(
            "ORDER_SYNC_LIVENESS_WINDOW_SECS",
            &mut cfg.liveness_window_secs,
        )?;
        override_from_env("ORDER_SYNC_SWEEP_INTERVAL_SECS", &mut cfg.sweep_interval_secs)?;
        override_from_env("ORDER_SYNC_GEO_MAX_ACCURACY_M", &mut cfg.geo.max_accuracy_m)?;
        override_from_env("ORDER_SYNC_GEO_MAX_SPEED_MPS", &mut cfg.geo.max_speed_mps)?;
        override_from_env("ORDER_SYNC_GEO_MAX_JUMP_M", &mut cfg.geo.max_jump_m)?;
        override_from_env("ORDER_SYNC_GEO_TICK_MS", &mut cfg.geo.tick_ms)?;
        override_from_env("ORDER_SYNC_GEO_DAMPING", &mut cfg.geo.damping)?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_size == 0 {
            return Err(out_of_range("mailbox_size", "must be at least 1"));
        }
        if self.subscriber_buffer == 0 {
            return Err(out_of_range("subscriber_buffer", "must be at least 1"));
        }
        if !(4..=12).contains(&self.code_length) {
            return Err(out_of_range("code_length", "must be between 4 and 12"));
        }
        if self.code_attempts == 0 || self.persistence_attempts == 0 {
            return Err(out_of_range("attempts", "must be at least 1"));
        }
        if self.geo.tick_ms == 0 {
            return Err(out_of_range("geo.tick_ms", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.geo.damping) {
            return Err(out_of_range("geo.damping", "must be in [0, 1)"));
        }
        Ok(())
    }

    pub fn admission_wait(&self) -> Duration {
        Duration::from_millis(self.admission_wait_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    pub fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.liveness_window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn queue_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.queue_retention_days))
    }

    pub fn persistence_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.persistence_attempts,
            Duration::from_millis(self.persistence_base_delay_ms),
            Duration::from_millis(self.persistence_max_delay_ms),
        )
    }

    /// Backoff between offline-queue drain attempts; unbounded attempts.
    pub fn queue_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            u32::MAX,
            Duration::from_millis(self.queue_base_delay_ms),
            Duration::from_millis(self.queue_max_delay_ms),
        )
    }
}

fn out_of_range(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::OutOfRange {
        name,
        reason: reason.to_string(),
    }
}

fn override_from_env<T>(name: &str, slot: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Ok(raw) = env::var(name) else {
        return Ok(());
    };
    *slot = raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name: name.to_string(),
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = SyncConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.admission_wait(), Duration::from_secs(3));
        assert_eq!(cfg.dedup_window(), Duration::from_secs(600));
        assert_eq!(cfg.queue_retention(), chrono::Duration::days(7));
        assert_eq!(cfg.geo.max_jump_m, 500.0);
    }

    #[test]
    fn test_override_parses_and_rejects() {
        // Unique names so parallel tests do not race on the environment.
        env::set_var("ORDER_SYNC_TEST_OVERRIDE_OK", " 42 ");
        let mut slot = 1u64;
        override_from_env("ORDER_SYNC_TEST_OVERRIDE_OK", &mut slot).unwrap();
        assert_eq!(slot, 42);

        env::set_var("ORDER_SYNC_TEST_OVERRIDE_BAD", "soon");
        let err = override_from_env("ORDER_SYNC_TEST_OVERRIDE_BAD", &mut slot).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(slot, 42);

        let mut untouched = 7u32;
        override_from_env("ORDER_SYNC_TEST_OVERRIDE_MISSING", &mut untouched).unwrap();
        assert_eq!(untouched, 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = SyncConfig {
            code_length: 2,
            ..SyncConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange { name: "code_length", .. })
        ));

        let mut cfg = SyncConfig::default();
        cfg.geo.damping = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let cfg: SyncConfig =
            serde_json::from_str(r#"{ "admission_wait_ms": 250, "geo": { "max_speed_mps": 30.0 } }"#)
                .unwrap();
        assert_eq!(cfg.admission_wait_ms, 250);
        assert_eq!(cfg.geo.max_speed_mps, 30.0);
        assert_eq!(cfg.geo.max_jump_m, 500.0);
        assert_eq!(cfg.mailbox_size, 64);
    }
}
