//! # Runtime Configuration
//!
//! Queue configuration plus runtime switches, with overrides read from the
//! environment.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `HB_TICK_INTERVAL_SECS` | Simulator period in seconds (> 0) |
//! | `HB_REMOVAL_DELAY_MS` | Delay before completed patients leave |
//! | `HB_RNG_SEED` | Seed for reproducible simulations |
//! | `HB_SEED_DEMO` | `true`/`false`: seed the demo clinic day |

use hb_queue::QueueConfig;
use std::str::FromStr;
use thiserror::Error;

pub const TICK_INTERVAL_VAR: &str = "HB_TICK_INTERVAL_SECS";
pub const REMOVAL_DELAY_VAR: &str = "HB_REMOVAL_DELAY_MS";
pub const RNG_SEED_VAR: &str = "HB_RNG_SEED";
pub const SEED_DEMO_VAR: &str = "HB_SEED_DEMO";

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Queue behaviour and timings.
    pub queue: QueueConfig,
    /// Fixed seed for the simulator; entropy when `None`.
    pub rng_seed: Option<u64>,
    /// Seed the four-patient demo queue at startup.
    pub seed_demo: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            rng_seed: None,
            seed_demo: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl RuntimeConfig {
    /// Loads defaults and applies environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads defaults and applies overrides from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, TICK_INTERVAL_VAR)? {
            if secs == 0 {
                return Err(invalid(TICK_INTERVAL_VAR, "0", "must be at least 1"));
            }
            config.queue.tick_interval_ms = secs.saturating_mul(1_000);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, REMOVAL_DELAY_VAR)? {
            config.queue.removal_delay_ms = ms;
        }
        config.rng_seed = parse_var::<u64>(&lookup, RNG_SEED_VAR)?;
        if let Some(raw) = lookup(SEED_DEMO_VAR) {
            config.seed_demo = parse_flag(&raw)
                .ok_or_else(|| invalid(SEED_DEMO_VAR, &raw, "expected true or false"))?;
        }

        Ok(config)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| invalid(var, &raw, &e.to_string()))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
