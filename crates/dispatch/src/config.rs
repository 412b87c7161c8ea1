use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

pub const BASE_RATE: &str = "DISPATCH_BASE_RATE";
pub const PER_KM_RATE: &str = "DISPATCH_PER_KM_RATE";
pub const WITH_ESTIMATE: &str = "DISPATCH_WITH_ESTIMATE";
pub const ROUTING_TIMEOUT_MS: &str = "DISPATCH_ROUTING_TIMEOUT_MS";
pub const LOCK_TIMEOUT_MS: &str = "DISPATCH_LOCK_TIMEOUT_MS";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} has invalid value `{value}`")]
    Invalid { name: &'static str, value: String },

    #[error("{0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pricing {
    pub base_rate: f64,
    pub per_km_rate: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            base_rate: 5.0,
            per_km_rate: 2.0,
        }
    }
}

impl Pricing {
    /// `base_rate + per_km_rate * distance_km`, rounded to cents.
    pub fn price(&self, distance_km: f64) -> f64 {
        let price = self.base_rate + self.per_km_rate * distance_km;
        (price * 100.0).round() / 100.0
    }
}

/// Process wide settings. Built once at startup, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub pricing: Pricing,
    /// If set, intake asks the routing service for an estimate and fails when
    /// none is available. If unset, requests are stored without an estimate.
    pub with_estimate: bool,
    pub routing_timeout: Duration,
    pub lock_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pricing: Pricing::default(),
            with_estimate: true,
            routing_timeout: Duration::from_millis(5000),
            lock_timeout: Duration::from_millis(3000),
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads every setting through `lookup`, falling back to the defaults for
    /// unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            pricing: Pricing {
                base_rate: parse(&lookup, BASE_RATE)?
                    .unwrap_or(defaults.pricing.base_rate),
                per_km_rate: parse(&lookup, PER_KM_RATE)?
                    .unwrap_or(defaults.pricing.per_km_rate),
            },
            with_estimate: parse(&lookup, WITH_ESTIMATE)?
                .unwrap_or(defaults.with_estimate),
            routing_timeout: parse(&lookup, ROUTING_TIMEOUT_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.routing_timeout),
            lock_timeout: parse(&lookup, LOCK_TIMEOUT_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = [
            (BASE_RATE, self.pricing.base_rate),
            (PER_KM_RATE, self.pricing.per_km_rate),
        ];
        for (name, rate) in rates {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ConfigError::OutOfRange(format!(
                    "{name} must be a non-negative number, got {rate}"
                )));
            }
        }
        let timeouts = [
            (ROUTING_TIMEOUT_MS, self.routing_timeout),
            (LOCK_TIMEOUT_MS, self.lock_timeout),
        ];
        for (name, timeout) in timeouts {
            if timeout.is_zero() {
                return Err(ConfigError::OutOfRange(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }

    pub fn log(&self) {
        log::info!(
            "pricing: base rate {}, per km rate {}",
            self.pricing.base_rate,
            self.pricing.per_km_rate
        );
        log::info!("estimates on intake: {}", self.with_estimate);
        log::info!(
            "timeouts: routing {:?}, row locks {:?}",
            self.routing_timeout,
            self.lock_timeout
        );
    }
}

fn parse<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
