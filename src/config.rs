//! Configuration for retries, caching and timeouts
//!
//! All types deserialize from TOML with human-readable durations
//! (`"250ms"`, `"2s"`) and fill unspecified fields from defaults.
//!
//! ```toml
//! timeout = "5s"
//!
//! [retry]
//! attempts = 4
//! initial_delay = "10ms"
//! backoff = "quadratic"
//!
//! [cache]
//! limit = 50
//! ```

use crate::error::ConfigError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Retry configuration with backoff strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Backoff strategy
    #[serde(default)]
    pub backoff: BackoffStrategy,

    /// Base delay the strategy scales from
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Upper bound on any single delay
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Add jitter to delays
    #[serde(default)]
    pub jitter: bool,

    /// Jitter factor (0.0 to 1.0)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff: BackoffStrategy::default(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            jitter: false,
            jitter_factor: default_jitter_factor(),
        }
    }
}

/// Backoff strategies for retry delays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Linear increase in delay
    Linear {
        #[serde(with = "humantime_serde")]
        increment: Duration,
    },
    /// Exponential increase in delay
    Exponential {
        #[serde(default = "default_exponential_base")]
        base: f64,
    },
    /// Initial delay times the square of the retry number
    Quadratic,
    /// Fibonacci sequence delays
    Fibonacci,
    /// Custom delay sequence
    Custom {
        #[serde(with = "humantime_list")]
        delays: Vec<Duration>,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential {
            base: default_exponential_base(),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidJitterFactor(self.jitter_factor));
        }
        match &self.backoff {
            BackoffStrategy::Exponential { base } if *base < 1.0 || base.is_nan() => {
                Err(ConfigError::InvalidExponentialBase(*base))
            }
            BackoffStrategy::Custom { delays } if delays.is_empty() => {
                Err(ConfigError::EmptyCustomDelays)
            }
            _ => Ok(()),
        }
    }

    /// Delay before the given retry (1-based), clamped to `max_delay`
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let base_delay = match &self.backoff {
            BackoffStrategy::Fixed => Some(self.initial_delay),
            BackoffStrategy::Linear { increment } => increment
                .checked_mul(retry - 1)
                .and_then(|extra| self.initial_delay.checked_add(extra)),
            BackoffStrategy::Exponential { base } => {
                let exponent = (retry - 1).min(i32::MAX as u32) as i32;
                let multiplier = base.powi(exponent);
                Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * multiplier).ok()
            }
            BackoffStrategy::Quadratic => self.initial_delay.checked_mul(retry.saturating_mul(retry)),
            BackoffStrategy::Fibonacci => self.initial_delay.checked_mul(fibonacci(retry)),
            BackoffStrategy::Custom { delays } => delays.get(retry as usize - 1).copied(),
        };

        base_delay.unwrap_or(self.max_delay).min(self.max_delay)
    }

    /// Apply jitter to delay
    pub fn apply_jitter(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }

        let jitter_range = delay.as_secs_f64() * self.jitter_factor;
        if !jitter_range.is_finite() || jitter_range <= 0.0 {
            return delay;
        }
        let mut rng = rand::rng();
        let jitter = rng.random_range(-jitter_range / 2.0..=jitter_range / 2.0);
        Duration::try_from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
            .unwrap_or(self.max_delay)
    }

    /// Delay before the 0-based attempt `attempt`; the first attempt never waits
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let retry = u32::try_from(attempt).unwrap_or(u32::MAX);
        self.apply_jitter(self.calculate_delay(retry))
    }
}

/// Cache sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of most recent inserts to retain
    #[serde(default = "default_cache_limit")]
    pub limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            limit: default_cache_limit(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::ZeroCacheLimit);
        }
        Ok(())
    }
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Optional timeout applied by callers around whole operations
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl JobConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: JobConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        self.cache.validate()
    }
}

fn fibonacci(n: u32) -> u32 {
    let (mut current, mut next) = (1u32, 1u32);
    for _ in 1..n {
        if current == u32::MAX {
            break;
        }
        let sum = current.saturating_add(next);
        current = next;
        next = sum;
    }
    current
}

fn default_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_jitter_factor() -> f64 {
    0.3
}

fn default_exponential_base() -> f64 {
    2.0
}

fn default_cache_limit() -> usize {
    100
}

/// `humantime_serde` for a list of durations
mod humantime_list {
    use humantime_serde::Serde;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(delays: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(delays.iter().map(Serde::from))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let delays: Vec<Serde<Duration>> = Vec::deserialize(deserializer)?;
        Ok(delays.into_iter().map(Serde::into_inner).collect())
    }
}
