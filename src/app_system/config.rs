//! Driver settings, resolved once at startup from the environment.
//!
//! | Variable                | Default      |
//! |-------------------------|--------------|
//! | `ORDER_WORKERS`         | `9`          |
//! | `ORDER_CONCURRENCY`     | `4`          |
//! | `ORDER_ID_SCHEME`       | `sequential` |
//! | `ORDER_SHUFFLE_BASKETS` | `false`      |
//!
//! Unset or blank variables take the default. `ORDER_WORKERS` is capped at
//! [`MAX_ORDERS`]. Log verbosity is controlled
//! separately through `RUST_LOG`.

use std::sync::Arc;

use crate::domain::{ClockRandomIds, IdAllocator, SequentialIds};
use crate::error::ConfigError;

pub const ENV_WORKERS: &str = "ORDER_WORKERS";
pub const ENV_CONCURRENCY: &str = "ORDER_CONCURRENCY";
pub const ENV_ID_SCHEME: &str = "ORDER_ID_SCHEME";
pub const ENV_SHUFFLE_BASKETS: &str = "ORDER_SHUFFLE_BASKETS";

pub const MAX_ORDERS: usize = 100_000;

/// How orders without a pre-seeded id get one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdScheme {
    #[default]
    Sequential,
    Clock,
}

impl IdScheme {
    /// Allocator for this scheme. Sequential ids start at `first`, so the
    /// caller can keep a low range free for pre-seeded orders.
    pub fn allocator(self, first: u64) -> Arc<dyn IdAllocator> {
        match self {
            IdScheme::Sequential => Arc::new(SequentialIds::starting_at(first)),
            IdScheme::Clock => Arc::new(ClockRandomIds),
        }
    }
}

impl std::str::FromStr for IdScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(IdScheme::Sequential),
            "clock" => Ok(IdScheme::Clock),
            other => Err(ConfigError::InvalidIdScheme(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Demo iterations; each one produces two work items.
    pub orders: usize,
    pub concurrency: usize,
    pub id_scheme: IdScheme,
    pub shuffle_baskets: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            orders: 9,
            concurrency: 4,
            id_scheme: IdScheme::Sequential,
            shuffle_baskets: false,
        }
    }
}

impl DriverConfig {
    /// Allocator for the demo batch. Ids `1..=orders` belong to the pre-seeded
    /// orders, so sequential allocation starts right after them.
    pub fn allocator(&self) -> Arc<dyn IdAllocator> {
        self.id_scheme.allocator(self.orders as u64 + 1)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any name → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let orders = match read(ENV_WORKERS) {
            Some(v) => parse_number(ENV_WORKERS, &v)?,
            None => defaults.orders,
        };
        if orders > MAX_ORDERS {
            return Err(ConfigError::OutOfRange {
                var: ENV_WORKERS,
                value: orders,
                max: MAX_ORDERS,
            });
        }

        let concurrency = match read(ENV_CONCURRENCY) {
            Some(v) => parse_number(ENV_CONCURRENCY, &v)?,
            None => defaults.concurrency,
        };
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let id_scheme = match read(ENV_ID_SCHEME) {
            Some(v) => v.parse()?,
            None => defaults.id_scheme,
        };

        let shuffle_baskets = match read(ENV_SHUFFLE_BASKETS) {
            Some(v) => parse_flag(ENV_SHUFFLE_BASKETS, &v)?,
            None => defaults.shuffle_baskets,
        };

        Ok(Self {
            orders,
            concurrency,
            id_scheme,
            shuffle_baskets,
        })
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}
