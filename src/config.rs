//! Runtime configuration read from the environment.

use crate::clock::{Clock, FixedClock, SystemClock};
use chrono::NaiveDate;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const HTTP_ADDR_VAR: &str = "PROCUREMENT_TRACKER_HTTP_ADDR";
pub const DATA_PATH_VAR: &str = "PROCUREMENT_TRACKER_DATA";
pub const TODAY_VAR: &str = "PROCUREMENT_TRACKER_TODAY";

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidAddr { var: &'static str, value: String },
    #[error("{var} is not a YYYY-MM-DD date: {value}")]
    InvalidDate { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub http_addr: SocketAddr,
    /// JSON snapshot to load at startup.
    pub data_path: Option<PathBuf>,
    /// Pins "today" for every computation when set.
    pub fixed_today: Option<NaiveDate>,
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr_value = lookup(HTTP_ADDR_VAR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = addr_value
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidAddr {
                var: HTTP_ADDR_VAR,
                value: addr_value.clone(),
            })?;

        let data_path = lookup(DATA_PATH_VAR)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let fixed_today = match lookup(TODAY_VAR).filter(|value| !value.trim().is_empty()) {
            Some(value) => Some(
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                    .map_err(|_| ConfigError::InvalidDate { var: TODAY_VAR, value })?,
            ),
            None => None,
        };

        Ok(Self {
            http_addr,
            data_path,
            fixed_today,
        })
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.fixed_today {
            Some(date) => Arc::new(FixedClock(date)),
            None => Arc::new(SystemClock),
        }
    }
}

/// Installs the global `tracing` subscriber, honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
