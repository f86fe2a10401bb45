//! Server configuration parsed from environment variables.
//!
//! Missing or unparsable values fall back to defaults; nothing here fails
//! startup. `.env` files are loaded by `main` before this runs.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::services::drawing::{DEFAULT_MAX_OPERATIONS, DEFAULT_MAX_STROKES, LogLimits};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    /// Directory served as a fallback for unmatched routes, if set.
    pub static_dir: Option<PathBuf>,
    /// Per-connection outbound queue depth. A full queue drops broadcasts.
    pub client_queue_capacity: usize,
    pub log_limits: LogLimits,
}

impl Config {
    /// Read every knob from the environment.
    ///
    /// - `PORT` (3000), `BIND_ADDR` (0.0.0.0)
    /// - `STATIC_DIR` (unset)
    /// - `CLIENT_QUEUE_CAPACITY` (256, at least 1)
    /// - `MAX_OPERATIONS` (1000), `MAX_STROKES` (100)
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            bind_addr: env_parse("BIND_ADDR", DEFAULT_BIND_ADDR),
            static_dir: std::env::var("STATIC_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            client_queue_capacity: env_parse("CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY).max(1),
            log_limits: LogLimits {
                max_operations: env_parse("MAX_OPERATIONS", DEFAULT_MAX_OPERATIONS).max(1),
                max_strokes: env_parse("MAX_STROKES", DEFAULT_MAX_STROKES).max(1),
            },
        }
    }

    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: DEFAULT_BIND_ADDR,
            static_dir: None,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
            log_limits: LogLimits::default(),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
