//! Environment configuration for the player and the banker.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TM_HOST` | `127.0.0.1` | Banker address (player) or bind host (banker) |
//! | `TM_PORT` | `3131` | Primary port; notifications use the next port up |
//! | `TM_READ_TIMEOUT_MS` | unset | Player read timeout; unset blocks forever |
//! | `TM_CONNECT_TIMEOUT_MS` | `3000` | Connect timeout for channels and notifications |
//! | `TM_NOTIFY_TAG` | `NOTF:` | Tag the banker puts on notifications |
//! | `TM_MAX_PLAYERS` | `4` | Banker seat limit |
//! | `TM_THEME` | `standard` | Player colour theme |
//! | `TM_LOG_PATH` | unset | Log file; the banker logs to stderr without one |

use std::env;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::NetError;
use crate::notify::DEFAULT_TAG;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3131;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_MAX_PLAYERS: usize = 4;

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    non_empty(value).and_then(|s| s.parse().ok())
}

fn millis(value: Option<String>) -> Option<Duration> {
    parsed::<u64>(value)
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, NetError> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        NetError::Io(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("{host}:{port} did not resolve"),
        ))
    })
}

/// Player side configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub read_timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub theme: String,
    pub log_path: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            theme: "standard".to_string(),
            log_path: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: non_empty(lookup("TM_HOST")).unwrap_or(defaults.host),
            port: parsed(lookup("TM_PORT")).unwrap_or(defaults.port),
            read_timeout: millis(lookup("TM_READ_TIMEOUT_MS")),
            connect_timeout: millis(lookup("TM_CONNECT_TIMEOUT_MS"))
                .unwrap_or(defaults.connect_timeout),
            theme: non_empty(lookup("TM_THEME")).unwrap_or(defaults.theme),
            log_path: non_empty(lookup("TM_LOG_PATH")),
        }
    }

    /// Address of the banker's primary port.
    pub fn socket_addr(&self) -> Result<SocketAddr, NetError> {
        resolve(&self.host, self.port)
    }
}

/// Banker side configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankerConfig {
    pub host: String,
    pub port: u16,
    pub max_players: usize,
    pub notify_tag: String,
    pub connect_timeout: Duration,
    pub log_path: Option<String>,
}

impl Default for BankerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_players: DEFAULT_MAX_PLAYERS,
            notify_tag: DEFAULT_TAG.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            log_path: None,
        }
    }
}

impl BankerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: non_empty(lookup("TM_HOST")).unwrap_or(defaults.host),
            port: parsed(lookup("TM_PORT")).unwrap_or(defaults.port),
            max_players: parsed::<usize>(lookup("TM_MAX_PLAYERS"))
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_players),
            notify_tag: non_empty(lookup("TM_NOTIFY_TAG")).unwrap_or(defaults.notify_tag),
            connect_timeout: millis(lookup("TM_CONNECT_TIMEOUT_MS"))
                .unwrap_or(defaults.connect_timeout),
            log_path: non_empty(lookup("TM_LOG_PATH")),
        }
    }

    /// Bind address for the primary listener.
    pub fn socket_addr(&self) -> Result<SocketAddr, NetError> {
        resolve(&self.host, self.port)
    }
}
