//! Client configuration, populated from environment variables.

use std::time::Duration;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::engine::Settings;

/// Errors reading a [`ClientConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Environment-driven defaults for a [`Client`](crate::Client).
///
/// Every field is optional, so a client can be built with zero
/// configuration. Apply with [`ClientBuilder::config`](crate::ClientBuilder::config).
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `NWFETCH_TIMEOUT_SECS` | (absent = engine default) | Default request timeout; `0` also means engine default |
/// | `NWFETCH_SEED` | (absent = random identity) | 64 hex chars; derive a stable identity from this seed |
/// | `NWFETCH_MAX_STREAMS` | (absent) | Max concurrent streams per connection |
/// | `NWFETCH_MAX_MESSAGE_SIZE` | (absent) | Max message size in bytes |
/// | `NWFETCH_IDLE_TIMEOUT_SECS` | (absent) | Close pooled connections idle for longer than this |
/// | `NWFETCH_POOL_SIZE` | (absent) | Reserved; one connection per server is always used |
#[derive(Clone, Default)]
pub struct ClientConfig {
    pub timeout: Option<Duration>,
    /// Hex-encoded identity seed. Zeroized on drop.
    pub seed_hex: Option<Zeroizing<String>>,
    pub settings: Option<Settings>,
    pub pool_size: Option<usize>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("timeout", &self.timeout)
            .field("seed_hex", &self.seed_hex.as_ref().map(|_| "<redacted>"))
            .field("settings", &self.settings)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

impl ClientConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout = parse_var::<u64, _>(&lookup, "NWFETCH_TIMEOUT_SECS", "an integer number of seconds")?
            .map(Duration::from_secs)
            .filter(|d| !d.is_zero());

        let seed_hex = match lookup("NWFETCH_SEED") {
            Some(value) => {
                let value = Zeroizing::new(value);
                let trimmed = value.trim();
                if trimmed.len() != 64 || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(ConfigError::Invalid {
                        var: "NWFETCH_SEED",
                        expected: "64 hex characters",
                        value: "<redacted>".into(),
                    });
                }
                Some(value)
            }
            None => None,
        };

        let max_streams = parse_var::<u32, _>(&lookup, "NWFETCH_MAX_STREAMS", "a positive integer")?;
        let max_message_size =
            parse_var::<u64, _>(&lookup, "NWFETCH_MAX_MESSAGE_SIZE", "an integer number of bytes")?;
        let idle_timeout =
            parse_var::<u64, _>(&lookup, "NWFETCH_IDLE_TIMEOUT_SECS", "an integer number of seconds")?
                .map(Duration::from_secs)
                .filter(|d| !d.is_zero());
        let settings = (max_streams.is_some() || max_message_size.is_some() || idle_timeout.is_some())
            .then_some(Settings {
                max_streams,
                max_message_size,
                idle_timeout,
            });

        let pool_size = parse_var::<usize, _>(&lookup, "NWFETCH_POOL_SIZE", "a positive integer")?;

        Ok(Self {
            timeout,
            seed_hex,
            settings,
            pool_size,
        })
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var,
                expected,
                value,
            }),
        None => Ok(None),
    }
}
