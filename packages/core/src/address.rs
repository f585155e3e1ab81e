//! WEB/1 addressing: the `web://[host]:port/path` format.
//!
//! A WEB/1 address names *which server* (the bracketed host and port) and
//! *which resource* (the path). Hosts may themselves contain `:`, so the
//! canonical form always brackets them and always spells out the port.
//!
//! # Format
//!
//! ```text
//! web://[4Fq2kVz…]:6937/greet
//!       └────────┘ └──┘└────┘
//!          host    port path
//! ```
//!
//! [`normalize`] rewrites the shorthand forms users type into the canonical
//! form; [`Target::parse`] is the strict parser for that canonical form.
//! Only [`Target::key`] is used for pool lookups, so two spellings of the same
//! server always share one connection.

use std::fmt;

use thiserror::Error;

/// Scheme prefix of every WEB/1 address.
pub const SCHEME: &str = "web://";

/// Default WEB/1 port, used when an address omits one.
pub const DEFAULT_PORT: u16 = 6937;

/// Errors that can occur when parsing a canonical WEB/1 address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with 'web://': '{0}'")]
    MissingScheme(String),

    #[error("host must be enclosed in '[' and ']': '{0}'")]
    MissingBracket(String),

    #[error("unterminated '[' in address: '{0}'")]
    UnterminatedBracket(String),

    #[error("empty host in address: '{0}'")]
    EmptyHost(String),

    #[error("missing port after ']' in address: '{0}'")]
    MissingPort(String),

    #[error("invalid port '{port}' in address: '{address}'")]
    InvalidPort { address: String, port: String },

    #[error("path must start with '/': '{0}'")]
    MissingPath(String),
}

/// Rewrite a user-supplied address into canonical `web://[host]:port/path`
/// form.
///
/// | Input | Output |
/// |---|---|
/// | `web://[addr]:port/path` | unchanged |
/// | `web://addr:port/path` | `web://[addr]:port/path` |
/// | `web://[addr]/path` | `web://[addr]:6937/path` |
/// | `web://addr/path` | `web://[addr]:6937/path` |
/// | `web://addr` | `web://[addr]:6937/` |
///
/// The `web://` prefix may be omitted. Malformed input (an unterminated `[`,
/// junk after `]`, nothing after the scheme) comes back unchanged so that
/// [`Target::parse`] can say exactly what is wrong with it.
///
/// Normalizing a canonical address returns it unchanged.
pub fn normalize(raw: &str) -> String {
    let rest = raw.strip_prefix(SCHEME).unwrap_or(raw);
    if rest.is_empty() {
        return raw.to_string();
    }

    let (host, path) = if let Some(bracketed) = rest.strip_prefix('[') {
        let Some(end) = bracketed.find(']') else {
            return raw.to_string();
        };
        let addr = &bracketed[..end];
        let after = &bracketed[end + 1..];

        if after.is_empty() {
            (format!("[{addr}]:{DEFAULT_PORT}"), "/")
        } else if after.starts_with(':') {
            match after.find('/') {
                Some(slash) => (format!("[{addr}]{}", &after[..slash]), &after[slash..]),
                None => (format!("[{addr}]{after}"), "/"),
            }
        } else if after.starts_with('/') {
            (format!("[{addr}]:{DEFAULT_PORT}"), after)
        } else {
            return raw.to_string();
        }
    } else {
        let (host_part, path) = match rest.find('/') {
            Some(slash) => (&rest[..slash], &rest[slash..]),
            None => (rest, "/"),
        };
        match host_part.split_once(':') {
            Some((addr, port)) => (format!("[{addr}]:{port}"), path),
            None => (format!("[{host_part}]:{DEFAULT_PORT}"), path),
        }
    };

    format!("{SCHEME}{host}{path}")
}

/// Normalize `raw` and parse the result.
pub fn resolve(raw: &str) -> Result<Target, AddressError> {
    Target::parse(&normalize(raw))
}

/// A parsed, canonical WEB/1 address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    /// The server host as written between the brackets.
    pub host: String,
    /// The server port.
    pub port: u16,
    /// The resource path, always starting with `/`.
    pub path: String,
}

impl Target {
    /// Construct from pre-validated parts.
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// Parse a canonical `web://[host]:port/path` string.
    ///
    /// This parser is strict: run user input through [`normalize`] (or use
    /// [`resolve`]) first.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let rest = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| AddressError::MissingScheme(s.to_string()))?;
        let bracketed = rest
            .strip_prefix('[')
            .ok_or_else(|| AddressError::MissingBracket(s.to_string()))?;
        let end = bracketed
            .find(']')
            .ok_or_else(|| AddressError::UnterminatedBracket(s.to_string()))?;

        let host = &bracketed[..end];
        if host.trim().is_empty() {
            return Err(AddressError::EmptyHost(s.to_string()));
        }

        let after = bracketed[end + 1..]
            .strip_prefix(':')
            .ok_or_else(|| AddressError::MissingPort(s.to_string()))?;
        let (port, path) = match after.find('/') {
            Some(slash) => (&after[..slash], &after[slash..]),
            None => return Err(AddressError::MissingPath(s.to_string())),
        };

        let port = match port.parse::<u16>() {
            Ok(p) if p != 0 => p,
            _ => {
                return Err(AddressError::InvalidPort {
                    address: s.to_string(),
                    port: port.to_string(),
                })
            }
        };

        Ok(Self::new(host, port, path))
    }

    /// `[host]:port`, the server part of the address without scheme or path.
    pub fn authority(&self) -> String {
        format!("[{}]:{}", self.host, self.port)
    }

    /// The pool key for this target's server.
    ///
    /// Depends only on host and port, so every path on one server shares a
    /// key.
    pub fn key(&self) -> PoolKey {
        PoolKey(bs58::encode(self.authority().as_bytes()).into_string())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}{}", self.authority(), self.path)
    }
}

/// Opaque connection-pool key: base58 of a target's `[host]:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey(String);

impl PoolKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
