//! Engine abstraction layer.
//!
//! The [`Engine`] trait is the contract between this crate and the protocol
//! engine that does the real work: transport, handshake, stream
//! multiplexing and WEB/1 framing. This crate owns connection lifecycle,
//! pooling and error semantics; the engine owns the wire.
//!
//! The contract is deliberately narrow:
//!
//! 1. [`Engine::connect`] dials a [`Target`] and authenticates with the
//!    client [`Keypair`], returning a shared [`Connection`].
//! 2. [`Connection::fetch`] performs one [`Exchange`] and returns a
//!    [`Reply`], or fails.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryEngine`] | Tests, loopback serving, examples |
//! | *native binding* | Production; wraps the NWEP library |
//!
//! [`MemoryEngine`]: memory::MemoryEngine

pub mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::address::Target;
use crate::error::BoxError;
use crate::identity::Keypair;
use crate::types::{Header, Method};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Protocol limits applied to new connections. `None` leaves the engine's
/// own default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Maximum concurrent streams per connection.
    pub max_streams: Option<u32>,
    /// Maximum size of a single message body, in bytes.
    pub max_message_size: Option<u64>,
    /// Close the connection after this much inactivity.
    pub idle_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// An unsolicited server-to-client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Server-defined event name.
    pub event: String,
    /// The resource the notification concerns.
    pub path: String,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

/// Callback for [`Notification`]s. Engines may invoke it on their own
/// background thread; it must not block.
pub type NotifyFn = Arc<dyn Fn(&Notification) + Send + Sync>;

// ---------------------------------------------------------------------------
// Dial / Exchange / Reply
// ---------------------------------------------------------------------------

/// Everything an engine needs to open one connection.
pub struct Dial<'a> {
    pub target: &'a Target,
    pub identity: &'a Keypair,
    pub settings: Option<&'a Settings>,
    pub on_notify: Option<&'a NotifyFn>,
    /// Upper bound on connect + handshake. `None` means the engine default.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for Dial<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dial")
            .field("target", self.target)
            .field("identity", &self.identity.node_id())
            .field("settings", &self.settings)
            .field("on_notify", &self.on_notify.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// One request on an established connection.
#[derive(Debug, Clone, Copy)]
pub struct Exchange<'a> {
    pub method: Method,
    pub path: &'a str,
    pub body: Option<&'a [u8]>,
    pub headers: &'a [Header],
    /// Upper bound on the exchange. `None` means the engine default.
    pub timeout: Option<Duration>,
}

/// The raw result of one exchange, as produced by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub status: String,
    pub status_details: Option<String>,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Reply {
    /// A reply with the given status and an empty body.
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }

    pub fn status_details(mut self, details: impl Into<String>) -> Self {
        self.status_details = Some(details.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Engine / Connection traits
// ---------------------------------------------------------------------------

/// A protocol engine capable of dialing WEB/1 servers.
///
/// Implementations must be `Send + Sync + 'static` so they can be held in an
/// `Arc<dyn Engine>` and shared by every client thread.
pub trait Engine: Send + Sync + 'static {
    /// Open and authenticate a connection to `dial.target`.
    fn connect(&self, dial: &Dial<'_>) -> Result<Arc<dyn Connection>, BoxError>;

    /// Engine name and version, for diagnostics.
    fn version(&self) -> String;
}

/// A live, multiplexed connection to one server.
///
/// `fetch` is called concurrently by every request to that server.
pub trait Connection: Send + Sync {
    /// Perform one exchange. Blocks until the reply arrives or the exchange
    /// fails.
    fn fetch(&self, exchange: &Exchange<'_>) -> Result<Reply, BoxError>;

    /// Close the connection. Later `fetch` calls fail. Idempotent.
    fn close(&self);
}
