//! In-memory engine implementation.
//!
//! Servers are plain closures registered per `host:port` and live only in
//! this process. Use this for tests, loopback serving and examples.
//!
//! Beyond serving, the engine records how many dials it has seen and lets a
//! test take a server away ([`MemoryEngine::stop`]) so that connections to it
//! start failing, which is how pool eviction gets exercised.
//!
//! Every dial runs a loopback handshake: the client signs a transcript naming
//! the server and dial number, and the engine verifies it against the
//! client's public key before handing out a connection. Connections honour
//! [`Settings::max_message_size`] and [`Settings::idle_timeout`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

use ed25519_dalek::{Signature, Verifier};
use thiserror::Error;

use super::{Connection, Dial, Engine, Exchange, Notification, NotifyFn, Reply, Settings};
use crate::error::BoxError;

/// Handles one exchange. `node_id` is the authenticated client.
pub type Handler = Arc<dyn Fn(&Exchange<'_>, &str) -> Reply + Send + Sync>;

/// Failures produced by [`MemoryEngine`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryEngineError {
    #[error("no server listening at {0}")]
    Unreachable(String),

    #[error("connection reset by {0}")]
    Reset(String),

    #[error("connection closed")]
    Closed,

    #[error("message of {size} bytes exceeds limit of {limit}")]
    MessageTooLarge { size: u64, limit: u64 },

    #[error("handshake with {server} failed: {reason}")]
    Handshake { server: String, reason: String },

    #[error("connection idle for longer than {0:?}")]
    IdleTimeout(Duration),
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Shared {
    servers: RwLock<HashMap<String, Handler>>,
    connections: RwLock<Vec<Weak<MemoryConnection>>>,
    dials: AtomicUsize,
}

fn server_key(host: &str, port: u16) -> String {
    format!("[{host}]:{port}")
}

// ---------------------------------------------------------------------------
// MemoryEngine
// ---------------------------------------------------------------------------

/// Thread-safe, in-process implementation of [`Engine`].
#[derive(Clone)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                servers: RwLock::new(HashMap::new()),
                connections: RwLock::new(Vec::new()),
                dials: AtomicUsize::new(0),
            }),
        }
    }

    /// Start serving `host:port` with `handler`, replacing any previous
    /// handler for that address.
    pub fn serve<F>(&self, host: &str, port: u16, handler: F)
    where
        F: Fn(&Exchange<'_>, &str) -> Reply + Send + Sync + 'static,
    {
        self.shared
            .servers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(server_key(host, port), Arc::new(handler));
    }

    /// Stop serving `host:port`. Open connections to it fail their next
    /// fetch with [`MemoryEngineError::Reset`]; new dials are refused.
    pub fn stop(&self, host: &str, port: u16) {
        self.shared
            .servers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&server_key(host, port));
    }

    /// Successful and failed dials since the engine was created.
    pub fn dial_count(&self) -> usize {
        self.shared.dials.load(Ordering::SeqCst)
    }

    /// Connections that have been opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.shared
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|c| !c.closed.load(Ordering::SeqCst))
            .count()
    }

    /// Push `notification` to every open connection to `host:port` that
    /// registered a callback. Returns the number of callbacks invoked.
    pub fn notify(&self, host: &str, port: u16, notification: &Notification) -> usize {
        let key = server_key(host, port);
        let live: Vec<Arc<MemoryConnection>> = self
            .shared
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|c| c.server == key && !c.closed.load(Ordering::SeqCst))
            .collect();

        let mut delivered = 0;
        for conn in live {
            if let Some(callback) = &conn.on_notify {
                callback(notification);
                delivered += 1;
            }
        }
        delivered
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MemoryEngine {
    fn connect(&self, dial: &Dial<'_>) -> Result<Arc<dyn Connection>, BoxError> {
        let dial_no = self.shared.dials.fetch_add(1, Ordering::SeqCst);

        let key = server_key(&dial.target.host, dial.target.port);
        if !self
            .shared
            .servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
        {
            return Err(MemoryEngineError::Unreachable(key).into());
        }

        handshake(&key, dial_no, dial)?;

        let settings: Settings = dial.settings.cloned().unwrap_or_default();
        let conn = Arc::new(MemoryConnection {
            shared: Arc::clone(&self.shared),
            server: key,
            client_id: dial.identity.node_id(),
            max_message_size: settings.max_message_size,
            idle_timeout: settings.idle_timeout,
            last_used: Mutex::new(Instant::now()),
            on_notify: dial.on_notify.cloned(),
            closed: AtomicBool::new(false),
        });

        let mut connections = self
            .shared
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        connections.retain(|w| w.strong_count() > 0);
        connections.push(Arc::downgrade(&conn));

        Ok(conn)
    }

    fn version(&self) -> String {
        format!("memory/{}", env!("CARGO_PKG_VERSION"))
    }
}

/// Client proves possession of its secret key by signing a transcript bound to
/// this server and dial.
fn handshake(server: &str, dial_no: usize, dial: &Dial<'_>) -> Result<(), MemoryEngineError> {
    let failed = |reason: String| MemoryEngineError::Handshake {
        server: server.to_string(),
        reason,
    };
    if dial.identity.is_cleared() {
        return Err(failed("client identity has been cleared".into()));
    }

    let transcript = format!("nwep-handshake {server} {dial_no}");
    let signature = Signature::from_bytes(&dial.identity.sign(transcript.as_bytes()));
    dial.identity
        .public_key()
        .verify(transcript.as_bytes(), &signature)
        .map_err(|e| failed(e.to_string()))
}

// ---------------------------------------------------------------------------
// MemoryConnection
// ---------------------------------------------------------------------------

struct MemoryConnection {
    shared: Arc<Shared>,
    server: String,
    client_id: String,
    max_message_size: Option<u64>,
    idle_timeout: Option<Duration>,
    last_used: Mutex<Instant>,
    on_notify: Option<NotifyFn>,
    closed: AtomicBool,
}

impl Connection for MemoryConnection {
    fn fetch(&self, exchange: &Exchange<'_>) -> Result<Reply, BoxError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MemoryEngineError::Closed.into());
        }

        {
            let mut last_used = self.last_used.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(limit) = self.idle_timeout {
                if last_used.elapsed() > limit {
                    self.closed.store(true, Ordering::SeqCst);
                    return Err(MemoryEngineError::IdleTimeout(limit).into());
                }
            }
            *last_used = Instant::now();
        }

        if let (Some(limit), Some(body)) = (self.max_message_size, exchange.body) {
            let size = body.len() as u64;
            if size > limit {
                return Err(MemoryEngineError::MessageTooLarge { size, limit }.into());
            }
        }

        let handler = self
            .shared
            .servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.server)
            .cloned()
            .ok_or_else(|| MemoryEngineError::Reset(self.server.clone()))?;

        Ok(handler(exchange, &self.client_id))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
