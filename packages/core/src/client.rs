//! The fetch client.
//!
//! A [`Client`] owns an Ed25519 identity (generated, seed-derived, or lent by
//! the caller), a [`ConnPool`], and per-client defaults. Build one with
//! [`Client::builder`], share it across threads by reference or `Arc`, and
//! close it (or drop it) when done.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::address;
use crate::config::ClientConfig;
use crate::engine::{Engine, Exchange, Notification, NotifyFn, Settings};
use crate::error::{ClientError, Stage, TransportError};
use crate::identity::Keypair;
use crate::pool::ConnPool;
use crate::request::Request;
use crate::response::Response;
use crate::types::Method;

// ---------------------------------------------------------------------------
// Identity ownership
// ---------------------------------------------------------------------------

enum IdentitySource {
    Keypair(Arc<Keypair>),
    Seed(Zeroizing<[u8; 32]>),
    SeedHex(Zeroizing<String>),
}

enum Identity {
    /// Lent by the caller; never cleared by the client.
    Shared(Arc<Keypair>),
    /// Generated or derived by the client; cleared on teardown.
    Owned(Keypair),
}

impl Identity {
    fn keypair(&self) -> &Keypair {
        match self {
            Identity::Shared(kp) => kp,
            Identity::Owned(kp) => kp,
        }
    }
}

// ---------------------------------------------------------------------------
// ClientBuilder
// ---------------------------------------------------------------------------

/// Configures a [`Client`]. Options apply in the order they are called.
pub struct ClientBuilder {
    engine: Arc<dyn Engine>,
    identity: Option<IdentitySource>,
    timeout: Option<Duration>,
    settings: Option<Settings>,
    on_notify: Option<NotifyFn>,
    pool_size: Option<usize>,
}

impl ClientBuilder {
    fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            identity: None,
            timeout: None,
            settings: None,
            on_notify: None,
            pool_size: None,
        }
    }

    /// Use an existing keypair. The caller keeps ownership: closing the
    /// client does not clear it. Replaces any earlier [`seed`](Self::seed).
    pub fn keypair(mut self, keypair: Arc<Keypair>) -> Self {
        self.identity = Some(IdentitySource::Keypair(keypair));
        self
    }

    /// Derive the identity from a 32-byte seed. The client owns the derived
    /// keypair and clears it on close. Replaces any earlier
    /// [`keypair`](Self::keypair).
    pub fn seed(mut self, seed: [u8; 32]) -> Self {
        self.identity = Some(IdentitySource::Seed(Zeroizing::new(seed)));
        self
    }

    /// Default timeout for every request. Zero means no timeout (the engine
    /// default applies).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Protocol settings used when dialing new connections.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Called for every unsolicited server notification. May run on an
    /// engine thread, so it must not block.
    pub fn on_notify<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.on_notify = Some(Arc::new(callback));
        self
    }

    /// Reserved. Connections are multiplexed, so exactly one per server is
    /// kept regardless of this value.
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// Apply every field set in `config`, as if the matching builder methods
    /// were called at this point.
    pub fn config(mut self, config: ClientConfig) -> Self {
        if let Some(timeout) = config.timeout {
            self = self.timeout(timeout);
        }
        if let Some(seed_hex) = config.seed_hex {
            self.identity = Some(IdentitySource::SeedHex(seed_hex));
        }
        if let Some(settings) = config.settings {
            self = self.settings(settings);
        }
        if let Some(size) = config.pool_size {
            self = self.pool_size(size);
        }
        self
    }

    /// Build the client. Generates a random identity if none was configured.
    pub fn build(self) -> Result<Client, ClientError> {
        let identity = match self.identity {
            Some(IdentitySource::Keypair(kp)) => Identity::Shared(kp),
            Some(IdentitySource::Seed(seed)) => Identity::Owned(Keypair::from_seed(&seed)),
            Some(IdentitySource::SeedHex(hex_seed)) => {
                Identity::Owned(Keypair::from_seed_hex(&hex_seed)?)
            }
            None => Identity::Owned(Keypair::generate()?),
        };

        if let Some(size) = self.pool_size {
            debug!(size, "pool size hint ignored; one multiplexed connection per server");
        }

        info!(
            node_id = %identity.keypair().node_id(),
            engine = %self.engine.version(),
            "nwfetch client ready"
        );

        Ok(Client {
            pool: ConnPool::new(Arc::clone(&self.engine), self.settings, self.on_notify),
            engine: self.engine,
            identity,
            timeout: self.timeout,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A WEB/1 fetch client.
///
/// All methods take `&self` and are safe to call from many threads at once.
/// Requests to the same server share one pooled connection.
pub struct Client {
    engine: Arc<dyn Engine>,
    identity: Identity,
    pool: ConnPool,
    timeout: Option<Duration>,
}

impl Client {
    /// Start configuring a client that dials through `engine`.
    pub fn builder(engine: Arc<dyn Engine>) -> ClientBuilder {
        ClientBuilder::new(engine)
    }

    /// A client with a random identity and default settings.
    pub fn new(engine: Arc<dyn Engine>) -> Result<Self, ClientError> {
        Self::builder(engine).build()
    }

    /// Execute `request`.
    ///
    /// Transport failures come back as a [`TransportError`] whose stage says
    /// where it happened: `parse` (bad address), `connect` (dial or
    /// handshake) or `fetch` (the exchange itself, after which the connection
    /// is evicted so the next request redials). A server-side error status is
    /// *not* a transport failure; it arrives as an ordinary [`Response`].
    pub fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let Request {
            url,
            method,
            headers,
            body,
            timeout,
        } = request;

        let target = match address::resolve(&url) {
            Ok(target) => target,
            Err(e) => return Err(TransportError::new(Stage::Parse, url, e)),
        };
        let timeout = timeout.or(self.timeout);

        let (conn, key) = match self.pool.get(&target, self.identity.keypair(), timeout) {
            Ok(pooled) => pooled,
            Err(e) => return Err(TransportError::new(Stage::Connect, url, e)),
        };

        let exchange = Exchange {
            method,
            path: &target.path,
            body: body.as_deref(),
            headers: &headers,
            timeout,
        };
        match conn.fetch(&exchange) {
            Ok(reply) => Ok(Response::from(reply)),
            Err(e) => {
                warn!(server = %target.authority(), error = %e, "fetch failed; evicting connection");
                self.pool.remove_conn(&key, &conn);
                Err(TransportError::new(Stage::Fetch, url, e))
            }
        }
    }

    /// `read` `url` with no body.
    pub fn get(&self, url: &str) -> Result<Response, TransportError> {
        self.execute(Request::new(url))
    }

    /// `write` `body` to `url`.
    pub fn post(&self, url: &str, body: impl Into<Vec<u8>>) -> Result<Response, TransportError> {
        self.execute(Request::new(url).method(Method::Write).body(body))
    }

    /// The client identity.
    pub fn identity(&self) -> &Keypair {
        self.identity.keypair()
    }

    /// Whether the identity was generated or derived by this client (and so
    /// is cleared on close).
    pub fn owns_identity(&self) -> bool {
        matches!(self.identity, Identity::Owned(_))
    }

    /// The default request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The connection pool.
    pub fn pool(&self) -> &ConnPool {
        &self.pool
    }

    /// Version string of the underlying engine.
    pub fn engine_version(&self) -> String {
        self.engine.version()
    }

    /// Close every pooled connection and clear an owned identity.
    ///
    /// Dropping the client does the same; `close` just makes the point of
    /// teardown explicit.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.pool.close_all();
        if let Identity::Owned(kp) = &mut self.identity {
            kp.clear();
        }
        debug!("nwfetch client closed");
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("node_id", &self.identity.keypair().node_id())
            .field("owns_identity", &self.owns_identity())
            .field("timeout", &self.timeout)
            .field("connections", &self.pool.len())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
