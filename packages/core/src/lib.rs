//! Synchronous fetch client for WEB/1 over NWEP.
//!
//! This crate turns `web://` addresses into WEB/1 requests, keeps one
//! multiplexed, authenticated connection per server, and gives back typed
//! responses with a clean split between transport failures and server-side
//! error statuses. The wire protocol itself lives behind the [`Engine`]
//! trait; [`MemoryEngine`] is the in-process implementation used for tests
//! and loopback serving.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`address`] | `web://` normalisation and parsing into a [`Target`] |
//! | [`identity`] | Ed25519 client identity ([`Keypair`]) |
//! | [`engine`] | The [`Engine`] / [`Connection`] seam and [`MemoryEngine`] |
//! | [`pool`] | One pooled [`Connection`] per server ([`ConnPool`]) |
//! | [`client`] | [`Client`] and [`ClientBuilder`] |
//! | [`request`] / [`response`] | [`Request`] builder and [`Response`] |
//! | [`error`] | [`TransportError`], [`StatusError`] and the `is_*` predicates |
//! | [`config`] | [`ClientConfig`] read from `NWFETCH_*` variables |
//! | [`types`] | [`Method`], [`Status`], [`Header`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nwfetch::{Client, Method, Request};
//!
//! let client = Client::builder(engine)
//!     .timeout(std::time::Duration::from_secs(5))
//!     .build()?;
//!
//! let resp = client.get("web://node1/greet")?;
//! if let Some(err) = resp.status_error() {
//!     if nwfetch::is_not_found(&err) { /* ... */ }
//! }
//!
//! let resp = Request::new("web://node1/items")
//!     .method(Method::Write)
//!     .json(&item)?
//!     .send_with(&client)?;
//! ```
//!
//! For scripts, [`init`] installs a process-wide default client that
//! [`get`], [`post`] and [`Request::send`] use.

pub mod address;
pub mod client;
pub mod config;
mod default;
pub mod engine;
pub mod error;
pub mod identity;
pub mod pool;
pub mod request;
pub mod response;
pub mod types;

pub use address::{normalize, resolve, AddressError, PoolKey, Target, DEFAULT_PORT, SCHEME};
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ConfigError};
pub use default::{client as default_client, get, init, init_with, post, shutdown};
pub use engine::memory::{MemoryEngine, MemoryEngineError};
pub use engine::{Connection, Engine, Notification, NotifyFn, Reply, Settings};
pub use error::{
    has_status, is_bad_request, is_conflict, is_forbidden, is_internal_error, is_not_found,
    is_rate_limited, is_unauthorized, is_unavailable, BoxError, ClientError, Error, Stage,
    StatusError, TransportError,
};
pub use identity::{IdentityError, Keypair};
pub use pool::ConnPool;
pub use request::Request;
pub use response::Response;
pub use types::{Header, Method, Status};
