//! Process-wide default client.
//!
//! [`init`] installs a client, [`shutdown`] closes it, and the free functions
//! ([`get`], [`post`], [`Request::send`](crate::Request::send)) route through
//! it. Calling them before `init` returns [`ClientError::NotInitialized`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::client::{Client, ClientBuilder};
use crate::engine::Engine;
use crate::error::{ClientError, Error};
use crate::request::Request;
use crate::response::Response;
use crate::types::Method;

static DEFAULT: Mutex<Option<Arc<Client>>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<Arc<Client>>> {
    DEFAULT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Install a default client with a random identity, dialing through
/// `engine`. Replaces (and closes) any previous default client.
pub fn init(engine: Arc<dyn Engine>) -> Result<(), ClientError> {
    init_with(Client::builder(engine))
}

/// Install a default client built from `builder`. Replaces (and closes) any
/// previous default client.
pub fn init_with(builder: ClientBuilder) -> Result<(), ClientError> {
    let client = Arc::new(builder.build()?);
    let previous = slot().replace(client);
    if previous.is_some() {
        info!("replaced default nwfetch client");
    }
    // The old client closes once in-flight callers drop their handles.
    drop(previous);
    Ok(())
}

/// Remove the default client. Its connections close once every in-flight
/// request using it has finished. A no-op if there is none.
pub fn shutdown() {
    let previous = slot().take();
    drop(previous);
}

/// The current default client.
pub fn client() -> Result<Arc<Client>, ClientError> {
    slot().clone().ok_or(ClientError::NotInitialized)
}

/// `read` `url` through the default client.
pub fn get(url: &str) -> Result<Response, Error> {
    execute(Request::new(url))
}

/// `write` `body` to `url` through the default client.
pub fn post(url: &str, body: impl Into<Vec<u8>>) -> Result<Response, Error> {
    execute(Request::new(url).method(Method::Write).body(body))
}

pub(crate) fn execute(request: Request) -> Result<Response, Error> {
    // Clone the handle out so the lock is not held across the exchange.
    let client = client()?;
    Ok(client.execute(request)?)
}
