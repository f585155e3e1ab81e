//! Request builder.

use std::time::Duration;

use serde::Serialize;

use crate::client::Client;
use crate::error::{Error, TransportError};
use crate::response::Response;
use crate::types::{Header, Method};

/// A single-use WEB/1 request.
///
/// Created with [`Request::new`], configured with chained calls, and
/// executed with [`send_with`](Self::send_with) (explicit client) or
/// [`send`](Self::send) (the default client). Both consume the request, so a
/// request cannot be executed twice.
///
/// ```rust,ignore
/// let resp = Request::new("web://addr/path")
///     .method(Method::Write)
///     .header("content-type", "application/json")
///     .body(json_bytes)
///     .send_with(&client)?;
/// ```
#[derive(Debug)]
pub struct Request {
    pub(crate) url: String,
    pub(crate) method: Method,
    pub(crate) headers: Vec<Header>,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) timeout: Option<Duration>,
}

impl Request {
    /// A `read` request for `url` with no headers, body or timeout override.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Read,
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Set the method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append a header. Repeated names are kept, in order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and add
    /// `content-type: application/json`.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self.header("content-type", "application/json").body(body))
    }

    /// Override the client's default timeout for this request. Zero clears
    /// the override.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// The address as supplied.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute on `client`.
    pub fn send_with(self, client: &Client) -> Result<Response, TransportError> {
        client.execute(self)
    }

    /// Execute on the default client set up by [`crate::init`].
    pub fn send(self) -> Result<Response, Error> {
        crate::default::execute(self)
    }
}
