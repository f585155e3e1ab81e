//! WEB/1 responses.

use std::borrow::Cow;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::engine::Reply;
use crate::error::StatusError;
use crate::types::{find_header, Header, Status};

/// A WEB/1 response.
///
/// Produced for every completed exchange, including ones whose status is an
/// error: a `not_found` is a valid response, not a transport failure. Use
/// [`is_success`](Self::is_success), [`status_error`](Self::status_error) or
/// [`error_for_status`](Self::error_for_status) to branch on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The WEB/1 status string, e.g. `"ok"` or `"not_found"`.
    pub status: String,
    /// Optional server-provided elaboration on the status.
    pub status_details: Option<String>,
    /// Response headers in the order the server sent them.
    pub headers: Vec<Header>,
    /// The raw payload. Empty for responses with no content.
    pub body: Vec<u8>,
}

impl Response {
    /// The status as a known [`Status`], if it is one.
    pub fn status_kind(&self) -> Option<Status> {
        self.status.parse().ok()
    }

    /// Whether the status is exactly `ok`.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok.as_str()
    }

    /// Whether the status is `ok`, `created`, `accepted` or `no_content`.
    pub fn is_success(&self) -> bool {
        self.status_kind().is_some_and(Status::is_success)
    }

    /// Whether the status is one of the defined error statuses.
    pub fn is_error(&self) -> bool {
        self.status_kind().is_some_and(Status::is_error)
    }

    /// The value of the first header named exactly `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// How long to wait before retrying, from the `retry-after` header
    /// (integer seconds, optionally signed, so `-0` is zero). `None` if the
    /// header is missing, not an integer, or negative.
    pub fn retry_after(&self) -> Option<Duration> {
        let secs = self.header("retry-after")?.parse::<i64>().ok()?;
        u64::try_from(secs).ok().map(Duration::from_secs)
    }

    /// `None` for success statuses; otherwise a [`StatusError`] carrying the
    /// status, details and body. Unrecognised statuses count as errors.
    pub fn status_error(&self) -> Option<StatusError> {
        if self.is_success() {
            return None;
        }
        Some(StatusError {
            status: self.status.clone(),
            status_details: self.status_details.clone(),
            body: self.body.clone(),
        })
    }

    /// Pass success responses through and turn the rest into a
    /// [`StatusError`], moving the body rather than copying it.
    pub fn error_for_status(self) -> Result<Self, StatusError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(StatusError {
            status: self.status,
            status_details: self.status_details,
            body: self.body,
        })
    }
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        Self {
            status: reply.status,
            status_details: reply.status_details,
            headers: reply.headers,
            body: reply.body,
        }
    }
}
