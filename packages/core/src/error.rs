//! Error taxonomy.
//!
//! Two kinds of failure never mix:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`TransportError`] | No WEB/1 response was obtained. Tagged with the [`Stage`] that failed. |
//! | [`StatusError`] | The server answered with a non-success status. Derived from a [`Response`](crate::Response). |
//!
//! [`Error`] unifies both (plus [`ClientError`]) so call sites can use `?`
//! on either, and the `is_*` predicates below find a [`StatusError`]
//! anywhere in an error's `source()` chain.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::identity::IdentityError;
use crate::types::Status;

/// An opaque error from the engine or the address parser.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Where a request failed before a response was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The address could not be parsed.
    Parse,
    /// No connection to the server could be established.
    Connect,
    /// The exchange on an established connection failed.
    Fetch,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Connect => "connect",
            Stage::Fetch => "fetch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request never produced a WEB/1 response.
#[derive(Debug, Error)]
#[error("nwfetch: {stage} {url}: {source}")]
pub struct TransportError {
    /// The stage that failed.
    pub stage: Stage,
    /// The address as the caller supplied it.
    pub url: String,
    /// The underlying cause.
    #[source]
    pub source: BoxError,
}

impl TransportError {
    pub fn new(stage: Stage, url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            stage,
            url: url.into(),
            source: source.into(),
        }
    }
}

/// The server was reached and answered with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    /// The WEB/1 status string, e.g. `"not_found"`.
    pub status: String,
    /// Optional server-provided elaboration.
    pub status_details: Option<String>,
    /// The raw response body.
    pub body: Vec<u8>,
}

impl StatusError {
    /// The status as a known [`Status`], if it is one.
    pub fn status_kind(&self) -> Option<Status> {
        self.status.parse().ok()
    }

    /// Whether this error carries exactly `status`.
    pub fn is(&self, status: Status) -> bool {
        self.status == status.as_str()
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_details.as_deref() {
            Some(details) if !details.is_empty() => {
                write!(f, "nwfetch: server returned {}: {details}", self.status)
            }
            _ => write!(f, "nwfetch: server returned {}", self.status),
        }
    }
}

impl StdError for StatusError {}

/// Errors raised while building a [`Client`](crate::Client) or reaching the
/// default client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("default client is not initialized; call nwfetch::init first")]
    NotInitialized,
}

/// Any error this crate returns.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Status(#[from] StatusError),

    #[error("{0}")]
    Client(#[from] ClientError),
}

/// Whether `err` is, or wraps, a [`StatusError`] with status `status`.
pub fn has_status(err: &(dyn StdError + 'static), status: Status) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(se) = e.downcast_ref::<StatusError>() {
            return se.is(status);
        }
        current = e.source();
    }
    false
}

/// Whether `err` is or wraps a `bad_request` [`StatusError`].
pub fn is_bad_request(err: &(dyn StdError + 'static)) -> bool {
    has_status(err, Status::BadRequest)
}

/// Whether `err` is or wraps an `unauthorized` [`StatusError`].
pub fn is_unauthorized(err: &(dyn StdError + 'static)) -> bool {
    has_status(err, Status::Unauthorized)
}

/// Whether `err` is or wraps a `forbidden` [`StatusError`].
pub fn is_forbidden(err: &(dyn StdError + 'static)) -> bool {
    has_status(err, Status::Forbidden)
}

/// Whether `err` is or wraps a `not_found` [`StatusError`].
pub fn is_not_found(err: &(dyn StdError + 'static)) -> bool {
    has_status(err, Status::NotFound)
}

/// Whether `err` is or wraps a `conflict` [`StatusError`].
pub fn is_conflict(err: &(dyn StdError + 'static)) -> bool {
    has_status(err, Status::Conflict)
}

/// Whether `err` is or wraps a `rate_limited` [`StatusError`].
pub fn is_rate_limited(err: &(dyn StdError + 'static)) -> bool {
    has_status(err, Status::RateLimited)
}

/// Whether `err` is or wraps an `internal_error` [`StatusError`].
pub fn is_internal_error(err: &(dyn StdError + 'static)) -> bool {
    has_status(err, Status::InternalError)
}

/// Whether `err` is or wraps an `unavailable` [`StatusError`].
pub fn is_unavailable(err: &(dyn StdError + 'static)) -> bool {
    has_status(err, Status::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: &str, details: Option<&str>) -> StatusError {
        StatusError {
            status: status.into(),
            status_details: details.map(String::from),
            body: b"oops".to_vec(),
        }
    }

    #[derive(Debug, Error)]
    #[error("while loading profile")]
    struct Wrapper(#[source] StatusError);

    #[test]
    fn status_error_display() {
        assert_eq!(
            status_error("not_found", Some("no such path")).to_string(),
            "nwfetch: server returned not_found: no such path"
        );
        assert_eq!(
            status_error("forbidden", None).to_string(),
            "nwfetch: server returned forbidden"
        );
        assert_eq!(
            status_error("forbidden", Some("")).to_string(),
            "nwfetch: server returned forbidden"
        );
    }

    #[test]
    fn transport_error_display_includes_stage_and_url() {
        let err = TransportError::new(Stage::Connect, "web://node1/x", "unreachable");
        assert_eq!(err.to_string(), "nwfetch: connect web://node1/x: unreachable");
        assert!(err.source().is_some());
    }

    #[test]
    fn predicates_match_direct_status_error() {
        let err = status_error("not_found", None);
        assert!(is_not_found(&err));
        assert!(!is_forbidden(&err));
    }

    #[test]
    fn predicates_see_through_wrappers() {
        let err = Wrapper(status_error("rate_limited", None));
        assert!(is_rate_limited(&err));

        let err = Error::from(status_error("conflict", None));
        assert!(is_conflict(&err));
        assert!(!is_not_found(&err));
    }

    #[test]
    fn every_predicate_matches_its_status() {
        let predicates: [(Status, fn(&(dyn StdError + 'static)) -> bool); 8] = [
            (Status::BadRequest, is_bad_request),
            (Status::Unauthorized, is_unauthorized),
            (Status::Forbidden, is_forbidden),
            (Status::NotFound, is_not_found),
            (Status::Conflict, is_conflict),
            (Status::RateLimited, is_rate_limited),
            (Status::InternalError, is_internal_error),
            (Status::Unavailable, is_unavailable),
        ];
        for (status, predicate) in predicates {
            let err = status_error(status.as_str(), None);
            assert!(predicate(&err), "{status}");
        }
    }

    #[test]
    fn transport_errors_never_match() {
        let err = TransportError::new(Stage::Fetch, "web://node1/x", "reset");
        assert!(!is_not_found(&err));
        assert!(!is_unavailable(&Error::from(err)));
    }
}
