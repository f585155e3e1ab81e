//! Wire-level vocabulary of WEB/1: methods, statuses and headers.
//!
//! All three serialise to and from the exact strings used on the wire
//! (e.g. `"read"`, `"not_found"`).

use serde::{Deserialize, Serialize};

/// A WEB/1 request method.
///
/// Serialises as a lowercase string (e.g. `"read"`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Retrieve a resource. Idempotent and safe for 0-RTT.
    #[default]
    Read,
    /// Create a new resource. Not idempotent.
    Write,
    /// Modify an existing resource. Not idempotent.
    Update,
    /// Remove a resource. Idempotent.
    Delete,
}

impl Method {
    /// The wire-format string.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Read => "read",
            Method::Write => "write",
            Method::Update => "update",
            Method::Delete => "delete",
        }
    }

    /// Whether repeating the request has the same effect as sending it once.
    pub fn is_idempotent(self) -> bool {
        matches!(self, Method::Read | Method::Delete)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a [`Method`] from its lowercase wire-format string.
impl std::str::FromStr for Method {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Method::Read),
            "write" => Ok(Method::Write),
            "update" => Ok(Method::Update),
            "delete" => Ok(Method::Delete),
            _ => Err(format!(
                "unknown method {:?}; expected one of: read, write, update, delete",
                s
            )),
        }
    }
}

/// A WEB/1 response status.
///
/// Serialises as a snake_case string (e.g. `"not_found"`). Servers may send
/// statuses outside this set; [`Response`](crate::Response) keeps the raw
/// string and treats anything unrecognised as an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The request was processed successfully.
    Ok,
    /// A new resource was created.
    Created,
    /// Accepted for processing; processing has not completed.
    Accepted,
    /// Succeeded with no response body.
    NoContent,
    /// Malformed request or invalid parameters.
    BadRequest,
    /// No valid authentication was provided.
    Unauthorized,
    /// Authenticated but not permitted.
    Forbidden,
    /// The path does not exist on the server.
    NotFound,
    /// Conflicts with the current state of the resource.
    Conflict,
    /// Request rate exceeded; back off before retrying.
    RateLimited,
    /// Unexpected server-side failure.
    InternalError,
    /// The server is temporarily unable to handle the request.
    Unavailable,
}

impl Status {
    /// Every success status.
    pub const SUCCESS: [Status; 4] = [
        Status::Ok,
        Status::Created,
        Status::Accepted,
        Status::NoContent,
    ];

    /// Every error status.
    pub const ERRORS: [Status; 8] = [
        Status::BadRequest,
        Status::Unauthorized,
        Status::Forbidden,
        Status::NotFound,
        Status::Conflict,
        Status::RateLimited,
        Status::InternalError,
        Status::Unavailable,
    ];

    /// The wire-format string.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Created => "created",
            Status::Accepted => "accepted",
            Status::NoContent => "no_content",
            Status::BadRequest => "bad_request",
            Status::Unauthorized => "unauthorized",
            Status::Forbidden => "forbidden",
            Status::NotFound => "not_found",
            Status::Conflict => "conflict",
            Status::RateLimited => "rate_limited",
            Status::InternalError => "internal_error",
            Status::Unavailable => "unavailable",
        }
    }

    pub fn is_success(self) -> bool {
        Self::SUCCESS.contains(&self)
    }

    pub fn is_error(self) -> bool {
        Self::ERRORS.contains(&self)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a [`Status`] from its snake_case wire-format string.
impl std::str::FromStr for Status {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUCCESS
            .into_iter()
            .chain(Self::ERRORS)
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown status {:?}", s))
    }
}

/// One request or response header. Names are case-sensitive and may repeat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// First value of the header called exactly `name`.
pub(crate) fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
}
