//! HTTP handlers for the proxy endpoints.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /raw?addr=<web address>` | [`raw`]: fetch and relay the body |
//! | `GET /?addr=<web address>` | [`frame`]: HTML page framing `/raw` |

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Response},
};
use nwfetch::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;

/// Content type used when the upstream response does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Shared state threaded through the handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    /// The blocking fetch client. Calls run on tokio's blocking pool.
    pub client: Arc<Client>,
}

#[derive(Debug, Deserialize)]
pub struct AddrQuery {
    pub addr: Option<String>,
}

impl AddrQuery {
    fn require(self) -> Result<String, AppError> {
        self.addr
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AppError::BadRequest("missing ?addr= parameter".into()))
    }
}

/// `GET /raw?addr=<web address>`
///
/// Reads the address through the client and relays the body with the
/// upstream `content-type`. Unreachable servers and error statuses both
/// become `502 Bad Gateway`.
pub async fn raw(
    State(state): State<AppState>,
    Query(params): Query<AddrQuery>,
) -> Result<Response, AppError> {
    let target = params.require()?;

    let client = Arc::clone(&state.client);
    let url = target.clone();
    let resp = tokio::task::spawn_blocking(move || client.get(&url))
        .await?
        .map_err(|e| {
            warn!(addr = %target, error = %e, "upstream unreachable");
            AppError::BadGateway(format!("unable to reach {target}"))
        })?;

    if let Some(err) = resp.status_error() {
        warn!(addr = %target, status = %err.status, "upstream error status");
        let message = match err.status_details.as_deref() {
            Some(details) if !details.is_empty() => {
                format!("upstream error: {}: {details}", err.status)
            }
            _ => format!("upstream error: {}", err.status),
        };
        return Err(AppError::BadGateway(message));
    }

    let content_type = resp
        .header("content-type")
        .filter(|ct| !ct.is_empty())
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    Ok(([(header::CONTENT_TYPE, content_type)], resp.body).into_response())
}

/// `GET /?addr=<web address>`
///
/// A full-window page whose iframe loads [`raw`] for the same address, so
/// relative links in the upstream content stay inside the proxy.
pub async fn frame(Query(params): Query<AddrQuery>) -> Result<Html<String>, AppError> {
    let target = params.require()?;
    let src = escape_html(&format!("/raw?addr={}", urlencoding::encode(&target)));
    Ok(Html(format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>WEB/1 proxy</title>\n\
         <style>*{{margin:0;padding:0}}iframe{{width:100%;height:100vh;border:none}}</style>\n\
         </head>\n\
         <body><iframe src=\"{src}\"></iframe></body>\n\
         </html>"
    )))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
