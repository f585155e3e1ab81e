//! HTTP front end for `nwfetch`.
//!
//! Lets an ordinary browser view WEB/1 content: `/raw?addr=` relays a read
//! through an [`nwfetch::Client`], and `/?addr=` wraps that in a page.
//! Hosts supply the client (and so the engine) and serve the router on
//! their own listener.

pub mod error;
pub mod handlers;
pub mod router;

pub use error::AppError;
pub use handlers::{AppState, DEFAULT_CONTENT_TYPE};
pub use router::build_router;
