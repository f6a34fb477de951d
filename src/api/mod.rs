//! HTTP API.
//!
//! Exposes the stores as JSON endpoints under `/api/`. Every response uses
//! one envelope: `{"success": true, ...}` on success and
//! `{"success": false, "code", "message"}` on failure.
//!
//! The router is composable: `api_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, start_api_server_on, ApiServer, ApiSession};
pub use types::ApiContext;
