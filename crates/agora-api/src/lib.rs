//! HTTP API server for the Agora forum backend.
//!
//! Exposes the core operations over three surfaces, all fed by the same
//! services and the same fan-out bus:
//!
//! - REST (JSON) -- mutations and cursor-paginated queries
//! - `WebSocket` (`GET /ws/posts/{id}`) -- the subscription channel
//! - SSE (`GET /api/posts/{id}/live`) -- the streaming HTTP transport
//!
//! # Modules
//!
//! - [`state`] -- shared [`AppState`](state::AppState) and per-request loaders
//! - [`auth`] -- bearer-identity extractors
//! - [`error`] -- [`ApiError`](error::ApiError) with stable error kinds
//! - [`handlers`] -- REST endpoint handlers and view assembly
//! - [`ws`] -- the `WebSocket` transport
//! - [`sse`] -- the SSE transport
//! - [`router`] -- route table and middleware
//! - [`server`] -- TCP bind and serve lifecycle

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod sse;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerConfig, start_server};
pub use state::AppState;
