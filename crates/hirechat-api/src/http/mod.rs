//! HTTP/WebSocket API layer for hirechat.
//!
//! Axum-based REST API at `/api/v1/` with session-token authentication,
//! envelope response format and CORS support, plus one WebSocket endpoint
//! per conversation for live updates.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
