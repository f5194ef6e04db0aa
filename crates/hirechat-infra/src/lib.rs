//! Infrastructure layer for hirechat.
//!
//! Contains implementations of the repository traits defined in
//! `hirechat-core` (SQLite storage), session-token lookup, configuration
//! loading and the wiring of a SQLite-backed messaging service.

pub mod config;
pub mod messaging;
pub mod sqlite;
