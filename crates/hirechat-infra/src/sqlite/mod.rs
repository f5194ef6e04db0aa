//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod application;
mod codec;
pub mod conversation;
pub mod entitlement;
pub mod message;
pub mod pool;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
