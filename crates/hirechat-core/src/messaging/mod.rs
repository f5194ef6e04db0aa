//! The conversation messaging subsystem.
//!
//! - `registry` -- one conversation per job application, race-safe creation
//! - `gate` -- re-derives the caller's participant role from stored state
//! - `store` -- validated appends to the ordered, append-only message log
//! - `cursor` -- per-participant monotonic read cursors
//! - `unread` -- batched unread counts and previews for the inbox
//! - `service` -- the exposed messaging API composing all of the above

pub mod cursor;
pub mod gate;
pub mod registry;
pub mod service;
pub mod store;
pub mod unread;

pub use gate::{AuthorizationGate, Authorized, Caller};
pub use service::{MessagingService, MessagingStats, ParticipantBackend};
