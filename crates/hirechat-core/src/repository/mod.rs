//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (hirechat-infra) implements. The core crate never depends on any
//! specific storage technology.
//!
//! `application` and `entitlement` are narrow read-only views onto
//! collaborators owned by other parts of the marketplace.

pub mod application;
pub mod conversation;
pub mod entitlement;
pub mod message;
