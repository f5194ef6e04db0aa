//! Business logic and repository trait definitions for hirechat.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements. It depends only on `hirechat-types` -- never on
//! `hirechat-infra` or any database/IO crate.

pub mod event;
pub mod messaging;
pub mod repository;

#[cfg(test)]
mod testing;
