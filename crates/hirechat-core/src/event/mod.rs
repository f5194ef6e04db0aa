//! Real-time event bus for conversation messages.
//!
//! - `bus` -- per-conversation topics over `tokio::sync::broadcast`
//! - `backoff` -- capped exponential reconnect delays
//! - `view` -- a session's de-duplicated, ordered local copy of a conversation
//! - `session` -- the subscription state machine driving one connected session

pub mod backoff;
pub mod bus;
pub mod session;
pub mod view;

pub use backoff::Backoff;
pub use bus::{EventPublisher, Subscription, TopicBus};
pub use session::{ConversationSession, SessionBackend, SessionHandle, SessionUpdate};
pub use view::LocalView;
