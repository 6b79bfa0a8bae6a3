//! Fire-and-forget notification events.
//!
//! The engine never talks to Telegram (or any other chat surface) directly. Instead it publishes
//! events on order transitions and operator-attention conditions, and the embedding application
//! subscribes with async hooks. Event delivery is best-effort by design: losing a notification
//! never affects order state.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
