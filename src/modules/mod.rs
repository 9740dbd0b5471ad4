//! Cross-cutting services module.

pub mod events;

pub use events::{
    ClientEvent, EventDispatcher, EventHandler, FailureEvent, LoggingHandler, PostResponseEvent,
    PreRequestEvent,
};
