//! Event system for the request pipeline.
//!
//! Provides hooks for logging and custom reactions around each exchange.

use chrono::{DateTime, Utc};
use http::Method;
use std::sync::Arc;
use std::time::Duration;

/// Emitted once the configuration is resolved, before dispatch.
#[derive(Debug, Clone)]
pub struct PreRequestEvent {
    pub url: String,
    pub method: Method,
    pub identity: String,
    pub timestamp: DateTime<Utc>,
}

/// Emitted after the body has been drained.
#[derive(Debug, Clone)]
pub struct PostResponseEvent {
    pub url: String,
    pub method: Method,
    pub status: u16,
    pub latency: Duration,
    pub size: usize,
    pub timestamp: DateTime<Utc>,
}

/// Emitted when any stage of the pipeline fails.
#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub url: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    PreRequest(PreRequestEvent),
    PostResponse(PostResponseEvent),
    Failure(FailureEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &ClientEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch(&self, event: ClientEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &ClientEvent) {
        match event {
            ClientEvent::PreRequest(pre) => {
                log::debug!("-> {} {} as {}", pre.method, pre.url, pre.identity);
            }
            ClientEvent::PostResponse(post) => {
                log::debug!(
                    "<- {} {} -> {} ({:.2}s, {} bytes)",
                    post.method,
                    post.url,
                    post.status,
                    post.latency.as_secs_f64(),
                    post.size
                );
            }
            ClientEvent::Failure(failure) => {
                log::warn!("request {} failed: {}", failure.url, failure.error);
            }
        }
    }
}
