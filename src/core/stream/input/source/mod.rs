// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod deferred_source;

pub use self::deferred_source::{DeferredOptions, DeferredSource};

use crate::core::error::ChainError;
use crate::core::stream::chunk::Chunk;
use std::fmt::Debug;
use std::sync::Arc;

/// Listener for the events a [`Source`] pushes
///
/// A source delivers zero or more `on_data` calls in order, then at most one
/// terminal `on_end`. `on_error` may arrive at any point.
pub trait SourceListener: Send + Sync {
    fn on_data(&self, chunk: &Chunk);
    fn on_end(&self);
    fn on_error(&self, error: &ChainError);
}

/// Push-style emitter with flow control
///
/// Sources deliver events to every subscribed listener, in subscription order.
/// Implementations must not hold internal locks while calling listeners: a
/// listener is allowed to call `pause()` or `resume()` on the same source from
/// inside a callback.
///
/// # Architecture
/// ```text
/// Source::resume() → SourceListener::on_data()* → SourceListener::on_end()
/// ```
pub trait Source: Debug + Send + Sync {
    /// Register a listener; it receives every event emitted after this call
    fn subscribe(&self, listener: Arc<dyn SourceListener>);

    /// Ask the source to stop emitting until `resume()`
    fn pause(&self);

    /// Start or continue emitting
    fn resume(&self);
}

/// Event as recorded by buffering wrappers
#[derive(Debug, Clone)]
pub enum SourceEvent {
    Data(Chunk),
    End,
    Error(ChainError),
}

impl SourceEvent {
    /// Deliver this event to each listener in order
    pub fn dispatch(&self, listeners: &[Arc<dyn SourceListener>]) {
        for listener in listeners {
            match self {
                SourceEvent::Data(chunk) => listener.on_data(chunk),
                SourceEvent::End => listener.on_end(),
                SourceEvent::Error(error) => listener.on_error(error),
            }
        }
    }
}
