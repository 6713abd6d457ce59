// SPDX-License-Identifier: MIT OR Apache-2.0

//! Producers accepted by [`ConcatStream::append`](crate::core::stream::ConcatStream::append).

use std::fmt;
use std::sync::Arc;

use crate::core::stream::chunk::Chunk;
use crate::core::stream::concat::Continuation;
use crate::core::stream::input::source::{DeferredSource, Source};

/// One entry of a concatenation, classified when it is built rather than probed at runtime
pub enum Producer {
    /// Eager source; wrapped in a [`DeferredSource`] when appended
    Stream(Arc<dyn Source>),
    /// Source that already holds its events; appended as-is
    Deferred(DeferredSource),
    /// Value emitted directly, without flow control
    Literal(Chunk),
    /// Producer that is only known once the session reaches it
    Lazy(LazyProducer),
}

impl Producer {
    pub fn stream(source: impl Source + 'static) -> Self {
        Producer::Stream(Arc::new(source))
    }

    pub fn literal(value: impl Into<Chunk>) -> Self {
        Producer::Literal(value.into())
    }

    /// Create a lazy producer from a factory that eventually calls [`Continuation::resolve`]
    ///
    /// The factory may resolve before returning, or keep the continuation and
    /// resolve it later from any thread.
    pub fn lazy<F>(factory: F) -> Self
    where
        F: FnOnce(Continuation) + Send + 'static,
    {
        Producer::Lazy(LazyProducer::new(factory))
    }

    /// True for both eager and already deferred sources
    pub fn is_stream_like(&self) -> bool {
        matches!(self, Producer::Stream(_) | Producer::Deferred(_))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Producer::Stream(_) => "stream",
            Producer::Deferred(_) => "deferred",
            Producer::Literal(_) => "literal",
            Producer::Lazy(_) => "lazy",
        }
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Producer::Stream(source) => f.debug_tuple("Stream").field(source).finish(),
            Producer::Deferred(source) => f.debug_tuple("Deferred").field(source).finish(),
            Producer::Literal(chunk) => f.debug_tuple("Literal").field(chunk).finish(),
            Producer::Lazy(lazy) => f.debug_tuple("Lazy").field(lazy).finish(),
        }
    }
}

impl From<Chunk> for Producer {
    fn from(chunk: Chunk) -> Self {
        Producer::Literal(chunk)
    }
}

impl From<&str> for Producer {
    fn from(text: &str) -> Self {
        Producer::Literal(text.into())
    }
}

impl From<String> for Producer {
    fn from(text: String) -> Self {
        Producer::Literal(text.into())
    }
}

impl From<Vec<u8>> for Producer {
    fn from(bytes: Vec<u8>) -> Self {
        Producer::Literal(bytes.into())
    }
}

impl From<&[u8]> for Producer {
    fn from(bytes: &[u8]) -> Self {
        Producer::Literal(bytes.into())
    }
}

impl From<DeferredSource> for Producer {
    fn from(source: DeferredSource) -> Self {
        Producer::Deferred(source)
    }
}

impl From<Arc<dyn Source>> for Producer {
    fn from(source: Arc<dyn Source>) -> Self {
        Producer::Stream(source)
    }
}

/// One-shot factory behind [`Producer::Lazy`]
pub struct LazyProducer {
    factory: Box<dyn FnOnce(Continuation) + Send>,
}

impl LazyProducer {
    pub fn new<F>(factory: F) -> Self
    where
        F: FnOnce(Continuation) + Send + 'static,
    {
        Self {
            factory: Box::new(factory),
        }
    }

    pub(crate) fn invoke(self, continuation: Continuation) {
        (self.factory)(continuation)
    }
}

impl fmt::Debug for LazyProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyProducer")
    }
}
