// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential concatenation of push-style sources, literal values and lazily
//! resolved producers into a single ordered output.
//!
//! ```rust
//! use stream_concat::core::stream::{ConcatStream, LogSink};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(LogSink::new());
//! let stream = ConcatStream::new();
//! stream.subscribe(sink.clone());
//! stream.append("a").append("b").append("c");
//! stream.resume();
//!
//! assert_eq!(sink.data_as_string(), "abc");
//! ```

pub mod core;

pub use crate::core::config::SessionConfig;
pub use crate::core::error::{ChainError, ChainResult};
pub use crate::core::stream::{
    Chunk, ConcatStream, Continuation, DeferredSource, Producer, SessionEvent, Source,
    SourceListener, StreamCallback, Writable,
};
