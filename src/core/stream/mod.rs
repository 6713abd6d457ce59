// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod chunk;
pub mod concat;
pub mod input;
pub mod output;
pub mod producer;

pub use self::chunk::Chunk;
pub use self::concat::{ConcatStream, Continuation, ProducerId, Terminal};
pub use self::input::source::{
    DeferredOptions, DeferredSource, Source, SourceEvent, SourceListener,
};
pub use self::output::{
    ChannelSink, LogSink, PipeOptions, SessionEvent, StreamCallback, Writable,
};
pub use self::producer::{LazyProducer, Producer};
