// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output side of a concatenation session: callbacks, events and pipe destinations.

pub mod sink;

pub use self::sink::{ChannelSink, LogSink};

use crate::core::error::ChainError;
use crate::core::stream::chunk::Chunk;

/// Receives the events a session emits
///
/// All methods default to no-ops so callbacks only implement what they need.
/// A session emits `on_data` zero or more times and then exactly one of
/// `on_end`, `on_error` or `on_close`. Callbacks may call back into the session
/// (for example `pause()` from `on_data`).
pub trait StreamCallback: Send + Sync {
    fn on_data(&self, _chunk: &Chunk) {}
    fn on_pause(&self) {}
    fn on_resume(&self) {}
    fn on_end(&self) {}
    fn on_error(&self, _error: &ChainError) {}
    fn on_close(&self) {}
}

/// Owned form of a session event, for sinks that store or forward events
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Data(Chunk),
    Pause,
    Resume,
    End,
    Error(ChainError),
    Close,
}

impl SessionEvent {
    /// `End`, `Error` and `Close` finish a session
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::End | SessionEvent::Error(_) | SessionEvent::Close
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Data(_) => "data",
            SessionEvent::Pause => "pause",
            SessionEvent::Resume => "resume",
            SessionEvent::End => "end",
            SessionEvent::Error(_) => "error",
            SessionEvent::Close => "close",
        }
    }
}

/// Destination for [`ConcatStream::pipe`](crate::core::stream::ConcatStream::pipe)
pub trait Writable: Send + Sync {
    /// Accept one chunk; returning `false` asks the session to pause
    fn write(&self, chunk: &Chunk) -> bool;

    /// Called once when the session ends, if the pipe was opened with `end: true`
    fn end(&self) {}
}

/// Options for [`ConcatStream::pipe`](crate::core::stream::ConcatStream::pipe)
#[derive(Debug, Clone, Copy)]
pub struct PipeOptions {
    /// Call [`Writable::end`] when the session ends
    pub end: bool,
}

impl Default for PipeOptions {
    fn default() -> Self {
        Self { end: true }
    }
}
