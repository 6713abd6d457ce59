// SPDX-License-Identifier: MIT OR Apache-2.0

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::core::error::ChainError;
use crate::core::stream::chunk::Chunk;
use crate::core::stream::output::{SessionEvent, StreamCallback, Writable};

/// Forwards session events into a crossbeam channel
///
/// Lets another thread consume a session's output. When the receiving side is
/// gone, events are dropped; as a pipe destination the sink then reports
/// backpressure so the session pauses.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<SessionEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<SessionEvent>) -> Self {
        Self { sender }
    }

    pub fn unbounded() -> (Self, Receiver<SessionEvent>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender), receiver)
    }

    /// Bounded channel; a full channel blocks the emitting thread
    pub fn bounded(capacity: usize) -> (Self, Receiver<SessionEvent>) {
        let (sender, receiver) = bounded(capacity);
        (Self::new(sender), receiver)
    }

    fn forward(&self, event: SessionEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(e) => {
                log::debug!(
                    "[ChannelSink] Receiver disconnected, dropping {} event",
                    e.into_inner().name()
                );
                false
            }
        }
    }
}

impl StreamCallback for ChannelSink {
    fn on_data(&self, chunk: &Chunk) {
        self.forward(SessionEvent::Data(chunk.clone()));
    }

    fn on_pause(&self) {
        self.forward(SessionEvent::Pause);
    }

    fn on_resume(&self) {
        self.forward(SessionEvent::Resume);
    }

    fn on_end(&self) {
        self.forward(SessionEvent::End);
    }

    fn on_error(&self, error: &ChainError) {
        self.forward(SessionEvent::Error(error.clone()));
    }

    fn on_close(&self) {
        self.forward(SessionEvent::Close);
    }
}

impl Writable for ChannelSink {
    fn write(&self, chunk: &Chunk) -> bool {
        self.forward(SessionEvent::Data(chunk.clone()))
    }

    fn end(&self) {
        self.forward(SessionEvent::End);
    }
}
