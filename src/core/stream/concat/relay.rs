// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listener objects connecting producers and destinations to a session.
//!
//! All of them hold a `Weak` reference: a session owns its producers, so a
//! strong reference back would keep both alive forever.

use std::sync::{Arc, Weak};

use super::queue::ProducerId;
use super::{ConcatStream, SessionInner};
use crate::core::error::ChainError;
use crate::core::stream::chunk::Chunk;
use crate::core::stream::input::source::SourceListener;
use crate::core::stream::output::{StreamCallback, Writable};
use crate::core::stream::producer::Producer;

/// Attached to a (wrapped) stream producer for its whole life
///
/// Data and end are honoured only while the producer is the active one; errors
/// are fatal whenever they arrive.
pub(crate) struct ProducerRelay {
    session: Weak<SessionInner>,
    id: ProducerId,
}

impl ProducerRelay {
    pub fn new(session: Weak<SessionInner>, id: ProducerId) -> Self {
        Self { session, id }
    }
}

impl SourceListener for ProducerRelay {
    fn on_data(&self, chunk: &Chunk) {
        if let Some(session) = self.session.upgrade() {
            session.relay_data(self.id, chunk);
        }
    }

    fn on_end(&self) {
        if let Some(session) = self.session.upgrade() {
            session.producer_ended(self.id);
        }
    }

    fn on_error(&self, error: &ChainError) {
        if let Some(session) = self.session.upgrade() {
            session.producer_failed(self.id, error);
        }
    }
}

/// Attached to the raw source, before wrapping, so size is measured on emission
pub(crate) struct SizeCheck {
    session: Weak<SessionInner>,
}

impl SizeCheck {
    pub fn new(session: Weak<SessionInner>) -> Self {
        Self { session }
    }
}

impl SourceListener for SizeCheck {
    fn on_data(&self, _chunk: &Chunk) {
        if let Some(session) = self.session.upgrade() {
            session.check_data_size();
        }
    }

    fn on_end(&self) {}

    // errors reach the session through the wrapper's relay
    fn on_error(&self, _error: &ChainError) {}
}

/// Session callback feeding a pipe destination
pub(crate) struct PipeRelay {
    session: Weak<SessionInner>,
    destination: Arc<dyn Writable>,
    end: bool,
}

impl PipeRelay {
    pub fn new(session: Weak<SessionInner>, destination: Arc<dyn Writable>, end: bool) -> Self {
        Self {
            session,
            destination,
            end,
        }
    }
}

impl StreamCallback for PipeRelay {
    fn on_data(&self, chunk: &Chunk) {
        if self.destination.write(chunk) {
            return;
        }
        if let Some(inner) = self.session.upgrade() {
            log::trace!("[ConcatStream] Pipe destination is full, pausing");
            ConcatStream { inner }.pause();
        }
    }

    fn on_end(&self) {
        if self.end {
            self.destination.end();
        }
    }
}

/// Handed to a lazy factory; resolving it hands the session the real producer
///
/// A continuation can be moved to another thread and resolved later. Resolving
/// after the session finished, or after it moved past this producer, is a no-op.
#[derive(Debug)]
pub struct Continuation {
    session: Weak<SessionInner>,
    id: ProducerId,
}

impl Continuation {
    pub(crate) fn new(session: Weak<SessionInner>, id: ProducerId) -> Self {
        Self { session, id }
    }

    /// Identity of the lazy producer this continuation belongs to
    pub fn id(&self) -> ProducerId {
        self.id
    }

    /// Supply the producer; it may itself be lazy
    pub fn resolve(self, producer: impl Into<Producer>) {
        match self.session.upgrade() {
            Some(session) => session.resolved(self.id, producer.into()),
            None => log::debug!(
                "[ConcatStream] Continuation {} resolved after session was dropped",
                self.id
            ),
        }
    }

    /// Report that the producer could not be obtained; fatal for the session
    pub fn fail(self, error: ChainError) {
        if let Some(session) = self.session.upgrade() {
            if session.state().is_resolving(self.id) {
                log::warn!("[ConcatStream] Lazy producer {} failed: {}", self.id, error);
                session.fail(error);
            }
        }
    }
}
