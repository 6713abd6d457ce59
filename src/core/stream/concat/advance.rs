// SPDX-License-Identifier: MIT OR Apache-2.0

//! Advance Engine - the reentrancy-safe drain loop
//!
//! A producer may finish inside the very call that activates it: a literal is
//! emitted and done immediately, a source may replay everything and end from
//! within `resume()`. Calling "activate next" from the completion callback
//! would recurse once per producer and, with a long run of such producers,
//! overflow the stack.
//!
//! Instead `advance()` is a trampoline. The first caller owns the loop
//! (`reentering`); any `advance()` issued while the loop runs only records
//! `pending_advance` and returns, and the loop performs one more step for it.
//! Both flags change under the state lock, so the same guard also serialises
//! completions arriving from other threads.

use std::sync::Arc;

use super::queue::{Descriptor, DescriptorKind, ProducerId};
use super::relay::Continuation;
use super::{Active, ActiveKind, SessionInner};
use crate::core::stream::input::source::Source;
use crate::core::stream::producer::Producer;

/// Releases loop ownership if a step unwinds
struct LoopOwnership<'a> {
    session: &'a SessionInner,
    held: bool,
}

impl Drop for LoopOwnership<'_> {
    fn drop(&mut self) {
        if self.held {
            let mut state = self.session.state();
            state.reentering = false;
            state.pending_advance = false;
        }
    }
}

impl SessionInner {
    /// Move on to the next producer
    ///
    /// Clears the active producer, then either runs the drain loop or, when a
    /// loop is already running, leaves a note for it.
    pub(crate) fn advance(self: &Arc<Self>) {
        self.advance_inner(None);
    }

    /// Move on only if `id` is still the active producer
    ///
    /// The comparison and the clear share one lock, so of two completions for
    /// the same producer only the first advances.
    pub(crate) fn advance_from(self: &Arc<Self>, id: ProducerId) {
        self.advance_inner(Some(id));
    }

    fn advance_inner(self: &Arc<Self>, expected: Option<ProducerId>) {
        let (previous, owner) = {
            let mut state = self.state();
            if !state.is_live() {
                return;
            }
            if let Some(id) = expected {
                if !state.is_active(id) {
                    log::trace!("[ConcatStream] Ignoring completion of inactive producer {}", id);
                    return;
                }
            }
            let previous = state.active.take();
            if state.reentering {
                state.pending_advance = true;
                (previous, false)
            } else {
                state.reentering = true;
                (previous, true)
            }
        };
        // the last handle to a finished source may be in here; drop it unlocked
        drop(previous);
        if !owner {
            return;
        }

        let mut ownership = LoopOwnership {
            session: self,
            held: true,
        };
        loop {
            self.state().pending_advance = false;
            self.advance_step();

            let mut state = self.state();
            if !state.pending_advance || !state.is_live() {
                state.reentering = false;
                state.pending_advance = false;
                ownership.held = false;
                break;
            }
        }
    }

    /// Pop the queue head and start it; an empty queue ends the session
    fn advance_step(self: &Arc<Self>) {
        let next = {
            let mut state = self.state();
            if !state.is_live() {
                return;
            }
            state.queue.pop_front()
        };
        match next {
            Some(descriptor) => self.activate(descriptor),
            None => {
                log::debug!("[ConcatStream] Queue exhausted");
                self.finish();
            }
        }
    }

    fn activate(self: &Arc<Self>, descriptor: Descriptor) {
        let Descriptor { id, kind } = descriptor;
        match kind {
            DescriptorKind::Stream(entry) => {
                let hold = {
                    let mut state = self.state();
                    if !state.is_live() {
                        return;
                    }
                    state.active = Some(Active {
                        id,
                        kind: ActiveKind::Stream(entry.source.clone()),
                    });
                    state.paused && state.pause_streams
                };
                log::trace!(
                    "[ConcatStream] Activating stream {} (prewrapped: {}, size listener: {})",
                    id,
                    entry.prewrapped,
                    entry.has_size_listener
                );
                // resuming releases whatever the wrapper held; the producer may end right here
                if hold {
                    log::trace!("[ConcatStream] Session paused, holding producer {}", id);
                } else {
                    entry.source.resume();
                }
            }
            DescriptorKind::Literal(chunk) => {
                {
                    let mut state = self.state();
                    if !state.is_live() {
                        return;
                    }
                    state.active = Some(Active {
                        id,
                        kind: ActiveKind::Literal,
                    });
                }
                log::trace!("[ConcatStream] Emitting literal {} ({} bytes)", id, chunk.len());
                self.emit_data(&chunk);
                self.advance_from(id);
            }
            DescriptorKind::Lazy(factory) => {
                {
                    let mut state = self.state();
                    if !state.is_live() {
                        return;
                    }
                    state.active = Some(Active {
                        id,
                        kind: ActiveKind::Resolving,
                    });
                }
                log::trace!("[ConcatStream] Resolving lazy producer {}", id);
                factory.invoke(Continuation::new(Arc::downgrade(self), id));
            }
        }
    }

    /// A lazy factory delivered its producer
    ///
    /// The producer goes back to the head of the queue and the engine advances
    /// onto it, so synchronous and asynchronous resolution take the same path
    /// and a chain of lazy producers never recurses.
    pub(crate) fn resolved(self: &Arc<Self>, id: ProducerId, producer: Producer) {
        let pause_streams = {
            let state = self.state();
            if !state.is_live() {
                log::debug!("[ConcatStream] Dropping producer {} resolved after reset", id);
                return;
            }
            if !state.is_resolving(id) {
                log::debug!("[ConcatStream] Dropping stale resolution of producer {}", id);
                return;
            }
            state.pause_streams
        };

        log::trace!("[ConcatStream] Lazy producer {} resolved to {}", id, producer.kind());
        let descriptor = self.prepare(id, producer, pause_streams);
        {
            let mut state = self.state();
            if !state.is_live() || !state.is_resolving(id) {
                return;
            }
            state.queue.push_front(descriptor);
        }
        self.advance_from(id);
    }
}
