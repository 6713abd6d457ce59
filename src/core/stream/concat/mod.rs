// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Concatenation Session
//!
//! [`ConcatStream`] drains an ordered list of producers, one at a time, into a
//! single output.
//!
//! ## Architecture
//!
//! ```text
//! append() ──▶ SourceQueue ──▶ advance loop ──▶ active producer ──▶ StreamCallback*
//!                                  ▲                   │
//!                                  └──── end ──────────┘
//! ```
//!
//! - **Source Queue** (`queue`): pending producers, FIFO
//! - **Advance Engine** (`advance`): trampolined loop that activates the next producer
//! - **Flow-Control Relay**: `pause()`/`resume()` reach the active producer only
//! - **Size Accountant** (`size`): hard ceiling over bytes held by stream producers
//! - **Reset Controller**: one teardown path for end, error and close
//!
//! ## Locking
//!
//! Session state sits behind a single mutex that is never held while sources or
//! callbacks run, so callbacks may re-enter the session (e.g. `pause()` from
//! `on_data`) and producers may complete inside the call that activates them.

mod advance;
mod queue;
mod relay;
mod size;

pub use self::queue::ProducerId;
pub use self::relay::Continuation;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use self::queue::{Descriptor, DescriptorKind, SourceQueue, StreamEntry};
use self::relay::{PipeRelay, ProducerRelay, SizeCheck};
use self::size::SizeAccountant;
use crate::core::config::SessionConfig;
use crate::core::error::ChainError;
use crate::core::stream::chunk::Chunk;
use crate::core::stream::input::source::{DeferredOptions, DeferredSource, Source};
use crate::core::stream::output::{PipeOptions, StreamCallback, Writable};
use crate::core::stream::producer::Producer;

/// Terminal state of a session; exactly one is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    /// The queue was exhausted
    Ended,
    /// A producer failed or the size ceiling was exceeded
    Errored,
    /// `destroy()` was called
    Closed,
}

#[derive(Debug)]
pub(crate) enum ActiveKind {
    Stream(DeferredSource),
    Literal,
    /// Lazy factory invoked, continuation not resolved yet
    Resolving,
}

#[derive(Debug)]
pub(crate) struct Active {
    pub id: ProducerId,
    pub kind: ActiveKind,
}

impl Active {
    fn stream(&self) -> Option<&DeferredSource> {
        match &self.kind {
            ActiveKind::Stream(source) => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct SessionState {
    pub queue: SourceQueue,
    pub active: Option<Active>,
    /// Set once, by the first `resume()`
    pub released: bool,
    pub writable: bool,
    pub paused: bool,
    pub pending_advance: bool,
    pub reentering: bool,
    pub size: SizeAccountant,
    pub pause_streams: bool,
    pub terminal: Option<Terminal>,
    next_id: u64,
}

impl SessionState {
    fn new(config: SessionConfig) -> Self {
        Self {
            queue: SourceQueue::default(),
            active: None,
            released: false,
            writable: false,
            paused: false,
            pending_advance: false,
            reentering: false,
            size: SizeAccountant::new(config.max_data_size),
            pause_streams: config.pause_streams,
            terminal: None,
            next_id: 0,
        }
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.terminal.is_none()
    }

    fn allocate_id(&mut self) -> ProducerId {
        self.next_id += 1;
        ProducerId(self.next_id)
    }

    pub fn is_active(&self, id: ProducerId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == id)
    }

    pub fn is_resolving(&self, id: ProducerId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.id == id && matches!(active.kind, ActiveKind::Resolving))
    }

    pub fn active_stream(&self) -> Option<&DeferredSource> {
        self.active.as_ref().and_then(Active::stream)
    }
}

pub(crate) struct SessionInner {
    state: Mutex<SessionState>,
    callbacks: Mutex<Vec<Arc<dyn StreamCallback>>>,
}

impl SessionInner {
    pub(crate) fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn callbacks(&self) -> Vec<Arc<dyn StreamCallback>> {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Deliver an event to every callback; no lock is held while they run
    fn emit(&self, f: impl Fn(&dyn StreamCallback)) {
        for callback in self.callbacks() {
            f(callback.as_ref());
        }
    }

    /// Like `emit`, but stops as soon as `deliverable` no longer holds
    ///
    /// A callback may end the session from inside its handler; the callbacks
    /// after it must then not see the event after the terminal one.
    fn emit_while(
        &self,
        deliverable: impl Fn(&SessionState) -> bool,
        f: impl Fn(&dyn StreamCallback),
    ) {
        for callback in self.callbacks() {
            let live = deliverable(&*self.state());
            if !live {
                return;
            }
            f(callback.as_ref());
        }
    }

    pub(crate) fn emit_data(&self, chunk: &Chunk) {
        self.emit_while(SessionState::is_live, |callback| callback.on_data(chunk));
    }

    /// Classify an incoming producer and wire its listeners
    ///
    /// Eager sources are wrapped so nothing they emit escapes before activation.
    /// The size check listens on the raw source, the relay on the wrapper.
    pub(crate) fn prepare(
        self: &Arc<Self>,
        id: ProducerId,
        producer: Producer,
        pause_streams: bool,
    ) -> Descriptor {
        let kind = match producer {
            Producer::Stream(source) => {
                let deferred = DeferredSource::new(
                    Arc::clone(&source),
                    DeferredOptions {
                        pause_source: pause_streams,
                        max_data_size: None,
                    },
                );
                source.subscribe(Arc::new(SizeCheck::new(Arc::downgrade(self))));
                deferred.subscribe(Arc::new(ProducerRelay::new(Arc::downgrade(self), id)));
                DescriptorKind::Stream(StreamEntry {
                    source: deferred,
                    prewrapped: false,
                    has_size_listener: true,
                })
            }
            Producer::Deferred(deferred) => {
                deferred.subscribe(Arc::new(ProducerRelay::new(Arc::downgrade(self), id)));
                DescriptorKind::Stream(StreamEntry {
                    source: deferred,
                    prewrapped: true,
                    has_size_listener: false,
                })
            }
            Producer::Literal(chunk) => DescriptorKind::Literal(chunk),
            Producer::Lazy(factory) => DescriptorKind::Lazy(factory),
        };
        Descriptor { id, kind }
    }

    /// Forward data from a stream producer, but only while it is the active one
    pub(crate) fn relay_data(&self, id: ProducerId, chunk: &Chunk) {
        {
            let state = self.state();
            if !state.is_live() || !state.is_active(id) {
                log::trace!("[ConcatStream] Dropping data from inactive producer {}", id);
                return;
            }
        }
        self.emit_while(
            |state| state.is_live() && state.is_active(id),
            |callback| callback.on_data(chunk),
        );
    }

    /// End of a stream producer; the check and the move to the next producer
    /// happen under one lock, so a duplicate end racing in from another thread
    /// cannot skip the producer that replaced it
    pub(crate) fn producer_ended(self: &Arc<Self>, id: ProducerId) {
        log::trace!("[ConcatStream] Producer {} ended", id);
        self.advance_from(id);
    }

    pub(crate) fn producer_failed(&self, id: ProducerId, error: &ChainError) {
        if !self.state().is_live() {
            return;
        }
        log::warn!("[ConcatStream] Producer {} failed: {}", id, error);
        self.fail(error.clone());
    }

    /// Recompute the pending size after raw data was emitted somewhere
    pub(crate) fn check_data_size(&self) {
        let result = {
            let mut guard = self.state();
            if !guard.is_live() {
                return;
            }
            let state = &mut *guard;
            let active = state.active.as_ref().and_then(Active::stream);
            state.size.recompute(state.queue.stream_sources(), active)
        };
        if let Err(error) = result {
            log::warn!("[ConcatStream] {}", error);
            self.fail(error);
        }
    }

    /// Move into a terminal state; false if one was already reached
    fn terminate(&self, terminal: Terminal) -> bool {
        let abandoned = {
            let mut state = self.state();
            if let Some(existing) = state.terminal {
                log::debug!(
                    "[ConcatStream] Ignoring {:?}, session already {:?}",
                    terminal,
                    existing
                );
                return false;
            }
            state.terminal = Some(terminal);
            state.writable = false;
            state.size.reset();
            (std::mem::take(&mut state.queue), state.active.take())
        };
        log::debug!(
            "[ConcatStream] Session {:?}, abandoning {} queued producers",
            terminal,
            abandoned.0.len()
        );
        // producers may run their own teardown; the session lock is released by now
        drop(abandoned);
        true
    }

    /// reset-then-error
    pub(crate) fn fail(&self, error: ChainError) {
        if self.terminate(Terminal::Errored) {
            self.emit(|callback| callback.on_error(&error));
        }
    }

    /// reset-then-end
    pub(crate) fn finish(&self) {
        if self.terminate(Terminal::Ended) {
            self.emit(|callback| callback.on_end());
        }
    }

    fn close(&self) {
        if self.terminate(Terminal::Closed) {
            self.emit(|callback| callback.on_close());
        }
    }

    pub(crate) fn pause(&self) {
        let target = {
            let mut state = self.state();
            if !state.is_live() {
                return;
            }
            state.paused = true;
            if state.pause_streams {
                state.active_stream().cloned()
            } else {
                None
            }
        };
        if let Some(source) = target {
            source.pause();
        }
        self.emit_while(SessionState::is_live, |callback| callback.on_pause());
    }

    pub(crate) fn resume(self: &Arc<Self>) {
        let (first, target) = {
            let mut state = self.state();
            if !state.is_live() {
                return;
            }
            state.paused = false;
            let first = !state.released;
            if first {
                state.released = true;
                state.writable = true;
            }
            let target = if !first && state.pause_streams {
                state.active_stream().cloned()
            } else {
                None
            };
            (first, target)
        };
        self.emit_while(SessionState::is_live, |callback| callback.on_resume());
        if first {
            log::debug!("[ConcatStream] Released, starting first producer");
            self.advance();
        }
        if let Some(source) = target {
            source.resume();
        }
    }
}

/// Sequential concatenation of producers into one output
///
/// Cloning yields another handle to the same session. A session is single use:
/// once it has ended, errored or been destroyed it stays that way.
///
/// # Example
///
/// ```rust
/// use stream_concat::core::stream::{ConcatStream, LogSink, Producer};
/// use std::sync::Arc;
///
/// let sink = Arc::new(LogSink::new());
/// let stream = ConcatStream::new();
/// stream
///     .append("header,")
///     .append(Producer::lazy(|next| next.resolve("body,")))
///     .append(b"trailer".to_vec());
/// stream.pipe(sink.clone(), Default::default());
///
/// assert_eq!(sink.data_as_string(), "header,body,trailer");
/// ```
#[derive(Clone)]
pub struct ConcatStream {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for ConcatStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("ConcatStream")
            .field("queued", &state.queue.len())
            .field("active", &state.active.as_ref().map(|active| active.id))
            .field("released", &state.released)
            .field("paused", &state.paused)
            .field("pending_size", &state.size.pending())
            .field("terminal", &state.terminal)
            .finish()
    }
}

impl Default for ConcatStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcatStream {
    /// Session with the default configuration (2 MiB ceiling, pauses propagated)
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        log::debug!(
            "[ConcatStream] Created (max_data_size: {:?}, pause_streams: {})",
            config.max_data_size,
            config.pause_streams
        );
        Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState::new(config)),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether `producer` has flow control (an eager or deferred source)
    pub fn is_stream_like(producer: &Producer) -> bool {
        producer.is_stream_like()
    }

    /// Queue a producer behind everything appended so far
    ///
    /// Nothing is activated here; activation is driven by `resume()`. Appending
    /// to a session that already finished drops the producer.
    pub fn append(&self, producer: impl Into<Producer>) -> &Self {
        let producer = producer.into();
        let (id, pause_streams) = {
            let mut state = self.inner.state();
            if !state.is_live() {
                log::debug!(
                    "[ConcatStream] Ignoring {} producer appended after {:?}",
                    producer.kind(),
                    state.terminal
                );
                return self;
            }
            (state.allocate_id(), state.pause_streams)
        };

        let descriptor = self.inner.prepare(id, producer, pause_streams);
        let mut state = self.inner.state();
        if state.is_live() {
            state.queue.push_back(descriptor);
        }
        self
    }

    /// Register a callback for this session's events
    pub fn subscribe(&self, callback: Arc<dyn StreamCallback>) {
        self.inner
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    /// Send this session's output to `destination` and start it
    ///
    /// When `destination.write` returns `false` the session pauses. [`Writable`]
    /// has no drain notification, so the caller owns resuming: keep a clone of
    /// this handle and call [`resume`](Self::resume) once the destination can
    /// take more.
    pub fn pipe<W>(&self, destination: Arc<W>, options: PipeOptions) -> Arc<W>
    where
        W: Writable + 'static,
    {
        let writable: Arc<dyn Writable> = destination.clone();
        self.subscribe(Arc::new(PipeRelay::new(
            Arc::downgrade(&self.inner),
            writable,
            options.end,
        )));
        self.resume();
        destination
    }

    pub fn pause(&self) {
        self.inner.pause();
    }

    /// Start the session on the first call; afterwards resume the active producer
    pub fn resume(&self) {
        self.inner.resume();
    }

    /// Tear the session down immediately and emit `close`
    pub fn destroy(&self) {
        self.inner.close();
    }

    /// Pending bytes as of the last size check
    pub fn data_size(&self) -> usize {
        self.inner.state().size.pending()
    }

    pub fn max_data_size(&self) -> Option<usize> {
        self.inner.state().size.ceiling()
    }

    pub fn pause_streams(&self) -> bool {
        self.inner.state().pause_streams
    }

    pub fn is_writable(&self) -> bool {
        self.inner.state().writable
    }

    pub fn is_released(&self) -> bool {
        self.inner.state().released
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state().paused
    }

    /// Producers appended but not yet activated
    pub fn queued_len(&self) -> usize {
        self.inner.state().queue.len()
    }

    pub fn terminal(&self) -> Option<Terminal> {
        self.inner.state().terminal
    }
}
