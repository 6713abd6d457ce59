// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Deferred Source
//!
//! Wraps an eager source and holds everything it emits until the wrapper is
//! resumed for the first time. Held events are replayed in order on release,
//! after which the wrapper forwards live events.
//!
//! ## Flow
//!
//! ```text
//! inner Source ──▶ buffer (until released) ──▶ replay ──▶ listeners
//!                        │
//!                        └── data_size += chunk.len()
//! ```
//!
//! The buffer is drained by a single trampoline: events that arrive while a
//! replay is running (for example because a listener resumed the inner source
//! synchronously) queue up behind it instead of overtaking it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::{Source, SourceEvent, SourceListener};
use crate::core::error::ChainError;
use crate::core::stream::chunk::Chunk;

/// Construction options for [`DeferredSource`]
#[derive(Debug, Clone, Copy)]
pub struct DeferredOptions {
    /// Pause the inner source as soon as it is wrapped
    pub pause_source: bool,
    /// Error out once more than this many bytes were buffered; `None` is unlimited
    pub max_data_size: Option<usize>,
}

impl Default for DeferredOptions {
    fn default() -> Self {
        Self {
            pause_source: true,
            max_data_size: Some(1024 * 1024),
        }
    }
}

#[derive(Default)]
struct DeferredState {
    released: bool,
    paused: bool,
    draining: bool,
    data_size: usize,
    buffered: VecDeque<SourceEvent>,
    listeners: Vec<Arc<dyn SourceListener>>,
}

struct DeferredInner {
    source: Arc<dyn Source>,
    max_data_size: Option<usize>,
    state: Mutex<DeferredState>,
}

/// Buffering wrapper around a [`Source`]; cloning yields another handle to the same wrapper
#[derive(Clone)]
pub struct DeferredSource {
    inner: Arc<DeferredInner>,
}

impl fmt::Debug for DeferredSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("DeferredSource")
            .field("source", &self.inner.source)
            .field("released", &state.released)
            .field("paused", &state.paused)
            .field("data_size", &state.data_size)
            .field("buffered", &state.buffered.len())
            .finish()
    }
}

/// Listener registered on the inner source; weak so the source does not keep the wrapper alive
struct UpstreamListener {
    wrapper: Weak<DeferredInner>,
}

impl SourceListener for UpstreamListener {
    fn on_data(&self, chunk: &Chunk) {
        if let Some(inner) = self.wrapper.upgrade() {
            inner.handle_upstream(SourceEvent::Data(chunk.clone()));
        }
    }

    fn on_end(&self) {
        if let Some(inner) = self.wrapper.upgrade() {
            inner.handle_upstream(SourceEvent::End);
        }
    }

    fn on_error(&self, error: &ChainError) {
        if let Some(inner) = self.wrapper.upgrade() {
            inner.handle_upstream(SourceEvent::Error(error.clone()));
        }
    }
}

impl DeferredSource {
    /// Wrap `source`, subscribing to it immediately
    pub fn new(source: Arc<dyn Source>, options: DeferredOptions) -> Self {
        let inner = Arc::new(DeferredInner {
            source: Arc::clone(&source),
            max_data_size: options.max_data_size,
            state: Mutex::new(DeferredState::default()),
        });
        source.subscribe(Arc::new(UpstreamListener {
            wrapper: Arc::downgrade(&inner),
        }));
        if options.pause_source {
            source.pause();
        }
        Self { inner }
    }

    /// The wrapped source
    pub fn source(&self) -> &Arc<dyn Source> {
        &self.inner.source
    }

    /// Bytes received while the wrapper was still holding events
    pub fn data_size(&self) -> usize {
        self.inner.state().data_size
    }

    pub fn is_released(&self) -> bool {
        self.inner.state().released
    }

    /// Number of events waiting to be replayed
    pub fn buffered_len(&self) -> usize {
        self.inner.state().buffered.len()
    }

    /// Whether two handles refer to the same wrapper
    pub fn ptr_eq(&self, other: &DeferredSource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Source for DeferredSource {
    fn subscribe(&self, listener: Arc<dyn SourceListener>) {
        self.inner.state().listeners.push(listener);
    }

    fn pause(&self) {
        self.inner.state().paused = true;
        self.inner.source.pause();
    }

    fn resume(&self) {
        {
            let mut state = self.inner.state();
            state.paused = false;
            state.released = true;
        }
        self.inner.drain();
        self.inner.source.resume();
    }
}

impl DeferredInner {
    fn state(&self) -> MutexGuard<'_, DeferredState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_upstream(&self, event: SourceEvent) {
        let overflow = {
            let mut state = self.state();
            let mut overflow = None;
            if !state.released {
                if let SourceEvent::Data(chunk) = &event {
                    state.data_size += chunk.len();
                    if let Some(limit) = self.max_data_size {
                        if state.data_size > limit {
                            overflow = Some((
                                ChainError::max_data_size_exceeded(limit, state.data_size),
                                state.listeners.clone(),
                            ));
                        }
                    }
                }
            }
            state.buffered.push_back(event);
            overflow
        };

        if let Some((error, listeners)) = overflow {
            log::warn!("[DeferredSource] {}", error);
            SourceEvent::Error(error).dispatch(&listeners);
        }
        self.drain();
    }

    /// Replay buffered events until the buffer is empty, the wrapper is paused,
    /// or it has not been released yet. Only one drain runs at a time.
    fn drain(&self) {
        {
            let mut state = self.state();
            if state.draining {
                return;
            }
            state.draining = true;
        }
        loop {
            let next = {
                let mut state = self.state();
                let next = if state.released && !state.paused {
                    state.buffered.pop_front()
                } else {
                    None
                };
                match next {
                    Some(event) => Some((event, state.listeners.clone())),
                    None => {
                        state.draining = false;
                        None
                    }
                }
            };
            let Some((event, listeners)) = next else {
                break;
            };
            event.dispatch(&listeners);
        }
    }
}
