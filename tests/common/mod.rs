// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test sources for driving a concatenation session.

#![allow(dead_code)]

use stream_concat::core::error::ChainError;
use stream_concat::core::stream::{Chunk, Source, SourceEvent, SourceListener};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Counts how many sources are emitting at the same moment
#[derive(Debug, Default)]
pub struct ActivityProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ActivityProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct MemoryState {
    chunks: VecDeque<Chunk>,
    fail_with: Option<ChainError>,
    paused: bool,
    emitting: bool,
    started: bool,
    finished: bool,
    listeners: Vec<Arc<dyn SourceListener>>,
    pause_calls: usize,
    resume_calls: usize,
}

/// Emits its chunks synchronously from `resume()` until paused, then ends (or fails)
pub struct MemorySource {
    name: String,
    state: Mutex<MemoryState>,
    probe: Option<Arc<ActivityProbe>>,
}

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl MemorySource {
    pub fn new(name: &str, chunks: &[&str]) -> Arc<Self> {
        Self::build(name, chunks, None, None)
    }

    /// Emits `chunks`, then reports `error` instead of ending
    pub fn failing(name: &str, chunks: &[&str], error: ChainError) -> Arc<Self> {
        Self::build(name, chunks, Some(error), None)
    }

    pub fn probed(name: &str, chunks: &[&str], probe: Arc<ActivityProbe>) -> Arc<Self> {
        Self::build(name, chunks, None, Some(probe))
    }

    fn build(
        name: &str,
        chunks: &[&str],
        fail_with: Option<ChainError>,
        probe: Option<Arc<ActivityProbe>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            state: Mutex::new(MemoryState {
                chunks: chunks.iter().map(|c| Chunk::from(*c)).collect(),
                fail_with,
                ..Default::default()
            }),
            probe,
        })
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().unwrap().pause_calls
    }

    pub fn resume_calls(&self) -> usize {
        self.state.lock().unwrap().resume_calls
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().unwrap().finished
    }

    fn pump(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.emitting {
                return;
            }
            state.emitting = true;
        }
        loop {
            let step = {
                let mut state = self.state.lock().unwrap();
                if state.paused || state.finished {
                    state.emitting = false;
                    None
                } else {
                    let first = !state.started;
                    state.started = true;
                    let event = match state.chunks.pop_front() {
                        Some(chunk) => SourceEvent::Data(chunk),
                        None => {
                            state.finished = true;
                            match state.fail_with.take() {
                                Some(error) => SourceEvent::Error(error),
                                None => SourceEvent::End,
                            }
                        }
                    };
                    Some((first, event, state.listeners.clone()))
                }
            };
            let Some((first, event, listeners)) = step else {
                break;
            };
            if let Some(probe) = &self.probe {
                if first {
                    probe.enter();
                }
                if !matches!(event, SourceEvent::Data(_)) {
                    probe.leave();
                }
            }
            event.dispatch(&listeners);
        }
    }
}

impl Source for MemorySource {
    fn subscribe(&self, listener: Arc<dyn SourceListener>) {
        self.state.lock().unwrap().listeners.push(listener);
    }

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        state.paused = true;
        state.pause_calls += 1;
    }

    fn resume(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.paused = false;
            state.resume_calls += 1;
        }
        self.pump();
    }
}

/// Source that only emits when the test tells it to, regardless of pause state
#[derive(Default)]
pub struct ManualSource {
    listeners: Mutex<Vec<Arc<dyn SourceListener>>>,
    paused: Mutex<bool>,
}

impl fmt::Debug for ManualSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualSource").finish_non_exhaustive()
    }
}

impl ManualSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn emit(&self, chunk: impl Into<Chunk>) {
        SourceEvent::Data(chunk.into()).dispatch(&self.snapshot());
    }

    pub fn end(&self) {
        SourceEvent::End.dispatch(&self.snapshot());
    }

    pub fn fail(&self, error: ChainError) {
        SourceEvent::Error(error).dispatch(&self.snapshot());
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock().unwrap()
    }

    fn snapshot(&self) -> Vec<Arc<dyn SourceListener>> {
        self.listeners.lock().unwrap().clone()
    }
}

impl Source for ManualSource {
    fn subscribe(&self, listener: Arc<dyn SourceListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    fn pause(&self) {
        *self.paused.lock().unwrap() = true;
    }

    fn resume(&self) {
        *self.paused.lock().unwrap() = false;
    }
}
