// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::core::error::ChainError;
use crate::core::stream::chunk::Chunk;
use crate::core::stream::output::{SessionEvent, StreamCallback, Writable};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// LogSink - Debug sink that logs session events to the log system
///
/// Every event is logged at info level and recorded in `events`, which makes
/// the sink useful both for development and as a test recorder.
#[derive(Debug, Clone)]
pub struct LogSink {
    pub events: Arc<Mutex<Vec<SessionEvent>>>,
    prefix: String,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink {
    pub fn new() -> Self {
        Self::with_prefix("[LOG]")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            prefix: prefix.into(),
        }
    }

    /// Snapshot of everything recorded so far
    pub fn recorded(&self) -> Vec<SessionEvent> {
        self.lock().clone()
    }

    /// Names of the recorded events, e.g. `["data", "data", "end"]`
    pub fn event_names(&self) -> Vec<&'static str> {
        self.lock().iter().map(SessionEvent::name).collect()
    }

    /// Recorded data chunks as text, in order
    pub fn data(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Data(chunk) => Some(chunk.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Recorded data concatenated into one string
    pub fn data_as_string(&self) -> String {
        self.data().concat()
    }

    /// Number of terminal events recorded
    pub fn terminal_count(&self) -> usize {
        self.lock().iter().filter(|event| event.is_terminal()).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SessionEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: SessionEvent) {
        match &event {
            SessionEvent::Data(chunk) => log::info!("{} data {:?}", self.prefix, chunk.to_text()),
            SessionEvent::Error(error) => log::info!("{} error: {}", self.prefix, error),
            other => log::info!("{} {}", self.prefix, other.name()),
        }
        self.lock().push(event);
    }
}

impl StreamCallback for LogSink {
    fn on_data(&self, chunk: &Chunk) {
        self.record(SessionEvent::Data(chunk.clone()));
    }

    fn on_pause(&self) {
        self.record(SessionEvent::Pause);
    }

    fn on_resume(&self) {
        self.record(SessionEvent::Resume);
    }

    fn on_end(&self) {
        self.record(SessionEvent::End);
    }

    fn on_error(&self, error: &ChainError) {
        self.record(SessionEvent::Error(error.clone()));
    }

    fn on_close(&self) {
        self.record(SessionEvent::Close);
    }
}

impl Writable for LogSink {
    fn write(&self, chunk: &Chunk) -> bool {
        self.record(SessionEvent::Data(chunk.clone()));
        true
    }

    fn end(&self) {
        self.record(SessionEvent::End);
    }
}
