// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazy producers resolved synchronously, asynchronously and too late

use stream_concat::core::config::SessionConfig;
use stream_concat::core::error::ChainError;
use stream_concat::core::stream::{
    ChannelSink, ConcatStream, Continuation, LogSink, Producer, SessionEvent, Terminal,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

mod common;
use common::{init_logging, ManualSource, MemorySource};

fn recorded_session() -> (ConcatStream, Arc<LogSink>) {
    init_logging();
    let sink = Arc::new(LogSink::new());
    let stream = ConcatStream::new();
    stream.subscribe(sink.clone());
    (stream, sink)
}

/// Lazy producer that parks its continuation for the test to resolve later
fn parked() -> (Producer, Arc<Mutex<Option<Continuation>>>) {
    let slot = Arc::new(Mutex::new(None));
    let parked = Arc::clone(&slot);
    let producer = Producer::lazy(move |next| {
        *parked.lock().unwrap() = Some(next);
    });
    (producer, slot)
}

fn nested(depth: usize) -> Producer {
    if depth == 0 {
        Producer::from("bottom")
    } else {
        Producer::lazy(move |next| next.resolve(nested(depth - 1)))
    }
}

#[test]
fn synchronous_resolution_keeps_order() {
    let (stream, sink) = recorded_session();
    stream
        .append("a")
        .append(Producer::lazy(|next| next.resolve("b")))
        .append("c");
    stream.resume();

    assert_eq!(sink.data(), vec!["a", "b", "c"]);
    assert_eq!(sink.event_names(), vec!["resume", "data", "data", "data", "end"]);
}

#[test]
fn lazy_can_resolve_to_a_stream() {
    let (stream, sink) = recorded_session();
    let source = MemorySource::new("lazy", &["s1", "s2"]);
    let handed_out = source.clone();
    stream
        .append(Producer::lazy(move |next| {
            next.resolve(Producer::Stream(handed_out))
        }))
        .append("tail");
    stream.resume();

    assert_eq!(sink.data(), vec!["s1", "s2", "tail"]);
    assert!(source.is_finished());
    assert_eq!(stream.terminal(), Some(Terminal::Ended));
}

#[test]
fn deep_lazy_chain_does_not_recurse() {
    let (stream, sink) = recorded_session();
    stream.append(nested(2_000)).append("!");
    stream.resume();

    assert_eq!(sink.data(), vec!["bottom", "!"]);
    assert_eq!(sink.terminal_count(), 1);
}

#[test]
fn asynchronous_resolution_from_another_thread() {
    init_logging();
    let (sink, events) = ChannelSink::unbounded();
    let stream = ConcatStream::new();
    stream.subscribe(Arc::new(sink));
    stream
        .append("a")
        .append(Producer::lazy(|next| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                next.resolve("b");
            });
        }))
        .append("c");
    stream.resume();

    let mut names = Vec::new();
    let mut data = String::new();
    loop {
        let event = events
            .recv_timeout(Duration::from_secs(5))
            .expect("session stalled");
        names.push(event.name());
        match event {
            SessionEvent::Data(chunk) => data.push_str(&chunk.to_text()),
            SessionEvent::End => break,
            _ => {}
        }
    }

    assert_eq!(names, vec!["resume", "data", "data", "data", "end"]);
    assert_eq!(data, "abc");
    assert_eq!(stream.terminal(), Some(Terminal::Ended));
}

#[test]
fn session_waits_for_pending_resolution() {
    let (stream, sink) = recorded_session();
    let (producer, slot) = parked();
    stream.append("a").append(producer).append("c");
    stream.resume();

    assert_eq!(sink.data(), vec!["a"]);
    assert!(stream.terminal().is_none());
    assert_eq!(stream.queued_len(), 1);

    let next = slot.lock().unwrap().take().unwrap();
    next.resolve("b");

    assert_eq!(sink.data(), vec!["a", "b", "c"]);
    assert_eq!(sink.terminal_count(), 1);
}

#[test]
fn resolution_after_destroy_is_dropped() {
    let (stream, sink) = recorded_session();
    let (producer, slot) = parked();
    stream.append(producer).append("never");
    stream.resume();
    stream.destroy();

    let next = slot.lock().unwrap().take().unwrap();
    next.resolve("late");

    assert_eq!(sink.event_names(), vec!["resume", "close"]);
    assert_eq!(stream.terminal(), Some(Terminal::Closed));
}

#[test]
fn resolution_after_session_dropped_is_harmless() {
    let (stream, sink) = recorded_session();
    let (producer, slot) = parked();
    stream.append(producer);
    stream.resume();
    drop(stream);

    let next = slot.lock().unwrap().take().unwrap();
    next.resolve("orphan");

    assert_eq!(sink.event_names(), vec!["resume"]);
}

#[test]
fn failed_resolution_is_fatal() {
    let (stream, sink) = recorded_session();
    stream
        .append("a")
        .append(Producer::lazy(|next| {
            next.fail(ChainError::upstream("lookup failed"))
        }))
        .append("never");
    stream.resume();

    assert_eq!(sink.event_names(), vec!["resume", "data", "error"]);
    assert_eq!(stream.terminal(), Some(Terminal::Errored));
    assert_eq!(stream.queued_len(), 0);
}

#[test]
fn continuations_carry_distinct_ids() {
    let (stream, _sink) = recorded_session();
    let (first, first_slot) = parked();
    let (second, second_slot) = parked();
    stream.append(first).append(second);
    stream.resume();

    let first_next = first_slot.lock().unwrap().take().unwrap();
    let first_id = first_next.id();
    first_next.resolve("one");

    let second_next = second_slot.lock().unwrap().take().unwrap();
    assert_ne!(first_id, second_next.id());
    second_next.resolve("two");

    assert_eq!(stream.terminal(), Some(Terminal::Ended));
}

#[test]
fn error_from_a_resolved_stream_is_fatal() {
    let (stream, sink) = recorded_session();
    let failing = MemorySource::failing("lazy", &["partial"], ChainError::upstream("reset"));
    stream
        .append(Producer::lazy(move |next| {
            next.resolve(Producer::Stream(failing))
        }))
        .append("never");
    stream.resume();

    assert_eq!(sink.event_names(), vec!["resume", "data", "error"]);
    assert_eq!(sink.data(), vec!["partial"]);
    assert_eq!(stream.terminal(), Some(Terminal::Errored));
}

#[test]
fn resolved_stream_is_size_checked() {
    init_logging();
    let sink = Arc::new(LogSink::new());
    let stream = ConcatStream::with_config(SessionConfig::default().with_max_data_size(4));
    stream.subscribe(sink.clone());
    let (producer, slot) = parked();
    stream.append(producer);
    stream.resume();

    // paused, so the resolved stream is activated but held in its wrapper
    stream.pause();
    let source = ManualSource::new();
    let next = slot.lock().unwrap().take().unwrap();
    next.resolve(Producer::Stream(source.clone()));
    assert!(source.is_paused());

    source.emit("12345");

    assert_eq!(sink.event_names(), vec!["resume", "pause", "error"]);
    assert!(matches!(
        sink.recorded().last(),
        Some(SessionEvent::Error(ChainError::MaxDataSizeExceeded { limit: 4, size: 5 }))
    ));
}
