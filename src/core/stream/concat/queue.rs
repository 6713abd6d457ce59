// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending producers, in append order.

use std::collections::VecDeque;
use std::fmt;

use crate::core::stream::chunk::Chunk;
use crate::core::stream::input::source::DeferredSource;
use crate::core::stream::producer::LazyProducer;

/// Identity of an appended producer, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProducerId(pub(crate) u64);

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stream producer as the session tracks it
#[derive(Debug, Clone)]
pub(crate) struct StreamEntry {
    pub source: DeferredSource,
    /// Appended as an already deferred source, so it was not wrapped again
    pub prewrapped: bool,
    /// A size-check listener sits on the raw source
    pub has_size_listener: bool,
}

#[derive(Debug)]
pub(crate) enum DescriptorKind {
    Stream(StreamEntry),
    Literal(Chunk),
    Lazy(LazyProducer),
}

#[derive(Debug)]
pub(crate) struct Descriptor {
    pub id: ProducerId,
    pub kind: DescriptorKind,
}

impl Descriptor {
    pub fn stream_source(&self) -> Option<&DeferredSource> {
        match &self.kind {
            DescriptorKind::Stream(entry) => Some(&entry.source),
            _ => None,
        }
    }
}

/// FIFO of descriptors; never reordered
#[derive(Debug, Default)]
pub(crate) struct SourceQueue {
    entries: VecDeque<Descriptor>,
}

impl SourceQueue {
    pub fn push_back(&mut self, descriptor: Descriptor) {
        self.entries.push_back(descriptor);
    }

    /// Put a descriptor back at the head, ahead of everything appended
    pub fn push_front(&mut self, descriptor: Descriptor) {
        self.entries.push_front(descriptor);
    }

    pub fn pop_front(&mut self) -> Option<Descriptor> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Stream sources still waiting, in queue order
    pub fn stream_sources(&self) -> impl Iterator<Item = &DeferredSource> {
        self.entries.iter().filter_map(Descriptor::stream_source)
    }
}
