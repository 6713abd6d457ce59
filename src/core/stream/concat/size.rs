// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate pending-size tracking with a hard ceiling.

use crate::core::error::{ChainError, ChainResult};
use crate::core::stream::input::source::DeferredSource;

/// Sums the bytes held by queued and active stream producers
///
/// Exceeding the ceiling is fatal for the session; it is not a backpressure signal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SizeAccountant {
    ceiling: Option<usize>,
    pending: usize,
}

impl SizeAccountant {
    pub fn new(ceiling: Option<usize>) -> Self {
        Self {
            ceiling,
            pending: 0,
        }
    }

    #[inline]
    pub fn ceiling(&self) -> Option<usize> {
        self.ceiling
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn reset(&mut self) {
        self.pending = 0;
    }

    /// Recompute from scratch over every stream the session still holds
    pub fn recompute<'a>(
        &mut self,
        queued: impl Iterator<Item = &'a DeferredSource>,
        active: Option<&'a DeferredSource>,
    ) -> ChainResult<usize> {
        let size: usize = queued.chain(active).map(DeferredSource::data_size).sum();
        self.pending = size;
        match self.ceiling {
            Some(limit) if size > limit => Err(ChainError::max_data_size_exceeded(limit, size)),
            _ => Ok(size),
        }
    }
}
