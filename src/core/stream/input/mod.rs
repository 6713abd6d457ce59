// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod source;

pub use self::source::{DeferredOptions, DeferredSource, Source, SourceEvent, SourceListener};
