// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod channel_sink;
pub mod log_sink;

pub use channel_sink::ChannelSink;
pub use log_sink::LogSink;
