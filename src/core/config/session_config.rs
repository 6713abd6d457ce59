// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session configuration for [`ConcatStream`](crate::core::stream::ConcatStream).
//!
//! ## Properties
//!
//! | key | values | default |
//! |---|---|---|
//! | `max-data-size` | bytes, or `unlimited` / `infinity` | 2 MiB |
//! | `pause-streams` | `true` / `false` | `true` |
//!
//! The TOML form uses `max_data_size` and `pause_streams`:
//!
//! ```toml
//! max_data_size = 65536
//! pause_streams = false
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use super::{FlatConfig, PropertySource};
use crate::core::error::{ChainError, ChainResult};

/// Default ceiling for pending data: 2 MiB
pub const DEFAULT_MAX_DATA_SIZE: usize = 2 * 1024 * 1024;

const KEY_MAX_DATA_SIZE: &str = "max-data-size";
const KEY_PAUSE_STREAMS: &str = "pause-streams";

/// Options recognised by a concatenation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Ceiling for the aggregate pending byte count; `None` is unbounded
    pub max_data_size: Option<usize>,
    /// Whether pause/resume on the session is relayed to the active producer
    pub pause_streams: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_data_size: Some(DEFAULT_MAX_DATA_SIZE),
            pause_streams: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLimit {
    Bytes(u64),
    Keyword(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSessionConfig {
    max_data_size: Option<RawLimit>,
    pause_streams: Option<bool>,
}

impl SessionConfig {
    pub fn with_max_data_size(mut self, limit: usize) -> Self {
        self.max_data_size = Some(limit);
        self
    }

    /// Remove the size ceiling entirely
    pub fn unbounded(mut self) -> Self {
        self.max_data_size = None;
        self
    }

    pub fn with_pause_streams(mut self, pause_streams: bool) -> Self {
        self.pause_streams = pause_streams;
        self
    }

    /// Create a configuration from string properties, on top of the defaults
    ///
    /// # Properties
    /// - `max-data-size`: byte ceiling, or `unlimited`
    /// - `pause-streams`: `true` or `false`
    pub fn from_properties(properties: &HashMap<String, String>) -> ChainResult<Self> {
        Self::from_flat_config(&FlatConfig::from_properties(
            properties,
            PropertySource::Explicit,
        ))
    }

    /// Resolve a configuration from layered properties
    ///
    /// Keys missing from `config` fall back to the Rust defaults.
    pub fn from_flat_config(config: &FlatConfig) -> ChainResult<Self> {
        let mut resolved = Self::defaults_as_flat_config();
        resolved.merge(config);

        let max_data_size = match resolved.get(KEY_MAX_DATA_SIZE) {
            Some(value) => parse_limit(value)?,
            None => Some(DEFAULT_MAX_DATA_SIZE),
        };
        let pause_streams = match resolved.get(KEY_PAUSE_STREAMS) {
            Some(value) => parse_bool(KEY_PAUSE_STREAMS, value)?,
            None => true,
        };

        Ok(Self {
            max_data_size,
            pause_streams,
        })
    }

    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(document: &str) -> ChainResult<Self> {
        let raw: RawSessionConfig = toml::from_str(document).map_err(|e| {
            ChainError::configuration(format!("Failed to parse session TOML: {}", e))
        })?;

        let mut config = FlatConfig::new();
        match raw.max_data_size {
            Some(RawLimit::Bytes(bytes)) => {
                config.set(KEY_MAX_DATA_SIZE, bytes.to_string(), PropertySource::TomlFile)
            }
            Some(RawLimit::Keyword(word)) => {
                config.set(KEY_MAX_DATA_SIZE, word, PropertySource::TomlFile)
            }
            None => {}
        }
        if let Some(pause_streams) = raw.pause_streams {
            config.set(
                KEY_PAUSE_STREAMS,
                pause_streams.to_string(),
                PropertySource::TomlFile,
            );
        }

        Self::from_flat_config(&config)
    }

    fn defaults_as_flat_config() -> FlatConfig {
        let defaults = Self::default();
        let mut config = FlatConfig::new();
        config.set(
            KEY_MAX_DATA_SIZE,
            DEFAULT_MAX_DATA_SIZE.to_string(),
            PropertySource::RustDefault,
        );
        config.set(
            KEY_PAUSE_STREAMS,
            defaults.pause_streams.to_string(),
            PropertySource::RustDefault,
        );
        config
    }
}

fn parse_limit(value: &str) -> ChainResult<Option<usize>> {
    let trimmed = value.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "unlimited" | "infinity" | "inf" => Ok(None),
        _ => trimmed.parse::<usize>().map(Some).map_err(|e| {
            ChainError::invalid_parameter_with_details(
                format!("Invalid max-data-size '{}': {}", value, e),
                KEY_MAX_DATA_SIZE,
                "a byte count or 'unlimited'",
            )
        }),
    }
}

fn parse_bool(key: &str, value: &str) -> ChainResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ChainError::invalid_parameter_with_details(
            format!("Invalid boolean '{}'", value),
            key,
            "'true' or 'false'",
        )),
    }
}
