// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Configuration Module
//!
//! Layered property resolution for concatenation sessions. Settings can come from
//! Rust defaults, a TOML file, or explicit caller overrides, and are merged by
//! priority.
//!
//! ## Configuration Sources (Priority: Low to High)
//!
//! 1. **RustDefault** - Built-in Rust defaults
//! 2. **TomlFile** - Values read from a TOML document
//! 3. **Explicit** - Values set directly by the caller

pub mod session_config;

pub use self::session_config::{SessionConfig, DEFAULT_MAX_DATA_SIZE};

use std::collections::HashMap;

/// Property source identifier with priority ordering
///
/// Higher priority sources override lower priority sources during configuration merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertySource {
    /// Rust code defaults (priority: 0)
    RustDefault,
    /// TOML document (priority: 1)
    TomlFile,
    /// Caller override (priority: 2)
    Explicit,
}

impl PropertySource {
    /// Get numeric priority for comparison (higher = more important)
    #[inline]
    pub const fn priority(&self) -> u8 {
        match self {
            PropertySource::RustDefault => 0,
            PropertySource::TomlFile => 1,
            PropertySource::Explicit => 2,
        }
    }

    #[inline]
    pub const fn description(&self) -> &'static str {
        match self {
            PropertySource::RustDefault => "Rust default",
            PropertySource::TomlFile => "TOML file",
            PropertySource::Explicit => "explicit override",
        }
    }
}

/// Flat key-value configuration with source tracking
///
/// Uses priority-based merging: higher priority sources override lower priority sources.
#[derive(Debug, Clone, Default)]
pub struct FlatConfig {
    properties: HashMap<String, String>,
    sources: HashMap<String, PropertySource>,
}

impl FlatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration where every property comes from the same source
    pub fn from_properties(properties: &HashMap<String, String>, source: PropertySource) -> Self {
        let mut config = Self::new();
        for (key, value) in properties {
            config.set(key.clone(), value.clone(), source);
        }
        config
    }

    /// Set a property with source tracking and priority-based override
    ///
    /// Only sets the value if the new source has equal or higher priority than the existing source.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        source: PropertySource,
    ) {
        let key = key.into();
        if let Some(existing) = self.sources.get(&key) {
            if existing.priority() > source.priority() {
                return;
            }
        }
        self.properties.insert(key.clone(), value.into());
        self.sources.insert(key, source);
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&String> {
        self.properties.get(key)
    }

    /// Get a property value with its source
    pub fn get_with_source(&self, key: &str) -> Option<(&String, PropertySource)> {
        self.properties
            .get(key)
            .and_then(|value| self.sources.get(key).map(|source| (value, *source)))
    }

    /// Merge another configuration into this one (respects priorities)
    pub fn merge(&mut self, other: &FlatConfig) {
        for (key, value) in &other.properties {
            if let Some(source) = other.sources.get(key) {
                self.set(key.clone(), value.clone(), *source);
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
