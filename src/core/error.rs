// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream Concatenation Error Types
//!
//! Every fatal condition of a session funnels into a single [`ChainError`] that is
//! delivered to all registered callbacks, so the type is cheaply cloneable.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Result type for stream concatenation operations
pub type ChainResult<T> = Result<T, ChainError>;

/// Shared error source, cloneable across listeners
pub type SharedSource = Arc<dyn StdError + Send + Sync>;

/// Stream concatenation error types
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("Upstream producer error: {message}")]
    Upstream {
        message: String,
        source: Option<SharedSource>,
    },

    #[error("maxDataSize of {limit} bytes exceeded ({size} bytes pending)")]
    MaxDataSizeExceeded { limit: usize, size: usize },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        config_key: Option<String>,
    },

    #[error("Invalid parameter '{parameter:?}': {message}")]
    InvalidParameter {
        message: String,
        parameter: Option<String>,
        expected: Option<String>,
    },

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for ChainError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}

impl ChainError {
    /// Create an upstream producer error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Create an upstream producer error wrapping the error the producer reported
    pub fn upstream_with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Upstream {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Create a size ceiling violation
    pub fn max_data_size_exceeded(limit: usize, size: usize) -> Self {
        Self::MaxDataSizeExceeded { limit, size }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: None,
        }
    }

    /// Create a configuration error with a specific key
    pub fn configuration_with_key(
        message: impl Into<String>,
        config_key: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: Some(config_key.into()),
        }
    }

    /// Create an invalid parameter error with details
    pub fn invalid_parameter_with_details(
        message: impl Into<String>,
        parameter: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            message: message.into(),
            parameter: Some(parameter.into()),
            expected: Some(expected.into()),
        }
    }

    /// Create a generic error from a string
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether this error was raised by the size accountant rather than a producer
    pub fn is_size_violation(&self) -> bool {
        matches!(self, Self::MaxDataSizeExceeded { .. })
    }
}
