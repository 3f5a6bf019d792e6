// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the query gateway
//!
//! Every failure a request can hit maps to one of these variants. The
//! transport only needs `status_code()` and `error_code()` to render them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retry hint attached to every rate-limit denial.
pub const RATE_LIMIT_RETRY_AFTER_MS: u64 = 1_000;

/// Unified error type for all gateway operations
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{message}")]
    InvalidQuery { message: String },

    #[error("Connector not registered: {source_name}")]
    ConnectorNotRegistered {
        #[serde(rename = "source")]
        source_name: String,
    },

    #[error("Rate limit exhausted for {source_name}")]
    RateLimitExhausted {
        #[serde(rename = "source")]
        source_name: String,
        retry_after_ms: u64,
    },

    #[error("Connector '{source_name}' failed: {message}")]
    ConnectorFailure {
        #[serde(rename = "source")]
        source_name: String,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl GatewayError {
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery { message: msg.into() }
    }

    pub fn not_registered(source: impl Into<String>) -> Self {
        Self::ConnectorNotRegistered {
            source_name: source.into(),
        }
    }

    pub fn rate_limited(source: impl Into<String>) -> Self {
        Self::RateLimitExhausted {
            source_name: source.into(),
            retry_after_ms: RATE_LIMIT_RETRY_AFTER_MS,
        }
    }

    pub fn connector_failure(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ConnectorFailure {
            source_name: source.into(),
            message: msg.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration { message: msg.into() }
    }

    /// HTTP-style status for the failure body.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RateLimitExhausted { .. } => 429,
            _ => 400,
        }
    }

    /// The source a failure is attributed to, if any.
    pub fn source_name(&self) -> Option<&str> {
        match self {
            Self::ConnectorNotRegistered { source_name }
            | Self::RateLimitExhausted { source_name, .. }
            | Self::ConnectorFailure { source_name, .. } => Some(source_name),
            _ => None,
        }
    }

    /// Machine-readable error code for the failure body.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RateLimitExhausted { .. } => "RATE_LIMIT_EXHAUSTED",
            _ => "QUERY_FAILED",
        }
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
