// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the runtime kernel.
//!
//! `Cancelled` is not a failure: every loop that catches errors must check
//! [`KernelError::is_cancelled`] before reporting a node or agent as failed.

use thiserror::Error;

/// Errors produced by the kernel and its subsystems.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Missing API key or malformed configuration. Fatal at startup only.
    #[error("config error: {0}")]
    Config(String),

    /// A node add would introduce a dependency cycle.
    #[error("invalid dependency: {0}")]
    InvalidDependency(String),

    /// A tool tried to read or write outside its permitted scope.
    #[error("scope violation: {0}")]
    ScopeViolation(String),

    /// Network timeout, 5xx, or rate limit. Retried once by callers.
    #[error("transient provider error: {0}")]
    ProviderTransient(String),

    /// Non-retriable provider rejection (4xx other than rate limit).
    #[error("provider error: {0}")]
    ProviderPermanent(String),

    /// A tool implementation failed. Local to the calling loop.
    #[error("tool error: {0}")]
    Tool(String),

    /// A worker exceeded its iteration cap.
    #[error("max iterations ({0}) exceeded")]
    MaxIterations(u32),

    /// Cooperative cancellation. Never reported as a failure.
    #[error("cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl KernelError {
    /// True when this error is a cooperative cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KernelError::Cancelled)
    }

    /// True when the provider error class permits one retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, KernelError::ProviderTransient(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
