// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative cancellation primitive.
//!
//! Every loop observes its flag at each yield point and between tool
//! calls; a set flag surfaces as [`KernelError::Cancelled`], which is
//! caught gracefully at every level and never reported as a failure.

use agiraph_core::KernelError;
use tokio_util::sync::CancellationToken;

/// Cloneable cooperative stop flag. Child flags stop when the parent does.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    token: CancellationToken,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A child flag: stopped by its own `stop()` or by any ancestor's.
    pub fn child(&self) -> Self {
        Self { token: self.token.child_token() }
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Raise `Cancelled` if the flag is set; the yield-point check.
    pub fn check(&self) -> Result<(), KernelError> {
        if self.is_stopped() {
            Err(KernelError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the flag is set. Used in `select!` around provider
    /// calls and subprocess waits so cancellation interrupts them.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
