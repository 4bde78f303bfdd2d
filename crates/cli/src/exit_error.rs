// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error-to-exit-code mapping.
//!
//! Only startup failures exit non-zero; everything that happens after an
//! agent is running is reported through events instead.

use agiraph_core::KernelError;

/// Startup failures (missing keys, unparseable config).
pub const EXIT_CONFIG: i32 = 2;
/// Any other pre-run failure.
pub const EXIT_FAILURE: i32 = 1;

pub fn exit_code(error: &KernelError) -> i32 {
    match error {
        KernelError::Config(_) => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}
