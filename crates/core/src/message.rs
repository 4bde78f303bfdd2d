// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages exchanged between the human, the coordinator, and workers.

use serde::{Deserialize, Serialize};

/// Reserved participant id for the human.
pub const HUMAN: &str = "human";
/// Reserved participant id for the coordinator; the default recipient.
pub const COORDINATOR: &str = "coordinator";
/// Reserved participant id for kernel-originated messages (trigger wakes).
pub const SYSTEM: &str = "system";
/// Broadcast target: expands to every live non-sender participant.
pub const BROADCAST: &str = "*";

/// A free-form text message between two participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub content: String,
    pub ts: u64,
}

impl Message {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        content: impl Into<String>,
        ts: u64,
    ) -> Self {
        Self { from: from.into(), to: to.into(), content: content.into(), ts }
    }

    /// True when the sender is the human.
    pub fn from_human(&self) -> bool {
        self.from == HUMAN
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
