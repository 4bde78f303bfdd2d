// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! agiraph-store: the persistent side of an agent.
//!
//! Owns the on-disk layout (agent home, runs, node dirs, worker dirs), the
//! append-only event journal, conversation logs, and trigger persistence.
//! The filesystem is the shared durable state; everything in-memory can be
//! rebuilt from these files.

pub mod conversation;
pub mod journal;
pub mod scope;
pub mod triggers;

pub use conversation::ConversationLog;
pub use journal::EventLog;
pub use scope::{Scope, ScopeStore};
pub use triggers::TriggerStore;

/// Returns a preview of `s` limited to `max` bytes, truncated at a UTF-8
/// character boundary.
pub fn preview(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod preview_tests {
    use super::preview;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(preview("abc", 512), "abc");
    }

    #[test]
    fn truncates_at_byte_cap() {
        let s = "x".repeat(600);
        assert_eq!(preview(&s, 512).len(), 512);
    }

    #[test]
    fn respects_utf8_boundaries() {
        // Each '€' is 3 bytes; a cap of 4 must back off to the first char.
        let s = "€€";
        assert_eq!(preview(s, 4), "€");
    }
}
