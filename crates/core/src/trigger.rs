// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger definitions: time-driven and event-driven wakeups.
//!
//! Triggers are persisted to `triggers.json` and re-registered on agent
//! startup. Schedules are interval strings (`"30s"`, `"5m"`, `"1h"`)
//! parsed by [`crate::interval::parse_interval`].

use crate::agent::AgentId;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a trigger.
    pub struct TriggerId("trg-");
}

/// The six trigger kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerKind {
    /// Fires repeatedly; the next fire time is recomputed from the wall
    /// clock after each fire so drift does not accumulate.
    Scheduled { every: String },
    /// Fires once, `after_ms` milliseconds after registration.
    Delayed { after_ms: u64 },
    /// Fires once at an absolute epoch-milliseconds instant.
    AtTime { at_ms: u64 },
    /// Fires forever on a fixed sleep between fires.
    Heartbeat { every: String },
    /// Fires on matching events. `pattern` matches the dotted event type
    /// (`"node.completed"`, or a `"node.*"` prefix wildcard); `filter`, if
    /// set, must appear as a substring of the serialized event.
    OnEvent {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<String>,
    },
    /// Fires when the agent has had no yield-point or tool activity for
    /// longer than the threshold; resets after firing.
    OnIdle { threshold_ms: u64 },
}

impl TriggerKind {
    /// True for kinds that fire at most once.
    pub fn is_one_shot(&self) -> bool {
        matches!(self, TriggerKind::Delayed { .. } | TriggerKind::AtTime { .. })
    }

    /// The dotted kind name as persisted and logged.
    pub fn name(&self) -> &'static str {
        match self {
            TriggerKind::Scheduled { .. } => "scheduled",
            TriggerKind::Delayed { .. } => "delayed",
            TriggerKind::AtTime { .. } => "at_time",
            TriggerKind::Heartbeat { .. } => "heartbeat",
            TriggerKind::OnEvent { .. } => "on_event",
            TriggerKind::OnIdle { .. } => "on_idle",
        }
    }
}

/// What a firing trigger does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TriggerAction {
    /// Appends a system message with the task text to the coordinator's inbox.
    WakeAgent { task: String },
    /// Sets the node back to pending and kicks the scheduler.
    RunNode { node_id: NodeId },
    /// Sends a bus message from `"system"`.
    SendMessage { to: String, content: String },
}

/// Lifecycle status of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    Active,
    Paused,
    /// One-shot trigger that has fired.
    Expired,
    Fired,
}

crate::simple_display! {
    TriggerStatus {
        Active => "active",
        Paused => "paused",
        Expired => "expired",
        Fired => "fired",
    }
}

/// A registered trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: TriggerId,
    pub agent_id: AgentId,
    #[serde(flatten)]
    pub kind: TriggerKind,
    #[serde(flatten)]
    pub action: TriggerAction,
    pub status: TriggerStatus,
    pub created_at_ms: u64,
}

impl Trigger {
    pub fn new(agent_id: AgentId, kind: TriggerKind, action: TriggerAction, now_ms: u64) -> Self {
        Self {
            id: TriggerId::new(),
            agent_id,
            kind,
            action,
            status: TriggerStatus::Active,
            created_at_ms: now_ms,
        }
    }

    /// Whether a matching event type string satisfies this trigger's pattern.
    /// Only meaningful for `OnEvent` triggers.
    pub fn matches_event_type(&self, event_type: &str) -> bool {
        match &self.kind {
            TriggerKind::OnEvent { pattern, .. } => {
                if let Some(prefix) = pattern.strip_suffix(".*") {
                    event_type.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('.'))
                } else {
                    pattern == event_type
                }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
