// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identity, mode, and lifecycle status.
//!
//! An agent is the top-level long-lived entity: one goal, one coordinator,
//! one on-disk home. The `AgentId` is a caller-provided stable string (it
//! names the home directory), unlike the generated run/node/worker ids.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identifier for an agent. Opaque to consumers; names the agent's
/// home directory under the data root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Whether the agent finishes once or cycles forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Runs until the coordinator calls `finish`.
    Finite,
    /// Never finishes; woken by scheduled or heartbeat triggers.
    Infinite,
}

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Working,
    WaitingForHuman,
    Stopped,
    Completed,
}

impl AgentStatus {
    /// Terminal states: the coordinator loop has exited.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Completed)
    }
}

crate::simple_display! {
    AgentMode {
        Finite => "finite",
        Infinite => "infinite",
    }
}

crate::simple_display! {
    AgentStatus {
        Idle => "idle",
        Working => "working",
        WaitingForHuman => "waiting_for_human",
        Stopped => "stopped",
        Completed => "completed",
    }
}

/// A provider/model pair, written `provider/model`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    /// Parse `"anthropic/claude-sonnet-4-5"` into a provider/model pair.
    /// A bare model name defaults to the `anthropic` provider.
    pub fn parse(s: &str) -> Self {
        match s.split_once('/') {
            Some((provider, model)) => {
                Self { provider: provider.to_string(), model: model.to_string() }
            }
            None => Self { provider: "anthropic".to_string(), model: s.to_string() },
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Creation parameters for an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub goal: String,
    pub mode: AgentMode,
    pub coordinator_model: ModelRef,
}

impl AgentConfig {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            mode: AgentMode::Finite,
            coordinator_model: ModelRef::parse("anthropic/claude-sonnet-4-5"),
        }
    }

    crate::setters! {
        set {
            mode: AgentMode,
            coordinator_model: ModelRef,
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
