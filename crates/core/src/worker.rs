// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identity, kind, and status.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a worker within a run.
    pub struct WorkerId("wkr-");
}

/// How a worker executes its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// The kernel runs the ReAct loop and dispatches tools.
    Harnessed,
    /// An external subprocess; the kernel only bridges files and messages.
    Autonomous,
}

crate::simple_display! {
    WorkerKind {
        Harnessed => "harnessed",
        Autonomous => "autonomous",
    }
}

/// Status of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Busy,
    WaitingForHuman,
    Stopped,
}

crate::simple_display! {
    WorkerStatus {
        Idle => "idle",
        Busy => "busy",
        WaitingForHuman => "waiting_for_human",
        Stopped => "stopped",
    }
}

/// Creation parameters for a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Short unique name; doubles as the worker's message-bus address.
    pub name: String,
    /// Short title, e.g. "researcher" or "editor".
    pub role: String,
    pub kind: WorkerKind,
    /// Provider/model for harnessed workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Launch command for autonomous workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_command: Option<String>,
    /// Subset of registered tools this worker may call. Empty means the
    /// default worker tool set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
}

impl WorkerSpec {
    pub fn harnessed(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            kind: WorkerKind::Harnessed,
            model: None,
            agent_command: None,
            capabilities: Vec::new(),
        }
    }

    pub fn autonomous(
        name: impl Into<String>,
        role: impl Into<String>,
        agent_command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            kind: WorkerKind::Autonomous,
            model: None,
            agent_command: Some(agent_command.into()),
            capabilities: Vec::new(),
        }
    }

    crate::setters! {
        set {
            capabilities: Vec<String>,
        }
        option {
            model: String,
        }
    }
}

/// A live worker in the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub spec: WorkerSpec,
    pub status: WorkerStatus,
    /// Node currently being executed, if busy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node: Option<NodeId>,
    /// When the worker last became idle; drives least-recently-used pairing.
    pub idle_since_ms: u64,
    pub spawned_at_ms: u64,
}

impl Worker {
    pub fn new(spec: WorkerSpec, now_ms: u64) -> Self {
        Self {
            id: WorkerId::new(),
            spec,
            status: WorkerStatus::Idle,
            current_node: None,
            idle_since_ms: now_ms,
            spawned_at_ms: now_ms,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
