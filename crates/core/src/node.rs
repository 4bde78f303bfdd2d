// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work node identifier and state machine.
//!
//! A node is the workpiece of the emergent graph: a task spec, a set of
//! dependencies, and a fixed on-disk layout (`_spec.md`, `_refs.json`,
//! `_status.md`, `scratch/`, `published/`, `log.jsonl`).

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

crate::define_id! {
    /// Unique identifier for one run (one attempt at the agent's goal).
    pub struct RunId("run-");
}

crate::define_id! {
    /// Unique identifier for a work node.
    pub struct NodeId("node");
}

/// Status of a work node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Created, waiting for dependencies and a worker.
    Pending,
    /// Paired with a worker, executor not yet started.
    Assigned,
    /// Executor running.
    Running,
    /// Published; `published/` is immutable from here on.
    Completed,
    /// Executor gave up; `failure_notes.md` has the trail.
    Failed,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed)
    }

    /// Legal transitions. A trigger may re-run a failed node, which is the
    /// one backward edge.
    pub fn can_transition_to(&self, next: NodeStatus) -> bool {
        use NodeStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Assigned, Running)
                | (Assigned, Pending)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Pending)
                | (Failed, Pending)
        )
    }
}

crate::simple_display! {
    NodeStatus {
        Pending => "pending",
        Assigned => "assigned",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// A unit of work on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkNode {
    pub id: NodeId,
    /// The task spec, written to `_spec.md`.
    pub task: String,
    pub status: NodeStatus,
    /// Node ids that must be completed before this one starts. May name
    /// nodes that do not exist yet; such a node stays unready until the
    /// dependency appears and completes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<NodeId>,
    /// Named pointers to upstream published files: name → `{node_id}/{path}`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub refs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_worker: Option<WorkerId>,
    /// Set when a worker spawned this as a sub-node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    pub created_at_ms: u64,
}

impl WorkNode {
    pub fn new(task: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            id: NodeId::new(),
            task: task.into(),
            status: NodeStatus::Pending,
            dependencies: Vec::new(),
            refs: BTreeMap::new(),
            assigned_worker: None,
            parent_node: None,
            children: Vec::new(),
            created_at_ms,
        }
    }

    crate::setters! {
        set {
            dependencies: Vec<NodeId>,
            refs: BTreeMap<String, String>,
        }
        option {
            parent_node: NodeId,
        }
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
