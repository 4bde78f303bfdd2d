// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the Agiraph runtime.
//!
//! Every mutation in the system emits one of these. Events are journaled to
//! `events.jsonl` and broadcast to live subscribers; within one agent they
//! are totally ordered by `(ts, seq)`, and the backfill/live dedup identity
//! is `(type, ts)`.

use crate::node::NodeId;
use crate::trigger::TriggerId;
use crate::worker::{WorkerId, WorkerKind};
use serde::{Deserialize, Serialize};

/// Events emitted by the kernel.
///
/// Serializes with `{"type": "node.completed", ...fields}` format.
/// Unknown type tags deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- agent --
    #[serde(rename = "agent.started")]
    AgentStarted { goal: String },

    #[serde(rename = "agent.stopped")]
    AgentStopped {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "agent.completed")]
    AgentCompleted { summary: String },

    // -- node --
    #[serde(rename = "node.created")]
    NodeCreated {
        node_id: NodeId,
        task: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        dependencies: Vec<NodeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<NodeId>,
    },

    #[serde(rename = "node.assigned")]
    NodeAssigned { node_id: NodeId, worker: WorkerId },

    #[serde(rename = "node.started")]
    NodeStarted { node_id: NodeId, worker: WorkerId },

    #[serde(rename = "node.completed")]
    NodeCompleted {
        node_id: NodeId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        published: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },

    #[serde(rename = "node.failed")]
    NodeFailed { node_id: NodeId, reason: String },

    /// Incremental progress note from a running node.
    #[serde(rename = "node.checkpoint")]
    NodeCheckpoint { node_id: NodeId, note: String },

    // -- worker --
    #[serde(rename = "worker.spawned")]
    WorkerSpawned { worker: WorkerId, name: String, role: String, kind: WorkerKind },

    #[serde(rename = "worker.launched")]
    WorkerLaunched { worker: WorkerId, node_id: NodeId },

    #[serde(rename = "worker.idle")]
    WorkerIdle { worker: WorkerId },

    #[serde(rename = "worker.busy")]
    WorkerBusy { worker: WorkerId },

    #[serde(rename = "worker.stopped")]
    WorkerStopped { worker: WorkerId },

    // -- message --
    #[serde(rename = "message.sent")]
    MessageSent { from: String, to: String, preview: String },

    #[serde(rename = "message.received")]
    MessageReceived { by: String, from: String },

    #[serde(rename = "message.undeliverable")]
    MessageUndeliverable { from: String, to: String },

    // -- tool --
    #[serde(rename = "tool.called")]
    ToolCalled { caller: String, tool: String, args_preview: String },

    #[serde(rename = "tool.result")]
    ToolResult { caller: String, tool: String, preview: String },

    #[serde(rename = "tool.error")]
    ToolError { caller: String, tool: String, error: String },

    // -- human --
    #[serde(rename = "human.question")]
    HumanQuestion { from: String, question: String },

    #[serde(rename = "human.response")]
    HumanResponse { response: String },

    // -- files --
    #[serde(rename = "file.written")]
    FileWritten { path: String, bytes: u64, preview: String },

    #[serde(rename = "memory.written")]
    MemoryWritten { path: String },

    // -- stages --
    #[serde(rename = "stage.started")]
    StageStarted { stage: String },

    #[serde(rename = "stage.reconvened")]
    StageReconvened { stage: String },

    #[serde(rename = "stage.completed")]
    StageCompleted { stage: String },

    // -- triggers --
    #[serde(rename = "trigger.created")]
    TriggerCreated { trigger_id: TriggerId, trigger_kind: String },

    #[serde(rename = "trigger.fired")]
    TriggerFired { trigger_id: TriggerId },

    #[serde(rename = "trigger.cancelled")]
    TriggerCancelled { trigger_id: TriggerId },

    /// Catch-all for unknown event types (forward compatibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// The dotted type tag, matching the serialized `"type"` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::AgentStarted { .. } => "agent.started",
            Event::AgentStopped { .. } => "agent.stopped",
            Event::AgentCompleted { .. } => "agent.completed",
            Event::NodeCreated { .. } => "node.created",
            Event::NodeAssigned { .. } => "node.assigned",
            Event::NodeStarted { .. } => "node.started",
            Event::NodeCompleted { .. } => "node.completed",
            Event::NodeFailed { .. } => "node.failed",
            Event::NodeCheckpoint { .. } => "node.checkpoint",
            Event::WorkerSpawned { .. } => "worker.spawned",
            Event::WorkerLaunched { .. } => "worker.launched",
            Event::WorkerIdle { .. } => "worker.idle",
            Event::WorkerBusy { .. } => "worker.busy",
            Event::WorkerStopped { .. } => "worker.stopped",
            Event::MessageSent { .. } => "message.sent",
            Event::MessageReceived { .. } => "message.received",
            Event::MessageUndeliverable { .. } => "message.undeliverable",
            Event::ToolCalled { .. } => "tool.called",
            Event::ToolResult { .. } => "tool.result",
            Event::ToolError { .. } => "tool.error",
            Event::HumanQuestion { .. } => "human.question",
            Event::HumanResponse { .. } => "human.response",
            Event::FileWritten { .. } => "file.written",
            Event::MemoryWritten { .. } => "memory.written",
            Event::StageStarted { .. } => "stage.started",
            Event::StageReconvened { .. } => "stage.reconvened",
            Event::StageCompleted { .. } => "stage.completed",
            Event::TriggerCreated { .. } => "trigger.created",
            Event::TriggerFired { .. } => "trigger.fired",
            Event::TriggerCancelled { .. } => "trigger.cancelled",
            Event::Custom => "custom",
        }
    }

    /// One-line summary for log spans.
    pub fn log_summary(&self) -> String {
        match self {
            Event::NodeCreated { node_id, .. }
            | Event::NodeCompleted { node_id, .. }
            | Event::NodeFailed { node_id, .. }
            | Event::NodeCheckpoint { node_id, .. } => {
                format!("{} node={}", self.kind(), node_id.short(8))
            }
            Event::NodeAssigned { node_id, worker } | Event::NodeStarted { node_id, worker } => {
                format!("{} node={} worker={}", self.kind(), node_id.short(8), worker.short(8))
            }
            Event::WorkerSpawned { name, .. } => format!("{} name={}", self.kind(), name),
            Event::WorkerLaunched { worker, node_id } => {
                format!("{} worker={} node={}", self.kind(), worker.short(8), node_id.short(8))
            }
            Event::WorkerIdle { worker }
            | Event::WorkerBusy { worker }
            | Event::WorkerStopped { worker } => {
                format!("{} worker={}", self.kind(), worker.short(8))
            }
            Event::MessageSent { from, to, .. } | Event::MessageUndeliverable { from, to } => {
                format!("{} {}->{}", self.kind(), from, to)
            }
            Event::ToolCalled { caller, tool, .. }
            | Event::ToolResult { caller, tool, .. }
            | Event::ToolError { caller, tool, .. } => {
                format!("{} {} by {}", self.kind(), tool, caller)
            }
            Event::FileWritten { path, bytes, .. } => {
                format!("{} {} ({}B)", self.kind(), path, bytes)
            }
            Event::TriggerCreated { trigger_id, trigger_kind } => {
                format!("{} {} kind={}", self.kind(), trigger_id.short(8), trigger_kind)
            }
            Event::TriggerFired { trigger_id } | Event::TriggerCancelled { trigger_id } => {
                format!("{} {}", self.kind(), trigger_id.short(8))
            }
            _ => self.kind().to_string(),
        }
    }
}

/// A journaled event: the payload plus its per-agent ordering envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Strictly increasing per agent; assigned by `emit`.
    pub seq: u64,
    /// Epoch milliseconds, strictly increasing per agent (ties bumped).
    pub ts: u64,
    pub agent_id: crate::agent::AgentId,
    #[serde(flatten)]
    pub event: Event,
}

impl EventRecord {
    /// Stable identity used by backfill+live consumers for deduplication.
    pub fn dedup_key(&self) -> (&'static str, u64) {
        (self.event.kind(), self.ts)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
