// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The work board: nodes, dependencies, readiness.
//!
//! The board holds state and answers readiness queries; it never
//! schedules. The runtime calls `ready()` synchronously after every
//! mutation that can unblock work. Insertion order is preserved so the
//! scheduler's "oldest ready node first" fairness falls out of iteration
//! order.

use agiraph_core::{Event, KernelError, NodeId, NodeStatus, WorkNode, WorkerId};
use agiraph_store::EventLog;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Node store for one run.
pub struct WorkBoard {
    journal: Arc<EventLog>,
    nodes: Mutex<IndexMap<NodeId, WorkNode>>,
}

impl WorkBoard {
    pub fn new(journal: Arc<EventLog>) -> Self {
        Self { journal, nodes: Mutex::new(IndexMap::new()) }
    }

    /// Add a node, rejecting dependency cycles.
    ///
    /// Dependencies may name nodes that do not exist yet (the node stays
    /// unready until they appear and complete); only a cycle through
    /// existing nodes or a self-dependency fails, leaving the board
    /// unchanged. Emits `node.created`.
    pub fn add(&self, node: WorkNode) -> Result<NodeId, KernelError> {
        let id = node.id;
        {
            let mut nodes = self.nodes.lock();
            if node.dependencies.contains(&id) {
                return Err(KernelError::InvalidDependency(format!(
                    "node {} depends on itself",
                    id.as_str()
                )));
            }
            if Self::reaches(&nodes, &node.dependencies, &id) {
                return Err(KernelError::InvalidDependency(format!(
                    "adding node {} would create a dependency cycle",
                    id.as_str()
                )));
            }
            if let Some(parent) = node.parent_node {
                if let Some(parent_node) = nodes.get_mut(&parent) {
                    if !parent_node.children.contains(&id) {
                        parent_node.children.push(id);
                    }
                }
            }
            nodes.insert(id, node.clone());
        }
        self.journal.emit(Event::NodeCreated {
            node_id: id,
            task: node.task.clone(),
            dependencies: node.dependencies.clone(),
            parent: node.parent_node,
        })?;
        Ok(id)
    }

    /// DFS from `start` deps: does any path lead back to `target`?
    fn reaches(nodes: &IndexMap<NodeId, WorkNode>, start: &[NodeId], target: &NodeId) -> bool {
        let mut stack: Vec<NodeId> = start.to_vec();
        let mut visited: Vec<NodeId> = Vec::new();
        while let Some(id) = stack.pop() {
            if id == *target {
                return true;
            }
            if visited.contains(&id) {
                continue;
            }
            visited.push(id);
            if let Some(node) = nodes.get(&id) {
                stack.extend(node.dependencies.iter().copied());
            }
        }
        false
    }

    pub fn get(&self, id: &NodeId) -> Option<WorkNode> {
        self.nodes.lock().get(id).cloned()
    }

    /// Pending nodes whose dependencies all exist and are completed,
    /// oldest first. O(nodes + dependency edges).
    pub fn ready(&self) -> Vec<WorkNode> {
        let nodes = self.nodes.lock();
        nodes
            .values()
            .filter(|node| {
                node.status == NodeStatus::Pending
                    && node.dependencies.iter().all(|dep| {
                        nodes.get(dep).is_some_and(|d| d.status == NodeStatus::Completed)
                    })
            })
            .cloned()
            .collect()
    }

    pub fn by_status(&self, status: NodeStatus) -> Vec<WorkNode> {
        self.nodes.lock().values().filter(|n| n.status == status).cloned().collect()
    }

    pub fn all(&self) -> Vec<WorkNode> {
        self.nodes.lock().values().cloned().collect()
    }

    /// Transition a node's status, enforcing the state machine.
    pub fn set_status(&self, id: &NodeId, status: NodeStatus) -> Result<(), KernelError> {
        let mut nodes = self.nodes.lock();
        let node = nodes
            .get_mut(id)
            .ok_or_else(|| KernelError::Tool(format!("unknown node: {}", id.as_str())))?;
        if node.status == status {
            return Ok(());
        }
        if !node.status.can_transition_to(status) {
            return Err(KernelError::Tool(format!(
                "node {} cannot go {} -> {}",
                id.as_str(),
                node.status,
                status
            )));
        }
        node.status = status;
        if status == NodeStatus::Pending {
            node.assigned_worker = None;
        }
        Ok(())
    }

    /// Record the worker pairing made by the scheduler.
    pub fn set_assigned(&self, id: &NodeId, worker: WorkerId) -> Result<(), KernelError> {
        self.set_status(id, NodeStatus::Assigned)?;
        let mut nodes = self.nodes.lock();
        if let Some(node) = nodes.get_mut(id) {
            node.assigned_worker = Some(worker);
        }
        Ok(())
    }

    /// `(pending, assigned, running, completed, failed)` counts.
    pub fn counts(&self) -> (usize, usize, usize, usize, usize) {
        let nodes = self.nodes.lock();
        let mut counts = (0, 0, 0, 0, 0);
        for node in nodes.values() {
            match node.status {
                NodeStatus::Pending => counts.0 += 1,
                NodeStatus::Assigned => counts.1 += 1,
                NodeStatus::Running => counts.2 += 1,
                NodeStatus::Completed => counts.3 += 1,
                NodeStatus::Failed => counts.4 += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
#[path = "board_tests.rs"]
mod tests;
