// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    pending_to_assigned = { NodeStatus::Pending, NodeStatus::Assigned, true },
    assigned_to_running = { NodeStatus::Assigned, NodeStatus::Running, true },
    assigned_back_to_pending = { NodeStatus::Assigned, NodeStatus::Pending, true },
    running_to_completed = { NodeStatus::Running, NodeStatus::Completed, true },
    running_to_failed = { NodeStatus::Running, NodeStatus::Failed, true },
    failed_rerun = { NodeStatus::Failed, NodeStatus::Pending, true },
    pending_to_running = { NodeStatus::Pending, NodeStatus::Running, false },
    completed_is_final = { NodeStatus::Completed, NodeStatus::Pending, false },
    completed_to_failed = { NodeStatus::Completed, NodeStatus::Failed, false },
)]
fn transition_rules(from: NodeStatus, to: NodeStatus, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn terminal_statuses() {
    assert!(NodeStatus::Completed.is_terminal());
    assert!(NodeStatus::Failed.is_terminal());
    assert!(!NodeStatus::Running.is_terminal());
}

#[test]
fn new_node_starts_pending_without_worker() {
    let node = WorkNode::new("summarize the corpus", 100);
    assert_eq!(node.status, NodeStatus::Pending);
    assert!(node.assigned_worker.is_none());
    assert!(node.dependencies.is_empty());
    assert!(node.id.as_str().starts_with("node"));
}

#[test]
fn optional_fields_are_omitted_from_json() {
    let node = WorkNode::new("t", 0);
    let json = serde_json::to_value(&node).unwrap();
    assert!(json.get("dependencies").is_none());
    assert!(json.get("assigned_worker").is_none());
    assert!(json.get("parent_node").is_none());
}

#[test]
fn setters_populate_graph_fields() {
    let dep = NodeId::new();
    let node = WorkNode::new("t", 0)
        .dependencies(vec![dep])
        .parent_node(NodeId::from_string("node-parent"));
    assert_eq!(node.dependencies, vec![dep]);
    assert_eq!(node.parent_node, Some(NodeId::from_string("node-parent")));
}
