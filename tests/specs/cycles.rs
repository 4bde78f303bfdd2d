// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency cycle rejection.

use crate::prelude::*;
use agiraph_core::{KernelError, NodeId, WorkNode};

#[tokio::test]
async fn closing_a_forward_dependency_cycle_fails_the_second_add() {
    let h = harness();
    h.provider.push_text("standing by");
    let kernel = h
        .registry
        .start_with_provider("cycles", AgentConfig::new("graph hygiene"), h.provider.clone())
        .unwrap();
    let board = &kernel.runtime().board;

    // a depends on b before b exists: allowed, just never ready.
    let b_id = NodeId::from_string("node-b");
    let mut a = WorkNode::new("a", 0);
    a.dependencies = vec![b_id];
    let a_id = board.add(a).unwrap();
    assert!(board.ready().is_empty());

    // b arrives depending on a: the add must fail and leave the board as
    // it was.
    let mut b = WorkNode::new("b", 0);
    b.id = b_id;
    b.dependencies = vec![a_id];
    let err = board.add(b).unwrap_err();
    assert!(matches!(err, KernelError::InvalidDependency(_)));

    let nodes = kernel.board();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, a_id);
    assert_eq!(nodes[0].status, NodeStatus::Pending);
    assert_eq!(nodes[0].dependencies, vec![b_id]);
    assert_eq!(count_events(&kernel, "node.created"), 1);
}

#[tokio::test]
async fn forward_dependencies_unblock_when_the_dependency_completes() {
    let h = harness();
    h.provider.push_text("standing by");
    let kernel = h
        .registry
        .start_with_provider("unblock", AgentConfig::new("graph growth"), h.provider.clone())
        .unwrap();
    let rt = kernel.runtime();

    let b_id = NodeId::from_string("node-b");
    let mut a = WorkNode::new("a", 0);
    a.dependencies = vec![b_id];
    let a_id = rt.board.add(a).unwrap();

    let mut b = WorkNode::new("b", 0);
    b.id = b_id;
    rt.board.add(b).unwrap();
    assert_eq!(rt.board.ready().iter().map(|n| n.id).collect::<Vec<_>>(), vec![b_id]);

    rt.board.set_assigned(&b_id, agiraph_core::WorkerId::new()).unwrap();
    rt.board.set_status(&b_id, NodeStatus::Running).unwrap();
    rt.board.set_status(&b_id, NodeStatus::Completed).unwrap();
    assert_eq!(rt.board.ready().iter().map(|n| n.id).collect::<Vec<_>>(), vec![a_id]);
}
