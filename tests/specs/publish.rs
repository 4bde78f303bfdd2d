// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish immutability.

use crate::prelude::*;

#[tokio::test]
async fn published_output_is_immutable_after_completion() {
    let h = harness();
    h.provider.push_tool_calls_for(
        "coordinator of agent",
        vec![
            ("spawn_worker".into(), json!({"name": "alice", "role": "writer"})),
            ("create_node".into(), json!({"task": "write a.md"})),
        ],
    );
    // Worker: write, publish, done.
    h.provider.push_tool_calls_for(
        "# alice",
        vec![
            ("write_file".into(), json!({"path": "scratch/a.md", "content": "v1"})),
            ("publish".into(), json!({"summary": "done"})),
        ],
    );

    let kernel = h
        .registry
        .start_with_provider("immutable", AgentConfig::new("produce a.md"), h.provider.clone())
        .unwrap();
    wait_until("node completed", || count_events(&kernel, "node.completed") == 1).await;

    let rt = kernel.runtime();
    let node = kernel.board().into_iter().find(|n| n.status == NodeStatus::Completed).unwrap();

    // Any later write into the completed node is a scope violation — both
    // into published/ directly and into the frozen scratch/.
    for path in ["published/a.md", "scratch/b.md"] {
        let err = rt
            .store
            .write_file(&agiraph_store::Scope::Node(rt.run, node.id), path, "v2")
            .unwrap_err();
        assert!(
            matches!(err, agiraph_core::KernelError::ScopeViolation(_)),
            "{path}: expected scope violation, got {err:?}"
        );
    }

    assert_eq!(kernel.node(&node.id).unwrap().0.status, NodeStatus::Completed);
    assert_eq!(
        std::fs::read_to_string(
            rt.store.node_dir(&rt.run, &node.id).join("published/a.md")
        )
        .unwrap(),
        "v1"
    );
    // No second completion, ever.
    assert_eq!(count_events(&kernel, "node.completed"), 1);
}

#[tokio::test]
async fn second_publish_is_a_no_op() {
    let h = harness();
    h.provider.push_tool_calls_for(
        "coordinator of agent",
        vec![
            ("spawn_worker".into(), json!({"name": "alice", "role": "writer"})),
            ("create_node".into(), json!({"task": "write once"})),
        ],
    );
    h.provider.push_tool_calls_for(
        "# alice",
        vec![
            ("write_file".into(), json!({"path": "scratch/out.md", "content": "final"})),
            ("publish".into(), json!({"summary": "first"})),
        ],
    );
    let kernel = h
        .registry
        .start_with_provider("idempotent", AgentConfig::new("publish once"), h.provider.clone())
        .unwrap();
    wait_until("node completed", || count_events(&kernel, "node.completed") >= 1).await;

    // Calling publish again yields the same published set and no new
    // node.completed.
    let rt = kernel.runtime();
    let node = kernel.board().into_iter().find(|n| n.status == NodeStatus::Completed).unwrap();
    let first = rt.store.published_files(&rt.run, &node.id).unwrap();
    let again = rt.store.publish(&rt.run, &node.id, "second").unwrap();
    assert_eq!(first, again);
    assert_eq!(first, vec!["out.md".to_string()]);
    assert_eq!(count_events(&kernel, "node.completed"), 1);
}
