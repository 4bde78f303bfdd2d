// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-result adjacency under concurrency.

use crate::prelude::*;

/// One worker makes two tool calls in one assistant message while a human
/// message lands mid-execution: the conversation must still show
/// assistant → result(a) → result(b) with nothing in between.
#[tokio::test]
async fn two_calls_one_message_no_interleaving() {
    let h = harness();
    // Coordinator: build the team and the node.
    h.provider.push_tool_calls_for(
        "coordinator of agent",
        vec![
            ("spawn_worker".into(), json!({"name": "alice", "role": "writer"})),
            ("create_node".into(), json!({"task": "write two files"})),
        ],
    );
    // Worker iteration 1: two writes in one assistant message.
    h.provider.push_tool_calls_for(
        "# alice",
        vec![
            ("write_file".into(), json!({"path": "scratch/a.md", "content": "a"})),
            ("write_file".into(), json!({"path": "scratch/b.md", "content": "b"})),
        ],
    );
    // Worker iteration 2: publish.
    h.provider.push_tool_call_for("# alice", "publish", json!({"summary": "both written"}));

    let kernel = h
        .registry
        .start_with_provider("adjacency", AgentConfig::new("write a and b"), h.provider.clone())
        .unwrap();

    wait_until("worker busy", || {
        kernel.workers().iter().any(|w| w.status == WorkerStatus::Busy)
    })
    .await;
    // Arrives somewhere mid-execution; must never split a call group.
    kernel.send_message(Some("alice"), "how is it going?").unwrap();

    wait_until("node completed", || count_events(&kernel, "node.completed") == 1).await;

    let worker = kernel.workers().into_iter().find(|w| w.name() == "alice").unwrap();
    let rt = kernel.runtime();
    let conversation = agiraph_store::ConversationLog::new(
        rt.store.worker_dir(&rt.run, &worker.id).join("conversation.jsonl"),
    );
    let turns = conversation.read_values().unwrap();

    let index = turns
        .iter()
        .position(|t| {
            t["role"] == "assistant"
                && t["tool_calls"].as_array().map(|c| c.len()) == Some(2)
        })
        .expect("two-call assistant turn");
    let calls = turns[index]["tool_calls"].as_array().unwrap().clone();
    assert_eq!(turns[index + 1]["role"], "tool");
    assert_eq!(turns[index + 1]["call_id"], calls[0]["id"]);
    assert_eq!(turns[index + 2]["role"], "tool");
    assert_eq!(turns[index + 2]["call_id"], calls[1]["id"]);

    // The human message still got through, as its own user turn.
    assert!(turns.iter().any(|t| {
        t["role"] == "user"
            && t["content"].as_str().is_some_and(|c| c.contains("[Message from human]"))
    }));
}
