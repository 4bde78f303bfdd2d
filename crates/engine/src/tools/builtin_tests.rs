// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{count_events, test_runtime, TestAgent};
use agiraph_core::{NodeId, HUMAN};
use agiraph_provider::ToolCall;
use std::sync::Arc;

fn coordinator_ctx(t: &TestAgent) -> ToolContext {
    ToolContext { rt: Arc::clone(&t.rt), caller: Caller::Coordinator }
}

fn worker_ctx(t: &TestAgent) -> (ToolContext, NodeId) {
    let worker = t.rt.spawn_worker(WorkerSpec::harnessed("alice", "researcher")).unwrap();
    let node = WorkNode::new("worker task", 0);
    t.rt.store.ensure_node_layout(&t.rt.run, &node).unwrap();
    let id = t.rt.board.add(node).unwrap();
    t.rt.board.set_assigned(&id, worker.id).unwrap();
    t.rt.board.set_status(&id, NodeStatus::Running).unwrap();
    t.rt.pool.set_status(&worker.id, WorkerStatus::Busy).unwrap();
    let ctx = ToolContext {
        rt: Arc::clone(&t.rt),
        caller: Caller::Worker { id: worker.id, name: "alice".into(), node: id },
    };
    (ctx, id)
}

fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall { id: "c1".into(), name: name.into(), args }
}

async fn dispatch(ctx: &ToolContext, name: &str, args: serde_json::Value) -> String {
    ctx.rt.tools.dispatch(&call(name, args), ctx.clone()).await.unwrap()
}

#[tokio::test]
async fn coordinator_write_file_lands_in_run_dir() {
    let t = test_runtime();
    let ctx = coordinator_ctx(&t);
    dispatch(&ctx, "write_file", json!({"path": "_plan.md", "content": "# plan"})).await;
    let plan = t.rt.store.run_dir(&t.rt.run).join("_plan.md");
    assert_eq!(std::fs::read_to_string(plan).unwrap(), "# plan");
    assert_eq!(count_events(&t.rt, "tool.result"), 1);
}

#[tokio::test]
async fn coordinator_memory_paths_go_to_agent_home() {
    let t = test_runtime();
    let ctx = coordinator_ctx(&t);
    dispatch(&ctx, "write_file", json!({"path": "memory/notes.md", "content": "learned"})).await;
    assert!(t.rt.store.agent_dir().join("memory/notes.md").exists());
    assert_eq!(count_events(&t.rt, "memory.written"), 1);
}

#[tokio::test]
async fn worker_writes_resolve_by_path_shape() {
    let t = test_runtime();
    let (ctx, node) = worker_ctx(&t);
    dispatch(&ctx, "write_file", json!({"path": "scratch/out.md", "content": "data"})).await;
    dispatch(&ctx, "write_file", json!({"path": "notebook.md", "content": "thoughts"})).await;

    let node_dir = t.rt.store.node_dir(&t.rt.run, &node);
    assert!(node_dir.join("scratch/out.md").exists());
    let worker = t.rt.pool.get_by_name("alice").unwrap();
    let notebook = t.rt.store.worker_dir(&t.rt.run, &worker.id).join("notebook.md");
    assert_eq!(std::fs::read_to_string(notebook).unwrap(), "thoughts");
}

#[tokio::test]
async fn scope_violation_is_reported_not_fatal() {
    let t = test_runtime();
    let (ctx, _node) = worker_ctx(&t);
    let output =
        dispatch(&ctx, "write_file", json!({"path": "published/x.md", "content": "no"})).await;
    assert!(output.starts_with("error:"), "got: {output}");
    assert!(output.contains("scope violation"));
    assert_eq!(count_events(&t.rt, "tool.error"), 1);
}

#[tokio::test]
async fn unknown_tool_is_reported_not_fatal() {
    let t = test_runtime();
    let ctx = coordinator_ctx(&t);
    let output = dispatch(&ctx, "teleport", json!({})).await;
    assert!(output.contains("unknown tool"));
    assert_eq!(count_events(&t.rt, "tool.error"), 1);
}

#[tokio::test]
async fn create_node_builds_layout_and_links_parent() {
    let t = test_runtime();
    let (ctx, parent) = worker_ctx(&t);
    let output = dispatch(&ctx, "create_node", json!({"task": "sub-investigation"})).await;
    assert!(output.starts_with("created node "));

    let board = t.rt.board.all();
    let sub = board.iter().find(|n| n.task == "sub-investigation").unwrap();
    assert_eq!(sub.parent_node, Some(parent));
    assert!(t.rt.board.get(&parent).unwrap().children.contains(&sub.id));
    assert!(t.rt.store.node_dir(&t.rt.run, &sub.id).join("_spec.md").exists());
    assert_eq!(count_events(&t.rt, "node.created"), 2);
}

#[tokio::test]
async fn publish_completes_and_notifies_coordinator() {
    let t = test_runtime();
    let (ctx, node) = worker_ctx(&t);
    dispatch(&ctx, "write_file", json!({"path": "scratch/out.md", "content": "v"})).await;
    let output = dispatch(&ctx, "publish", json!({"summary": "shipped"})).await;
    assert_eq!(output, "published 1 files");
    assert_eq!(t.rt.board.get(&node).unwrap().status, NodeStatus::Completed);
    assert!(t.rt.bus.peek(COORDINATOR).iter().any(|m| m.content.contains("shipped")));
}

#[tokio::test]
async fn finish_branches_on_caller() {
    let t = test_runtime();
    let coordinator = coordinator_ctx(&t);
    dispatch(&coordinator, "finish", json!({"summary": "goal met"})).await;
    assert_eq!(t.rt.take_finish().as_deref(), Some("goal met"));

    let (worker, node) = worker_ctx(&t);
    dispatch(&worker, "finish", json!({"summary": "node done"})).await;
    assert_eq!(t.rt.board.get(&node).unwrap().status, NodeStatus::Completed);
}

#[tokio::test]
async fn spawn_worker_is_coordinator_only() {
    let t = test_runtime();
    let (worker, _node) = worker_ctx(&t);
    let output = dispatch(&worker, "spawn_worker", json!({"name": "eve", "role": "spy"})).await;
    assert!(output.contains("coordinator tool"));
    assert!(t.rt.pool.get_by_name("eve").is_none());
}

#[tokio::test]
async fn send_message_defaults_to_coordinator() {
    let t = test_runtime();
    let (worker, _node) = worker_ctx(&t);
    dispatch(&worker, "send_message", json!({"content": "progress"})).await;
    assert!(t.rt.bus.peek(COORDINATOR).iter().any(|m| m.content == "progress" && m.from == "alice"));
}

#[tokio::test]
async fn reconvene_walks_stage_events() {
    let t = test_runtime();
    let ctx = coordinator_ctx(&t);
    dispatch(&ctx, "reconvene", json!({"stage": "research"})).await;
    assert_eq!(count_events(&t.rt, "stage.started"), 1);
    let summary = dispatch(&ctx, "reconvene", json!({"stage": "writing"})).await;
    assert_eq!(count_events(&t.rt, "stage.reconvened"), 1);
    assert_eq!(count_events(&t.rt, "stage.completed"), 1);
    assert_eq!(count_events(&t.rt, "stage.started"), 2);
    assert!(summary.contains("Board:"));
}

#[tokio::test]
async fn create_trigger_parses_and_registers() {
    let t = test_runtime();
    let ctx = coordinator_ctx(&t);
    let output = dispatch(
        &ctx,
        "create_trigger",
        json!({"kind": "on_event", "pattern": "node.failed", "action": "wake_agent", "task": "triage"}),
    )
    .await;
    assert!(output.starts_with("created trigger "));
    assert_eq!(t.rt.triggers().list().len(), 1);
    assert_eq!(count_events(&t.rt, "trigger.created"), 1);
}

#[tokio::test]
async fn read_file_reaches_published_upstream() {
    let t = test_runtime();
    let (producer, node) = worker_ctx(&t);
    dispatch(&producer, "write_file", json!({"path": "scratch/data.md", "content": "insight"})).await;
    dispatch(&producer, "publish", json!({"summary": "done"})).await;

    let ctx = coordinator_ctx(&t);
    let path = format!("nodes/{}/published/data.md", node.as_str());
    let output = dispatch(&ctx, "read_file", json!({"path": path})).await;
    assert_eq!(output, "insight");
}

#[tokio::test]
async fn human_question_flows_through_the_gate() {
    let t = test_runtime();
    let (worker, _node) = worker_ctx(&t);
    let rt = t.rt.clone();
    let ask = tokio::spawn(async move {
        dispatch(&worker, "ask_human", json!({"question": "proceed?"})).await
    });
    crate::test_helpers::wait_until("question", || count_events(&t.rt, "human.question") == 1)
        .await;
    // The worker shows as waiting while blocked.
    assert_eq!(
        t.rt.pool.get_by_name("alice").unwrap().status,
        WorkerStatus::WaitingForHuman
    );
    rt.respond_human("yes").unwrap();
    assert_eq!(ask.await.unwrap(), "yes");
    assert_eq!(t.rt.pool.get_by_name("alice").unwrap().status, WorkerStatus::Busy);
    // ask_human also messaged the human queue.
    assert!(t.rt.bus.peek(HUMAN).iter().any(|m| m.content == "proceed?"));
}
