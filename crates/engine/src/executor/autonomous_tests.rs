// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{count_events, test_runtime, test_runtime_with_config, TestAgent};
use agiraph_core::{Clock, WorkerSpec, WorkerStatus, HUMAN};
use std::time::Duration;

struct Launch {
    node: WorkNode,
    executor: AutonomousExecutor,
    stop: StopFlag,
}

fn launch(t: &TestAgent, command: &str) -> Launch {
    let worker = t
        .rt
        .spawn_worker(WorkerSpec::autonomous("bot", "external", command))
        .unwrap();
    let node = WorkNode::new("run the external job", t.clock.epoch_ms());
    t.rt.store.ensure_node_layout(&t.rt.run, &node).unwrap();
    t.rt.board.add(node.clone()).unwrap();
    t.rt.board.set_assigned(&node.id, worker.id).unwrap();
    t.rt.board.set_status(&node.id, agiraph_core::NodeStatus::Running).unwrap();
    t.rt.pool.set_status(&worker.id, WorkerStatus::Busy).unwrap();
    let stop = StopFlag::new();
    let executor = AutonomousExecutor::new(t.rt.clone(), worker, stop.clone());
    Launch { node, executor, stop }
}

#[tokio::test]
async fn result_file_completes_and_publishes_scratch() {
    let t = test_runtime();
    let l = launch(
        &t,
        "echo output > scratch/out.md; echo 'all done' > _result.md",
    );
    let outcome = l.executor.execute(&l.node).await.unwrap();
    assert_eq!(outcome, NodeOutcome::Completed);
    let published = t.rt.store.published_files(&t.rt.run, &l.node.id).unwrap();
    assert_eq!(published, vec!["out.md".to_string()]);
    assert_eq!(count_events(&t.rt, "node.completed"), 1);
    let inbox = t.rt.bus.peek(COORDINATOR);
    assert!(inbox.iter().any(|m| m.content.contains("all done")));
}

#[tokio::test]
async fn bridge_files_are_written_before_launch() {
    let t = test_runtime();
    let l = launch(&t, "test -f _task.md && test -f _context.json && test -f _inbox.md && test -f _outbox.md");
    let outcome = l.executor.execute(&l.node).await.unwrap();
    assert_eq!(outcome, NodeOutcome::Completed, "bridge files should exist from the process's view");
    let dir = t.rt.store.node_dir(&t.rt.run, &l.node.id);
    let context: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("_context.json")).unwrap()).unwrap();
    assert_eq!(context["worker"], "bot");
    assert_eq!(context["goal"], "test goal");
}

#[tokio::test]
async fn nonzero_exit_without_result_fails() {
    let t = test_runtime();
    let l = launch(&t, "exit 3");
    let outcome = l.executor.execute(&l.node).await.unwrap();
    assert_eq!(outcome, NodeOutcome::Failed);
    assert_eq!(count_events(&t.rt, "node.failed"), 1);
    let dir = t.rt.store.node_dir(&t.rt.run, &l.node.id);
    assert!(dir.join("failure_notes.md").exists());
}

#[tokio::test]
async fn outbox_blocks_become_bus_messages() {
    let t = test_runtime();
    let l = launch(
        &t,
        "printf 'to: human\\nhello from the subprocess\\n---\\n' > _outbox.md; echo ok > _result.md",
    );
    l.executor.execute(&l.node).await.unwrap();
    let human_inbox = t.rt.bus.peek(HUMAN);
    assert!(
        human_inbox.iter().any(|m| m.content == "hello from the subprocess" && m.from == "bot"),
        "outbox block should reach the human queue: {human_inbox:?}"
    );
}

#[tokio::test]
async fn headerless_outbox_block_goes_to_coordinator() {
    let t = test_runtime();
    let l = launch(&t, "printf 'progress update\\n---\\n' > _outbox.md; echo ok > _result.md");
    l.executor.execute(&l.node).await.unwrap();
    assert!(t.rt.bus.peek(COORDINATOR).iter().any(|m| m.content == "progress update"));
}

#[tokio::test]
async fn bus_messages_are_relayed_into_inbox() {
    let t = test_runtime();
    // Wait for the ping to land in _inbox.md, then succeed.
    let l = launch(
        &t,
        "for i in $(seq 100); do grep -q ping _inbox.md 2>/dev/null && { echo pong > _result.md; exit 0; }; sleep 0.05; done; exit 1",
    );
    t.rt.bus.send(HUMAN, Some("bot"), "ping").unwrap();
    let outcome = l.executor.execute(&l.node).await.unwrap();
    assert_eq!(outcome, NodeOutcome::Completed);
    let dir = t.rt.store.node_dir(&t.rt.run, &l.node.id);
    let inbox = std::fs::read_to_string(dir.join("_inbox.md")).unwrap();
    assert!(inbox.contains("[from human] ping"));
}

#[tokio::test]
async fn cancellation_kills_the_subprocess() {
    let t = test_runtime();
    let l = launch(&t, "sleep 30");
    let stop = l.stop.clone();
    let started = std::time::Instant::now();
    let task = tokio::spawn(async move { l.executor.execute(&l.node).await });
    tokio::time::sleep(Duration::from_millis(60)).await;
    stop.stop();
    let result = task.await.unwrap();
    assert!(result.unwrap_err().is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5), "kill should be prompt");
}

#[tokio::test]
async fn lifetime_cap_kills_overrunning_subprocess() {
    let t = test_runtime_with_config(|config| {
        config.max_subprocess_lifetime = Duration::from_millis(150);
    });
    let l = launch(&t, "sleep 30");
    let outcome = l.executor.execute(&l.node).await.unwrap();
    assert_eq!(outcome, NodeOutcome::Failed);
    let dir = t.rt.store.node_dir(&t.rt.run, &l.node.id);
    let status = std::fs::read_to_string(dir.join("_status.md")).unwrap();
    assert!(status.contains("lifetime"));
}

#[tokio::test]
async fn missing_command_fails_cleanly() {
    let t = test_runtime();
    let worker = t
        .rt
        .spawn_worker(WorkerSpec {
            name: "broken".into(),
            role: "external".into(),
            kind: agiraph_core::WorkerKind::Autonomous,
            model: None,
            agent_command: None,
            capabilities: vec![],
        })
        .unwrap();
    let node = WorkNode::new("doomed", t.clock.epoch_ms());
    t.rt.store.ensure_node_layout(&t.rt.run, &node).unwrap();
    t.rt.board.add(node.clone()).unwrap();
    t.rt.board.set_assigned(&node.id, worker.id).unwrap();
    t.rt.board.set_status(&node.id, agiraph_core::NodeStatus::Running).unwrap();
    t.rt.pool.set_status(&worker.id, WorkerStatus::Busy).unwrap();

    let executor = AutonomousExecutor::new(t.rt.clone(), worker, StopFlag::new());
    let outcome = executor.execute(&node).await.unwrap();
    assert_eq!(outcome, NodeOutcome::Failed);
}
