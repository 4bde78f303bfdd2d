// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::AgentRegistry;
use crate::test_helpers::wait_until;
use agiraph_core::FakeClock;
use agiraph_provider::FakeProvider;
use serde_json::json;
use std::time::Duration;

struct Fixture {
    _dir: tempfile::TempDir,
    registry: AgentRegistry,
    provider: Arc<FakeProvider>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let registry = AgentRegistry::with_clock(
        Config::for_test(dir.path()),
        Arc::new(FakeClock::new()),
    );
    Fixture { _dir: dir, registry, provider: Arc::new(FakeProvider::new()) }
}

fn count_events(kernel: &AgentKernel, kind: &str) -> usize {
    kernel.events(10_000).map(|r| r.iter().filter(|e| e.event.kind() == kind).count()).unwrap_or(0)
}

#[tokio::test]
async fn coordinator_alone_writes_and_finishes() {
    let f = fixture();
    f.provider.push_tool_calls(vec![
        ("write_file".into(), json!({"path": "answer.txt", "content": "42"})),
        ("finish".into(), json!({"summary": "wrote the answer"})),
    ]);
    let kernel = f
        .registry
        .start_with_provider(
            "smoke",
            AgentConfig::new("Write the file answer.txt containing the number 42 and finish."),
            f.provider.clone(),
        )
        .unwrap();

    wait_until("agent completed", || kernel.status() == AgentStatus::Completed).await;
    assert_eq!(kernel.read_workspace("answer.txt").unwrap(), "42");
    assert_eq!(count_events(&kernel, "agent.completed"), 1);
    assert!(kernel.workers().is_empty());
}

#[tokio::test]
async fn human_message_default_routes_and_logs_once() {
    let f = fixture();
    f.provider.push_text("hello human");
    let kernel = f
        .registry
        .start_with_provider("routing", AgentConfig::new("idle goal"), f.provider.clone())
        .unwrap();
    wait_until("kickoff thought", || f.provider.remaining() == 0).await;

    kernel.send_message(None, "what is the plan?").unwrap();
    wait_until("message drained", || {
        kernel.runtime().bus.peek(agiraph_core::COORDINATOR).is_empty()
    })
    .await;
    // Give the think round a beat to land in the conversation.
    wait_until("human turn journaled", || {
        matches!(kernel.conversation(), Ok(turns) if turns
            .iter()
            .filter(|t| t["content"].as_str() == Some("[Message from human]: what is the plan?"))
            .count() == 1)
    })
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let occurrences = kernel
        .conversation()
        .unwrap()
        .iter()
        .filter(|t| t["content"].as_str() == Some("[Message from human]: what is the plan?"))
        .count();
    assert_eq!(occurrences, 1, "human message journaled exactly once");
}

#[tokio::test]
async fn stop_then_resume_preserves_conversation_order() {
    let f = fixture();
    f.provider.push_text("on it");
    let kernel = f
        .registry
        .start_with_provider("resume", AgentConfig::new("long goal"), f.provider.clone())
        .unwrap();
    wait_until("kickoff thought", || f.provider.remaining() == 0).await;

    kernel.stop().unwrap();
    wait_until("waiting for human", || kernel.status() == AgentStatus::WaitingForHuman).await;

    kernel.send_message(None, "Skip Y, just do X.").unwrap();
    wait_until("resumed", || kernel.status() == AgentStatus::Working).await;

    let turns = kernel.conversation().unwrap();
    let note_index = turns
        .iter()
        .position(|t| {
            t["role"] == "system"
                && t["content"].as_str().is_some_and(|c| c.contains("The human stopped the run"))
        })
        .unwrap_or_else(|| panic!("stop summary note missing"));
    let human_index = turns
        .iter()
        .position(|t| t["content"].as_str() == Some("[Message from human]: Skip Y, just do X."))
        .unwrap_or_else(|| panic!("resume message missing"));
    let kickoff_index = turns
        .iter()
        .position(|t| t["content"].as_str().is_some_and(|c| c.contains("Your goal:")))
        .unwrap_or_else(|| panic!("kickoff missing"));
    assert!(kickoff_index < note_index && note_index < human_index);
}

#[tokio::test]
async fn respond_answers_a_pending_question() {
    let f = fixture();
    f.provider.push_tool_call("ask_human", json!({"question": "blue or green?"}));
    f.provider.push_tool_call("finish", json!({"summary": "picked"}));
    let kernel = f
        .registry
        .start_with_provider("asker", AgentConfig::new("pick a color"), f.provider.clone())
        .unwrap();

    wait_until("question emitted", || count_events(&kernel, "human.question") == 1).await;
    kernel.respond("blue").unwrap();
    wait_until("agent completed", || kernel.status() == AgentStatus::Completed).await;
    assert_eq!(count_events(&kernel, "human.response"), 1);

    // The answer flowed back as the ask_human tool result.
    let turns = kernel.conversation().unwrap();
    assert!(turns.iter().any(|t| t["role"] == "tool" && t["content"] == "blue"));
}

#[tokio::test]
async fn registry_lists_and_deletes() {
    let f = fixture();
    f.provider.push_text("ok");
    let kernel = f
        .registry
        .start_with_provider("listed", AgentConfig::new("goal"), f.provider.clone())
        .unwrap();
    assert_eq!(f.registry.list().len(), 1);
    assert!(f.registry.get("listed").is_some());
    assert!(f.registry.start_with_provider("listed", AgentConfig::new("dup"), f.provider.clone()).is_err());

    let dir = kernel.runtime().store.agent_dir().to_path_buf();
    f.registry.delete("listed").await.unwrap();
    assert!(f.registry.get("listed").is_none());
    assert!(!dir.exists());
}
