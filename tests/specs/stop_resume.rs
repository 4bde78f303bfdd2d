// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative stop and resume.

use crate::prelude::*;

#[tokio::test]
async fn stop_parks_workers_and_resume_keeps_the_run() {
    let h = harness();
    // Kickoff: two workers, two independent nodes.
    h.provider.push_tool_calls_for(
        "coordinator of agent",
        vec![
            ("spawn_worker".into(), json!({"name": "x-researcher", "role": "researcher"})),
            ("spawn_worker".into(), json!({"name": "y-researcher", "role": "researcher"})),
            ("create_node".into(), json!({"task": "research X"})),
            ("create_node".into(), json!({"task": "research Y"})),
        ],
    );
    // Both workers' first provider calls hang: they are mid-turn when the
    // stop arrives.
    h.provider.push_hang_for("# x-researcher");
    h.provider.push_hang_for("# y-researcher");

    let kernel = h
        .registry
        .start_with_provider(
            "stoppable",
            AgentConfig::new("Research X and Y in parallel and compare."),
            h.provider.clone(),
        )
        .unwrap();

    wait_until("two busy workers", || {
        kernel.workers().iter().filter(|w| w.status == WorkerStatus::Busy).count() == 2
    })
    .await;

    kernel.stop().unwrap();

    // Within the cooperative-stop bound: both workers released, the agent
    // parked for a human.
    wait_until("workers released", || {
        kernel
            .workers()
            .iter()
            .all(|w| matches!(w.status, WorkerStatus::Idle | WorkerStatus::Stopped))
    })
    .await;
    wait_until("waiting for human", || kernel.status() == AgentStatus::WaitingForHuman).await;
    assert_eq!(count_events(&kernel, "agent.stopped"), 1);
    // Cancellation is never a failure.
    assert_eq!(count_events(&kernel, "node.failed"), 0);

    // Resume with a new instruction.
    kernel.send_message(None, "Skip Y, just do X.").unwrap();
    wait_until("resumed", || kernel.status() == AgentStatus::Working).await;

    // Same run: the agent home still has exactly one run directory.
    let runs_dir = kernel.runtime().store.agent_dir().join("runs");
    let runs = std::fs::read_dir(runs_dir).unwrap().count();
    assert_eq!(runs, 1, "resume must not start a new run");

    // The conversation holds everything, in order: kickoff, stop note,
    // resume message.
    let turns = kernel.conversation().unwrap();
    let kickoff = turns
        .iter()
        .position(|t| t["content"].as_str().is_some_and(|c| c.contains("Your goal:")))
        .expect("kickoff turn");
    let note = turns
        .iter()
        .position(|t| {
            t["role"] == "system"
                && t["content"].as_str().is_some_and(|c| c.contains("The human stopped the run"))
        })
        .expect("stop summary note");
    let resume = turns
        .iter()
        .position(|t| t["content"].as_str() == Some("[Message from human]: Skip Y, just do X."))
        .expect("resume message");
    assert!(kickoff < note && note < resume);

    // The wound-back nodes are still on the board, not failed.
    let board = kernel.board();
    assert_eq!(board.len(), 2);
    assert!(board.iter().all(|n| n.status == NodeStatus::Pending));
}
