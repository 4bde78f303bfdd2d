// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Smoke: a coordinator that works alone.

use crate::prelude::*;

#[tokio::test]
async fn single_write_and_finish() {
    let h = harness();
    h.provider.push_tool_calls(vec![
        ("write_file".into(), json!({"path": "answer.txt", "content": "42"})),
        ("finish".into(), json!({"summary": "answer written"})),
    ]);
    let kernel = h
        .registry
        .start_with_provider(
            "smoke",
            AgentConfig::new("Write the file answer.txt containing the number 42 and finish."),
            h.provider.clone(),
        )
        .unwrap();

    wait_until("agent completed", || kernel.status() == AgentStatus::Completed).await;

    assert_eq!(kernel.read_workspace("answer.txt").unwrap(), "42");
    assert_eq!(count_events(&kernel, "agent.completed"), 1);
    assert_eq!(count_events(&kernel, "worker.spawned"), 0);
    assert!(kernel.workers().is_empty());

    // The journaled completion carries the summary.
    let records = kernel.events(100).unwrap();
    assert!(records.iter().any(|r| matches!(
        &r.event,
        Event::AgentCompleted { summary } if summary == "answer written"
    )));
}

#[tokio::test]
async fn event_stream_order_matches_backfill() {
    let h = harness();
    h.provider.push_tool_calls(vec![
        ("write_file".into(), json!({"path": "a.txt", "content": "a"})),
        ("finish".into(), json!({"summary": "done"})),
    ]);
    let kernel = h
        .registry
        .start_with_provider("ordered", AgentConfig::new("write and finish"), h.provider.clone())
        .unwrap();
    let mut live = kernel.subscribe_events();

    wait_until("agent completed", || kernel.status() == AgentStatus::Completed).await;

    // Live delivery is in emission order: seq strictly increases.
    let mut last_seq = 0;
    while let Ok(record) = live.try_recv() {
        assert!(record.seq > last_seq, "live stream out of order");
        last_seq = record.seq;
    }
    // Backfill agrees.
    let backfill = kernel.events(10_000).unwrap();
    for window in backfill.windows(2) {
        assert!(window[0].seq < window[1].seq);
        assert!(window[0].ts < window[1].ts);
    }
}
