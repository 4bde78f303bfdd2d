// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast fan-out.

use crate::prelude::*;

#[tokio::test]
async fn broadcast_reaches_coordinator_and_every_worker() {
    let h = harness();
    // Coordinator kickoff spawns the team; no nodes, so workers stay idle.
    h.provider.push_tool_calls(vec![
        ("spawn_worker".into(), json!({"name": "alice", "role": "researcher"})),
        ("spawn_worker".into(), json!({"name": "bob", "role": "writer"})),
        ("spawn_worker".into(), json!({"name": "carol", "role": "editor"})),
    ]);
    let kernel = h
        .registry
        .start_with_provider("fanout", AgentConfig::new("assemble a team"), h.provider.clone())
        .unwrap();
    wait_until("three workers", || kernel.workers().len() == 3).await;

    kernel.send_message(Some(BROADCAST), "hi").unwrap();

    // Four deliveries: coordinator, alice, bob, carol; never the sender.
    wait_until("four message.sent", || {
        kernel
            .events(10_000)
            .unwrap()
            .iter()
            .filter(|r| matches!(&r.event, Event::MessageSent { preview, from, .. }
                if preview == "hi" && from == HUMAN))
            .count()
            == 4
    })
    .await;

    let rt = kernel.runtime();
    for name in ["alice", "bob", "carol"] {
        let messages = rt.bus.receive(name).unwrap();
        assert_eq!(messages.len(), 1, "{name} should get exactly one");
        assert_eq!(messages[0].content, "hi");
    }
    // The sender never hears its own broadcast (replies may land, though).
    assert!(rt.bus.receive(HUMAN).unwrap().iter().all(|m| m.content != "hi"));
    // The coordinator drained its copy at a yield point.
    wait_until("coordinator drained", || rt.bus.peek(COORDINATOR).is_empty()).await;
}
