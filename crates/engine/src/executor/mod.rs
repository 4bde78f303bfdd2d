// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker executors.
//!
//! Both implementations share one contract — `execute(node)` runs the
//! node to completion, failure, or cancellation — and one yield-point
//! discipline: drain the inbox, check the stop flag, let other tasks run.
//! The wrapper here owns the common prologue (status flips, launch
//! events) and epilogue (release the worker, re-tick the scheduler).

pub mod autonomous;
pub mod claude_code;
pub mod harnessed;

pub use autonomous::AutonomousExecutor;
pub use harnessed::HarnessedExecutor;

use crate::cancel::StopFlag;
use crate::runtime::AgentRuntime;
use agiraph_core::{Event, KernelError, NodeStatus, WorkNode, Worker, WorkerKind, COORDINATOR};
use agiraph_provider::Turn;
use std::sync::Arc;

/// How a node execution ended (cancellation travels as `Err(Cancelled)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    Completed,
    Failed,
}

/// Executor task entry point, spawned by `AgentRuntime::assign`.
pub(crate) async fn run(rt: Arc<AgentRuntime>, node: WorkNode, worker: Worker, stop: StopFlag) {
    let node_id = node.id;
    let worker_id = worker.id;
    if let Err(e) = rt.board.set_status(&node_id, NodeStatus::Running) {
        tracing::error!(node = %node_id, error = %e, "could not start node");
        rt.executor_done(&worker_id, false);
        return;
    }
    let launch = rt
        .journal
        .emit(Event::NodeStarted { node_id, worker: worker_id })
        .and_then(|_| rt.journal.emit(Event::WorkerLaunched { worker: worker_id, node_id }));
    if let Err(e) = launch {
        tracing::warn!(error = %e, "launch events failed");
    }

    let result = match worker.spec.kind {
        WorkerKind::Harnessed => {
            HarnessedExecutor::new(Arc::clone(&rt), worker.clone(), stop.clone())
                .execute(&node)
                .await
        }
        WorkerKind::Autonomous => {
            AutonomousExecutor::new(Arc::clone(&rt), worker.clone(), stop.clone())
                .execute(&node)
                .await
        }
    };

    let cancelled = matches!(&result, Err(e) if e.is_cancelled());
    match result {
        Ok(outcome) => {
            tracing::info!(node = %node_id, worker = %worker_id, ?outcome, "node finished");
        }
        Err(_) if cancelled => {
            tracing::info!(node = %node_id, worker = %worker_id, "executor cancelled");
            // Mid-execution cancellation winds the node back so a resumed
            // run can pick it up; it is not a failure.
            if rt.board.get(&node_id).map(|n| n.status) == Some(NodeStatus::Running) {
                if let Err(e) = rt.board.set_status(&node_id, NodeStatus::Pending) {
                    tracing::warn!(node = %node_id, error = %e, "wind-back failed");
                }
            }
        }
        Err(e) => {
            tracing::error!(node = %node_id, worker = %worker_id, error = %e, "executor error");
            let _ = fail_node(&rt, worker.name(), &node, &format!("executor error: {e}"), &[]);
        }
    }
    rt.executor_done(&worker_id, cancelled);
}

/// Shared failure path: failure notes, board state, `node.failed`, and a
/// message so the coordinator reconvenes.
pub(crate) fn fail_node(
    rt: &Arc<AgentRuntime>,
    worker_name: &str,
    node: &WorkNode,
    reason: &str,
    turns: &[Turn],
) -> Result<(), KernelError> {
    let notes = if turns.is_empty() {
        reason.to_string()
    } else {
        serde_json::to_string_pretty(turns)?
    };
    rt.store.write_failure_notes(&rt.run, &node.id, reason, &notes)?;
    if let Some(current) = rt.board.get(&node.id) {
        if !current.status.is_terminal() {
            rt.board.set_status(&node.id, NodeStatus::Failed)?;
        }
    }
    rt.journal.emit(Event::NodeFailed { node_id: node.id, reason: reason.to_string() })?;
    rt.bus.send(
        worker_name,
        Some(COORDINATOR),
        format!("node {} failed: {}", node.id.as_str(), reason),
    )?;
    Ok(())
}
