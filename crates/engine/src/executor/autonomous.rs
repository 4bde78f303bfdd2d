// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The autonomous subprocess bridge.
//!
//! The worker is an external process with the node directory as its cwd.
//! The kernel writes `_task.md` / `_context.json`, relays bus messages in
//! through `_inbox.md`, parses `_outbox.md` blocks back onto the bus, and
//! finishes the node when `_result.md` appears or the process exits.
//! Outbox blocks are separated by `---` lines, with an optional
//! `to: <name>` header line; headerless blocks go to the coordinator.

use super::{fail_node, NodeOutcome};
use crate::cancel::StopFlag;
use crate::runtime::AgentRuntime;
use agiraph_core::{KernelError, NodeStatus, WorkNode, Worker, COORDINATOR};
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

/// Block separator in `_outbox.md`.
const OUTBOX_SEPARATOR: &str = "\n---\n";

/// Subprocess-bridge executor.
pub struct AutonomousExecutor {
    rt: Arc<AgentRuntime>,
    worker: Worker,
    stop: StopFlag,
}

impl AutonomousExecutor {
    pub fn new(rt: Arc<AgentRuntime>, worker: Worker, stop: StopFlag) -> Self {
        Self { rt, worker, stop }
    }

    pub async fn execute(&self, node: &WorkNode) -> Result<NodeOutcome, KernelError> {
        let dir = self.rt.store.node_dir(&self.rt.run, &node.id);
        self.write_bridge_files(node, &dir)?;

        let Some(command) = self.worker.spec.agent_command.clone() else {
            fail_node(&self.rt, self.worker.name(), node, "no agent_command configured", &[])?;
            return Ok(NodeOutcome::Failed);
        };

        let stream_json = command.contains("stream-json");
        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg("-c")
            .arg(&command)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(if stream_json { Stdio::piped() } else { Stdio::null() })
            .stderr(Stdio::null())
            .kill_on_drop(true);

        tracing::info!(worker = %self.worker.name(), node = %node.id, %command, "spawning autonomous worker");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                fail_node(&self.rt, self.worker.name(), node, &format!("spawn failed: {e}"), &[])?;
                return Ok(NodeOutcome::Failed);
            }
        };

        if let Some(stdout) = child.stdout.take() {
            let rt = Arc::clone(&self.rt);
            let name = self.worker.spec.name.clone();
            let node_id = node.id;
            tokio::spawn(async move {
                super::claude_code::forward_stream(rt, name, node_id, stdout).await;
            });
        }

        let started = self.rt.clock.now();
        let mut outbox_offset = 0usize;
        let exit_success = loop {
            if self.stop.is_stopped() {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(KernelError::Cancelled);
            }
            if started.elapsed() > self.rt.config.max_subprocess_lifetime {
                let _ = child.start_kill();
                let _ = child.wait().await;
                fail_node(
                    &self.rt,
                    self.worker.name(),
                    node,
                    "max subprocess lifetime exceeded",
                    &[],
                )?;
                return Ok(NodeOutcome::Failed);
            }

            self.relay_inbox(&dir)?;
            outbox_offset = self.drain_outbox(&dir, outbox_offset)?;

            if dir.join("_result.md").exists() {
                let _ = child.start_kill();
                let _ = child.wait().await;
                break true;
            }
            match child.try_wait() {
                Ok(Some(status)) => break status.success(),
                Ok(None) => {}
                Err(e) => {
                    fail_node(&self.rt, self.worker.name(), node, &format!("wait failed: {e}"), &[])?;
                    return Ok(NodeOutcome::Failed);
                }
            }

            tokio::time::sleep(self.rt.config.poll_interval).await;
        };

        // Late blocks written right before exit still count.
        let _ = self.drain_outbox(&dir, outbox_offset)?;

        let result = std::fs::read_to_string(dir.join("_result.md")).ok();
        if result.is_some() || exit_success {
            let summary = result.map(|s| s.trim().to_string()).unwrap_or_else(|| "completed".into());
            self.rt.store.publish(&self.rt.run, &node.id, &summary)?;
            self.rt.board.set_status(&node.id, NodeStatus::Completed)?;
            self.rt.bus.send(
                self.worker.name(),
                Some(COORDINATOR),
                format!("node {} completed: {}", node.id.as_str(), agiraph_core::short(&summary, 200)),
            )?;
            Ok(NodeOutcome::Completed)
        } else {
            fail_node(&self.rt, self.worker.name(), node, "process exited without result", &[])?;
            Ok(NodeOutcome::Failed)
        }
    }

    fn write_bridge_files(&self, node: &WorkNode, dir: &Path) -> Result<(), KernelError> {
        let task = format!(
            "{task}\n\n---\n\
             Write your outputs into scratch/ inside this directory.\n\
             When finished, write _result.md with a short summary.\n\
             Incoming messages append to _inbox.md. To send one, append to \
             _outbox.md: an optional `to: <name>` first line, the body, then \
             a `---` line. Without a header the message goes to the \
             coordinator.\n",
            task = node.task,
        );
        std::fs::write(dir.join("_task.md"), task)?;
        let context = serde_json::json!({
            "agent_id": self.rt.agent_id,
            "run_id": self.rt.run,
            "node_id": node.id,
            "worker": self.worker.spec.name,
            "goal": self.rt.goal,
            "refs": node.refs,
        });
        std::fs::write(dir.join("_context.json"), serde_json::to_string_pretty(&context)?)?;
        std::fs::write(dir.join("_inbox.md"), "")?;
        std::fs::write(dir.join("_outbox.md"), "")?;
        Ok(())
    }

    /// Append pending bus messages to `_inbox.md`.
    fn relay_inbox(&self, dir: &Path) -> Result<(), KernelError> {
        let messages = self.rt.bus.receive(self.worker.name())?;
        if messages.is_empty() {
            return Ok(());
        }
        let mut file =
            std::fs::OpenOptions::new().create(true).append(true).open(dir.join("_inbox.md"))?;
        for message in messages {
            writeln!(file, "[from {}] {}\n", message.from, message.content)?;
        }
        self.rt.touch_activity();
        Ok(())
    }

    /// Parse newly completed `_outbox.md` blocks into bus messages.
    /// Returns the new consumed offset; a trailing partial block waits for
    /// its separator.
    fn drain_outbox(&self, dir: &Path, offset: usize) -> Result<usize, KernelError> {
        let content = match std::fs::read_to_string(dir.join("_outbox.md")) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(offset),
            Err(e) => return Err(e.into()),
        };
        if content.len() <= offset {
            return Ok(offset);
        }

        let mut consumed = offset;
        let mut cursor = offset;
        while let Some(found) = content[cursor..].find(OUTBOX_SEPARATOR) {
            let block_end = cursor + found;
            let block = content[cursor..block_end].trim();
            cursor = block_end + OUTBOX_SEPARATOR.len();
            consumed = cursor;
            if block.is_empty() {
                continue;
            }

            let (to, body) = match block.strip_prefix("to:") {
                Some(rest) => {
                    let (name, body) = rest.split_once('\n').unwrap_or((rest, ""));
                    (Some(name.trim().to_string()), body.trim().to_string())
                }
                None => (None, block.to_string()),
            };
            self.rt.bus.send(self.worker.name(), to.as_deref(), body)?;
        }
        Ok(consumed)
    }
}

#[cfg(test)]
#[path = "autonomous_tests.rs"]
mod tests;
