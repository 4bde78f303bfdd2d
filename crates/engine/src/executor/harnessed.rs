// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The harnessed ReAct loop.
//!
//! One provider call per iteration. The assistant message carrying tool
//! calls is appended to the conversation before any tool runs, and every
//! tool result is appended consecutively right after it — yield points
//! happen only between complete assistant/result groups. Getting this
//! wrong is the classic source of OpenAI 400s, so the ordering is
//! structural here, not a convention.

use super::{fail_node, NodeOutcome};
use crate::cancel::StopFlag;
use crate::runtime::AgentRuntime;
use crate::tools::{Caller, ToolContext};
use agiraph_core::{KernelError, WorkNode, Worker, COORDINATOR};
use agiraph_provider::{ModelResponse, ToolDef, Turn};
use agiraph_store::{ConversationLog, Scope};
use std::sync::Arc;
use std::time::Duration;

/// Sleep between the first provider failure and the single retry.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Rough chars-per-token estimate for the compaction check.
const CHARS_PER_TOKEN: u64 = 4;

/// Kernel-run ReAct executor.
pub struct HarnessedExecutor {
    rt: Arc<AgentRuntime>,
    worker: Worker,
    stop: StopFlag,
}

impl HarnessedExecutor {
    pub fn new(rt: Arc<AgentRuntime>, worker: Worker, stop: StopFlag) -> Self {
        Self { rt, worker, stop }
    }

    /// Run the node to publish, failure, or cancellation.
    pub async fn execute(&self, node: &WorkNode) -> Result<NodeOutcome, KernelError> {
        let run = self.rt.run;
        let conversation = ConversationLog::new(
            self.rt.store.worker_dir(&run, &self.worker.id).join("conversation.jsonl"),
        );
        // Worker memory survives across nodes within the run: pick the
        // conversation up where the last assignment left it.
        let mut turns = load_turns(&conversation);

        let task_turn = Turn::user(self.task_briefing(node));
        conversation.append(&task_turn)?;
        turns.push(task_turn);

        let capabilities = if self.worker.spec.capabilities.is_empty() {
            self.rt.tool_sets.worker.clone()
        } else {
            self.worker.spec.capabilities.clone()
        };
        let defs = self.rt.tools.defs(&capabilities);
        let system = self.system_prompt(&defs)?;
        let ctx = ToolContext {
            rt: Arc::clone(&self.rt),
            caller: Caller::Worker {
                id: self.worker.id,
                name: self.worker.spec.name.clone(),
                node: node.id,
            },
        };

        for _iteration in 0..self.rt.config.max_worker_iterations {
            self.yield_point(&mut turns, &conversation)?;
            tokio::task::yield_now().await;

            let response = match self.call_model(&system, &turns, &defs).await {
                Ok(response) => response,
                Err(e) if e.is_cancelled() => return Err(KernelError::Cancelled),
                Err(e) => {
                    // Both attempts spent: persist the trail and give up.
                    fail_node(
                        &self.rt,
                        self.worker.name(),
                        node,
                        &format!("provider error: {e}"),
                        &turns,
                    )?;
                    return Ok(NodeOutcome::Failed);
                }
            };

            // Assistant first, then every result, before anything else.
            let assistant = Turn::assistant(&response);
            conversation.append(&assistant)?;
            turns.push(assistant);

            if response.tool_calls.is_empty() {
                let nudge = Turn::user(
                    "No tool call received. Keep working with your tools; \
                     call publish with a summary when the node is done.",
                );
                conversation.append(&nudge)?;
                turns.push(nudge);
                continue;
            }

            let mut finished = false;
            for call in &response.tool_calls {
                let output = if finished {
                    "skipped: node already finished".to_string()
                } else {
                    self.rt.tools.dispatch(call, ctx.clone()).await?
                };
                let result_turn = self.rt.provider.format_tool_result(call, &output);
                conversation.append(&result_turn)?;
                turns.push(result_turn);
                if call.name == "publish" || call.name == "finish" {
                    finished = true;
                }
            }
            if finished {
                return Ok(NodeOutcome::Completed);
            }

            self.maybe_compact(node, &mut turns, &conversation)?;
        }

        fail_node(&self.rt, self.worker.name(), node, "max_iterations", &turns)?;
        Ok(NodeOutcome::Failed)
    }

    /// Drain the inbox into user turns and observe cancellation.
    fn yield_point(
        &self,
        turns: &mut Vec<Turn>,
        conversation: &ConversationLog,
    ) -> Result<(), KernelError> {
        self.stop.check()?;
        for message in self.rt.bus.receive(self.worker.name())? {
            let turn = Turn::user(format!("[Message from {}]: {}", message.from, message.content));
            conversation.append(&turn)?;
            turns.push(turn);
        }
        self.rt.touch_activity();
        Ok(())
    }

    /// One provider call with exactly one retry on a transient failure.
    async fn call_model(
        &self,
        system: &str,
        turns: &[Turn],
        defs: &[ToolDef],
    ) -> Result<ModelResponse, KernelError> {
        match self.try_call(system, turns, defs).await {
            Err(e) if e.is_transient() => {
                tracing::warn!(worker = %self.worker.name(), error = %e, "provider failed, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                self.stop.check()?;
                self.try_call(system, turns, defs).await
            }
            other => other,
        }
    }

    async fn try_call(
        &self,
        system: &str,
        turns: &[Turn],
        defs: &[ToolDef],
    ) -> Result<ModelResponse, KernelError> {
        tokio::select! {
            result = self.rt.provider.complete(system, turns, defs) => {
                result.map_err(KernelError::from)
            }
            _ = self.stop.cancelled() => Err(KernelError::Cancelled),
        }
    }

    /// Compact when the estimated token footprint crosses the configured
    /// fraction of the context limit. The old conversation is archived,
    /// never deleted.
    fn maybe_compact(
        &self,
        node: &WorkNode,
        turns: &mut Vec<Turn>,
        conversation: &ConversationLog,
    ) -> Result<(), KernelError> {
        let estimate = turns
            .iter()
            .map(|turn| serde_json::to_string(turn).map(|s| s.len() as u64).unwrap_or(0))
            .sum::<u64>()
            / CHARS_PER_TOKEN;
        if estimate <= self.rt.config.compaction_threshold_tokens() {
            return Ok(());
        }

        tracing::info!(worker = %self.worker.name(), estimate, "compacting conversation");
        conversation.archive(&format!("pre-compact-{}", self.rt.clock.epoch_ms()))?;

        let keep = self.rt.config.compact_keep_turns.min(turns.len());
        let mut tail: Vec<Turn> = turns[turns.len() - keep..].to_vec();
        // Never lead with orphaned tool results.
        while matches!(tail.first(), Some(Turn::ToolResult { .. })) {
            tail.remove(0);
        }

        let scratch = self
            .rt
            .store
            .list_files(&Scope::Node(self.rt.run, node.id), "scratch")
            .unwrap_or_default();
        let reconstruction = Turn::user(format!(
            "Conversation compacted; reconstructed from your files.\n\
             Task:\n{}\n\nScratch files so far: {}\n\nContinue from this state.",
            node.task,
            if scratch.is_empty() { "(none)".to_string() } else { scratch.join(", ") },
        ));

        turns.clear();
        turns.push(reconstruction);
        turns.extend(tail);
        for turn in turns.iter() {
            conversation.append(turn)?;
        }
        Ok(())
    }

    fn task_briefing(&self, node: &WorkNode) -> String {
        let mut briefing = format!(
            "Your assigned node is {}.\n\nTask:\n{}\n",
            node.id.as_str(),
            node.task,
        );
        if !node.refs.is_empty() {
            briefing.push_str("\nInputs from upstream nodes:\n");
            for (name, target) in &node.refs {
                briefing.push_str(&format!("- {name}: read_file(\"nodes/{target}\")\n"));
            }
        }
        briefing.push_str(
            "\nWrite outputs under scratch/ and call publish with a summary when done.",
        );
        briefing
    }

    fn system_prompt(&self, defs: &[ToolDef]) -> Result<String, KernelError> {
        let identity = self
            .rt
            .store
            .read_file(&Scope::Worker(self.rt.run, self.worker.id), "identity.md")
            .unwrap_or_else(|_| format!("You are {}.", self.worker.name()));
        let tool_prompt = self.rt.provider.format_tool_prompt(defs);
        Ok(format!(
            "{identity}\n\nYou report to \"{COORDINATOR}\" on the message bus.\n\n{tool_prompt}"
        ))
    }
}

fn load_turns(conversation: &ConversationLog) -> Vec<Turn> {
    match conversation.read_values() {
        Ok(values) => values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "could not load prior conversation, starting fresh");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "harnessed_tests.rs"]
mod tests;
