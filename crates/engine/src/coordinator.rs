// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordinator: an agent's always-live loop.
//!
//! It differs from a worker in three ways: it never completes a node, it
//! holds the full coordinator tool set, and it is the default route for
//! human messages. The outer loop alternates plan-and-dispatch with a
//! monitor phase that blocks in `wait_for_activity` — the coordinator
//! never re-thinks until something changed (worker finished, message
//! arrived, trigger fired, stop requested).

use crate::runtime::AgentRuntime;
use crate::tools::{Caller, ToolContext};
use agiraph_core::{
    AgentMode, AgentStatus, Event, KernelError, COORDINATOR, HUMAN, SYSTEM,
};
use agiraph_provider::{ModelResponse, ToolDef, Turn};
use agiraph_store::{ConversationLog, Scope};
use std::sync::Arc;
use std::time::Duration;

/// Yield cadence for the monitor loop.
const MONITOR_TICK: Duration = Duration::from_secs(1);

/// Sleep between the first provider failure and the single retry.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// The coordinator loop for one agent.
pub struct Coordinator {
    rt: Arc<AgentRuntime>,
    conversation: ConversationLog,
    turns: Vec<Turn>,
}

impl Coordinator {
    pub fn new(rt: Arc<AgentRuntime>) -> Self {
        let conversation = rt.coordinator_conversation();
        let turns = match conversation.read_values() {
            Ok(values) => values
                .into_iter()
                .filter_map(|value| serde_json::from_value(value).ok())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "could not load coordinator conversation");
                Vec::new()
            }
        };
        Self { rt, conversation, turns }
    }

    /// Run until `finish` or agent shutdown.
    pub async fn run(mut self) {
        match self.run_inner().await {
            Ok(()) => tracing::info!(agent = %self.rt.agent_id, "coordinator finished"),
            Err(e) if e.is_cancelled() => {
                tracing::info!(agent = %self.rt.agent_id, "coordinator cancelled");
            }
            Err(e) => {
                tracing::error!(agent = %self.rt.agent_id, error = %e, "coordinator error");
                let _ = self.rt.journal.emit(Event::AgentStopped { reason: Some(e.to_string()) });
                self.rt.set_status(AgentStatus::Stopped);
            }
        }
    }

    async fn run_inner(&mut self) -> Result<(), KernelError> {
        self.rt.set_status(AgentStatus::Working);
        self.rt.journal.emit(Event::AgentStarted { goal: self.rt.goal.clone() })?;

        if self.turns.is_empty() {
            let kickoff = Turn::user(self.kickoff_text());
            self.conversation.append(&kickoff)?;
            self.turns.push(kickoff);
            self.think().await?;
        }

        loop {
            if let Some(summary) = self.rt.take_finish() {
                self.rt.journal.emit(Event::AgentCompleted { summary })?;
                self.rt.set_status(AgentStatus::Completed);
                return Ok(());
            }
            self.rt.stop.check()?;

            self.wait_for_activity().await;

            let think_needed = self.yield_point()?;
            if think_needed && !self.rt.stop_requested() {
                self.think().await?;
            }
        }
    }

    /// Block on the activity condition: bus delivery, worker completion,
    /// trigger firing, or shutdown — with a ≤1s tick as a safety cadence.
    async fn wait_for_activity(&self) {
        let notify = self.rt.bus.activity();
        tokio::select! {
            _ = notify.notified() => {}
            _ = tokio::time::sleep(MONITOR_TICK) => {}
            _ = self.rt.stop.cancelled() => {}
        }
    }

    /// Drain the inbox. Human messages were journaled at send time, so the
    /// drain path injects them into memory without re-logging (exactly-once
    /// journaling); everything else is appended to the conversation here.
    /// A human message also clears a pending stop.
    fn yield_point(&mut self) -> Result<bool, KernelError> {
        let messages = self.rt.bus.receive(COORDINATOR)?;
        self.rt.touch_activity();
        let mut think_needed = false;
        let mut human_arrived = false;
        for message in messages {
            let turn = if message.from == SYSTEM {
                Turn::System { content: message.content.clone() }
            } else {
                Turn::user(format!("[Message from {}]: {}", message.from, message.content))
            };
            if message.from != HUMAN {
                self.conversation.append(&turn)?;
            }
            human_arrived |= message.from == HUMAN;
            self.turns.push(turn);
            think_needed = true;
        }
        if human_arrived && self.rt.stop_requested() {
            tracing::info!(agent = %self.rt.agent_id, "human message clears stop; resuming");
            self.rt.set_stop_requested(false);
            self.rt.set_status(AgentStatus::Working);
        }
        Ok(think_needed)
    }

    /// One plan-and-dispatch burst: call the model, relay its reply, run
    /// its tool calls, repeat until it stops calling tools.
    async fn think(&mut self) -> Result<(), KernelError> {
        let defs = self.rt.tools.defs(&self.rt.tool_sets.coordinator);
        let system = self.system_prompt(&defs);
        let ctx = ToolContext { rt: Arc::clone(&self.rt), caller: Caller::Coordinator };

        for _round in 0..self.rt.config.max_worker_iterations {
            self.rt.stop.check()?;
            let response = match self.call_model(&system, &defs).await {
                Ok(response) => response,
                Err(e) if e.is_cancelled() => return Err(KernelError::Cancelled),
                Err(e) => {
                    // Both attempts failed: park the agent for a human.
                    tracing::error!(agent = %self.rt.agent_id, error = %e, "coordinator provider failed");
                    self.rt.journal.emit(Event::AgentStopped {
                        reason: Some(format!("coordinator provider error: {e}")),
                    })?;
                    self.rt.set_status(AgentStatus::Stopped);
                    return Ok(());
                }
            };

            let assistant = Turn::assistant(&response);
            self.conversation.append(&assistant)?;
            self.turns.push(assistant);

            if let Some(text) = response.text.as_deref().filter(|t| !t.trim().is_empty()) {
                self.rt.bus.send(COORDINATOR, Some(HUMAN), text)?;
            }
            if response.tool_calls.is_empty() {
                return Ok(());
            }

            for call in &response.tool_calls {
                let output = self.rt.tools.dispatch(call, ctx.clone()).await?;
                let result_turn = self.rt.provider.format_tool_result(call, &output);
                self.conversation.append(&result_turn)?;
                self.turns.push(result_turn);
            }
            // finish() latches the flag; the outer loop emits completion.
            if self.rt.stop_requested() || self.rt.finish_pending() {
                return Ok(());
            }
        }
        tracing::warn!(agent = %self.rt.agent_id, "coordinator think hit its round cap");
        Ok(())
    }

    async fn call_model(
        &self,
        system: &str,
        defs: &[ToolDef],
    ) -> Result<ModelResponse, KernelError> {
        match self.try_call(system, defs).await {
            Err(e) if e.is_transient() => {
                tracing::warn!(agent = %self.rt.agent_id, error = %e, "provider failed, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                self.rt.stop.check()?;
                self.try_call(system, defs).await
            }
            other => other,
        }
    }

    async fn try_call(&self, system: &str, defs: &[ToolDef]) -> Result<ModelResponse, KernelError> {
        tokio::select! {
            result = self.rt.provider.complete(system, &self.turns, defs) => {
                result.map_err(KernelError::from)
            }
            _ = self.rt.stop.cancelled() => Err(KernelError::Cancelled),
        }
    }

    fn kickoff_text(&self) -> String {
        format!(
            "Your goal:\n{}\n\nWork the goal with your tools. Create one or two \
             nodes, observe the results, then decide what comes next. Spawn \
             workers when the work calls for a team; reply in plain text to \
             talk to the human.",
            self.rt.goal,
        )
    }

    fn system_prompt(&self, defs: &[ToolDef]) -> String {
        let soul = self
            .rt
            .store
            .read_file(&Scope::Agent, "SOUL.md")
            .unwrap_or_else(|_| "You are a coordinator.".to_string());
        let mode_note = match self.rt.mode {
            AgentMode::Finite => "Call finish with a summary once the goal is met.",
            AgentMode::Infinite => {
                "This agent runs forever: never call finish. Triggers wake you for each cycle."
            }
        };
        format!(
            "{soul}\n\nYou are the coordinator of agent \"{agent}\". {mode_note}\n\n{tools}",
            agent = self.rt.agent_id,
            tools = self.rt.provider.format_tool_prompt(defs),
        )
    }
}
