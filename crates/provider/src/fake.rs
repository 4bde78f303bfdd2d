// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted provider for executor and integration tests.
//!
//! Responses are queued ahead of time and popped per `complete` call;
//! failures can be injected to exercise retry paths. With several loops
//! sharing one provider (coordinator plus workers), steps can be routed
//! by a substring of the caller's system prompt. Every call is recorded
//! with a snapshot of the conversation so tests can assert on turn
//! ordering (the adjacency rule in particular).

use crate::{ModelResponse, ProviderAdapter, ProviderError, ToolCall, ToolDef, Turn};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;

/// One scripted step.
#[derive(Debug, Clone)]
pub enum FakeStep {
    Respond(ModelResponse),
    Fail(ProviderError),
    /// Never resolves; exercises cancellation of in-flight calls.
    Hang,
}

/// Snapshot of one `complete` call.
#[derive(Debug, Clone)]
pub struct FakeCall {
    pub system: String,
    pub turns: Vec<Turn>,
    pub tool_names: Vec<String>,
}

#[derive(Debug)]
struct Scripted {
    /// Substring the caller's system prompt must contain; `None` matches
    /// any caller.
    route: Option<String>,
    step: FakeStep,
}

/// Scripted test provider.
#[derive(Debug, Default)]
pub struct FakeProvider {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a step for any caller.
    pub fn push_step(&self, step: FakeStep) {
        self.script.lock().push_back(Scripted { route: None, step });
    }

    /// Queue a step only for callers whose system prompt contains `route`.
    pub fn push_step_for(&self, route: impl Into<String>, step: FakeStep) {
        self.script.lock().push_back(Scripted { route: Some(route.into()), step });
    }

    /// Queue a plain text reply.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push_step(FakeStep::Respond(ModelResponse::text_only(text)));
    }

    /// Queue a single tool call with a generated id.
    pub fn push_tool_call(&self, name: impl Into<String>, args: serde_json::Value) {
        self.push_tool_calls(vec![(name.into(), args)]);
    }

    /// Queue one assistant turn containing several tool calls.
    pub fn push_tool_calls(&self, calls: Vec<(String, serde_json::Value)>) {
        self.push_step(FakeStep::Respond(Self::calls_response(calls)));
    }

    /// Routed variant of [`FakeProvider::push_tool_calls`].
    pub fn push_tool_calls_for(
        &self,
        route: impl Into<String>,
        calls: Vec<(String, serde_json::Value)>,
    ) {
        self.push_step_for(route, FakeStep::Respond(Self::calls_response(calls)));
    }

    /// Routed single tool call.
    pub fn push_tool_call_for(
        &self,
        route: impl Into<String>,
        name: impl Into<String>,
        args: serde_json::Value,
    ) {
        self.push_tool_calls_for(route, vec![(name.into(), args)]);
    }

    /// Queue a full response (for content-block round-trip tests).
    pub fn push_response(&self, response: ModelResponse) {
        self.push_step(FakeStep::Respond(response));
    }

    /// Queue a transient failure.
    pub fn push_transient_failure(&self, msg: impl Into<String>) {
        self.push_step(FakeStep::Fail(ProviderError::Transient(msg.into())));
    }

    /// Queue a permanent failure.
    pub fn push_permanent_failure(&self, msg: impl Into<String>) {
        self.push_step(FakeStep::Fail(ProviderError::Permanent(msg.into())));
    }

    /// Queue a call that never returns (until the caller cancels it).
    pub fn push_hang(&self) {
        self.push_step(FakeStep::Hang);
    }

    /// Routed hang.
    pub fn push_hang_for(&self, route: impl Into<String>) {
        self.push_step_for(route, FakeStep::Hang);
    }

    fn calls_response(calls: Vec<(String, serde_json::Value)>) -> ModelResponse {
        let calls = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, args))| ToolCall { id: format!("fake-{}", i + 1), name, args })
            .collect();
        ModelResponse::with_calls(calls)
    }

    /// All calls recorded so far.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().clone()
    }

    /// Number of scripted steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }

    fn pop_for(&self, system: &str) -> Option<FakeStep> {
        let mut script = self.script.lock();
        let index = script
            .iter()
            .position(|s| match s.route.as_deref() {
                Some(route) => system.contains(route),
                None => true,
            })?;
        script.remove(index).map(|s| s.step)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn format_tools(&self, defs: &[ToolDef]) -> Option<serde_json::Value> {
        Some(json!(defs.iter().map(|d| d.name.clone()).collect::<Vec<_>>()))
    }

    fn parse_response(&self, _raw: &serde_json::Value) -> Result<ModelResponse, ProviderError> {
        Ok(ModelResponse::default())
    }

    async fn complete(
        &self,
        system: &str,
        turns: &[Turn],
        tools: &[ToolDef],
    ) -> Result<ModelResponse, ProviderError> {
        self.calls.lock().push(FakeCall {
            system: system.to_string(),
            turns: turns.to_vec(),
            tool_names: tools.iter().map(|d| d.name.clone()).collect(),
        });
        match self.pop_for(system) {
            Some(FakeStep::Respond(response)) => Ok(response),
            Some(FakeStep::Fail(error)) => Err(error),
            Some(FakeStep::Hang) => {
                std::future::pending::<()>().await;
                unreachable!("pending future resolved")
            }
            // No matching step: idle rather than fail, so long-lived
            // coordinator loops can keep ticking in tests.
            None => Ok(ModelResponse::text_only("(idle)")),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
