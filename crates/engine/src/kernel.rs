// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent kernel: lifecycle API over one composed runtime.
//!
//! Everything the HTTP layer needs is a method here; the kernel itself
//! never speaks HTTP. Read-only views mirror the server surface (board,
//! workers, conversation, event backfill, live subscription).

use crate::coordinator::Coordinator;
use crate::runtime::AgentRuntime;
use crate::triggers::TriggerScheduler;
use agiraph_core::{
    AgentConfig, AgentId, AgentMode, AgentStatus, EventRecord, KernelError, SharedClock,
    WorkNode, Worker, BROADCAST, COORDINATOR,
};
use agiraph_provider::{ProviderAdapter, Turn};
use agiraph_store::TriggerStore;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::Config;

/// Read-only agent overview (the `GET /agents/{id}` shape).
#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentSummary {
    pub agent_id: AgentId,
    pub goal: String,
    pub mode: AgentMode,
    pub status: AgentStatus,
    pub model: String,
    pub path: PathBuf,
    pub created_at_ms: u64,
}

/// One live agent: runtime plus its coordinator task.
pub struct AgentKernel {
    rt: Arc<AgentRuntime>,
    coordinator: Mutex<Option<JoinHandle<()>>>,
}

impl AgentKernel {
    /// Build the runtime, restore persisted triggers, and launch the
    /// coordinator loop.
    pub fn start(
        agent_id: AgentId,
        agent: AgentConfig,
        config: Config,
        clock: SharedClock,
        provider: Arc<dyn ProviderAdapter>,
    ) -> Result<Arc<Self>, KernelError> {
        let rt = AgentRuntime::build(agent_id, &agent, config, clock.clone(), provider)?;
        let scheduler = TriggerScheduler::new(TriggerStore::new(rt.store.agent_dir()), clock);
        scheduler.bind(&rt);
        rt.attach_triggers(Arc::clone(&scheduler));
        let restored = scheduler.restore()?;
        if restored > 0 {
            tracing::info!(agent = %rt.agent_id, restored, "re-registered persisted triggers");
        }

        let coordinator = Coordinator::new(Arc::clone(&rt));
        let handle = tokio::spawn(coordinator.run());
        Ok(Arc::new(Self { rt, coordinator: Mutex::new(Some(handle)) }))
    }

    pub fn runtime(&self) -> &Arc<AgentRuntime> {
        &self.rt
    }

    /// Enqueue a human message. Defaults to the coordinator; `"*"`
    /// broadcasts. Coordinator-bound human messages are journaled to the
    /// conversation here, at send time — the coordinator's drain path
    /// knows not to log them again.
    pub fn send_message(&self, to: Option<&str>, content: &str) -> Result<(), KernelError> {
        let resolved = to.unwrap_or(COORDINATOR);
        if resolved == COORDINATOR || resolved == BROADCAST {
            self.rt
                .coordinator_conversation()
                .append(&Turn::user(format!("[Message from human]: {content}")))?;
        }
        self.rt.bus.send(agiraph_core::HUMAN, to, content)
    }

    /// Answer a pending `ask_human`.
    pub fn respond(&self, response: &str) -> Result<(), KernelError> {
        self.rt.respond_human(response)
    }

    /// Cooperative stop: cancels workers, preserves the coordinator's
    /// conversation, parks the agent as `waiting_for_human`.
    pub fn stop(&self) -> Result<(), KernelError> {
        self.rt.stop_agent()
    }

    /// Tear the agent down: kill every task and wait for the coordinator.
    pub async fn shutdown(&self) {
        self.rt.stop.stop();
        self.rt.triggers().stop_all();
        self.rt.stop_workers();
        self.rt.notify_activity();
        let handle = self.coordinator.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "coordinator task join failed");
            }
        }
        if !self.rt.status().is_terminal() {
            self.rt.set_status(AgentStatus::Stopped);
        }
    }

    // ── Read-only views ──────────────────────────────────────────────────

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            agent_id: self.rt.agent_id.clone(),
            goal: self.rt.goal.clone(),
            mode: self.rt.mode,
            status: self.rt.status(),
            model: self.rt.model.to_string(),
            path: self.rt.store.agent_dir().to_path_buf(),
            created_at_ms: self.rt.created_at_ms,
        }
    }

    pub fn status(&self) -> AgentStatus {
        self.rt.status()
    }

    /// Board view: every node with its status.
    pub fn board(&self) -> Vec<WorkNode> {
        self.rt.board.all()
    }

    /// Single node detail plus its published files.
    pub fn node(&self, id: &agiraph_core::NodeId) -> Option<(WorkNode, Vec<String>)> {
        let node = self.rt.board.get(id)?;
        let published = self.rt.store.published_files(&self.rt.run, id).unwrap_or_default();
        Some((node, published))
    }

    pub fn workers(&self) -> Vec<Worker> {
        self.rt.pool.list()
    }

    /// The coordinator conversation as raw JSON turns.
    pub fn conversation(&self) -> Result<Vec<serde_json::Value>, KernelError> {
        self.rt.coordinator_conversation().read_values()
    }

    /// Event backfill (`GET /agents/{id}/events?limit=N`).
    pub fn events(&self, limit: usize) -> Result<Vec<EventRecord>, KernelError> {
        self.rt.journal.recent(limit)
    }

    /// Live event stream (the WS feed). Combine with [`AgentKernel::events`]
    /// and dedup on `(type, ts)`.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<EventRecord> {
        self.rt.journal.subscribe()
    }

    /// Read a workspace file under scope rules (run scope).
    pub fn read_workspace(&self, path: &str) -> Result<String, KernelError> {
        self.rt.store.read_file(&agiraph_store::Scope::Run(self.rt.run), path)
    }

    /// Read an agent memory file.
    pub fn read_memory(&self, path: &str) -> Result<String, KernelError> {
        self.rt.store.read_file(&agiraph_store::Scope::Agent, path)
    }
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
