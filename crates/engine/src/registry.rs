// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide agent registry.
//!
//! The only global mutable state in the system: `agent_id → kernel` under
//! one lock, initialized at server start and torn down at server stop.
//! Agents do not share state; each runs on its own task group.

use crate::config::Config;
use crate::kernel::{AgentKernel, AgentSummary};
use agiraph_core::{AgentConfig, AgentId, KernelError, SharedClock, SystemClock};
use agiraph_provider::ProviderAdapter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// All live agents in this process.
pub struct AgentRegistry {
    config: Config,
    clock: SharedClock,
    agents: Mutex<HashMap<AgentId, Arc<AgentKernel>>>,
}

impl AgentRegistry {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: SharedClock) -> Self {
        Self { config, clock, agents: Mutex::new(HashMap::new()) }
    }

    /// Start an agent, building its provider from configuration.
    pub fn start(
        &self,
        agent_id: impl Into<AgentId>,
        agent: AgentConfig,
    ) -> Result<Arc<AgentKernel>, KernelError> {
        let provider = self.config.provider_for(&agent.coordinator_model)?;
        self.start_with_provider(agent_id, agent, provider)
    }

    /// Start an agent with an explicit provider (tests inject fakes here).
    pub fn start_with_provider(
        &self,
        agent_id: impl Into<AgentId>,
        agent: AgentConfig,
        provider: Arc<dyn ProviderAdapter>,
    ) -> Result<Arc<AgentKernel>, KernelError> {
        let agent_id = agent_id.into();
        {
            let agents = self.agents.lock();
            if agents.contains_key(&agent_id) {
                return Err(KernelError::Config(format!("agent already running: {agent_id}")));
            }
        }
        let kernel = AgentKernel::start(
            agent_id.clone(),
            agent,
            self.config.clone(),
            self.clock.clone(),
            provider,
        )?;
        self.agents.lock().insert(agent_id, Arc::clone(&kernel));
        Ok(kernel)
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<AgentKernel>> {
        self.agents.lock().get(agent_id).cloned()
    }

    pub fn list(&self) -> Vec<AgentSummary> {
        let mut summaries: Vec<AgentSummary> =
            self.agents.lock().values().map(|kernel| kernel.summary()).collect();
        summaries.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
        summaries
    }

    /// Cooperative stop; the agent stays registered and resumable.
    pub fn stop(&self, agent_id: &str) -> Result<(), KernelError> {
        let kernel = self
            .get(agent_id)
            .ok_or_else(|| KernelError::Config(format!("no such agent: {agent_id}")))?;
        kernel.stop()
    }

    /// Stop, deregister, and remove the agent's home directory.
    pub async fn delete(&self, agent_id: &str) -> Result<(), KernelError> {
        let kernel = self
            .agents
            .lock()
            .remove(agent_id)
            .ok_or_else(|| KernelError::Config(format!("no such agent: {agent_id}")))?;
        let dir = kernel.runtime().store.agent_dir().to_path_buf();
        kernel.shutdown().await;
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Tear down every agent (server stop).
    pub async fn shutdown(&self) {
        let kernels: Vec<Arc<AgentKernel>> = self.agents.lock().drain().map(|(_, k)| k).collect();
        for kernel in kernels {
            kernel.shutdown().await;
        }
    }
}
