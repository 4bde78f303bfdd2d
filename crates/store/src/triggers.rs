// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger persistence: `triggers.json` in the agent home.

use agiraph_core::{KernelError, Trigger};
use std::path::PathBuf;

/// Durable trigger set for one agent.
pub struct TriggerStore {
    path: PathBuf,
}

impl TriggerStore {
    pub fn new(agent_dir: &std::path::Path) -> Self {
        Self { path: agent_dir.join("triggers.json") }
    }

    /// Load all persisted triggers. Missing file is an empty set.
    pub fn load(&self) -> Result<Vec<Trigger>, KernelError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the persisted set.
    pub fn save(&self, triggers: &[Trigger]) -> Result<(), KernelError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(triggers)?)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "triggers_tests.rs"]
mod tests;
