// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker pool: live workers and idle lookup.
//!
//! Pure state, like the board; the runtime emits the `worker.*` events
//! around its mutations. Idle lookup is least-recently-used so work
//! spreads across equally idle workers.

use agiraph_core::{KernelError, NodeId, SharedClock, Worker, WorkerId, WorkerStatus};
use indexmap::IndexMap;
use parking_lot::Mutex;

/// Worker store for one run.
pub struct WorkerPool {
    clock: SharedClock,
    workers: Mutex<IndexMap<WorkerId, Worker>>,
}

impl WorkerPool {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock, workers: Mutex::new(IndexMap::new()) }
    }

    pub fn add(&self, worker: Worker) {
        self.workers.lock().insert(worker.id, worker);
    }

    pub fn get(&self, id: &WorkerId) -> Option<Worker> {
        self.workers.lock().get(id).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Worker> {
        self.workers.lock().values().find(|w| w.name() == name).cloned()
    }

    pub fn list(&self) -> Vec<Worker> {
        self.workers.lock().values().cloned().collect()
    }

    /// Idle workers, least-recently-used first.
    pub fn idle_workers(&self) -> Vec<Worker> {
        let mut idle: Vec<Worker> = self
            .workers
            .lock()
            .values()
            .filter(|w| w.status == WorkerStatus::Idle)
            .cloned()
            .collect();
        idle.sort_by_key(|w| w.idle_since_ms);
        idle
    }

    /// Set a worker's status; stamps `idle_since_ms` on the busy→idle edge.
    pub fn set_status(&self, id: &WorkerId, status: WorkerStatus) -> Result<(), KernelError> {
        let mut workers = self.workers.lock();
        let worker = workers
            .get_mut(id)
            .ok_or_else(|| KernelError::Tool(format!("unknown worker: {}", id.as_str())))?;
        if worker.status != WorkerStatus::Idle && status == WorkerStatus::Idle {
            worker.idle_since_ms = self.clock.epoch_ms();
        }
        worker.status = status;
        if status != WorkerStatus::Busy {
            worker.current_node = None;
        }
        Ok(())
    }

    pub fn set_current_node(&self, id: &WorkerId, node: Option<NodeId>) {
        if let Some(worker) = self.workers.lock().get_mut(id) {
            worker.current_node = node;
        }
    }

    /// Workers currently executing something.
    pub fn busy_workers(&self) -> Vec<Worker> {
        self.workers
            .lock()
            .values()
            .filter(|w| w.status == WorkerStatus::Busy)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
