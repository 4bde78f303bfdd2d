// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent runtime state: the composition every loop hangs off.
//!
//! One `AgentRuntime` owns the store, journal, bus, board, pool, tool
//! registry, and trigger scheduler for a single agent. All mutation goes
//! through brief locks here; the coordinator and executor tasks hold an
//! `Arc` and nothing holds a pointer back into them.

use crate::board::WorkBoard;
use crate::bus::MessageBus;
use crate::cancel::StopFlag;
use crate::config::Config;
use crate::pool::WorkerPool;
use crate::tools::{register_builtins, BuiltinTools, ToolRegistry};
use crate::triggers::TriggerScheduler;
use agiraph_core::{
    AgentConfig, AgentId, AgentMode, AgentStatus, Event, KernelError, ModelRef, NodeId, RunId,
    SharedClock, Worker, WorkerId, WorkerSpec, WorkerStatus, COORDINATOR, HUMAN, SYSTEM,
};
use agiraph_provider::ProviderAdapter;
use agiraph_store::{ConversationLog, EventLog, ScopeStore};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::oneshot;

/// Shared state for one agent.
pub struct AgentRuntime {
    pub agent_id: AgentId,
    pub goal: String,
    pub mode: AgentMode,
    pub model: ModelRef,
    pub run: RunId,
    pub config: Config,
    pub clock: SharedClock,
    pub store: Arc<ScopeStore>,
    pub journal: Arc<EventLog>,
    pub bus: Arc<MessageBus>,
    pub board: Arc<WorkBoard>,
    pub pool: Arc<WorkerPool>,
    pub tools: Arc<ToolRegistry>,
    pub tool_sets: BuiltinTools,
    pub provider: Arc<dyn ProviderAdapter>,
    /// Agent-level kill switch (delete); workers get child flags.
    pub stop: StopFlag,
    pub created_at_ms: u64,

    status: Mutex<AgentStatus>,
    /// Coordinator stop-requested flag; cleared by the next human message.
    stopped: AtomicBool,
    finish: Mutex<Option<String>>,
    current_stage: Mutex<Option<String>>,
    worker_stops: Mutex<HashMap<WorkerId, StopFlag>>,
    explicit_assignments: Mutex<HashMap<NodeId, WorkerId>>,
    human_gate: Mutex<VecDeque<oneshot::Sender<String>>>,
    /// Epoch ms of the last yield-point drain or tool call; `on_idle` input.
    last_activity_ms: AtomicU64,
    triggers: OnceLock<Arc<TriggerScheduler>>,
}

impl AgentRuntime {
    /// Compose the runtime for one agent, creating its on-disk layout.
    pub fn build(
        agent_id: AgentId,
        agent: &AgentConfig,
        config: Config,
        clock: SharedClock,
        provider: Arc<dyn ProviderAdapter>,
    ) -> Result<Arc<Self>, KernelError> {
        let agent_dir = config.data_dir.join("agents").join(agent_id.as_str());
        let journal = Arc::new(EventLog::open(agent_id.clone(), &agent_dir, clock.clone())?);
        let store = Arc::new(ScopeStore::new(agent_id.clone(), agent_dir, Arc::clone(&journal)));
        store.ensure_agent_layout(&agent.goal)?;

        let run = RunId::new();
        store.ensure_run_layout(&run)?;

        let bus = Arc::new(MessageBus::new(Arc::clone(&journal), clock.clone()));
        bus.set_message_log(store.run_dir(&run).join("_messages/log.jsonl"));
        bus.register(HUMAN);
        bus.register(COORDINATOR);

        let board = Arc::new(WorkBoard::new(Arc::clone(&journal)));
        let pool = Arc::new(WorkerPool::new(clock.clone()));
        let tools = Arc::new(ToolRegistry::new());
        let tool_sets = register_builtins(&tools);

        let now_ms = clock.epoch_ms();
        Ok(Arc::new(Self {
            agent_id,
            goal: agent.goal.clone(),
            mode: agent.mode,
            model: agent.coordinator_model.clone(),
            run,
            config,
            clock,
            store,
            journal,
            bus,
            board,
            pool,
            tools,
            tool_sets,
            provider,
            stop: StopFlag::new(),
            created_at_ms: now_ms,
            status: Mutex::new(AgentStatus::Idle),
            stopped: AtomicBool::new(false),
            finish: Mutex::new(None),
            current_stage: Mutex::new(None),
            worker_stops: Mutex::new(HashMap::new()),
            explicit_assignments: Mutex::new(HashMap::new()),
            human_gate: Mutex::new(VecDeque::new()),
            last_activity_ms: AtomicU64::new(now_ms),
            triggers: OnceLock::new(),
        }))
    }

    /// Attach the trigger scheduler (set once during kernel assembly).
    pub fn attach_triggers(&self, scheduler: Arc<TriggerScheduler>) {
        let _ = self.triggers.set(scheduler);
    }

    pub fn triggers(&self) -> Arc<TriggerScheduler> {
        match self.triggers.get() {
            Some(scheduler) => Arc::clone(scheduler),
            None => unreachable!("trigger scheduler attached during kernel build"),
        }
    }

    // ── Status & activity ────────────────────────────────────────────────

    pub fn status(&self) -> AgentStatus {
        *self.status.lock()
    }

    pub fn set_status(&self, status: AgentStatus) {
        *self.status.lock() = status;
    }

    /// Record yield-point or tool activity for `on_idle` triggers.
    pub fn touch_activity(&self) {
        self.last_activity_ms.store(self.clock.epoch_ms(), Ordering::Relaxed);
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    /// Wake the coordinator's `wait_for_activity`.
    pub fn notify_activity(&self) {
        self.bus.activity().notify_one();
    }

    pub fn stop_requested(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn set_stop_requested(&self, value: bool) {
        self.stopped.store(value, Ordering::SeqCst);
    }

    pub fn request_finish(&self, summary: impl Into<String>) {
        *self.finish.lock() = Some(summary.into());
    }

    pub fn take_finish(&self) -> Option<String> {
        self.finish.lock().take()
    }

    pub fn finish_pending(&self) -> bool {
        self.finish.lock().is_some()
    }

    /// Swap the current stage, returning the previous one.
    pub fn swap_stage(&self, stage: Option<String>) -> Option<String> {
        std::mem::replace(&mut *self.current_stage.lock(), stage)
    }

    /// The coordinator's persistent conversation.
    pub fn coordinator_conversation(&self) -> ConversationLog {
        ConversationLog::new(self.store.agent_dir().join("conversation.jsonl"))
    }

    // ── Workers ──────────────────────────────────────────────────────────

    /// Instantiate a worker: identity file, pool entry, bus address.
    pub fn spawn_worker(&self, spec: WorkerSpec) -> Result<Worker, KernelError> {
        if self.pool.get_by_name(&spec.name).is_some() {
            return Err(KernelError::Tool(format!("worker name taken: {}", spec.name)));
        }
        let worker = Worker::new(spec, self.clock.epoch_ms());
        let identity = format!(
            "# {name}\n\nRole: {role}\nKind: {kind}\n\nYou are part of a team working toward:\n{goal}\n",
            name = worker.spec.name,
            role = worker.spec.role,
            kind = worker.spec.kind,
            goal = self.goal,
        );
        self.store.ensure_worker_layout(&self.run, &worker, &identity)?;
        self.bus.register(worker.spec.name.clone());
        self.pool.add(worker.clone());
        self.journal.emit(Event::WorkerSpawned {
            worker: worker.id,
            name: worker.spec.name.clone(),
            role: worker.spec.role.clone(),
            kind: worker.spec.kind,
        })?;
        Ok(worker)
    }

    /// Retire a worker: it stops being schedulable and leaves the bus.
    pub fn retire_worker(&self, id: &WorkerId) -> Result<(), KernelError> {
        if let Some(flag) = self.worker_stops.lock().get(id) {
            flag.stop();
        }
        if let Some(worker) = self.pool.get(id) {
            self.bus.unregister(worker.name());
        }
        self.pool.set_status(id, WorkerStatus::Stopped)?;
        self.journal.emit(Event::WorkerStopped { worker: *id })?;
        Ok(())
    }

    /// Pin a node to a worker ahead of automatic pairing.
    pub fn set_explicit_assignment(&self, node: NodeId, worker: WorkerId) {
        self.explicit_assignments.lock().insert(node, worker);
    }

    pub fn worker_stop_flag(&self, id: &WorkerId) -> Option<StopFlag> {
        self.worker_stops.lock().get(id).cloned()
    }

    // ── Scheduling ───────────────────────────────────────────────────────

    /// Match ready nodes against idle workers and launch executors.
    ///
    /// Invoked synchronously after every mutation that can unblock work;
    /// no suspension between a node add and this tick. Explicit
    /// assignments win; otherwise oldest ready node meets least-recently
    /// used idle worker.
    pub fn tick(self: &Arc<Self>) {
        loop {
            let ready = self.board.ready();
            if ready.is_empty() {
                return;
            }
            let idle = self.pool.idle_workers();
            if idle.is_empty() {
                return;
            }

            let explicit = self.explicit_assignments.lock().clone();
            let reserved: Vec<WorkerId> = ready
                .iter()
                .filter_map(|node| explicit.get(&node.id).copied())
                .collect();

            let mut pair: Option<(NodeId, WorkerId)> = None;
            for node in &ready {
                match explicit.get(&node.id) {
                    Some(worker_id) => {
                        if idle.iter().any(|w| w.id == *worker_id) {
                            pair = Some((node.id, *worker_id));
                            break;
                        }
                        // Pinned worker busy: the node waits for it.
                    }
                    None => {
                        if let Some(worker) =
                            idle.iter().find(|w| !reserved.contains(&w.id))
                        {
                            pair = Some((node.id, worker.id));
                            break;
                        }
                    }
                }
            }

            let Some((node_id, worker_id)) = pair else { return };
            if let Err(e) = self.assign(&node_id, &worker_id) {
                tracing::error!(node = %node_id, worker = %worker_id, error = %e, "assign failed");
                return;
            }
        }
    }

    /// Atomically pair a node with a worker and launch its executor.
    pub fn assign(self: &Arc<Self>, node_id: &NodeId, worker_id: &WorkerId) -> Result<(), KernelError> {
        let node = self
            .board
            .get(node_id)
            .ok_or_else(|| KernelError::Tool(format!("unknown node: {}", node_id.as_str())))?;
        let worker = self
            .pool
            .get(worker_id)
            .ok_or_else(|| KernelError::Tool(format!("unknown worker: {}", worker_id.as_str())))?;
        if worker.status != WorkerStatus::Idle {
            return Err(KernelError::Tool(format!("worker {} is not idle", worker.name())));
        }

        self.board.set_assigned(node_id, *worker_id)?;
        self.pool.set_status(worker_id, WorkerStatus::Busy)?;
        self.pool.set_current_node(worker_id, Some(*node_id));
        self.explicit_assignments.lock().remove(node_id);
        self.record_assignment(worker_id, node_id);
        self.journal.emit(Event::NodeAssigned { node_id: *node_id, worker: *worker_id })?;
        self.journal.emit(Event::WorkerBusy { worker: *worker_id })?;

        let stop = self.stop.child();
        self.worker_stops.lock().insert(*worker_id, stop.clone());
        let rt = Arc::clone(self);
        let node = node.clone();
        let worker = worker.clone();
        tokio::spawn(async move {
            crate::executor::run(rt, node, worker, stop).await;
        });
        Ok(())
    }

    /// Append the pairing to the worker's `history.json`.
    fn record_assignment(&self, worker_id: &WorkerId, node_id: &NodeId) {
        let path = self.store.worker_dir(&self.run, worker_id).join("history.json");
        let mut history: Vec<serde_json::Value> = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        history.push(serde_json::json!({
            "node_id": node_id,
            "assigned_at_ms": self.clock.epoch_ms(),
        }));
        let result = serde_json::to_string_pretty(&history)
            .map_err(KernelError::from)
            .and_then(|s| std::fs::write(&path, s).map_err(KernelError::from));
        if let Err(e) = result {
            tracing::warn!(worker = %worker_id, error = %e, "history append failed");
        }
    }

    /// Executor epilogue: release the worker and look for more work.
    pub fn executor_done(self: &Arc<Self>, worker_id: &WorkerId, cancelled: bool) {
        self.worker_stops.lock().remove(worker_id);
        if self.pool.get(worker_id).is_some() {
            if let Err(e) = self.pool.set_status(worker_id, WorkerStatus::Idle) {
                tracing::warn!(worker = %worker_id, error = %e, "release failed");
            }
            let event = if cancelled {
                Event::WorkerStopped { worker: *worker_id }
            } else {
                Event::WorkerIdle { worker: *worker_id }
            };
            if let Err(e) = self.journal.emit(event) {
                tracing::warn!(error = %e, "worker release event failed");
            }
        }
        if !cancelled {
            self.tick();
        }
        self.notify_activity();
    }

    /// Cooperatively cancel every running worker task.
    pub fn stop_workers(&self) {
        for (worker_id, flag) in self.worker_stops.lock().iter() {
            tracing::info!(worker = %worker_id, "cancelling worker task");
            flag.stop();
        }
    }

    /// Cooperative stop: cancel workers, flag the coordinator, inject a
    /// context summary, and park the agent for the next human message.
    pub fn stop_agent(self: &Arc<Self>) -> Result<(), KernelError> {
        self.stop_workers();
        self.set_stop_requested(true);
        let summary = self.snapshot_summary(10);
        self.bus.send(
            SYSTEM,
            Some(COORDINATOR),
            format!(
                "The human stopped the run. All workers were cancelled.\n\n{summary}\n\
                 Hold until the next human message, then resume from this state."
            ),
        )?;
        self.set_status(AgentStatus::WaitingForHuman);
        self.journal.emit(Event::AgentStopped { reason: Some("stop requested".into()) })?;
        self.notify_activity();
        Ok(())
    }

    /// Board, worker, and recent-event overview for stop notes and the
    /// `reconvene` tool.
    pub fn snapshot_summary(&self, recent_events: usize) -> String {
        let mut out = String::from("Board:\n");
        for node in self.board.all() {
            out.push_str(&format!(
                "- {} [{}] {}\n",
                node.id.short(8),
                node.status,
                agiraph_core::short(&node.task, 80),
            ));
        }
        out.push_str("Workers:\n");
        for worker in self.pool.list() {
            out.push_str(&format!(
                "- {} ({}) [{}]\n",
                worker.name(),
                worker.spec.role,
                worker.status,
            ));
        }
        if recent_events > 0 {
            if let Ok(records) = self.journal.recent(recent_events) {
                out.push_str("Recent events:\n");
                for record in records {
                    out.push_str(&format!("- {}\n", record.event.log_summary()));
                }
            }
        }
        out
    }

    // ── Human gate ───────────────────────────────────────────────────────

    /// Block until the human answers. The caller's stop flag aborts the
    /// wait with `Cancelled`.
    pub async fn ask_human(
        &self,
        asker: &str,
        question: &str,
        stop: &StopFlag,
    ) -> Result<String, KernelError> {
        self.journal.emit(Event::HumanQuestion {
            from: asker.to_string(),
            question: question.to_string(),
        })?;
        self.bus.send(asker, Some(HUMAN), question)?;
        let (tx, rx) = oneshot::channel();
        self.human_gate.lock().push_back(tx);
        self.notify_activity();

        tokio::select! {
            answer = rx => answer.map_err(|_| KernelError::Cancelled),
            _ = stop.cancelled() => Err(KernelError::Cancelled),
        }
    }

    /// Feed a human answer to the oldest pending `ask_human`.
    pub fn respond_human(&self, response: &str) -> Result<(), KernelError> {
        self.journal.emit(Event::HumanResponse { response: response.to_string() })?;
        if let Some(tx) = self.human_gate.lock().pop_front() {
            let _ = tx.send(response.to_string());
        } else {
            tracing::warn!("human response with no pending question");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
