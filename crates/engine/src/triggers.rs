// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger scheduler: six kinds of time- and event-driven wakeups.
//!
//! Each active trigger gets one driver task. `scheduled` computes the
//! next fire instant from the wall clock after each fire (drift-free);
//! `heartbeat` sleeps its fixed interval between fires; `on_event`
//! subscribes to the journal; `on_idle` watches the runtime's
//! last-activity stamp. All triggers persist to `triggers.json` and the
//! active ones are re-registered on agent startup.

use crate::cancel::StopFlag;
use crate::runtime::AgentRuntime;
use agiraph_core::{
    parse_interval, Event, KernelError, NodeStatus, SharedClock, Trigger, TriggerAction,
    TriggerId, TriggerKind, TriggerStatus, COORDINATOR, SYSTEM,
};
use agiraph_store::TriggerStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Floor for the `on_idle` polling cadence.
const IDLE_POLL_FLOOR: Duration = Duration::from_millis(100);

struct Entry {
    trigger: Trigger,
    stop: StopFlag,
}

/// All triggers for one agent.
pub struct TriggerScheduler {
    rt: Mutex<Weak<AgentRuntime>>,
    clock: SharedClock,
    store: TriggerStore,
    entries: Mutex<HashMap<TriggerId, Entry>>,
}

impl TriggerScheduler {
    pub fn new(store: TriggerStore, clock: SharedClock) -> Arc<Self> {
        Arc::new(Self {
            rt: Mutex::new(Weak::new()),
            clock,
            store,
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Bind to the runtime (drivers hold only this weak reference back).
    pub fn bind(&self, rt: &Arc<AgentRuntime>) {
        *self.rt.lock() = Arc::downgrade(rt);
    }

    fn runtime(&self) -> Option<Arc<AgentRuntime>> {
        self.rt.lock().upgrade()
    }

    /// Register and start driving a new trigger.
    pub fn register(self: &Arc<Self>, trigger: Trigger) -> Result<(), KernelError> {
        validate(&trigger.kind)?;
        if let Some(rt) = self.runtime() {
            rt.journal.emit(Event::TriggerCreated {
                trigger_id: trigger.id,
                trigger_kind: trigger.kind.name().to_string(),
            })?;
        }
        self.start_driver(trigger)?;
        self.persist();
        Ok(())
    }

    /// Re-register the persisted `active` triggers on startup.
    pub fn restore(self: &Arc<Self>) -> Result<usize, KernelError> {
        let triggers = self.store.load()?;
        let mut restored = 0;
        for trigger in triggers {
            if trigger.status == TriggerStatus::Active {
                self.start_driver(trigger)?;
                restored += 1;
            } else {
                // Keep inactive triggers visible in the persisted set.
                self.entries.lock().insert(
                    trigger.id,
                    Entry { trigger, stop: StopFlag::new() },
                );
            }
        }
        self.persist();
        Ok(restored)
    }

    fn start_driver(self: &Arc<Self>, trigger: Trigger) -> Result<(), KernelError> {
        let stop = StopFlag::new();
        self.entries.lock().insert(trigger.id, Entry { trigger: trigger.clone(), stop: stop.clone() });
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.drive(trigger, stop).await;
        });
        Ok(())
    }

    /// Cancel a trigger: stop its driver, drop it from the persisted set.
    pub fn cancel(&self, id: &TriggerId) -> Result<(), KernelError> {
        let entry = self.entries.lock().remove(id);
        let Some(entry) = entry else {
            return Err(KernelError::Tool(format!("unknown trigger: {}", id.as_str())));
        };
        entry.stop.stop();
        if let Some(rt) = self.runtime() {
            rt.journal.emit(Event::TriggerCancelled { trigger_id: *id })?;
        }
        self.persist();
        Ok(())
    }

    pub fn list(&self) -> Vec<Trigger> {
        self.entries.lock().values().map(|e| e.trigger.clone()).collect()
    }

    /// Stop every driver (agent shutdown).
    pub fn stop_all(&self) {
        for entry in self.entries.lock().values() {
            entry.stop.stop();
        }
    }

    fn persist(&self) {
        let triggers = self.list();
        if let Err(e) = self.store.save(&triggers) {
            tracing::warn!(error = %e, "trigger persistence failed");
        }
    }

    fn mark(&self, id: &TriggerId, status: TriggerStatus) {
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.trigger.status = status;
        }
        self.persist();
    }

    async fn drive(self: Arc<Self>, trigger: Trigger, stop: StopFlag) {
        tracing::debug!(trigger = %trigger.id, kind = trigger.kind.name(), "trigger driver started");
        match trigger.kind.clone() {
            TriggerKind::Delayed { after_ms } => {
                if sleep_or_stop(Duration::from_millis(after_ms), &stop).await {
                    self.fire(&trigger);
                    self.mark(&trigger.id, TriggerStatus::Expired);
                }
            }
            TriggerKind::AtTime { at_ms } => {
                let delta = at_ms.saturating_sub(self.clock.epoch_ms());
                if sleep_or_stop(Duration::from_millis(delta), &stop).await {
                    self.fire(&trigger);
                    self.mark(&trigger.id, TriggerStatus::Expired);
                }
            }
            TriggerKind::Scheduled { every } => {
                let Ok(interval) = parse_interval(&every) else { return };
                // Next fire is anchored to the wall clock, not to how long
                // the previous firing took.
                let mut next = tokio::time::Instant::now() + interval;
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep_until(next) => {}
                        _ = stop.cancelled() => return,
                    }
                    self.fire(&trigger);
                    self.mark(&trigger.id, TriggerStatus::Fired);
                    next += interval;
                }
            }
            TriggerKind::Heartbeat { every } => {
                let Ok(interval) = parse_interval(&every) else { return };
                loop {
                    if !sleep_or_stop(interval, &stop).await {
                        return;
                    }
                    self.fire(&trigger);
                    self.mark(&trigger.id, TriggerStatus::Fired);
                }
            }
            TriggerKind::OnEvent { ref filter, .. } => {
                let Some(rt) = self.runtime() else { return };
                let mut events = rt.journal.subscribe();
                drop(rt);
                loop {
                    let record = tokio::select! {
                        result = events.recv() => match result {
                            Ok(record) => record,
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(_) => return,
                        },
                        _ = stop.cancelled() => return,
                    };
                    // Never feed back on our own firing.
                    if matches!(record.event, Event::TriggerFired { trigger_id } if trigger_id == trigger.id)
                    {
                        continue;
                    }
                    if !trigger.matches_event_type(record.event.kind()) {
                        continue;
                    }
                    if let Some(filter) = filter {
                        let serialized =
                            serde_json::to_string(&record.event).unwrap_or_default();
                        if !serialized.contains(filter.as_str()) {
                            continue;
                        }
                    }
                    self.fire(&trigger);
                    self.mark(&trigger.id, TriggerStatus::Fired);
                }
            }
            TriggerKind::OnIdle { threshold_ms } => {
                let poll = Duration::from_millis(threshold_ms / 4).max(IDLE_POLL_FLOOR);
                loop {
                    if !sleep_or_stop(poll, &stop).await {
                        return;
                    }
                    let Some(rt) = self.runtime() else { return };
                    let idle = self.clock.epoch_ms().saturating_sub(rt.last_activity_ms());
                    if idle >= threshold_ms {
                        self.fire(&trigger);
                        self.mark(&trigger.id, TriggerStatus::Fired);
                        // Firing counts as activity so the next window
                        // starts fresh.
                        rt.touch_activity();
                    }
                }
            }
        }
        tracing::debug!(trigger = %trigger.id, "trigger driver finished");
    }

    /// Emit `trigger.fired` and dispatch the action.
    fn fire(&self, trigger: &Trigger) {
        let Some(rt) = self.runtime() else { return };
        tracing::info!(trigger = %trigger.id, kind = trigger.kind.name(), "trigger fired");
        if let Err(e) = rt.journal.emit(Event::TriggerFired { trigger_id: trigger.id }) {
            tracing::warn!(error = %e, "trigger.fired emit failed");
            return;
        }
        let result = match &trigger.action {
            TriggerAction::WakeAgent { task } => rt.bus.send(SYSTEM, Some(COORDINATOR), task.clone()),
            TriggerAction::RunNode { node_id } => {
                let outcome = rt.board.set_status(node_id, NodeStatus::Pending);
                rt.tick();
                outcome
            }
            TriggerAction::SendMessage { to, content } => {
                rt.bus.send(SYSTEM, Some(to.as_str()), content.clone())
            }
        };
        if let Err(e) = result {
            tracing::warn!(trigger = %trigger.id, error = %e, "trigger action failed");
        }
        rt.notify_activity();
    }
}

/// Sleep the full duration; false if the stop flag interrupted it.
async fn sleep_or_stop(duration: Duration, stop: &StopFlag) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = stop.cancelled() => false,
    }
}

fn validate(kind: &TriggerKind) -> Result<(), KernelError> {
    match kind {
        TriggerKind::Scheduled { every } | TriggerKind::Heartbeat { every } => {
            parse_interval(every).map_err(KernelError::Tool)?;
        }
        TriggerKind::OnIdle { threshold_ms } if *threshold_ms == 0 => {
            return Err(KernelError::Tool("on_idle threshold must be positive".into()));
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
#[path = "triggers_tests.rs"]
mod tests;
