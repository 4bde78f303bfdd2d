// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-recipient message queues.
//!
//! Human ⇄ coordinator ⇄ workers all talk through here. Messages to an
//! unregistered recipient are journaled as `message.undeliverable` and
//! dropped; a message with no recipient routes to the coordinator; `"*"`
//! expands to every live non-sender participant. Per-(from, to) ordering
//! is preserved; there is no global order across senders.

use agiraph_core::{Event, KernelError, Message, SharedClock, BROADCAST, COORDINATOR};
use agiraph_store::{preview, EventLog};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

/// Preview cap for `message.sent` events.
const MESSAGE_PREVIEW_BYTES: usize = 200;

/// Per-recipient queues for one agent.
pub struct MessageBus {
    journal: Arc<EventLog>,
    clock: SharedClock,
    queues: Mutex<HashMap<String, VecDeque<Message>>>,
    /// Signalled on every delivery; the coordinator's activity condition.
    activity: Arc<Notify>,
    /// Run-level message log (`_messages/log.jsonl`), set once per run.
    message_log: Mutex<Option<std::path::PathBuf>>,
}

impl MessageBus {
    pub fn new(journal: Arc<EventLog>, clock: SharedClock) -> Self {
        Self {
            journal,
            clock,
            queues: Mutex::new(HashMap::new()),
            activity: Arc::new(Notify::new()),
            message_log: Mutex::new(None),
        }
    }

    /// Log every delivered message to this JSONL file.
    pub fn set_message_log(&self, path: std::path::PathBuf) {
        *self.message_log.lock() = Some(path);
    }

    /// The notify handle the coordinator blocks on in `wait_for_activity`.
    pub fn activity(&self) -> Arc<Notify> {
        Arc::clone(&self.activity)
    }

    /// Register a participant; its queue starts empty.
    pub fn register(&self, name: impl Into<String>) {
        self.queues.lock().entry(name.into()).or_default();
    }

    /// Drop a participant and anything still queued for it.
    pub fn unregister(&self, name: &str) {
        self.queues.lock().remove(name);
    }

    /// Live participant names.
    pub fn participants(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Queue a message. `to = None` routes to the coordinator; `"*"`
    /// broadcasts. Every accepted delivery emits `message.sent`.
    pub fn send(
        &self,
        from: &str,
        to: Option<&str>,
        content: impl Into<String>,
    ) -> Result<(), KernelError> {
        let content = content.into();
        let to = to.unwrap_or(COORDINATOR);
        if to == BROADCAST {
            return self.broadcast(from, &content);
        }
        self.deliver(from, to, &content)
    }

    /// Deliver to every live participant except the sender.
    pub fn broadcast(&self, from: &str, content: &str) -> Result<(), KernelError> {
        let recipients: Vec<String> =
            self.participants().into_iter().filter(|name| name != from).collect();
        for recipient in recipients {
            self.deliver(from, &recipient, content)?;
        }
        Ok(())
    }

    fn deliver(&self, from: &str, to: &str, content: &str) -> Result<(), KernelError> {
        let message = Message::new(from, to, content, self.clock.epoch_ms());
        let queued = {
            let mut queues = self.queues.lock();
            match queues.get_mut(to) {
                Some(queue) => {
                    queue.push_back(message);
                    true
                }
                None => false,
            }
        };
        if queued {
            self.append_message_log(from, to, content);
            self.journal.emit(Event::MessageSent {
                from: from.to_string(),
                to: to.to_string(),
                preview: preview(content, MESSAGE_PREVIEW_BYTES),
            })?;
            self.activity.notify_one();
        } else {
            tracing::warn!(from, to, "message to unknown recipient dropped");
            self.journal.emit(Event::MessageUndeliverable {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        }
        Ok(())
    }

    /// Drain the recipient's queue, oldest first. Emits `message.received`
    /// per drained message.
    pub fn receive(&self, recipient: &str) -> Result<Vec<Message>, KernelError> {
        let drained: Vec<Message> = {
            let mut queues = self.queues.lock();
            match queues.get_mut(recipient) {
                Some(queue) => queue.drain(..).collect(),
                None => Vec::new(),
            }
        };
        for message in &drained {
            self.journal.emit(Event::MessageReceived {
                by: recipient.to_string(),
                from: message.from.clone(),
            })?;
        }
        Ok(drained)
    }

    /// Best-effort append to the run's message log.
    fn append_message_log(&self, from: &str, to: &str, content: &str) {
        let log = self.message_log.lock();
        let Some(path) = log.as_ref() else { return };
        let line = serde_json::json!({
            "from": from,
            "to": to,
            "content": content,
            "ts": self.clock.epoch_ms(),
        });
        let result = std::fs::OpenOptions::new().create(true).append(true).open(path).and_then(
            |mut file| {
                use std::io::Write;
                writeln!(file, "{line}")
            },
        );
        if let Err(e) = result {
            tracing::warn!(error = %e, "message log append failed");
        }
    }

    /// Non-destructive view of the recipient's queue.
    pub fn peek(&self, recipient: &str) -> Vec<Message> {
        self.queues
            .lock()
            .get(recipient)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
