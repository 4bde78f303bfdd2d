// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-agent event journal with live fan-out.
//!
//! One JSON object per line in `events.jsonl`. Emission assigns a strictly
//! increasing `(seq, ts)` pair, appends to the journal, and broadcasts to
//! live subscribers. Emission never blocks on slow subscribers: the live
//! channel is bounded and a lagging subscriber loses the oldest buffered
//! events, while the journal keeps everything.

use agiraph_core::{AgentId, Clock, Event, EventRecord, KernelError, SharedClock};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Live-subscriber buffer size; overflow drops the oldest buffered event
/// for that subscriber only.
const LIVE_BUFFER: usize = 256;

struct JournalCursor {
    seq: u64,
    last_ts: u64,
}

/// Append-only event log for one agent.
pub struct EventLog {
    agent_id: AgentId,
    path: PathBuf,
    clock: SharedClock,
    cursor: Mutex<JournalCursor>,
    tx: broadcast::Sender<EventRecord>,
}

impl EventLog {
    /// Open (or create) the journal at `{agent_dir}/events.jsonl`, restoring
    /// the sequence cursor from the last journaled line.
    pub fn open(
        agent_id: AgentId,
        agent_dir: &std::path::Path,
        clock: SharedClock,
    ) -> Result<Self, KernelError> {
        std::fs::create_dir_all(agent_dir)?;
        let path = agent_dir.join("events.jsonl");
        let cursor = match Self::read_tail(&path, 1)?.pop() {
            Some(last) => JournalCursor { seq: last.seq, last_ts: last.ts },
            None => JournalCursor { seq: 0, last_ts: 0 },
        };
        let (tx, _) = broadcast::channel(LIVE_BUFFER);
        Ok(Self { agent_id, path, clock, cursor: Mutex::new(cursor), tx })
    }

    /// Append an event, assigning the next `(seq, ts)`, and fan it out.
    ///
    /// `ts` is forced strictly increasing so the `(type, ts)` dedup identity
    /// holds even when the wall clock stalls within one millisecond.
    pub fn emit(&self, event: Event) -> Result<EventRecord, KernelError> {
        let record = {
            let mut cursor = self.cursor.lock();
            cursor.seq += 1;
            let now = self.clock.epoch_ms();
            cursor.last_ts = now.max(cursor.last_ts + 1);
            let record = EventRecord {
                seq: cursor.seq,
                ts: cursor.last_ts,
                agent_id: self.agent_id.clone(),
                event,
            };
            // Append under the cursor lock so journal order matches seq order.
            let line = serde_json::to_string(&record)?;
            let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            writeln!(file, "{}", line)?;
            record
        };
        tracing::debug!(agent_id = %self.agent_id, seq = record.seq, "{}", record.event.log_summary());
        // A send error only means there are no live subscribers.
        let _ = self.tx.send(record.clone());
        Ok(record)
    }

    /// The most recent `limit` journaled events, oldest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<EventRecord>, KernelError> {
        Self::read_tail(&self.path, limit)
    }

    /// Subscribe to the live stream. Delivery order matches emission order;
    /// combine with [`EventLog::recent`] and dedup on
    /// [`EventRecord::dedup_key`] for gap-free backfill.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    fn read_tail(path: &std::path::Path, limit: usize) -> Result<Vec<EventRecord>, KernelError> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records: Vec<EventRecord> = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping bad journal line"),
            }
        }
        if records.len() > limit {
            records.drain(..records.len() - limit);
        }
        Ok(records)
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
