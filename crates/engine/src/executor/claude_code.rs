// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream-JSON bridge for Claude-Code style subprocesses.
//!
//! No ReAct loop runs here — the subprocess is the loop. Its stdout is a
//! stream of one JSON event per line (`system`, `assistant`, `result`);
//! each is appended to the node's `log.jsonl` and forwarded as kernel
//! events so a frontend can show live progress.

use crate::runtime::AgentRuntime;
use agiraph_core::{Event, NodeId};
use agiraph_store::preview;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStdout;

/// Preview cap for forwarded checkpoint notes.
const NOTE_PREVIEW_BYTES: usize = 200;

/// Consume the subprocess stdout until EOF, forwarding events.
pub async fn forward_stream(
    rt: Arc<AgentRuntime>,
    worker_name: String,
    node_id: NodeId,
    stdout: ChildStdout,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(worker = worker_name, error = %e, "stream read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) else {
            tracing::debug!(worker = worker_name, "non-JSON stream line skipped");
            continue;
        };
        if let Err(e) = rt.store.append_node_log(&rt.run, &node_id, &value) {
            tracing::warn!(error = %e, "node log append failed");
        }
        if let Err(e) = forward_event(&rt, &worker_name, node_id, &value) {
            tracing::warn!(error = %e, "stream event forward failed");
        }
    }
}

fn forward_event(
    rt: &Arc<AgentRuntime>,
    worker_name: &str,
    node_id: NodeId,
    value: &serde_json::Value,
) -> Result<(), agiraph_core::KernelError> {
    match value["type"].as_str() {
        Some("system") => {
            let subtype = value["subtype"].as_str().unwrap_or("event");
            rt.journal.emit(Event::NodeCheckpoint {
                node_id,
                note: format!("session {subtype}"),
            })?;
        }
        Some("assistant") => {
            let blocks = value["message"]["content"].as_array().cloned().unwrap_or_default();
            for block in blocks {
                match block["type"].as_str() {
                    Some("text") => {
                        let text = block["text"].as_str().unwrap_or_default();
                        if !text.is_empty() {
                            rt.journal.emit(Event::NodeCheckpoint {
                                node_id,
                                note: preview(text, NOTE_PREVIEW_BYTES),
                            })?;
                        }
                    }
                    Some("tool_use") => {
                        rt.journal.emit(Event::ToolCalled {
                            caller: worker_name.to_string(),
                            tool: block["name"].as_str().unwrap_or("unknown").to_string(),
                            args_preview: preview(&block["input"].to_string(), NOTE_PREVIEW_BYTES),
                        })?;
                    }
                    _ => {}
                }
            }
        }
        Some("result") => {
            let result = value["result"].as_str().unwrap_or("(no result text)");
            rt.journal.emit(Event::NodeCheckpoint {
                node_id,
                note: format!("result: {}", preview(result, NOTE_PREVIEW_BYTES)),
            })?;
        }
        _ => {}
    }
    Ok(())
}
