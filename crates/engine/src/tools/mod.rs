// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool registry and dispatch.
//!
//! A tool pairs a canonical [`ToolDef`] with an async implementation.
//! Dispatch validates arguments loosely against the def's JSON-Schema
//! (required keys enforced, unambiguous type coercion applied), emits
//! `tool.called` and then `tool.result` or `tool.error`, and folds
//! non-cancellation failures into the result string so the model can see
//! them and recover. Only `Cancelled` propagates.

pub mod builtin;

pub use builtin::{register_builtins, BuiltinTools};

use crate::runtime::AgentRuntime;
use agiraph_core::{Event, KernelError, NodeId, RunId, WorkerId, COORDINATOR};
use agiraph_provider::{ToolCall, ToolDef};
use agiraph_store::{preview, Scope};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Preview cap for `tool.called` / `tool.result` events.
const TOOL_PREVIEW_BYTES: usize = 200;

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<String, KernelError>> + Send>>;
pub type ToolFn = Arc<dyn Fn(ToolContext, serde_json::Value) -> ToolFuture + Send + Sync>;

/// Who is calling a tool. Id-only back-references; the runtime handle in
/// [`ToolContext`] is the only way back to shared state.
#[derive(Clone)]
pub enum Caller {
    Coordinator,
    Worker { id: WorkerId, name: String, node: NodeId },
}

impl Caller {
    /// The caller's message-bus address.
    pub fn bus_name(&self) -> &str {
        match self {
            Caller::Coordinator => COORDINATOR,
            Caller::Worker { name, .. } => name,
        }
    }

    /// The scope this caller reads through.
    pub fn read_scope(&self, run: RunId) -> Scope {
        match self {
            Caller::Coordinator => Scope::Run(run),
            Caller::Worker { node, .. } => Scope::Node(run, *node),
        }
    }
}

/// Everything a tool implementation gets to work with.
#[derive(Clone)]
pub struct ToolContext {
    pub rt: Arc<AgentRuntime>,
    pub caller: Caller,
}

struct RegisteredTool {
    def: ToolDef,
    imp: ToolFn,
}

/// Name → tool map for one agent.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Mutex<IndexMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Later registrations replace earlier ones by name.
    pub fn register<F, Fut>(&self, def: ToolDef, f: F)
    where
        F: Fn(ToolContext, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, KernelError>> + Send + 'static,
    {
        let imp: ToolFn = Arc::new(move |ctx, args| Box::pin(f(ctx, args)));
        self.tools.lock().insert(def.name.clone(), RegisteredTool { def, imp });
    }

    /// Defs for the given names, in registration order. Unknown names are
    /// skipped (a worker's capability list may predate a tool's removal).
    pub fn defs(&self, names: &[String]) -> Vec<ToolDef> {
        let tools = self.tools.lock();
        tools
            .values()
            .filter(|tool| names.iter().any(|n| n == &tool.def.name))
            .map(|tool| tool.def.clone())
            .collect()
    }

    pub fn all_defs(&self) -> Vec<ToolDef> {
        self.tools.lock().values().map(|tool| tool.def.clone()).collect()
    }

    /// Run one tool call. Failures other than cancellation come back as an
    /// `error: …` result string after a `tool.error` event.
    pub async fn dispatch(&self, call: &ToolCall, ctx: ToolContext) -> Result<String, KernelError> {
        let caller = ctx.caller.bus_name().to_string();
        let journal = Arc::clone(&ctx.rt.journal);

        let entry = {
            let tools = self.tools.lock();
            tools.get(call.name.as_str()).map(|t| (t.def.clone(), Arc::clone(&t.imp)))
        };
        let Some((def, imp)) = entry else {
            let error = format!("unknown tool: {}", call.name);
            journal.emit(Event::ToolError {
                caller,
                tool: call.name.clone(),
                error: error.clone(),
            })?;
            return Ok(format!("error: {error}"));
        };

        journal.emit(Event::ToolCalled {
            caller: caller.clone(),
            tool: call.name.clone(),
            args_preview: preview(&call.args.to_string(), TOOL_PREVIEW_BYTES),
        })?;

        let mut args = call.args.clone();
        if let Err(error) = validate_args(&def, &mut args) {
            journal.emit(Event::ToolError {
                caller,
                tool: call.name.clone(),
                error: error.clone(),
            })?;
            return Ok(format!("error: {error}"));
        }

        let result = imp(ctx.clone(), args).await;
        ctx.rt.touch_activity();
        match result {
            Ok(output) => {
                journal.emit(Event::ToolResult {
                    caller,
                    tool: call.name.clone(),
                    preview: preview(&output, TOOL_PREVIEW_BYTES),
                })?;
                Ok(output)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                journal.emit(Event::ToolError {
                    caller,
                    tool: call.name.clone(),
                    error: e.to_string(),
                })?;
                Ok(format!("error: {e}"))
            }
        }
    }
}

/// Loose schema validation: required keys must be present; string/number
/// mismatches are coerced where unambiguous.
fn validate_args(def: &ToolDef, args: &mut serde_json::Value) -> Result<(), String> {
    if !args.is_object() {
        if args.is_null() {
            *args = serde_json::json!({});
        } else {
            return Err("arguments must be an object".to_string());
        }
    }

    if let Some(required) = def.parameters["required"].as_array() {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if args.get(key).is_none() {
                return Err(format!("missing required argument: {key}"));
            }
        }
    }

    if let Some(properties) = def.parameters["properties"].as_object() {
        for (key, schema) in properties {
            let Some(value) = args.get_mut(key) else { continue };
            match schema["type"].as_str() {
                Some("number") | Some("integer") => {
                    if let Some(s) = value.as_str() {
                        if let Ok(n) = s.parse::<f64>() {
                            *value = serde_json::json!(n);
                        }
                    }
                }
                Some("string") => {
                    if value.is_number() {
                        *value = serde_json::Value::String(value.to_string());
                    }
                }
                Some("boolean") => {
                    if let Some(s) = value.as_str() {
                        if let Ok(b) = s.parse::<bool>() {
                            *value = serde_json::Value::Bool(b);
                        }
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
