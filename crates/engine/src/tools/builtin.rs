// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel tool set.
//!
//! These are the tools whose semantics belong to the kernel itself: file
//! access through the scope store, messaging, node and worker lifecycle,
//! triggers, publish/finish. External effectful tools (bash, web search)
//! register through the same [`super::ToolRegistry::register`] API and are
//! opaque here.

use super::{Caller, ToolContext, ToolRegistry};
use crate::runtime::AgentRuntime;
use agiraph_core::{
    AgentStatus, Event, KernelError, NodeId, NodeStatus, Trigger, TriggerAction, TriggerId,
    TriggerKind, WorkNode, WorkerSpec, WorkerStatus, COORDINATOR,
};
use agiraph_provider::ToolDef;
use agiraph_store::Scope;
use serde_json::json;
use std::collections::BTreeMap;

/// Tool-name sets handed to the coordinator and to workers by default.
#[derive(Debug, Clone)]
pub struct BuiltinTools {
    pub coordinator: Vec<String>,
    pub worker: Vec<String>,
}

/// Register every kernel tool and return the default capability sets.
pub fn register_builtins(registry: &ToolRegistry) -> BuiltinTools {
    register_write_file(registry);
    register_read_file(registry);
    register_list_files(registry);
    register_send_message(registry);
    register_broadcast(registry);
    register_create_node(registry);
    register_node_status(registry);
    register_publish(registry);
    register_finish(registry);
    register_spawn_worker(registry);
    register_assign_worker(registry);
    register_create_trigger(registry);
    register_cancel_trigger(registry);
    register_reconvene(registry);
    register_ask_human(registry);

    let shared = ["write_file", "read_file", "list_files", "send_message", "broadcast", "create_node", "node_status", "ask_human"];
    let mut coordinator: Vec<String> = shared.iter().map(|s| s.to_string()).collect();
    coordinator.extend(
        ["spawn_worker", "assign_worker", "create_trigger", "cancel_trigger", "reconvene", "finish"]
            .iter()
            .map(|s| s.to_string()),
    );
    let mut worker: Vec<String> = shared.iter().map(|s| s.to_string()).collect();
    worker.extend(["publish", "finish"].iter().map(|s| s.to_string()));
    BuiltinTools { coordinator, worker }
}

fn str_arg(args: &serde_json::Value, key: &str) -> Result<String, KernelError> {
    args[key]
        .as_str()
        .map(String::from)
        .ok_or_else(|| KernelError::Tool(format!("missing argument: {key}")))
}

/// The scope a caller's `write_file` resolves through, by path shape.
fn write_scope(rt: &AgentRuntime, caller: &Caller, path: &str) -> Scope {
    match caller {
        Caller::Coordinator => {
            if path.starts_with("memory/")
                || matches!(path, "MEMORY.md" | "SOUL.md" | "GOAL.md")
            {
                Scope::Agent
            } else {
                Scope::Run(rt.run)
            }
        }
        Caller::Worker { id, node, .. } => {
            if matches!(path, "notebook.md" | "memory.md") {
                Scope::Worker(rt.run, *id)
            } else {
                Scope::Node(rt.run, *node)
            }
        }
    }
}

fn register_write_file(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "write_file",
        "Write a text file within your scope",
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Relative path"},
                "content": {"type": "string"},
            },
            "required": ["path", "content"],
        }),
    )
    .guidance(
        "Workers write under scratch/ (plus their own notebook.md and memory.md); \
         the coordinator writes run files and agent memory under memory/.",
    );
    registry.register(def, |ctx, args| async move {
        let path = str_arg(&args, "path")?;
        let content = str_arg(&args, "content")?;
        let scope = write_scope(&ctx.rt, &ctx.caller, &path);
        ctx.rt.store.write_file(&scope, &path, &content)?;
        Ok(format!("wrote {path} ({} bytes)", content.len()))
    });
}

fn register_read_file(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "read_file",
        "Read a file visible to you",
        json!({
            "type": "object",
            "properties": {"path": {"type": "string"}},
            "required": ["path"],
        }),
    )
    .guidance(
        "Other nodes are visible through nodes/<id>/published/…; agent memory \
         through memory/….",
    );
    registry.register(def, |ctx, args| async move {
        let path = str_arg(&args, "path")?;
        ctx.rt.store.read_file(&ctx.caller.read_scope(ctx.rt.run), &path)
    });
}

fn register_list_files(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "list_files",
        "List directory entries visible to you",
        json!({
            "type": "object",
            "properties": {"path": {"type": "string", "description": "Defaults to your scope root"}},
        }),
    );
    registry.register(def, |ctx, args| async move {
        let path = args["path"].as_str().unwrap_or("").to_string();
        let entries = ctx.rt.store.list_files(&ctx.caller.read_scope(ctx.rt.run), &path)?;
        Ok(if entries.is_empty() { "(empty)".to_string() } else { entries.join("\n") })
    });
}

fn register_send_message(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "send_message",
        "Send a message to another participant",
        json!({
            "type": "object",
            "properties": {
                "to": {"type": "string", "description": "Recipient name; defaults to the coordinator. \"*\" broadcasts."},
                "content": {"type": "string"},
            },
            "required": ["content"],
        }),
    );
    registry.register(def, |ctx, args| async move {
        let content = str_arg(&args, "content")?;
        let to = args["to"].as_str().map(String::from);
        ctx.rt.bus.send(ctx.caller.bus_name(), to.as_deref(), content)?;
        Ok(format!("sent to {}", to.as_deref().unwrap_or(COORDINATOR)))
    });
}

fn register_broadcast(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "broadcast",
        "Send a message to every live participant",
        json!({
            "type": "object",
            "properties": {"content": {"type": "string"}},
            "required": ["content"],
        }),
    );
    registry.register(def, |ctx, args| async move {
        let content = str_arg(&args, "content")?;
        ctx.rt.bus.broadcast(ctx.caller.bus_name(), &content)?;
        Ok("broadcast sent".to_string())
    });
}

fn register_create_node(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "create_node",
        "Create a work node on the board",
        json!({
            "type": "object",
            "properties": {
                "task": {"type": "string", "description": "The node's spec"},
                "dependencies": {"type": "array", "items": {"type": "string"}},
                "refs": {"type": "object", "description": "name -> <node_id>/published/<file>"},
                "assign_to": {"type": "string", "description": "Worker name to pin this node to"},
            },
            "required": ["task"],
        }),
    )
    .guidance(
        "Create one or two nodes, watch the results, then decide what comes \
         next; the graph is grown, not planned upfront.",
    );
    registry.register(def, |ctx, args| async move {
        let task = str_arg(&args, "task")?;
        let mut node = WorkNode::new(task, ctx.rt.clock.epoch_ms());
        if let Some(deps) = args["dependencies"].as_array() {
            node.dependencies =
                deps.iter().filter_map(|d| d.as_str()).map(NodeId::from_string).collect();
        }
        if let Some(refs) = args["refs"].as_object() {
            node.refs = refs
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect::<BTreeMap<_, _>>();
        }
        if let Caller::Worker { node: parent, .. } = &ctx.caller {
            node.parent_node = Some(*parent);
        }

        let id = ctx.rt.board.add(node.clone())?;
        ctx.rt.store.ensure_node_layout(&ctx.rt.run, &node)?;
        if let Some(worker_name) = args["assign_to"].as_str() {
            let worker = ctx.rt.pool.get_by_name(worker_name).ok_or_else(|| {
                KernelError::Tool(format!("unknown worker: {worker_name}"))
            })?;
            ctx.rt.set_explicit_assignment(id, worker.id);
        }
        // No yield between the add and this tick.
        ctx.rt.tick();
        Ok(format!("created node {}", id.as_str()))
    });
}

fn register_node_status(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "node_status",
        "Inspect one node, or the whole board",
        json!({
            "type": "object",
            "properties": {"node_id": {"type": "string"}},
        }),
    );
    registry.register(def, |ctx, args| async move {
        match args["node_id"].as_str() {
            Some(id) => {
                let id = NodeId::from_string(id);
                let node = ctx
                    .rt
                    .board
                    .get(&id)
                    .ok_or_else(|| KernelError::Tool(format!("unknown node: {}", id.as_str())))?;
                let published = ctx.rt.store.published_files(&ctx.rt.run, &id)?;
                Ok(format!(
                    "{} [{}]\ntask: {}\npublished: {}",
                    node.id.as_str(),
                    node.status,
                    node.task,
                    if published.is_empty() { "(none)".to_string() } else { published.join(", ") },
                ))
            }
            None => Ok(ctx.rt.snapshot_summary(0)),
        }
    });
}

/// Publish then notify the coordinator. Idempotent on repeat.
async fn publish_node(ctx: &ToolContext, summary: &str) -> Result<String, KernelError> {
    let Caller::Worker { node, name, .. } = &ctx.caller else {
        return Err(KernelError::Tool("publish is a worker tool".into()));
    };
    let already = ctx.rt.store.is_node_completed(&ctx.rt.run, node);
    let files = ctx.rt.store.publish(&ctx.rt.run, node, summary)?;
    ctx.rt.board.set_status(node, NodeStatus::Completed)?;
    if !already {
        ctx.rt.bus.send(
            name,
            Some(COORDINATOR),
            format!("node {} published ({} files): {}", node.as_str(), files.len(), summary),
        )?;
        ctx.rt.tick();
    }
    Ok(format!("published {} files", files.len()))
}

fn register_publish(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "publish",
        "Move scratch/ into published/ and complete the node",
        json!({
            "type": "object",
            "properties": {"summary": {"type": "string"}},
            "required": ["summary"],
        }),
    )
    .guidance("Publish exactly once, when the node's outputs are final.");
    registry.register(def, |ctx, args| async move {
        let summary = str_arg(&args, "summary")?;
        publish_node(&ctx, &summary).await
    });
}

fn register_finish(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "finish",
        "Declare the work done",
        json!({
            "type": "object",
            "properties": {"summary": {"type": "string"}},
            "required": ["summary"],
        }),
    )
    .guidance(
        "For the coordinator this completes the agent; only call it when the \
         goal is met. A worker calling finish completes its node.",
    );
    registry.register(def, |ctx, args| async move {
        let summary = str_arg(&args, "summary")?;
        match &ctx.caller {
            Caller::Coordinator => {
                ctx.rt.request_finish(&summary);
                ctx.rt.notify_activity();
                Ok("finishing".to_string())
            }
            Caller::Worker { .. } => publish_node(&ctx, &summary).await,
        }
    });
}

fn register_spawn_worker(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "spawn_worker",
        "Add a worker to the team",
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Short unique name, also its bus address"},
                "role": {"type": "string"},
                "kind": {"type": "string", "enum": ["harnessed", "autonomous"]},
                "model": {"type": "string", "description": "provider/model for harnessed workers"},
                "agent_command": {"type": "string", "description": "Launch command for autonomous workers"},
                "capabilities": {"type": "array", "items": {"type": "string"}},
            },
            "required": ["name", "role"],
        }),
    )
    .guidance("Spawn workers as the work demands them, not upfront.");
    registry.register(def, |ctx, args| async move {
        if !matches!(ctx.caller, Caller::Coordinator) {
            return Err(KernelError::Tool("spawn_worker is a coordinator tool".into()));
        }
        let name = str_arg(&args, "name")?;
        let role = str_arg(&args, "role")?;
        let mut spec = match args["kind"].as_str() {
            Some("autonomous") => {
                WorkerSpec::autonomous(&name, &role, str_arg(&args, "agent_command")?)
            }
            _ => WorkerSpec::harnessed(&name, &role),
        };
        if let Some(model) = args["model"].as_str() {
            spec = spec.model(model);
        }
        if let Some(capabilities) = args["capabilities"].as_array() {
            spec.capabilities =
                capabilities.iter().filter_map(|c| c.as_str()).map(String::from).collect();
        }
        let worker = ctx.rt.spawn_worker(spec)?;
        ctx.rt.tick();
        Ok(format!("spawned worker {} ({})", worker.name(), worker.id.as_str()))
    });
}

fn register_assign_worker(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "assign_worker",
        "Pin a node to a specific worker",
        json!({
            "type": "object",
            "properties": {
                "node_id": {"type": "string"},
                "worker": {"type": "string", "description": "Worker name"},
            },
            "required": ["node_id", "worker"],
        }),
    );
    registry.register(def, |ctx, args| async move {
        if !matches!(ctx.caller, Caller::Coordinator) {
            return Err(KernelError::Tool("assign_worker is a coordinator tool".into()));
        }
        let node_id = NodeId::from_string(str_arg(&args, "node_id")?);
        let worker_name = str_arg(&args, "worker")?;
        let worker = ctx
            .rt
            .pool
            .get_by_name(&worker_name)
            .ok_or_else(|| KernelError::Tool(format!("unknown worker: {worker_name}")))?;
        ctx.rt.set_explicit_assignment(node_id, worker.id);
        ctx.rt.tick();
        Ok(format!("pinned {} to {}", node_id.as_str(), worker_name))
    });
}

fn parse_trigger(ctx: &ToolContext, args: &serde_json::Value) -> Result<Trigger, KernelError> {
    let kind = match args["kind"].as_str() {
        Some("scheduled") => TriggerKind::Scheduled { every: str_arg(args, "every")? },
        Some("delayed") => TriggerKind::Delayed {
            after_ms: args["after_ms"].as_u64().ok_or_else(|| KernelError::Tool("missing after_ms".into()))?,
        },
        Some("at_time") => TriggerKind::AtTime {
            at_ms: args["at_ms"].as_u64().ok_or_else(|| KernelError::Tool("missing at_ms".into()))?,
        },
        Some("heartbeat") => TriggerKind::Heartbeat { every: str_arg(args, "every")? },
        Some("on_event") => TriggerKind::OnEvent {
            pattern: str_arg(args, "pattern")?,
            filter: args["filter"].as_str().map(String::from),
        },
        Some("on_idle") => TriggerKind::OnIdle {
            threshold_ms: args["threshold_ms"].as_u64().ok_or_else(|| KernelError::Tool("missing threshold_ms".into()))?,
        },
        other => return Err(KernelError::Tool(format!("unknown trigger kind: {other:?}"))),
    };
    let action = match args["action"].as_str() {
        Some("wake_agent") => TriggerAction::WakeAgent { task: str_arg(args, "task")? },
        Some("run_node") => TriggerAction::RunNode { node_id: NodeId::from_string(str_arg(args, "node_id")?) },
        Some("send_message") => TriggerAction::SendMessage {
            to: str_arg(args, "to")?,
            content: str_arg(args, "content")?,
        },
        other => return Err(KernelError::Tool(format!("unknown trigger action: {other:?}"))),
    };
    Ok(Trigger::new(ctx.rt.agent_id.clone(), kind, action, ctx.rt.clock.epoch_ms()))
}

fn register_create_trigger(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "create_trigger",
        "Register a time- or event-driven trigger",
        json!({
            "type": "object",
            "properties": {
                "kind": {"type": "string", "enum": ["scheduled", "delayed", "at_time", "heartbeat", "on_event", "on_idle"]},
                "every": {"type": "string", "description": "Interval like \"30s\", \"5m\", \"1h\""},
                "after_ms": {"type": "integer"},
                "at_ms": {"type": "integer"},
                "pattern": {"type": "string", "description": "Event type, or a prefix like node.*"},
                "filter": {"type": "string"},
                "threshold_ms": {"type": "integer"},
                "action": {"type": "string", "enum": ["wake_agent", "run_node", "send_message"]},
                "task": {"type": "string"},
                "node_id": {"type": "string"},
                "to": {"type": "string"},
                "content": {"type": "string"},
            },
            "required": ["kind", "action"],
        }),
    );
    registry.register(def, |ctx, args| async move {
        let trigger = parse_trigger(&ctx, &args)?;
        let id = trigger.id;
        ctx.rt.triggers().register(trigger)?;
        Ok(format!("created trigger {}", id.as_str()))
    });
}

fn register_cancel_trigger(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "cancel_trigger",
        "Cancel a trigger",
        json!({
            "type": "object",
            "properties": {"trigger_id": {"type": "string"}},
            "required": ["trigger_id"],
        }),
    );
    registry.register(def, |ctx, args| async move {
        let id = TriggerId::from_string(str_arg(&args, "trigger_id")?);
        ctx.rt.triggers().cancel(&id)?;
        Ok(format!("cancelled trigger {}", id.as_str()))
    });
}

fn register_reconvene(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "reconvene",
        "Take stock of the board and move to the next stage",
        json!({
            "type": "object",
            "properties": {"stage": {"type": "string", "description": "Name for the next stage"}},
        }),
    );
    registry.register(def, |ctx, args| async move {
        if !matches!(ctx.caller, Caller::Coordinator) {
            return Err(KernelError::Tool("reconvene is a coordinator tool".into()));
        }
        let next = args["stage"].as_str().map(String::from);
        if let Some(previous) = ctx.rt.swap_stage(next.clone()) {
            ctx.rt.journal.emit(Event::StageReconvened { stage: previous.clone() })?;
            ctx.rt.journal.emit(Event::StageCompleted { stage: previous })?;
        }
        if let Some(stage) = next {
            ctx.rt.journal.emit(Event::StageStarted { stage })?;
        }
        Ok(ctx.rt.snapshot_summary(5))
    });
}

fn register_ask_human(registry: &ToolRegistry) {
    let def = ToolDef::new(
        "ask_human",
        "Ask the human a question and wait for the answer",
        json!({
            "type": "object",
            "properties": {"question": {"type": "string"}},
            "required": ["question"],
        }),
    )
    .guidance("Blocks until the human responds; use sparingly.");
    registry.register(def, |ctx, args| async move {
        let question = str_arg(&args, "question")?;
        let caller_name = ctx.caller.bus_name().to_string();
        match &ctx.caller {
            Caller::Coordinator => {
                let previous = ctx.rt.status();
                ctx.rt.set_status(AgentStatus::WaitingForHuman);
                let stop = ctx.rt.stop.clone();
                let answer = ctx.rt.ask_human(&caller_name, &question, &stop).await;
                ctx.rt.set_status(previous);
                answer
            }
            Caller::Worker { id, .. } => {
                let stop = ctx.rt.worker_stop_flag(id).unwrap_or_else(|| ctx.rt.stop.child());
                ctx.rt.pool.set_status(id, WorkerStatus::WaitingForHuman)?;
                let answer = ctx.rt.ask_human(&caller_name, &question, &stop).await;
                ctx.rt.pool.set_status(id, WorkerStatus::Busy)?;
                answer
            }
        }
    });
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
