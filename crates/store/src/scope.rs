// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped filesystem access for one agent.
//!
//! Four scopes: the agent home, a run, a node, a worker. Every file
//! operation a tool performs flows through [`ScopeStore::resolve`], which
//! rejects traversal (`..`, absolute paths, symlinks escaping the scope).
//! Write permissions follow the data model invariants: a node's `scratch/`
//! is writable only by its assigned worker, `published/` becomes immutable
//! once the node completes, and no worker can write into another node's
//! directory.

use crate::journal::EventLog;
use crate::preview;
use agiraph_core::{AgentId, Event, KernelError, NodeId, RunId, WorkNode, Worker, WorkerId};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Preview cap for `file.written` events, in bytes.
const WRITE_PREVIEW_BYTES: usize = 512;

/// One of the four data scopes, relative to a single agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Agent,
    Run(RunId),
    Node(RunId, NodeId),
    Worker(RunId, WorkerId),
}

/// Scoped filesystem for one agent's home directory.
pub struct ScopeStore {
    agent_id: AgentId,
    agent_dir: PathBuf,
    journal: Arc<EventLog>,
}

impl ScopeStore {
    pub fn new(agent_id: AgentId, agent_dir: PathBuf, journal: Arc<EventLog>) -> Self {
        Self { agent_id, agent_dir, journal }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn agent_dir(&self) -> &Path {
        &self.agent_dir
    }

    pub fn run_dir(&self, run: &RunId) -> PathBuf {
        self.agent_dir.join("runs").join(run.as_str())
    }

    pub fn node_dir(&self, run: &RunId, node: &NodeId) -> PathBuf {
        self.run_dir(run).join("nodes").join(node.as_str())
    }

    pub fn worker_dir(&self, run: &RunId, worker: &WorkerId) -> PathBuf {
        self.run_dir(run).join("workers").join(worker.as_str())
    }

    fn scope_dir(&self, scope: &Scope) -> PathBuf {
        match scope {
            Scope::Agent => self.agent_dir.clone(),
            Scope::Run(run) => self.run_dir(run),
            Scope::Node(run, node) => self.node_dir(run, node),
            Scope::Worker(run, worker) => self.worker_dir(run, worker),
        }
    }

    // ── Layout creation ──────────────────────────────────────────────────

    /// Create the agent home skeleton: identity files, memory subtree.
    pub fn ensure_agent_layout(&self, goal: &str) -> Result<(), KernelError> {
        std::fs::create_dir_all(self.agent_dir.join("memory"))?;
        write_if_absent(&self.agent_dir.join("SOUL.md"), "# Soul\n")?;
        write_if_absent(&self.agent_dir.join("GOAL.md"), &format!("# Goal\n\n{goal}\n"))?;
        write_if_absent(&self.agent_dir.join("MEMORY.md"), "# Memory\n")?;
        write_if_absent(&self.agent_dir.join("memory/index.md"), "# Memory index\n")?;
        touch(&self.agent_dir.join("conversation.jsonl"))?;
        Ok(())
    }

    /// Create a run directory with its plan and message log.
    pub fn ensure_run_layout(&self, run: &RunId) -> Result<(), KernelError> {
        let dir = self.run_dir(run);
        std::fs::create_dir_all(dir.join("_messages"))?;
        std::fs::create_dir_all(dir.join("nodes"))?;
        std::fs::create_dir_all(dir.join("workers"))?;
        write_if_absent(&dir.join("_plan.md"), "# Plan\n")?;
        Ok(())
    }

    /// Create a node directory with the fixed layout.
    pub fn ensure_node_layout(&self, run: &RunId, node: &WorkNode) -> Result<(), KernelError> {
        let dir = self.node_dir(run, &node.id);
        std::fs::create_dir_all(dir.join("scratch"))?;
        std::fs::create_dir_all(dir.join("published"))?;
        std::fs::write(dir.join("_spec.md"), &node.task)?;
        std::fs::write(dir.join("_refs.json"), serde_json::to_string_pretty(&node.refs)?)?;
        std::fs::write(dir.join("_status.md"), "status: pending\n")?;
        touch(&dir.join("log.jsonl"))?;
        Ok(())
    }

    /// Create a worker directory with identity and memory files.
    pub fn ensure_worker_layout(
        &self,
        run: &RunId,
        worker: &Worker,
        identity: &str,
    ) -> Result<(), KernelError> {
        let dir = self.worker_dir(run, &worker.id);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("identity.md"), identity)?;
        write_if_absent(&dir.join("memory.md"), "")?;
        write_if_absent(&dir.join("notebook.md"), "")?;
        write_if_absent(&dir.join("history.json"), "[]")?;
        touch(&dir.join("conversation.jsonl"))?;
        Ok(())
    }

    // ── Path resolution ──────────────────────────────────────────────────

    /// Resolve `rel` inside `scope`, rejecting traversal.
    ///
    /// The scope directory must already exist; the resolved path need not.
    pub fn resolve(&self, scope: &Scope, rel: &str) -> Result<PathBuf, KernelError> {
        let base = self.scope_dir(scope);
        let candidate = safe_join(&base, rel)?;
        assert_within(&base, &candidate)?;
        Ok(candidate)
    }

    // ── Scoped reads ─────────────────────────────────────────────────────

    /// Read a file visible to `reader`.
    ///
    /// Node and worker readers address paths relative to the run; other
    /// nodes are visible only through their `published/` subtree, and other
    /// workers' directories are not visible at all. Paths starting with
    /// `memory/`, plus the identity files, read from the agent home.
    pub fn read_file(&self, reader: &Scope, rel: &str) -> Result<String, KernelError> {
        let path = self.readable_path(reader, rel)?;
        Ok(std::fs::read_to_string(path)?)
    }

    /// List directory entries visible to `reader` under `rel`.
    pub fn list_files(&self, reader: &Scope, rel: &str) -> Result<Vec<String>, KernelError> {
        let path = self.readable_path(reader, rel)?;
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn readable_path(&self, reader: &Scope, rel: &str) -> Result<PathBuf, KernelError> {
        if rel == "SOUL.md" || rel == "GOAL.md" || rel == "MEMORY.md" || rel.starts_with("memory/")
        {
            return self.resolve(&Scope::Agent, rel);
        }
        match reader {
            Scope::Agent => self.resolve(&Scope::Agent, rel),
            Scope::Run(_) => self.resolve(reader, rel),
            Scope::Node(run, own) => {
                let mut parts = rel.splitn(3, '/');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some("nodes"), Some(node), rest) if node != own.as_str() => {
                        let allowed = matches!(rest, Some(r) if r.starts_with("published"))
                            || rest == Some("_status.md");
                        if !allowed {
                            return Err(KernelError::ScopeViolation(format!(
                                "{rel}: only published/ of other nodes is readable"
                            )));
                        }
                        self.resolve(&Scope::Run(*run), rel)
                    }
                    (Some("nodes"), _, _) => self.resolve(&Scope::Run(*run), rel),
                    (Some("workers"), _, _) => Err(KernelError::ScopeViolation(format!(
                        "{rel}: worker directories are private"
                    ))),
                    // Plain paths are the node's own files.
                    _ => self.resolve(reader, rel),
                }
            }
            Scope::Worker(run, own) => {
                let mut parts = rel.splitn(3, '/');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some("workers"), Some(worker), _) if worker != own.as_str() => {
                        Err(KernelError::ScopeViolation(format!(
                            "{rel}: worker directories are private"
                        )))
                    }
                    (Some("workers"), _, _) => self.resolve(&Scope::Run(*run), rel),
                    (Some("nodes"), Some(_), rest) => {
                        let allowed = matches!(rest, Some(r) if r.starts_with("published"))
                            || rest == Some("_status.md");
                        if !allowed {
                            return Err(KernelError::ScopeViolation(format!(
                                "{rel}: only published/ of nodes is readable from worker scope"
                            )));
                        }
                        self.resolve(&Scope::Run(*run), rel)
                    }
                    // Plain paths are the worker's own files.
                    _ => self.resolve(reader, rel),
                }
            }
        }
    }

    // ── Scoped writes ────────────────────────────────────────────────────

    /// Write a file within `writer`'s permitted scope and journal it.
    ///
    /// Emits `file.written` with a content preview on success; writes under
    /// the agent `memory/` subtree additionally emit `memory.written`.
    pub fn write_file(&self, writer: &Scope, rel: &str, content: &str) -> Result<(), KernelError> {
        self.check_writable(writer, rel)?;
        let path = self.resolve(writer, rel)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;

        let event_path = self.agent_relative(&path);
        self.journal.emit(Event::FileWritten {
            path: event_path.clone(),
            bytes: content.len() as u64,
            preview: preview(content, WRITE_PREVIEW_BYTES),
        })?;
        if matches!(writer, Scope::Agent) && rel.starts_with("memory/") {
            self.journal.emit(Event::MemoryWritten { path: event_path })?;
        }
        Ok(())
    }

    fn check_writable(&self, writer: &Scope, rel: &str) -> Result<(), KernelError> {
        match writer {
            Scope::Agent => {
                if rel.starts_with("runs/") || rel == "events.jsonl" {
                    return Err(KernelError::ScopeViolation(format!(
                        "{rel}: run data is written through node and worker scopes"
                    )));
                }
            }
            Scope::Run(_) => {
                if rel.starts_with("nodes/") || rel.starts_with("workers/") {
                    return Err(KernelError::ScopeViolation(format!(
                        "{rel}: node and worker directories are not writable from run scope"
                    )));
                }
            }
            Scope::Node(run, node) => {
                if !rel.starts_with("scratch/") || rel == "scratch/" {
                    return Err(KernelError::ScopeViolation(format!(
                        "{rel}: nodes write only under scratch/"
                    )));
                }
                if self.is_node_completed(run, node) {
                    return Err(KernelError::ScopeViolation(format!(
                        "{rel}: node {} is completed and immutable",
                        node.as_str()
                    )));
                }
            }
            Scope::Worker(_, _) => {}
        }
        Ok(())
    }

    // ── Node status & publish ────────────────────────────────────────────

    /// Whether the node's `_status.md` records completion.
    pub fn is_node_completed(&self, run: &RunId, node: &NodeId) -> bool {
        let status = self.node_dir(run, node).join("_status.md");
        match std::fs::read_to_string(status) {
            Ok(s) => s.starts_with("status: completed"),
            Err(_) => false,
        }
    }

    /// Atomically move `scratch/*` into `published/`, mark the node
    /// completed, and emit one `node.completed` carrying the published list.
    ///
    /// Idempotent: a second call returns the existing published list and
    /// emits nothing.
    pub fn publish(
        &self,
        run: &RunId,
        node: &NodeId,
        summary: &str,
    ) -> Result<Vec<String>, KernelError> {
        let dir = self.node_dir(run, node);
        if self.is_node_completed(run, node) {
            return self.published_files(run, node);
        }

        let scratch = dir.join("scratch");
        let published = dir.join("published");
        std::fs::create_dir_all(&published)?;
        if scratch.is_dir() {
            for entry in std::fs::read_dir(&scratch)? {
                let entry = entry?;
                std::fs::rename(entry.path(), published.join(entry.file_name()))?;
            }
        }

        let files = self.published_files(run, node)?;
        std::fs::write(
            dir.join("_status.md"),
            format!("status: completed\n\n{summary}\n"),
        )?;
        self.journal.emit(Event::NodeCompleted {
            node_id: *node,
            published: files.clone(),
            summary: Some(summary.to_string()),
        })?;
        Ok(files)
    }

    /// Relative paths of everything under the node's `published/`.
    pub fn published_files(&self, run: &RunId, node: &NodeId) -> Result<Vec<String>, KernelError> {
        let published = self.node_dir(run, node).join("published");
        let mut files = Vec::new();
        if published.is_dir() {
            collect_files(&published, &published, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    /// Record a failure: status file plus the conversation trail.
    pub fn write_failure_notes(
        &self,
        run: &RunId,
        node: &NodeId,
        reason: &str,
        notes: &str,
    ) -> Result<(), KernelError> {
        let dir = self.node_dir(run, node);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("_status.md"), format!("status: failed\n\n{reason}\n"))?;
        std::fs::write(dir.join("failure_notes.md"), notes)?;
        Ok(())
    }

    /// Append a structured entry to the node's `log.jsonl`.
    pub fn append_node_log(
        &self,
        run: &RunId,
        node: &NodeId,
        entry: &impl serde::Serialize,
    ) -> Result<(), KernelError> {
        use std::io::Write;
        let path = self.node_dir(run, node).join("log.jsonl");
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", serde_json::to_string(entry)?)?;
        Ok(())
    }

    fn agent_relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.agent_dir).unwrap_or(path).display().to_string()
    }
}

fn write_if_absent(path: &Path, content: &str) -> Result<(), KernelError> {
    if !path.exists() {
        std::fs::write(path, content)?;
    }
    Ok(())
}

fn touch(path: &Path) -> Result<(), KernelError> {
    std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

/// Join `rel` onto `base`, rejecting absolute paths and `..` components.
fn safe_join(base: &Path, rel: &str) -> Result<PathBuf, KernelError> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return Err(KernelError::ScopeViolation(format!("{rel}: absolute paths are not allowed")));
    }
    for component in rel_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(KernelError::ScopeViolation(format!(
                    "{rel}: path traversal is not allowed"
                )))
            }
        }
    }
    Ok(base.join(rel_path))
}

/// Verify `candidate` stays under `base` after resolving symlinks on its
/// deepest existing ancestor.
fn assert_within(base: &Path, candidate: &Path) -> Result<(), KernelError> {
    let canon_base = base.canonicalize()?;
    let mut probe = candidate;
    while !probe.exists() {
        probe = match probe.parent() {
            Some(parent) => parent,
            None => {
                return Err(KernelError::ScopeViolation(format!(
                    "{}: escapes its scope",
                    candidate.display()
                )))
            }
        };
    }
    let canon_probe = probe.canonicalize()?;
    if !canon_probe.starts_with(&canon_base) {
        return Err(KernelError::ScopeViolation(format!(
            "{}: escapes its scope",
            candidate.display()
        )));
    }
    Ok(())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), KernelError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            out.push(path.strip_prefix(root).unwrap_or(&path).display().to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
