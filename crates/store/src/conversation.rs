// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL conversation persistence.
//!
//! Used for the human ⇄ coordinator conversation and for each harnessed
//! worker's turn history. Stays schema-agnostic: callers serialize their
//! own turn type, and compaction archives the old file instead of
//! deleting it.

use agiraph_core::KernelError;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

/// One JSONL conversation file.
pub struct ConversationLog {
    path: PathBuf,
}

impl ConversationLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Append one turn as a JSON line.
    pub fn append(&self, turn: &impl serde::Serialize) -> Result<(), KernelError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file =
            std::fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(turn)?)?;
        Ok(())
    }

    /// All turns as raw JSON values, oldest first. Missing file is empty.
    pub fn read_values(&self) -> Result<Vec<serde_json::Value>, KernelError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut values = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            values.push(serde_json::from_str(&line)?);
        }
        Ok(values)
    }

    /// Move the current file aside as `{stem}.{suffix}.jsonl` and start
    /// fresh. Returns the archive path. Used by compaction; the archived
    /// conversation is never deleted.
    pub fn archive(&self, suffix: &str) -> Result<PathBuf, KernelError> {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "conversation".to_string());
        let archived = self.path.with_file_name(format!("{stem}.{suffix}.jsonl"));
        if self.path.exists() {
            std::fs::rename(&self.path, &archived)?;
        }
        Ok(archived)
    }
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
