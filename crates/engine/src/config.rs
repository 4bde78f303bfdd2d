// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the kernel.
//!
//! All runtime knobs are read once at startup; malformed values are a
//! startup failure, missing optional values fall back to defaults.

use agiraph_core::{KernelError, ModelRef};
use agiraph_provider::{AnthropicAdapter, OpenAiAdapter, ProviderAdapter, TextAdapter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Runtime configuration, read from `AGIRAPH_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root data directory holding `agents/{agent_id}/`.
    pub data_dir: PathBuf,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible chat endpoint for the text-fallback provider.
    pub text_chat_url: Option<String>,
    /// Per-call provider timeout.
    pub provider_timeout: Duration,
    /// ReAct iteration cap per node.
    pub max_worker_iterations: u32,
    /// Poll interval for autonomous subprocess bridges.
    pub poll_interval: Duration,
    /// Safety-net lifetime for autonomous subprocesses.
    pub max_subprocess_lifetime: Duration,
    /// Per-call use cap for native web search; `None` disables it.
    pub native_search_max_uses: Option<u32>,
    /// Model context window used for the compaction check, in tokens.
    pub context_limit_tokens: u64,
    /// Fraction of the context limit that triggers compaction.
    pub compact_at: f64,
    /// Turns kept verbatim after compaction.
    pub compact_keep_turns: usize,
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// Resolution for the data dir: `AGIRAPH_DATA_DIR` >
    /// `XDG_STATE_HOME/agiraph` > `~/.local/state/agiraph`.
    pub fn from_env() -> Result<Self, KernelError> {
        let data_dir = if let Ok(dir) = std::env::var("AGIRAPH_DATA_DIR") {
            PathBuf::from(dir)
        } else if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            PathBuf::from(xdg).join("agiraph")
        } else {
            let home = std::env::var("HOME")
                .map_err(|_| KernelError::Config("no HOME for the data directory".into()))?;
            PathBuf::from(home).join(".local/state/agiraph")
        };

        Ok(Self {
            data_dir,
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            text_chat_url: non_empty_var("AGIRAPH_TEXT_CHAT_URL"),
            provider_timeout: duration_ms_var("AGIRAPH_PROVIDER_TIMEOUT_MS", 120_000)?,
            max_worker_iterations: parse_var("AGIRAPH_MAX_ITERATIONS", 30)?,
            poll_interval: duration_ms_var("AGIRAPH_POLL_INTERVAL_MS", 1_000)?,
            max_subprocess_lifetime: duration_ms_var("AGIRAPH_MAX_SUBPROCESS_MS", 3_600_000)?,
            native_search_max_uses: optional_var("AGIRAPH_SEARCH_MAX_USES")?,
            context_limit_tokens: parse_var("AGIRAPH_CONTEXT_LIMIT", 200_000)?,
            compact_at: parse_var("AGIRAPH_COMPACT_AT", 0.8)?,
            compact_keep_turns: parse_var("AGIRAPH_COMPACT_KEEP_TURNS", 6)?,
        })
    }

    /// Fast-timeout configuration rooted in a scratch directory.
    pub fn for_test(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            anthropic_api_key: None,
            openai_api_key: None,
            text_chat_url: None,
            provider_timeout: Duration::from_secs(5),
            max_worker_iterations: 10,
            poll_interval: Duration::from_millis(20),
            max_subprocess_lifetime: Duration::from_secs(10),
            native_search_max_uses: None,
            context_limit_tokens: 200_000,
            compact_at: 0.8,
            compact_keep_turns: 6,
        }
    }

    /// Build the provider adapter for a model reference.
    ///
    /// A missing key for the requested provider is a `Config` error — fatal
    /// at agent start, never mid-run.
    pub fn provider_for(&self, model: &ModelRef) -> Result<Arc<dyn ProviderAdapter>, KernelError> {
        match model.provider.as_str() {
            "anthropic" => {
                let key = self.anthropic_api_key.as_ref().ok_or_else(|| {
                    KernelError::Config("ANTHROPIC_API_KEY is not set".into())
                })?;
                let mut adapter =
                    AnthropicAdapter::new(key, &model.model, self.provider_timeout);
                if let Some(max_uses) = self.native_search_max_uses {
                    adapter = adapter.native_search_max_uses(max_uses);
                }
                Ok(Arc::new(adapter))
            }
            "openai" => {
                let key = self
                    .openai_api_key
                    .as_ref()
                    .ok_or_else(|| KernelError::Config("OPENAI_API_KEY is not set".into()))?;
                Ok(Arc::new(OpenAiAdapter::new(key, &model.model, self.provider_timeout)))
            }
            "text" => {
                let url = self.text_chat_url.as_ref().ok_or_else(|| {
                    KernelError::Config("AGIRAPH_TEXT_CHAT_URL is not set".into())
                })?;
                Ok(Arc::new(TextAdapter::new(url, &model.model, self.provider_timeout)))
            }
            other => Err(KernelError::Config(format!("unknown provider: {other}"))),
        }
    }

    /// Token budget above which a worker compacts its conversation.
    pub fn compaction_threshold_tokens(&self) -> u64 {
        (self.context_limit_tokens as f64 * self.compact_at) as u64
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, KernelError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| KernelError::Config(format!("unparseable {name}: {value:?}"))),
        Err(_) => Ok(default),
    }
}

fn optional_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, KernelError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map(Some)
            .map_err(|_| KernelError::Config(format!("unparseable {name}: {value:?}"))),
        _ => Ok(None),
    }
}

fn duration_ms_var(name: &str, default_ms: u64) -> Result<Duration, KernelError> {
    Ok(Duration::from_millis(parse_var(name, default_ms)?))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
