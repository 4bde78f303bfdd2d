// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agiraph-provider: the LLM adapter layer.
//!
//! One canonical tool schema and one canonical [`ModelResponse`]; each
//! adapter reduces the schema to its provider's native tool-calling format
//! (or, for the text fallback, into the prompt) and parses the provider's
//! response back. The executors never see provider-specific shapes.

pub mod anthropic;
pub mod openai;
pub mod text;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use anthropic::AnthropicAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProvider;
pub use openai::OpenAiAdapter;
pub use text::TextAdapter;

use agiraph_core::KernelError;
use serde::{Deserialize, Serialize};

/// Canonical tool definition.
///
/// `parameters` is a JSON-Schema object; `guidance` is the prose the model
/// always sees in its prompt, independent of the tool-calling transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub guidance: String,
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self { name: name.into(), description: description.into(), parameters, guidance: String::new() }
    }

    agiraph_core::setters! {
        into {
            guidance: String,
        }
    }
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

/// Token accounting for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The canonical response shape every adapter produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub usage: Usage,
    /// Opaque provider content blocks (citations, encrypted search results).
    /// Replayed verbatim on follow-up turns; persisted with the conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_blocks: Option<serde_json::Value>,
}

impl ModelResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Default::default() }
    }

    pub fn with_calls(calls: Vec<ToolCall>) -> Self {
        Self { tool_calls: calls, ..Default::default() }
    }
}

/// One turn of a conversation, provider-agnostic.
///
/// The executor guarantees that an `Assistant` turn carrying tool calls is
/// followed immediately by its `ToolResult` turns, in call order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_blocks: Option<serde_json::Value>,
    },
    #[serde(rename = "tool")]
    ToolResult {
        call_id: String,
        tool: String,
        content: String,
    },
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn::User { content: content.into() }
    }

    pub fn assistant(response: &ModelResponse) -> Self {
        Turn::Assistant {
            content: response.text.clone(),
            tool_calls: response.tool_calls.clone(),
            content_blocks: response.content_blocks.clone(),
        }
    }
}

/// Provider failures, split by retry class.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Network timeout, 5xx, or rate limit. Callers retry exactly once.
    #[error("transient: {0}")]
    Transient(String),
    /// Anything the provider rejected outright.
    #[error("permanent: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

impl From<ProviderError> for KernelError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Transient(msg) => KernelError::ProviderTransient(msg),
            ProviderError::Permanent(msg) => KernelError::ProviderPermanent(msg),
        }
    }
}

/// A provider adapter: canonical schema in, canonical response out.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Reduce tool defs to the provider's native schema. `None` means the
    /// provider has no native tool calling and the schemas go into the
    /// prompt via [`ProviderAdapter::format_tool_prompt`] instead.
    fn format_tools(&self, defs: &[ToolDef]) -> Option<serde_json::Value>;

    /// The tool prose for the system prompt. Always includes per-tool
    /// guidance; the text fallback appends full schemas and the call-marker
    /// contract.
    fn format_tool_prompt(&self, defs: &[ToolDef]) -> String {
        guidance_prompt(defs)
    }

    /// Decode a raw provider response into the canonical shape.
    fn parse_response(&self, raw: &serde_json::Value) -> Result<ModelResponse, ProviderError>;

    /// The turn that must immediately follow the assistant message carrying
    /// the matching call.
    fn format_tool_result(&self, call: &ToolCall, result: &str) -> Turn {
        Turn::ToolResult { call_id: call.id.clone(), tool: call.name.clone(), content: result.to_string() }
    }

    /// Run one completion over the conversation.
    async fn complete(
        &self,
        system: &str,
        turns: &[Turn],
        tools: &[ToolDef],
    ) -> Result<ModelResponse, ProviderError>;
}

/// Per-tool guidance shared by every adapter's prompt.
pub(crate) fn guidance_prompt(defs: &[ToolDef]) -> String {
    let mut out = String::new();
    for def in defs {
        if def.guidance.is_empty() {
            continue;
        }
        out.push_str(&format!("## {}\n{}\n\n", def.name, def.guidance));
    }
    out.trim_end().to_string()
}

/// Classify a reqwest failure into the retry taxonomy.
pub(crate) fn map_http_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() || e.is_connect() {
        ProviderError::Transient(e.to_string())
    } else {
        ProviderError::Permanent(e.to_string())
    }
}

/// Classify an HTTP status into the retry taxonomy.
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let msg = format!("{}: {}", status, agiraph_core::short(body, 300));
    if status.as_u16() == 429 || status.as_u16() == 408 || status.is_server_error() {
        ProviderError::Transient(msg)
    } else {
        ProviderError::Permanent(msg)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
