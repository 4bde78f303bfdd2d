// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Anthropic Messages API adapter.
//!
//! Reference: <https://docs.anthropic.com/en/api/messages>
//!
//! Tool use is native: defs become `input_schema` entries, responses carry
//! `tool_use` content blocks. Models that support server-side web search
//! get the search tool added automatically with a per-call use cap, and the
//! opaque content blocks the API returns are replayed verbatim on follow-up
//! turns so citations and encrypted search results survive multi-turn
//! flows.

use crate::{
    map_http_error, map_http_status, ModelResponse, ProviderAdapter, ProviderError, ToolCall,
    ToolDef, Turn, Usage,
};
use serde_json::json;
use std::time::Duration;

/// Default Anthropic API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Server-side web search tool type.
const NATIVE_SEARCH_TOOL: &str = "web_search_20250305";

/// Model families with server-side web search support.
const NATIVE_SEARCH_MODELS: &[&str] = &["claude-3-5", "claude-3-7", "claude-sonnet-4", "claude-opus-4", "claude-haiku-4"];

/// Adapter for the Anthropic Messages API.
#[derive(Debug)]
pub struct AnthropicAdapter {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    /// When set, native web search is enabled with this use cap for
    /// supporting models.
    native_search_max_uses: Option<u32>,
    client: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.into(),
            max_tokens: 8192,
            native_search_max_uses: None,
            client: reqwest::Client::builder().timeout(timeout).build().unwrap_or_default(),
        }
    }

    agiraph_core::setters! {
        into {
            base_url: String,
        }
        set {
            max_tokens: u32,
        }
        option {
            native_search_max_uses: u32,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn supports_native_search(&self) -> bool {
        NATIVE_SEARCH_MODELS.iter().any(|prefix| self.model.starts_with(prefix))
    }

    fn map_turns(turns: &[Turn]) -> Vec<serde_json::Value> {
        let mut messages = Vec::new();
        for turn in turns {
            match turn {
                // System content goes in the top-level field, never inline.
                Turn::System { .. } => {}
                Turn::User { content } => {
                    messages.push(json!({"role": "user", "content": content}));
                }
                Turn::Assistant { content, tool_calls, content_blocks } => {
                    // Replay the API's own content blocks when we have them;
                    // they carry opaque state (citations, encrypted search
                    // results) that must round-trip unchanged.
                    let blocks = match content_blocks {
                        Some(blocks) => blocks.clone(),
                        None => {
                            let mut built = Vec::new();
                            if let Some(text) = content {
                                if !text.is_empty() {
                                    built.push(json!({"type": "text", "text": text}));
                                }
                            }
                            for call in tool_calls {
                                built.push(json!({
                                    "type": "tool_use",
                                    "id": call.id,
                                    "name": call.name,
                                    "input": call.args,
                                }));
                            }
                            serde_json::Value::Array(built)
                        }
                    };
                    messages.push(json!({"role": "assistant", "content": blocks}));
                }
                Turn::ToolResult { call_id, content, .. } => {
                    messages.push(json!({
                        "role": "user",
                        "content": [{
                            "type": "tool_result",
                            "tool_use_id": call_id,
                            "content": content,
                        }],
                    }));
                }
            }
        }
        messages
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn format_tools(&self, defs: &[ToolDef]) -> Option<serde_json::Value> {
        let mut tools: Vec<serde_json::Value> = defs
            .iter()
            .map(|def| {
                json!({
                    "name": def.name,
                    "description": def.description,
                    "input_schema": def.parameters,
                })
            })
            .collect();
        if let Some(max_uses) = self.native_search_max_uses {
            if self.supports_native_search() {
                tools.push(json!({
                    "type": NATIVE_SEARCH_TOOL,
                    "name": "web_search",
                    "max_uses": max_uses,
                }));
            }
        }
        Some(serde_json::Value::Array(tools))
    }

    fn parse_response(&self, raw: &serde_json::Value) -> Result<ModelResponse, ProviderError> {
        let content = raw["content"]
            .as_array()
            .ok_or_else(|| ProviderError::Permanent("response has no content array".into()))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in content {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(t) = block["text"].as_str() {
                        text.push_str(t);
                    }
                }
                Some("tool_use") => tool_calls.push(ToolCall {
                    id: block["id"].as_str().unwrap_or_default().to_string(),
                    name: block["name"].as_str().unwrap_or_default().to_string(),
                    args: block["input"].clone(),
                }),
                // Search results, citations, thinking: opaque, kept in the
                // block replay below.
                _ => {}
            }
        }

        Ok(ModelResponse {
            text: if text.is_empty() { None } else { Some(text) },
            tool_calls,
            usage: Usage {
                input_tokens: raw["usage"]["input_tokens"].as_u64().unwrap_or(0),
                output_tokens: raw["usage"]["output_tokens"].as_u64().unwrap_or(0),
            },
            content_blocks: Some(serde_json::Value::Array(content.clone())),
        })
    }

    async fn complete(
        &self,
        system: &str,
        turns: &[Turn],
        tools: &[ToolDef],
    ) -> Result<ModelResponse, ProviderError> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": Self::map_turns(turns),
        });
        if !system.is_empty() {
            body["system"] = json!(system);
        }
        if !tools.is_empty() || self.native_search_max_uses.is_some() {
            if let Some(formatted) = self.format_tools(tools) {
                body["tools"] = formatted;
            }
        }

        tracing::debug!(model = %self.model, "sending completion request");
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        let body_text = response.text().await.map_err(map_http_error)?;
        if !status.is_success() {
            return Err(map_http_status(status, &body_text));
        }
        let raw: serde_json::Value = serde_json::from_str(&body_text)
            .map_err(|e| ProviderError::Permanent(format!("invalid JSON response: {e}")))?;
        self.parse_response(&raw)
    }
}

#[cfg(test)]
#[path = "anthropic_tests.rs"]
mod tests;
