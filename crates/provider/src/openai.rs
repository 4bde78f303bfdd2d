// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenAI Chat Completions adapter.
//!
//! Reference: <https://platform.openai.com/docs/api-reference/chat>
//!
//! Tool calls arrive as `tool_calls` entries with JSON-encoded argument
//! strings; results go back as `role: "tool"` messages carrying the
//! matching `tool_call_id`. The API returns 400 for a tool message that
//! does not immediately follow its assistant message, which is why the
//! executor enforces the adjacency rule structurally.

use crate::{
    map_http_error, map_http_status, ModelResponse, ProviderAdapter, ProviderError, ToolCall,
    ToolDef, Turn, Usage,
};
use serde_json::json;
use std::time::Duration;

/// Default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Adapter for the OpenAI Chat Completions API.
#[derive(Debug)]
pub struct OpenAiAdapter {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::builder().timeout(timeout).build().unwrap_or_default(),
        }
    }

    agiraph_core::setters! {
        into {
            base_url: String,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn map_turns(system: &str, turns: &[Turn]) -> Vec<serde_json::Value> {
        let mut messages = Vec::new();
        if !system.is_empty() {
            messages.push(json!({"role": "system", "content": system}));
        }
        for turn in turns {
            match turn {
                Turn::System { content } => {
                    messages.push(json!({"role": "system", "content": content}));
                }
                Turn::User { content } => {
                    messages.push(json!({"role": "user", "content": content}));
                }
                Turn::Assistant { content, tool_calls, .. } => {
                    let mut message = json!({
                        "role": "assistant",
                        "content": content.clone().unwrap_or_default(),
                    });
                    if !tool_calls.is_empty() {
                        message["tool_calls"] = tool_calls
                            .iter()
                            .map(|call| {
                                json!({
                                    "id": call.id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        "arguments": call.args.to_string(),
                                    },
                                })
                            })
                            .collect();
                    }
                    messages.push(message);
                }
                Turn::ToolResult { call_id, content, .. } => {
                    messages.push(json!({
                        "role": "tool",
                        "tool_call_id": call_id,
                        "content": content,
                    }));
                }
            }
        }
        messages
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn format_tools(&self, defs: &[ToolDef]) -> Option<serde_json::Value> {
        Some(
            defs.iter()
                .map(|def| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": def.name,
                            "description": def.description,
                            "parameters": def.parameters,
                        },
                    })
                })
                .collect(),
        )
    }

    fn parse_response(&self, raw: &serde_json::Value) -> Result<ModelResponse, ProviderError> {
        let message = &raw["choices"][0]["message"];
        if message.is_null() {
            return Err(ProviderError::Permanent("response has no choices".into()));
        }

        let mut tool_calls = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                let arguments = call["function"]["arguments"].as_str().unwrap_or("{}");
                let args = serde_json::from_str(arguments).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "unparseable tool arguments, using empty object");
                    json!({})
                });
                tool_calls.push(ToolCall {
                    id: call["id"].as_str().unwrap_or_default().to_string(),
                    name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
                    args,
                });
            }
        }

        let text = message["content"].as_str().filter(|s| !s.is_empty()).map(String::from);
        Ok(ModelResponse {
            text,
            tool_calls,
            usage: Usage {
                input_tokens: raw["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
                output_tokens: raw["usage"]["completion_tokens"].as_u64().unwrap_or(0),
            },
            content_blocks: None,
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
            "messages": Self::map_turns(system, turns),
        });
        if !tools.is_empty() {
            if let Some(formatted) = self.format_tools(tools) {
                body["tools"] = formatted;
            }
        }

        tracing::debug!(model = %self.model, "sending completion request");
        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
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
#[path = "openai_tests.rs"]
mod tests;
