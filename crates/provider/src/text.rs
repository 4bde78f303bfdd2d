// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text-fallback adapter for providers without native tool calling.
//!
//! The tool schemas go into the prompt together with an exact call-marker
//! contract, and the response text is scanned for
//! `<tool_call>{"name":…,"arguments":…}</tool_call>` markers. Malformed
//! markers are logged and skipped, never fatal. Speaks the OpenAI-compatible
//! chat shape on the wire (the common denominator for local runtimes).

use crate::{
    map_http_error, map_http_status, ModelResponse, ProviderAdapter, ProviderError, ToolCall,
    ToolDef, Turn, Usage,
};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // the pattern is a compile-time constant
        Regex::new(r"(?s)<tool_call>\s*(.*?)\s*</tool_call>").unwrap()
    })
}

/// Adapter that embeds tool schemas in the prompt and parses call markers.
#[derive(Debug)]
pub struct TextAdapter {
    model: String,
    chat_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl TextAdapter {
    /// `chat_url` is a full OpenAI-compatible `/chat/completions` endpoint.
    pub fn new(chat_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            chat_url: chat_url.into(),
            api_key: None,
            client: reqwest::Client::builder().timeout(timeout).build().unwrap_or_default(),
        }
    }

    agiraph_core::setters! {
        option {
            api_key: String,
        }
    }

    /// Extract tool-call markers from `text`, returning the remaining prose
    /// and the parsed calls. Call ids are synthesized sequentially.
    pub fn parse_marked_text(text: &str) -> (Option<String>, Vec<ToolCall>) {
        let mut calls = Vec::new();
        let mut stripped = String::with_capacity(text.len());
        let mut cursor = 0;
        for capture in marker_regex().captures_iter(text) {
            let whole = match capture.get(0) {
                Some(m) => m,
                None => continue,
            };
            stripped.push_str(&text[cursor..whole.start()]);
            cursor = whole.end();

            let body = capture.get(1).map(|m| m.as_str()).unwrap_or_default();
            match serde_json::from_str::<serde_json::Value>(body) {
                Ok(parsed) => match parsed["name"].as_str() {
                    Some(name) => calls.push(ToolCall {
                        id: format!("call-{}", calls.len() + 1),
                        name: name.to_string(),
                        args: parsed.get("arguments").cloned().unwrap_or_else(|| json!({})),
                    }),
                    None => tracing::warn!(marker = body, "tool_call marker missing name, skipped"),
                },
                Err(e) => tracing::warn!(error = %e, marker = body, "malformed tool_call marker, skipped"),
            }
        }
        stripped.push_str(&text[cursor..]);
        let stripped = stripped.trim().to_string();
        (if stripped.is_empty() { None } else { Some(stripped) }, calls)
    }

    fn map_turns(system_with_tools: &str, turns: &[Turn]) -> Vec<serde_json::Value> {
        let mut messages = Vec::new();
        if !system_with_tools.is_empty() {
            messages.push(json!({"role": "system", "content": system_with_tools}));
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
                    // Re-render calls as markers so the transcript the model
                    // sees matches what it produced.
                    let mut text = content.clone().unwrap_or_default();
                    for call in tool_calls {
                        text.push_str(&format!(
                            "\n<tool_call>{}</tool_call>",
                            json!({"name": call.name, "arguments": call.args}),
                        ));
                    }
                    messages.push(json!({"role": "assistant", "content": text.trim()}));
                }
                Turn::ToolResult { tool, content, .. } => {
                    messages.push(json!({
                        "role": "user",
                        "content": format!("[Result of {tool}]:\n{content}"),
                    }));
                }
            }
        }
        messages
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for TextAdapter {
    fn name(&self) -> &'static str {
        "text"
    }

    /// No native tool schema: everything goes through the prompt.
    fn format_tools(&self, _defs: &[ToolDef]) -> Option<serde_json::Value> {
        None
    }

    fn format_tool_prompt(&self, defs: &[ToolDef]) -> String {
        let mut prompt = crate::guidance_prompt(defs);
        prompt.push_str("\n\n# Tools\n\nYou have these tools:\n\n");
        for def in defs {
            prompt.push_str(&format!(
                "- {}: {}\n  parameters: {}\n",
                def.name, def.description, def.parameters,
            ));
        }
        prompt.push_str(
            "\nTo call a tool, emit exactly:\n\
             <tool_call>{\"name\":\"tool_name\",\"arguments\":{...}}</tool_call>\n\
             One marker per call. Text outside markers is your reply.\n",
        );
        prompt
    }

    fn parse_response(&self, raw: &serde_json::Value) -> Result<ModelResponse, ProviderError> {
        let content = raw["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::Permanent("response has no message content".into()))?;
        let (text, tool_calls) = Self::parse_marked_text(content);
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
        // Tools ride in the system prompt for this adapter.
        let system_with_tools = if tools.is_empty() {
            system.to_string()
        } else {
            format!("{system}\n\n{}", self.format_tool_prompt(tools))
        };
        let body = json!({
            "model": self.model,
            "messages": Self::map_turns(&system_with_tools, turns),
        });

        tracing::debug!(model = %self.model, "sending completion request");
        let mut request = self.client.post(&self.chat_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(map_http_error)?;

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
#[path = "text_tests.rs"]
mod tests;
