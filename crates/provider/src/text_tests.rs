// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn extracts_marker_and_strips_text() {
    let text = "I'll write it now.\n<tool_call>{\"name\":\"write_file\",\"arguments\":{\"path\":\"a.md\"}}</tool_call>\nDone soon.";
    let (remaining, calls) = TextAdapter::parse_marked_text(text);
    assert_eq!(remaining.as_deref(), Some("I'll write it now.\n\nDone soon."));
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "write_file");
    assert_eq!(calls[0].args["path"], "a.md");
    assert_eq!(calls[0].id, "call-1");
}

#[test]
fn multiple_markers_get_sequential_ids() {
    let text = "<tool_call>{\"name\":\"a\",\"arguments\":{}}</tool_call>\
                <tool_call>{\"name\":\"b\",\"arguments\":{}}</tool_call>";
    let (remaining, calls) = TextAdapter::parse_marked_text(text);
    assert!(remaining.is_none());
    assert_eq!(calls.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["call-1", "call-2"]);
}

#[test]
fn malformed_markers_are_skipped_not_fatal() {
    let text = "keep this <tool_call>{broken json</tool_call> \
                <tool_call>{\"arguments\":{}}</tool_call> \
                <tool_call>{\"name\":\"ok\",\"arguments\":{}}</tool_call>";
    let (remaining, calls) = TextAdapter::parse_marked_text(text);
    assert_eq!(remaining.as_deref(), Some("keep this"));
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "ok");
}

#[test]
fn missing_arguments_default_to_empty_object() {
    let text = "<tool_call>{\"name\":\"finish\"}</tool_call>";
    let (_, calls) = TextAdapter::parse_marked_text(text);
    assert_eq!(calls[0].args, json!({}));
}

#[test]
fn format_tools_is_none() {
    let adapter = TextAdapter::new("http://localhost:11434/v1/chat/completions", "llama3", Duration::from_secs(5));
    assert!(adapter.format_tools(&[]).is_none());
}

#[test]
fn tool_prompt_contains_schema_and_marker_contract() {
    let adapter = TextAdapter::new("http://localhost/v1/chat/completions", "m", Duration::from_secs(5));
    let defs = vec![ToolDef::new(
        "publish",
        "Publish your outputs",
        json!({"type": "object", "properties": {"summary": {"type": "string"}}}),
    )
    .guidance("Publish once, at the end.")];
    let prompt = adapter.format_tool_prompt(&defs);
    assert!(prompt.contains("Publish once, at the end."));
    assert!(prompt.contains("\"summary\""));
    assert!(prompt.contains("<tool_call>{\"name\":\"tool_name\",\"arguments\":{...}}</tool_call>"));
}

#[test]
fn assistant_turns_rerender_markers() {
    let turns = vec![Turn::Assistant {
        content: Some("working".into()),
        tool_calls: vec![ToolCall { id: "call-1".into(), name: "read_file".into(), args: json!({"path": "x"}) }],
        content_blocks: None,
    }];
    let messages = TextAdapter::map_turns("", &turns);
    let content = messages[0]["content"].as_str().unwrap();
    assert!(content.starts_with("working"));
    assert!(content.contains("<tool_call>{\"arguments\":{\"path\":\"x\"},\"name\":\"read_file\"}</tool_call>"));
}

#[test]
fn parse_response_reads_chat_shape() {
    let adapter = TextAdapter::new("http://localhost/v1/chat/completions", "m", Duration::from_secs(5));
    let raw = json!({
        "choices": [{"message": {"content": "hello <tool_call>{\"name\":\"finish\",\"arguments\":{}}</tool_call>"}}],
        "usage": {"prompt_tokens": 1, "completion_tokens": 2},
    });
    let response = adapter.parse_response(&raw).unwrap();
    assert_eq!(response.text.as_deref(), Some("hello"));
    assert_eq!(response.tool_calls[0].name, "finish");
}
