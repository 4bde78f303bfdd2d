// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn adapter(model: &str) -> AnthropicAdapter {
    AnthropicAdapter::new("sk-test", model, Duration::from_secs(5))
}

#[test]
fn format_tools_uses_input_schema() {
    let defs = vec![ToolDef::new(
        "write_file",
        "Write a file",
        json!({"type": "object", "properties": {"path": {"type": "string"}}}),
    )];
    let tools = adapter("claude-sonnet-4-5").format_tools(&defs).unwrap();
    assert_eq!(tools[0]["name"], "write_file");
    assert_eq!(tools[0]["input_schema"]["type"], "object");
}

#[test]
fn native_search_added_for_supporting_models() {
    let adapter = adapter("claude-sonnet-4-5").native_search_max_uses(3u32);
    let tools = adapter.format_tools(&[]).unwrap();
    let tools = tools.as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["type"], "web_search_20250305");
    assert_eq!(tools[0]["max_uses"], 3);
}

#[test]
fn native_search_skipped_for_unsupported_models() {
    let adapter = adapter("claude-2.1").native_search_max_uses(3u32);
    let tools = adapter.format_tools(&[]).unwrap();
    assert!(tools.as_array().unwrap().is_empty());
}

#[test]
fn parse_response_decodes_text_and_tool_use() {
    let raw = json!({
        "content": [
            {"type": "text", "text": "I'll write the file."},
            {"type": "tool_use", "id": "toolu_1", "name": "write_file",
             "input": {"path": "a.md", "content": "hi"}},
        ],
        "usage": {"input_tokens": 10, "output_tokens": 20},
    });
    let response = adapter("claude-sonnet-4-5").parse_response(&raw).unwrap();
    assert_eq!(response.text.as_deref(), Some("I'll write the file."));
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].id, "toolu_1");
    assert_eq!(response.tool_calls[0].args["path"], "a.md");
    assert_eq!(response.usage.input_tokens, 10);
    // The full block array is preserved for replay.
    assert_eq!(response.content_blocks.as_ref().unwrap().as_array().unwrap().len(), 2);
}

#[test]
fn assistant_replay_uses_opaque_blocks_verbatim() {
    let opaque = json!([
        {"type": "text", "text": "cited", "citations": [{"encrypted_index": "xyz"}]},
        {"type": "web_search_tool_result", "content": "opaque-payload"},
    ]);
    let turns = vec![
        Turn::user("question"),
        Turn::Assistant {
            content: Some("cited".into()),
            tool_calls: vec![],
            content_blocks: Some(opaque.clone()),
        },
        Turn::user("follow-up"),
    ];
    let messages = AnthropicAdapter::map_turns(&turns);
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], opaque);
}

#[test]
fn assistant_without_blocks_is_rebuilt() {
    let turns = vec![Turn::Assistant {
        content: Some("thinking".into()),
        tool_calls: vec![ToolCall { id: "c1".into(), name: "publish".into(), args: json!({}) }],
        content_blocks: None,
    }];
    let messages = AnthropicAdapter::map_turns(&turns);
    let content = messages[0]["content"].as_array().unwrap();
    assert_eq!(content[0]["type"], "text");
    assert_eq!(content[1]["type"], "tool_use");
    assert_eq!(content[1]["id"], "c1");
}

#[test]
fn tool_results_become_tool_result_blocks() {
    let turns = vec![Turn::ToolResult { call_id: "c9".into(), tool: "read_file".into(), content: "data".into() }];
    let messages = AnthropicAdapter::map_turns(&turns);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"][0]["type"], "tool_result");
    assert_eq!(messages[0]["content"][0]["tool_use_id"], "c9");
}

#[test]
fn missing_content_is_permanent_error() {
    let err = adapter("claude-sonnet-4-5").parse_response(&json!({"oops": true})).unwrap_err();
    assert!(!err.is_transient());
}
