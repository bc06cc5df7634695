//! Markdown → ADF

use adf_babel::{parse, ParseContext};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn import(source: &str, context: &ParseContext) -> (Value, Vec<String>) {
    let outcome = parse(source, context);
    let value = serde_json::to_value(&outcome.document).expect("document to serialize");
    assert_eq!(value["type"], "doc");
    assert_eq!(value["version"], 1);
    (value["content"].clone(), outcome.warnings)
}

fn text(text: &str) -> Value {
    json!({"type": "text", "text": text})
}

fn paragraph(content: Value) -> Value {
    json!({"type": "paragraph", "content": content})
}

#[test]
fn test_plan_document() {
    let source = "# Plan\n\
                  \n\
                  Owner: [@Jane](/jira/people/abc123) `[status:b]In progress`\n\
                  \n\
                  - [ ] Draft\n\
                  - [x] Review\n\
                  \n\
                  > [!TIP]\n\
                  > Looks good.\n";
    let (content, warnings) = import(source, &ParseContext::default());

    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    assert_eq!(
        content,
        json!([
            {"type": "heading", "attrs": {"level": 1}, "content": [text("Plan")]},
            paragraph(json!([
                text("Owner: "),
                {"type": "mention", "attrs": {"id": "abc123", "text": "@Jane"}},
                text(" "),
                {"type": "status", "attrs": {"text": "In progress", "color": "blue"}}
            ])),
            {"type": "taskList", "attrs": {"localId": ""}, "content": [
                {"type": "taskItem", "attrs": {"localId": "", "state": "TODO"}, "content": [text("Draft")]},
                {"type": "taskItem", "attrs": {"localId": "", "state": "DONE"}, "content": [text("Review")]}
            ]},
            {"type": "panel", "attrs": {"panelType": "success"}, "content": [
                paragraph(json!([text("Looks good.")]))
            ]}
        ])
    );
}

#[test]
fn test_decisions_in_a_quote() {
    let source = "> `[decision:d]Ship it`\n>\n> `[decision:u]Rename later`\n";
    let (content, _) = import(source, &ParseContext::default());
    assert_eq!(
        content,
        json!([
            {"type": "decisionList", "attrs": {"localId": ""}, "content": [
                {"type": "decisionItem", "attrs": {"localId": "", "state": "DECIDED"}, "content": [text("Ship it")]},
                {"type": "decisionItem", "attrs": {"localId": "", "state": "UP_FOR_DISCUSSION"}, "content": [text("Rename later")]}
            ]}
        ])
    );
}

#[test]
fn test_invalid_date_stays_code() {
    let (content, _) = import("`[date]2024-02-30`\n", &ParseContext::default());
    assert_eq!(
        content,
        json!([paragraph(json!([
            {"type": "text", "text": "[date]2024-02-30", "marks": [{"type": "code"}]}
        ]))])
    );
}

#[test]
fn test_mentions_respect_base_url() {
    let source = "[@Jane](https://h.atlassian.net/jira/people/abc) [@Joe](https://evil.example/jira/people/def)\n";
    let context = ParseContext::with_base_url("https://h.atlassian.net");
    let (content, _) = import(source, &context);
    assert_eq!(
        content,
        json!([paragraph(json!([
            {"type": "mention", "attrs": {"id": "abc", "text": "@Jane"}},
            text(" "),
            {
                "type": "text",
                "text": "@Joe",
                "marks": [{"type": "link", "attrs": {"href": "https://evil.example/jira/people/def"}}]
            }
        ]))])
    );
}

#[test]
fn test_table_rows() {
    let source = "| Key | Value |\n| --- | --- |\n| a |  |\n";
    let (content, _) = import(source, &ParseContext::default());
    assert_eq!(
        content,
        json!([
            {"type": "table", "content": [
                {"type": "tableRow", "content": [
                    {"type": "tableHeader", "content": [paragraph(json!([text("Key")]))]},
                    {"type": "tableHeader", "content": [paragraph(json!([text("Value")]))]}
                ]},
                {"type": "tableRow", "content": [
                    {"type": "tableCell", "content": [paragraph(json!([text("a")]))]},
                    {"type": "tableCell", "content": []}
                ]}
            ]}
        ])
    );
}

#[test]
fn test_nested_list_in_task_becomes_text() {
    let (content, warnings) = import("- [ ] parent\n  - child\n", &ParseContext::default());
    assert_eq!(
        warnings,
        vec!["Line 2: Nested list in task item converted to text".to_string()]
    );
    assert_eq!(
        content,
        json!([
            {"type": "taskList", "attrs": {"localId": ""}, "content": [
                {"type": "taskItem", "attrs": {"localId": "", "state": "TODO"}, "content": [
                    text("parent"),
                    {"type": "hardBreak"},
                    text("child")
                ]}
            ]}
        ])
    );
}

#[test]
fn test_warnings_order_and_dedupe() {
    let source = "Intro **unclosed\n\n![pic](a.png)\n\n![again](b.png)\n\n<div>x</div>\n";
    let (content, warnings) = import(source, &ParseContext::default());

    assert_eq!(
        warnings,
        vec![
            "Line 1: Unclosed bold marker (**) in \"Intro **unclosed\"".to_string(),
            "Unsupported inline markdown: image".to_string(),
            "Unsupported markdown element: html block".to_string(),
        ]
    );
    assert_eq!(content[1], paragraph(json!([text("pic")])));
    assert_eq!(content[3], paragraph(json!([text("<div>x</div>")])));
}

#[test]
fn test_whitespace_only_input() {
    let outcome = parse("  \n\n", &ParseContext::default());
    assert!(outcome.document.is_empty());
    assert!(outcome.warnings.is_empty());
}
