//! ADF → Markdown

use super::{doc, fixture};
use adf_babel::format::Format;
use adf_babel::formats::AdfFormat;
use adf_babel::{render, Document, RenderOptions};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use serde_json::json;

fn md(value: serde_json::Value) -> String {
    render(&doc(value), &RenderOptions::default())
}

fn paragraph(content: serde_json::Value) -> serde_json::Value {
    json!({"type": "doc", "version": 1, "content": [{"type": "paragraph", "content": content}]})
}

#[test]
fn test_release_notes() {
    let source = fixture("release-notes.json");
    let document = AdfFormat.parse(&source).expect("fixture to parse");
    let markdown = render(&document, &RenderOptions::default());

    assert!(markdown.ends_with("---\n"));
    assert_snapshot!(markdown.trim_end(), @r#"
    # Release notes

    Shipped by [@Ada](/jira/people/557058:abc) on `[date]2024-01-15` with status `[status:g]Done`

    **bold** and *italic* with [a link](https://example.com) and `code`

    > [!WARNING]
    > Mind the gap.

    - First
    - Second

    ```sh
    make release
    ```

    ☑ Write docs

    ☐ Announce

    > `[decision:d]Ship on Friday`

    | Area | Owner |
    | --- | --- |
    | API | Ada |

    *(see file "diagram.png" in attachments)*

    ---
    "#);
}

#[test]
fn test_empty_document_renders_nothing() {
    assert_eq!(render(&Document::empty(), &RenderOptions::default()), "");
    assert_eq!(md(json!({"type": "doc", "version": 1, "content": [{"type": "paragraph"}]})), "");
}

#[test]
fn test_mentions_use_base_url() {
    let document = doc(paragraph(json!([
        {"type": "mention", "attrs": {"id": "abc", "text": "Ada"}},
        {"type": "text", "text": " and "},
        {"type": "mention", "attrs": {"id": "def", "text": ""}}
    ])));

    let relative = render(&document, &RenderOptions::default());
    assert_eq!(
        relative,
        "[@Ada](/jira/people/abc) and [@def](/jira/people/def)\n"
    );

    let absolute = render(
        &document,
        &RenderOptions::with_base_url("https://h.atlassian.net/"),
    );
    assert_eq!(
        absolute,
        "[@Ada](https://h.atlassian.net/jira/people/abc) and [@def](https://h.atlassian.net/jira/people/def)\n"
    );
}

#[test]
fn test_mention_without_id_is_plain_text() {
    let markdown = md(paragraph(json!([
        {"type": "mention", "attrs": {"text": "@Ghost"}}
    ])));
    assert_eq!(markdown, "@Ghost\n");
}

#[test]
fn test_marker_fallbacks() {
    let markdown = md(paragraph(json!([
        {"type": "status", "attrs": {"text": "  ", "color": "red"}},
        {"type": "text", "text": " "},
        {"type": "date"},
        {"type": "text", "text": " "},
        {"type": "date", "attrs": {"timestamp": "soon"}}
    ])));
    assert_eq!(
        markdown,
        "`[status:n][no status]` `[date][no date]` `[date][invalid date]`\n"
    );
}

#[test]
fn test_reserved_code_points_are_stripped_from_text() {
    let markdown = md(paragraph(json!([
        {"type": "text", "text": "zero\u{200B}width\u{200E}"}
    ])));
    assert_eq!(markdown, "zerowidth\n");
}

#[test]
fn test_panel_kinds_map_to_alerts() {
    let panel = |kind: &str| {
        json!({"type": "panel", "attrs": {"panelType": kind}, "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": kind}]}
        ]})
    };
    let markdown = md(json!({"type": "doc", "version": 1, "content": [
        panel("info"), panel("success"), panel("note"), panel("error")
    ]}));

    assert_snapshot!(markdown.trim_end(), @r"
    > [!NOTE]
    > info

    > [!TIP]
    > success

    > [!IMPORTANT]
    > note

    > [!CAUTION]
    > error
    ");
}

#[test]
fn test_adjacent_lists_stay_separate() {
    let item = |text: &str| {
        json!({"type": "listItem", "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": text}]}
        ]})
    };
    let markdown = md(json!({"type": "doc", "version": 1, "content": [
        {"type": "orderedList", "attrs": {"order": 3}, "content": [item("three"), item("four")]},
        {"type": "orderedList", "content": [item("one")]},
        {"type": "bulletList", "content": [item("a")]},
        {"type": "bulletList", "content": [item("b")]}
    ]}));

    assert_snapshot!(markdown.trim_end(), @r"
    3. three
    4. four

    1) one

    - a

    * b
    ");
}

#[test]
fn test_nested_task_lists_are_flattened() {
    let markdown = md(json!({"type": "doc", "version": 1, "content": [
        {"type": "taskList", "content": [
            {"type": "taskItem", "attrs": {"state": "TODO"}, "content": [{"type": "text", "text": "parent"}]},
            {"type": "taskList", "content": [
                {"type": "taskItem", "attrs": {"state": "DONE"}, "content": [{"type": "text", "text": "child"}]}
            ]}
        ]}
    ]}));
    assert_eq!(markdown, "☐ parent\n\n☑ child\n");
}

#[test]
fn test_task_lists_keep_glyphs_inside_containers() {
    let tasks = json!({"type": "taskList", "content": [
        {"type": "taskItem", "attrs": {"state": "TODO"}, "content": [{"type": "text", "text": "buy milk"}]},
        {"type": "taskItem", "attrs": {"state": "DONE"}, "content": [{"type": "text", "text": "eggs"}]}
    ]});
    let markdown = md(json!({"type": "doc", "version": 1, "content": [
        {"type": "panel", "attrs": {"panelType": "info"}, "content": [tasks.clone()]},
        {"type": "blockquote", "content": [tasks.clone()]},
        {"type": "bulletList", "content": [{"type": "listItem", "content": [tasks]}]}
    ]}));

    assert_snapshot!(markdown.trim_end(), @r"
    > [!NOTE]
    > ☐ buy milk
    >
    > ☑ eggs

    > ☐ buy milk
    >
    > ☑ eggs

    - ☐ buy milk

      ☑ eggs
    ");
}

#[test]
fn test_single_cell_table() {
    let markdown = md(json!({"type": "doc", "version": 1, "content": [
        {"type": "table", "content": [
            {"type": "tableRow", "content": [
                {"type": "tableHeader", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "Only"}]}
                ]}
            ]}
        ]},
        {"type": "paragraph", "content": [{"type": "text", "text": "After"}]}
    ]}));
    assert_eq!(markdown, "| Only |\n|---|\n\nAfter\n");
}

#[test]
fn test_code_block_trailing_blank_lines_dropped() {
    let markdown = md(json!({"type": "doc", "version": 1, "content": [
        {"type": "codeBlock", "content": [{"type": "text", "text": "x\n\n"}]}
    ]}));
    assert_eq!(markdown, "```\nx\n```\n");
}

#[test]
fn test_unknown_node_keeps_its_content() {
    let markdown = md(json!({"type": "doc", "version": 1, "content": [
        {"type": "expand", "attrs": {"title": "More"}, "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": "Hidden"}]}
        ]}
    ]}));
    assert_eq!(markdown, "Hidden\n");
}
