//! render → parse → render stability

use super::{doc, fixture};
use adf_babel::format::Format;
use adf_babel::formats::AdfFormat;
use adf_babel::adf::{PanelKind, StatusColor};
use adf_babel::{parse, render, Document, Mark, Node, ParseContext, RenderOptions};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn rerender(markdown: &str) -> String {
    let outcome = parse(markdown, &ParseContext::default());
    render(&outcome.document, &RenderOptions::default())
}

#[test]
fn test_release_notes_render_is_stable() {
    let document = AdfFormat
        .parse(&fixture("release-notes.json"))
        .expect("fixture to parse");
    let first = render(&document, &RenderOptions::default());

    let outcome = parse(&first, &ParseContext::default());
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(render(&outcome.document, &RenderOptions::default()), first);
}

#[test]
fn test_handwritten_markdown_settles_after_one_pass() {
    let source = "Intro text with a_b and 2 * 3\n\
                  * one\n\
                  * two\n\
                  \n\
                  1) first\n\
                  \n\
                  > quoted **bold ** text\n\
                  \n\
                  | only |\n\
                  \n\
                  - [ ] todo\n\
                  - [x] done\n";
    let first = rerender(source);
    assert_eq!(rerender(&first), first);
}

#[test]
fn test_structure_survives() {
    let document = doc(json!({"type": "doc", "version": 1, "content": [
        {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Intro"}]},
        {"type": "paragraph", "content": [
            {"type": "text", "text": "strong", "marks": [{"type": "strong"}]},
            {"type": "text", "text": " "},
            {"type": "text", "text": "em", "marks": [{"type": "em"}]},
            {"type": "text", "text": " "},
            {"type": "text", "text": "gone", "marks": [{"type": "strike"}]},
            {"type": "text", "text": " "},
            {"type": "text", "text": "site", "marks": [{"type": "link", "attrs": {"href": "https://example.com/a"}}]},
            {"type": "text", "text": " "},
            {"type": "text", "text": "x = 1", "marks": [{"type": "code"}]}
        ]},
        {"type": "orderedList", "attrs": {"order": 1}, "content": [
            {"type": "listItem", "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "step"}]}
            ]}
        ]},
        {"type": "blockquote", "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": "said"}]}
        ]},
        {"type": "codeBlock", "attrs": {"language": "rust"}, "content": [
            {"type": "text", "text": "fn main() {}"}
        ]},
        {"type": "panel", "attrs": {"panelType": "info"}, "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": "note"}]}
        ]},
        {"type": "rule"}
    ]}));

    let markdown = render(&document, &RenderOptions::default());
    let outcome = parse(&markdown, &ParseContext::default());
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(outcome.document, document);
}

#[test]
fn test_statuses_and_dates_survive() {
    let document = doc(json!({"type": "doc", "version": 1, "content": [
        {"type": "paragraph", "content": [
            {"type": "status", "attrs": {"text": "At risk", "color": "red"}},
            {"type": "text", "text": " due "},
            {"type": "date", "attrs": {"timestamp": "1705276800000"}}
        ]}
    ]}));
    let markdown = render(&document, &RenderOptions::default());
    assert_eq!(markdown, "`[status:r]At risk` due `[date]2024-01-15`\n");
    assert_eq!(parse(&markdown, &ParseContext::default()).document, document);
}

#[test]
fn test_single_cell_table_stays_a_table() {
    let document = doc(json!({"type": "doc", "version": 1, "content": [
        {"type": "table", "content": [
            {"type": "tableRow", "content": [
                {"type": "tableHeader", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "A"}]}
                ]}
            ]}
        ]}
    ]}));
    let markdown = render(&document, &RenderOptions::default());
    assert_eq!(markdown, "| A |\n|---|\n");
    assert_eq!(parse(&markdown, &ParseContext::default()).document, document);
}

#[test]
fn test_every_panel_kind_survives() {
    for kind in ["info", "success", "note", "warning", "error"] {
        let document = doc(json!({"type": "doc", "version": 1, "content": [
            {"type": "panel", "attrs": {"panelType": kind}, "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "body"}]}
            ]}
        ]}));
        let markdown = render(&document, &RenderOptions::default());
        assert_eq!(markdown.matches("[!").count(), 1, "{markdown}");
        assert_eq!(parse(&markdown, &ParseContext::default()).document, document);
    }
}

#[test]
fn test_task_lists_inside_containers_survive() {
    let tasks = json!({"type": "taskList", "content": [
        {"type": "taskItem", "attrs": {"state": "TODO"}, "content": [{"type": "text", "text": "buy milk"}]},
        {"type": "taskItem", "attrs": {"state": "DONE"}, "content": [{"type": "text", "text": "eggs"}]}
    ]});
    let document = doc(json!({"type": "doc", "version": 1, "content": [
        {"type": "panel", "attrs": {"panelType": "warning"}, "content": [tasks.clone()]},
        {"type": "bulletList", "content": [{"type": "listItem", "content": [tasks]}]}
    ]}));

    let markdown = render(&document, &RenderOptions::default());
    assert!(!markdown.contains("[ ]"), "{markdown}");
    let outcome = parse(&markdown, &ParseContext::default());
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(outcome.document, document);
}

#[test]
fn test_emphasis_next_to_punctuation_survives() {
    let cases = [
        (
            json!([
                {"type": "text", "text": "x"},
                {"type": "text", "text": "a.", "marks": [{"type": "em"}]},
                {"type": "text", "text": "b"}
            ]),
            "x*a*.b\n",
        ),
        (
            json!([
                {"type": "text", "text": "x"},
                {"type": "text", "text": "(a)", "marks": [{"type": "strong"}]},
                {"type": "text", "text": "y"}
            ]),
            "x(**a**)y\n",
        ),
        (
            json!([
                {"type": "text", "text": "no"},
                {"type": "text", "text": "\"way\"", "marks": [{"type": "strike"}]},
                {"type": "text", "text": "out"}
            ]),
            "no\"~~way~~\"out\n",
        ),
    ];
    for (content, expected) in cases {
        let document = doc(json!({"type": "doc", "version": 1, "content": [
            {"type": "paragraph", "content": content}
        ]}));
        let first = render(&document, &RenderOptions::default());
        assert_eq!(first, expected);
        assert_eq!(rerender(&first), first);
    }
}

#[test]
fn test_status_ending_in_backtick_survives() {
    let document = doc(json!({"type": "doc", "version": 1, "content": [
        {"type": "paragraph", "content": [
            {"type": "status", "attrs": {"text": "ab`", "color": "green"}}
        ]}
    ]}));
    let markdown = render(&document, &RenderOptions::default());
    assert_eq!(markdown, "`` [status:g]ab` ``\n");
    assert_eq!(parse(&markdown, &ParseContext::default()).document, document);
}

#[test]
fn test_quote_of_literal_alert_marker_stays_a_quote() {
    let document = doc(json!({"type": "doc", "version": 1, "content": [
        {"type": "blockquote", "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": "[!NOTE]"}]},
            {"type": "paragraph", "content": [{"type": "text", "text": "not a panel"}]}
        ]}
    ]}));
    let markdown = render(&document, &RenderOptions::default());
    assert_eq!(markdown, "> \\[!NOTE\\]\n>\n> not a panel\n");
    assert_eq!(parse(&markdown, &ParseContext::default()).document, document);
}

#[test]
fn test_panel_opening_with_a_list_survives() {
    let item = |text: &str| {
        json!({"type": "listItem", "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": text}]}
        ]})
    };
    let document = doc(json!({"type": "doc", "version": 1, "content": [
        {"type": "panel", "attrs": {"panelType": "note"}, "content": [
            {"type": "orderedList", "attrs": {"order": 4}, "content": [item("four")]}
        ]},
        {"type": "panel", "attrs": {"panelType": "error"}, "content": [{"type": "rule"}]},
        {"type": "blockquote", "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": "INFO", "marks": [{"type": "strong"}]}]}
        ]}
    ]}));
    let markdown = render(&document, &RenderOptions::default());
    assert_eq!(
        markdown,
        "> [!IMPORTANT]\n>\n> 4. four\n\n> [!CAUTION]\n>\n> ---\n\n> **INFO**\n"
    );
    assert_eq!(parse(&markdown, &ParseContext::default()).document, document);
}

#[test]
fn test_adjacent_code_spans_survive() {
    let first = rerender("`a` `[status:r]Late` `[date]2024-03-01`\n");
    assert_eq!(first, "`a` `[status:r]Late` `[date]2024-03-01`\n");
    let document = doc(json!({"type": "doc", "version": 1, "content": [
        {"type": "paragraph", "content": [
            {"type": "text", "text": "a", "marks": [{"type": "code"}]},
            {"type": "status", "attrs": {"text": "Late", "color": "red"}}
        ]}
    ]}));
    let markdown = render(&document, &RenderOptions::default());
    assert_eq!(rerender(&markdown), markdown);
}

const PUNCTUATION_BEFORE: &[&str] = &["", "", "(", "\"", "'"];
const PUNCTUATION_AFTER: &[&str] = &["", "", ".", ",", ";", ":", "!", "?", ")", "\"", "'", "-"];

fn word() -> impl Strategy<Value = Node> {
    (
        prop::sample::select(PUNCTUATION_BEFORE),
        "[a-z]{1,6}",
        prop::sample::select(PUNCTUATION_AFTER),
        0..5u8,
    )
        .prop_map(|(before, word, after, mark)| {
            let marks = match mark {
                1 => vec![Mark::Strong],
                2 => vec![Mark::Em],
                3 => vec![Mark::Strike],
                4 => vec![Mark::Code],
                _ => Vec::new(),
            };
            Node::marked(format!("{before}{word}{after}"), marks)
        })
}

fn atom() -> impl Strategy<Value = Node> {
    let colors = prop::sample::select(vec![
        StatusColor::Neutral,
        StatusColor::Red,
        StatusColor::Blue,
        StatusColor::Green,
        StatusColor::Yellow,
        StatusColor::Purple,
        StatusColor::Teal,
    ]);
    prop_oneof![
        6 => word(),
        1 => (colors, "[A-Za-z]{1,8}").prop_map(|(color, text)| Node::Status { color, text }),
        1 => (0..20_000u64).prop_map(|days| Node::Date {
            timestamp: Some((days * 86_400_000).to_string()),
        }),
        1 => ("[a-z0-9]{4,10}", "[A-Z][a-z]{1,6}")
            .prop_map(|(id, text)| Node::Mention { id, text }),
    ]
}

/// Inline runs; neighbours are joined by a space or written back to back.
fn inlines() -> BoxedStrategy<Vec<Node>> {
    prop::collection::vec((atom(), any::<bool>()), 1..5)
        .prop_map(|atoms| {
            let mut out = Vec::new();
            for (i, (atom, spaced)) in atoms.into_iter().enumerate() {
                if i > 0 && spaced {
                    out.push(Node::text(" "));
                }
                out.push(atom);
            }
            out
        })
        .boxed()
}

fn task_list() -> impl Strategy<Value = Node> {
    prop::collection::vec((any::<bool>(), inlines()), 1..4).prop_map(|items| Node::TaskList {
        content: items
            .into_iter()
            .map(|(checked, content)| Node::TaskItem { checked, content })
            .collect(),
    })
}

fn list_of(item: BoxedStrategy<Node>) -> impl Strategy<Value = Node> {
    prop_oneof![
        prop::collection::vec(item.clone(), 1..4).prop_map(|content| Node::BulletList { content }),
        (1..20u32, prop::collection::vec(item, 1..4)).prop_map(|(order, content)| {
            Node::OrderedList {
                order: Some(order),
                content,
            }
        }),
    ]
}

/// Blocks that can sit inside any container.
fn leaf() -> BoxedStrategy<Node> {
    let item = inlines()
        .prop_map(|content| Node::ListItem {
            content: vec![Node::paragraph(content)],
        })
        .boxed();
    prop_oneof![
        3 => inlines().prop_map(Node::paragraph),
        1 => list_of(item),
        1 => task_list(),
    ]
    .boxed()
}

fn table() -> impl Strategy<Value = Node> {
    (1..4usize, 1..3usize)
        .prop_flat_map(|(columns, rows)| {
            prop::collection::vec(prop::collection::vec(inlines(), columns), rows)
        })
        .prop_map(|rows| Node::Table {
            content: rows
                .into_iter()
                .enumerate()
                .map(|(i, cells)| Node::TableRow {
                    content: cells
                        .into_iter()
                        .map(|cell| {
                            let content = vec![Node::paragraph(cell)];
                            if i == 0 {
                                Node::TableHeader { content }
                            } else {
                                Node::TableCell { content }
                            }
                        })
                        .collect(),
                })
                .collect(),
        })
}

fn block() -> impl Strategy<Value = Node> {
    let kinds = prop::sample::select(vec![
        PanelKind::Info,
        PanelKind::Success,
        PanelKind::Note,
        PanelKind::Warning,
        PanelKind::Error,
    ]);
    let nested_item = prop_oneof![
        task_list().prop_map(|tasks| vec![tasks]),
        (inlines(), task_list()).prop_map(|(content, tasks)| vec![Node::paragraph(content), tasks]),
        (inlines(), leaf()).prop_map(|(content, inner)| vec![Node::paragraph(content), inner]),
    ]
    .prop_map(|content| Node::ListItem { content })
    .boxed();
    prop_oneof![
        4 => leaf(),
        1 => (1..=6u8, inlines()).prop_map(|(level, content)| Node::Heading { level, content }),
        1 => (kinds, prop::collection::vec(leaf(), 1..3))
            .prop_map(|(kind, content)| Node::Panel { kind, content }),
        1 => prop::collection::vec(leaf(), 1..3).prop_map(|content| Node::Blockquote { content }),
        1 => list_of(nested_item),
        1 => table(),
        1 => Just(Node::Rule),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn rendering_is_a_fixed_point(blocks in prop::collection::vec(block(), 1..6)) {
        let first = render(&Document::new(blocks), &RenderOptions::default());
        let outcome = parse(&first, &ParseContext::default());
        prop_assert!(outcome.warnings.is_empty(), "{:?}\n{}", outcome.warnings, first);
        prop_assert_eq!(render(&outcome.document, &RenderOptions::default()), first);
    }
}
