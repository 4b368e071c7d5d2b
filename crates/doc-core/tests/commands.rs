use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use manos_doc_core::{
    CommandSpec, Editor, EditorOptions, Extension, Node, Selection, Transaction,
};
use serde_json::{Value, json};

/// Three commands: `test.a` succeeds, `test.b` fails, `test.c` counts calls.
struct Probe {
    calls: Arc<AtomicUsize>,
}

impl Extension for Probe {
    fn name(&self) -> &str {
        "probe"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let calls = self.calls.clone();
        vec![
            CommandSpec::new("test.a", "A", |ctx, _args| {
                let doc = Node::doc(vec![Node::paragraph("changed by a")]);
                ctx.dispatch(Transaction::new().doc(doc).source("command:test.a"));
                true
            }),
            CommandSpec::new("test.b", "B", |_ctx, _args| false),
            CommandSpec::new("test.c", "C", move |_ctx, _args| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ]
    }
}

fn editor_with(html: &str) -> Editor {
    Editor::new(EditorOptions::new().content(html)).unwrap()
}

fn select(editor: &mut Editor, from: usize, to: usize) {
    assert!(editor.run_command("core.set_text_selection", json!({ "from": from, "to": to })));
}

fn first_block(editor: &Editor) -> &Node {
    editor.doc().child(0).unwrap()
}

#[test]
fn chain_short_circuits_after_first_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let options = EditorOptions::new().extension(Probe {
        calls: calls.clone(),
    });
    let mut editor = Editor::new(options).unwrap();

    let ok = editor.chain().then("test.a").then("test.b").then("test.c").run();
    assert!(!ok);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Steps before the failure are not rolled back.
    assert_eq!(editor.get_text(), "changed by a");

    assert!(editor.chain().then("test.c").then("test.c").run());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn unknown_commands_fail_the_chain() {
    let mut editor = editor_with("<p>text</p>");
    assert!(!editor.run_command("does.not_exist", Value::Null));
    assert!(!editor.chain().then("core.select_all").then("nope").run());
}

#[test]
fn can_reports_without_committing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let editor = Editor::new(
        EditorOptions::new()
            .content("<p>Hello</p>")
            .extension(Probe { calls: calls.clone() }),
    )
    .unwrap();
    let before = editor.doc().clone();

    assert!(editor.can().then("test.a").run());
    assert!(!editor.can().then("test.b").then("test.c").run());
    assert!(editor.can().command("block.set_heading", json!({ "level": 2 })).run());
    assert_eq!(editor.doc(), &before);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn later_chain_steps_see_earlier_changes() {
    let mut editor = editor_with("<p>Hello world</p>");
    let ok = editor
        .chain()
        .command("core.set_text_selection", json!({ "from": 1, "to": 6 }))
        .then("marks.toggle_bold")
        .command("core.set_text_selection", json!(12))
        .command("core.insert_text", json!({ "text": "!" }))
        .run();
    assert!(ok);
    assert_eq!(
        editor.get_json(),
        json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [
                    { "type": "text", "text": "Hello", "marks": [{ "type": "bold" }] },
                    { "type": "text", "text": " world!" }
                ]
            }]
        })
    );
}

#[test]
fn toggling_marks_adds_then_removes() {
    let mut editor = editor_with("<p>Hello world</p>");
    select(&mut editor, 1, 6);

    assert!(editor.run_command("marks.toggle_italic", Value::Null));
    assert!(editor.query::<bool>("marks.is_active", json!({ "type": "italic" })).unwrap());
    assert_eq!(editor.get_html(), "<p><em>Hello</em> world</p>");

    assert!(editor.run_command("marks.toggle_italic", Value::Null));
    assert!(!editor.query::<bool>("marks.is_active", json!("italic")).unwrap());
    assert_eq!(editor.get_html(), "<p>Hello world</p>");
}

#[test]
fn mark_commands_fail_on_a_collapsed_selection() {
    let mut editor = editor_with("<p>Hello</p>");
    editor.run_command("core.set_text_selection", json!(3));
    assert!(!editor.run_command("marks.toggle_bold", Value::Null));
    assert!(!editor.run_command("marks.set", json!({ "type": "bold" })));
    assert!(!editor.run_command("marks.unset", json!({ "type": "bold" })));
}

#[test]
fn code_mark_replaces_and_blocks_other_marks() {
    let mut editor = editor_with("<p><strong>bold</strong></p>");
    select(&mut editor, 1, 5);

    assert!(editor.run_command("marks.toggle_code", Value::Null));
    assert_eq!(editor.get_html(), "<p><code>bold</code></p>");
    assert!(!editor.run_command("marks.toggle_bold", Value::Null));
}

#[test]
fn links_are_set_and_removed() {
    let mut editor = editor_with("<p>docs here</p>");
    select(&mut editor, 1, 5);

    assert!(editor.run_command("marks.set_link", json!({ "href": "https://example.com" })));
    assert_eq!(
        editor.get_html(),
        r#"<p><a href="https://example.com" rel="noopener noreferrer nofollow">docs</a> here</p>"#
    );
    assert!(editor.run_command("marks.unset_link", Value::Null));
    assert_eq!(editor.get_html(), "<p>docs here</p>");
}

#[test]
fn heading_commands_and_level_query() {
    let mut editor = editor_with("<p>Title</p>");
    assert_eq!(editor.query::<Option<u64>>("block.heading_level", Value::Null).unwrap(), None);

    assert!(editor.run_command("block.set_heading", json!({ "level": 2 })));
    assert_eq!(editor.get_html(), "<h2>Title</h2>");
    assert_eq!(editor.query::<Option<u64>>("block.heading_level", Value::Null).unwrap(), Some(2));

    assert!(editor.run_command("block.toggle_heading", json!({ "level": 2 })));
    assert_eq!(editor.get_html(), "<p>Title</p>");
    assert_eq!(editor.query::<String>("block.active_type", Value::Null).unwrap(), "paragraph");
}

#[test]
fn block_ids_and_alignment_survive_block_type_changes() {
    let mut editor = editor_with("<p>Intro</p>");
    assert!(editor.run_command("block.set_block_id", json!({ "id": "intro" })));
    assert!(editor.run_command("block.set_text_align", json!({ "align": "center" })));
    assert!(!editor.run_command("block.set_text_align", json!({ "align": "diagonal" })));

    assert!(editor.run_command("block.set_heading", json!({ "level": 1 })));
    assert_eq!(
        editor.get_html(),
        r#"<h1 id="intro" data-block-id="intro" style="text-align:center">Intro</h1>"#
    );

    assert!(editor.run_command("block.unset_text_align", Value::Null));
    assert_eq!(first_block(&editor).attr("textAlign"), None);
}

#[test]
fn code_block_toggle_flattens_marks_and_records_language() {
    let mut editor = editor_with("<p><strong>let</strong> x = 1;</p>");
    assert!(!editor.query::<bool>("code_block.is_active", Value::Null).unwrap());

    assert!(editor.run_command("code_block.toggle", json!({ "language": "rust" })));
    assert!(editor.query::<bool>("code_block.is_active", Value::Null).unwrap());
    let block = first_block(&editor);
    assert_eq!(block.kind(), "codeBlock");
    assert_eq!(block.attr("language"), Some(&json!("rust")));
    assert_eq!(block.text_content(), "let x = 1;");
    assert!(block.content().iter().all(|n| n.as_text().is_some_and(|t| t.marks.is_empty())));

    assert!(editor.run_command("code_block.set_language", json!({ "language": "python" })));
    assert_eq!(first_block(&editor).attr("language"), Some(&json!("python")));

    assert!(editor.run_command("code_block.toggle", Value::Null));
    assert_eq!(first_block(&editor).kind(), "paragraph");
    assert_eq!(first_block(&editor).attr("language"), None);
}

#[test]
fn bullet_list_wraps_converts_and_unwraps() {
    let mut editor = editor_with("<p>one</p><p>two</p>");
    assert!(editor.run_command("core.select_all", Value::Null));

    assert!(editor.run_command("list.toggle_bullet", Value::Null));
    assert_eq!(
        editor.get_html(),
        "<ul><li><p>one</p></li><li><p>two</p></li></ul>"
    );

    assert!(editor.run_command("list.toggle_ordered", Value::Null));
    assert_eq!(editor.doc().child(0).unwrap().kind(), "orderedList");

    assert!(editor.run_command("list.toggle_ordered", Value::Null));
    assert_eq!(editor.get_html(), "<p>one</p><p>two</p>");
}

#[test]
fn blockquote_toggle_round_trips() {
    let mut editor = editor_with("<p>quoted</p>");
    assert!(editor.run_command("blockquote.toggle", Value::Null));
    assert_eq!(editor.get_html(), "<blockquote><p>quoted</p></blockquote>");
    assert!(editor.run_command("blockquote.toggle", Value::Null));
    assert_eq!(editor.get_html(), "<p>quoted</p>");
}

#[test]
fn callout_set_wraps_then_changes_variant() {
    let mut editor = editor_with("<p>careful</p>");
    assert_eq!(editor.query::<Option<String>>("callout.variant", Value::Null).unwrap(), None);

    assert!(editor.run_command("callout.set", json!({ "variant": "warning" })));
    assert_eq!(editor.doc().child(0).unwrap().kind(), "callout");
    assert_eq!(
        editor.query::<Option<String>>("callout.variant", Value::Null).unwrap(),
        Some("warning".to_string())
    );

    assert!(editor.run_command("callout.set", json!({ "variant": "success" })));
    assert_eq!(editor.doc().content().len(), 1);
    assert_eq!(editor.doc().child(0).unwrap().attr("variant"), Some(&json!("success")));

    assert!(!editor.run_command("callout.set", json!({ "variant": "purple" })));

    assert!(editor.run_command("callout.unset", Value::Null));
    assert_eq!(editor.get_html(), "<p>careful</p>");
    assert!(!editor.run_command("callout.unset", Value::Null));
}

#[test]
fn split_block_moves_the_tail_into_a_new_block() {
    let mut editor = editor_with("<p>Hello world</p>");
    assert!(editor.run_command("block.set_block_id", json!("greeting")));
    editor.run_command("core.set_text_selection", json!(6));

    assert!(editor.run_command("core.split_block", Value::Null));
    assert_eq!(editor.doc().content().len(), 2);
    assert_eq!(editor.doc().child(0).unwrap().text_content(), "Hello");
    assert_eq!(editor.doc().child(1).unwrap().text_content(), " world");
    assert_eq!(editor.doc().child(1).unwrap().attr("blockId"), None);
    assert_eq!(editor.selection(), Selection::cursor(8));
}

#[test]
fn split_at_end_of_heading_continues_with_paragraph() {
    let mut editor = editor_with("<h2>Title</h2>");
    editor.run_command("core.set_text_selection", json!(6));
    assert!(editor.run_command("core.split_block", Value::Null));
    assert_eq!(editor.get_html(), "<h2>Title</h2><p></p>");
}

#[test]
fn insert_text_replaces_the_selection() {
    let mut editor = editor_with("<p>Hello world</p>");
    select(&mut editor, 7, 12);
    assert!(editor.run_command("core.insert_text", json!({ "text": "there" })));
    assert_eq!(editor.get_text(), "Hello there");
    assert_eq!(editor.selection(), Selection::cursor(12));

    assert!(!editor.run_command("core.insert_text", json!({ "text": "" })));
}

#[test]
fn delete_selection_needs_a_range() {
    let mut editor = editor_with("<p>Hello world</p>");
    editor.run_command("core.set_text_selection", json!(3));
    assert!(!editor.run_command("core.delete_selection", Value::Null));

    select(&mut editor, 6, 12);
    assert!(editor.run_command("core.delete_selection", Value::Null));
    assert_eq!(editor.get_text(), "Hello");
}

#[test]
fn hard_break_insert_and_plain_text() {
    let mut editor = editor_with("<p>ab</p>");
    editor.run_command("core.set_text_selection", json!(2));
    assert!(editor.run_command("hard_break.insert", Value::Null));
    assert_eq!(editor.get_html(), "<p>a<br>b</p>");
    assert_eq!(editor.get_text(), "a\nb");
}

#[test]
fn insert_blocks_after_the_current_block() {
    let mut editor = editor_with("<p>before</p><p>after</p>");

    assert!(editor.run_command("divider.insert", Value::Null));
    assert!(editor.run_command("image.insert", json!({ "src": "/a.png", "alt": "A" })));
    let kinds: Vec<&str> = editor.doc().content().iter().map(|n| n.kind()).collect();
    assert_eq!(kinds, vec!["paragraph", "image", "horizontalRule", "paragraph"]);

    assert!(!editor.run_command("image.insert", json!({ "alt": "no source" })));
}

#[test]
fn columns_insert_clamps_the_count() {
    let mut editor = editor_with("<p>x</p>");
    assert!(editor.run_command("columns.insert", json!({ "count": 9, "layout": "1:1:1:1" })));
    let columns = editor.doc().child(1).unwrap();
    assert_eq!(columns.kind(), "columns");
    assert_eq!(columns.content().len(), 4);
    assert_eq!(columns.attr("layout"), Some(&json!("1:1:1:1")));
    assert!(editor.schema().validate_content(editor.doc()).is_ok());
}

#[test]
fn insert_content_accepts_nodes_and_markup() {
    let mut editor = editor_with("<p>start</p>");
    assert!(editor.run_command(
        "core.insert_content",
        json!({ "type": "heading", "attrs": { "level": 3 }, "content": [{ "type": "text", "text": "Inserted" }] })
    ));
    assert_eq!(editor.get_html(), "<p>start</p><h3>Inserted</h3>");

    editor.run_command("core.set_text_selection", json!(6));
    assert!(editor.run_command("core.insert_content", json!({ "content": "<strong>!</strong>" })));
    assert_eq!(editor.get_html(), "<p>start<strong>!</strong></p><h3>Inserted</h3>");

    assert!(!editor.run_command("core.insert_content", json!({ "type": "marquee" })));
}

#[test]
fn set_node_rejects_non_textblocks() {
    let mut editor = editor_with("<p>x</p>");
    assert!(!editor.run_command("core.set_node", json!({ "type": "bulletList" })));
    assert!(editor.run_command(
        "core.set_node",
        json!({ "type": "heading", "attrs": { "level": 4 } })
    ));
    assert_eq!(editor.get_html(), "<h4>x</h4>");
}

#[test]
fn update_attributes_ignores_undeclared_keys() {
    let mut editor = editor_with("<ol><li><p>one</p></li></ol>");
    assert!(!editor.run_command(
        "core.update_attributes",
        json!({ "type": "orderedList", "attrs": { "color": "red" } })
    ));
    assert!(editor.run_command(
        "core.update_attributes",
        json!({ "type": "orderedList", "attrs": { "start": 5 } })
    ));
    assert_eq!(editor.doc().child(0).unwrap().attr("start"), Some(&json!(5)));
}

#[test]
fn set_and_clear_content_commands() {
    let mut editor = editor_with("<p>old</p>");
    assert!(editor.run_command("core.set_content", json!({ "content": "<h1>new</h1>" })));
    assert_eq!(editor.get_html(), "<h1>new</h1>");

    let before = editor.doc().clone();
    assert!(!editor.run_command(
        "core.set_content",
        json!({ "type": "doc", "content": [{ "type": "marquee" }] })
    ));
    assert_eq!(editor.doc(), &before);

    assert!(editor.run_command("core.clear_content", Value::Null));
    assert!(editor.is_empty());
}

#[test]
fn edits_share_untouched_subtrees() {
    let mut editor = editor_with("<p>one</p><p>two</p>");
    let before = editor.doc().clone();
    editor.run_command("core.set_text_selection", json!(2));
    assert!(editor.run_command("core.insert_text", json!("x")));

    assert!(!Arc::ptr_eq(&before.content()[0], &editor.doc().content()[0]));
    assert!(Arc::ptr_eq(&before.content()[1], &editor.doc().content()[1]));
    assert_eq!(before.child(0).unwrap().text_content(), "one");
}

#[test]
fn focus_and_blur_commands_update_focus() {
    let mut editor = editor_with("<p>abc</p>");
    assert!(!editor.is_focused());
    assert!(editor.run_command("core.focus", json!("end")));
    assert!(editor.is_focused());
    assert_eq!(editor.selection(), Selection::cursor(4));
    assert!(editor.run_command("core.blur", Value::Null));
    assert!(!editor.is_focused());
}
