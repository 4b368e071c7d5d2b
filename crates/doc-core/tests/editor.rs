use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use manos_doc_core::{
    Content, Editor, EditorError, EditorOptions, Extension, HookContext, HookError, Node,
    QueryError, Selection,
};
use serde_json::{Value, json};

struct FailingCreate;

impl Extension for FailingCreate {
    fn name(&self) -> &str {
        "broken"
    }

    fn on_create(&self, _ctx: &HookContext<'_>) -> Result<(), HookError> {
        Err(HookError::new("cannot start"))
    }
}

/// Fails every update; other hooks must still run.
struct FailingUpdate;

impl Extension for FailingUpdate {
    fn name(&self) -> &str {
        "noisy"
    }

    fn on_update(&self, _ctx: &HookContext<'_>) -> Result<(), HookError> {
        Err(HookError::new("update rejected"))
    }
}

struct CountingUpdate {
    count: Arc<AtomicUsize>,
}

impl Extension for CountingUpdate {
    fn name(&self) -> &str {
        "counter"
    }

    fn on_update(&self, _ctx: &HookContext<'_>) -> Result<(), HookError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn failing_on_create_aborts_construction() {
    let err = Editor::new(EditorOptions::new().extension(FailingCreate))
        .err()
        .expect("construction should fail");
    match err {
        EditorError::Construction { extension, source } => {
            assert_eq!(extension, "broken");
            assert_eq!(source.message(), "cannot start");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn options_on_create_sees_initial_content() {
    let seen = Arc::new(Mutex::new(String::new()));
    let sink = seen.clone();
    let editor = Editor::new(
        EditorOptions::new()
            .content("<p>loaded</p>")
            .on_create(move |ctx| {
                *sink.lock().unwrap() = ctx.state.doc().text_content();
                Ok(())
            }),
    )
    .unwrap();
    assert_eq!(*seen.lock().unwrap(), "loaded");
    assert_eq!(editor.get_text(), "loaded");

    let err = Editor::new(EditorOptions::new().on_create(|_| Err(HookError::new("nope"))))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        EditorError::Construction { ref extension, .. } if extension == "editor"
    ));
}

#[test]
fn update_hooks_run_after_state_replacement_and_survive_failures() {
    let count = Arc::new(AtomicUsize::new(0));
    let texts = Arc::new(Mutex::new(Vec::new()));
    let sink = texts.clone();
    let mut editor = Editor::new(
        EditorOptions::new()
            .content("<p>a</p>")
            .extension(FailingUpdate)
            .extension(CountingUpdate { count: count.clone() })
            .on_update(move |ctx| {
                sink.lock().unwrap().push(ctx.state.doc().text_content());
                Ok(())
            }),
    )
    .unwrap();

    editor.run_command("core.set_text_selection", json!(2));
    assert_eq!(count.load(Ordering::SeqCst), 0, "selection changes are not updates");

    assert!(editor.run_command("core.insert_text", json!("b")));
    assert!(editor.set_content("<p>fresh</p>"));
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(*texts.lock().unwrap(), vec!["ab".to_string(), "fresh".to_string()]);
}

#[test]
fn rejected_content_falls_back_to_an_empty_document() {
    let mut editor = Editor::new(EditorOptions::new().content("<p>keep</p>")).unwrap();
    let accepted = editor.set_content(json!({
        "type": "doc",
        "content": [{ "type": "paragraph", "attrs": { "color": "red" } }]
    }));
    assert!(!accepted);
    assert!(editor.is_empty());
    assert_eq!(editor.get_html(), "<p></p>");

    let bare = Content::Json(json!({ "type": "paragraph" }));
    let editor = Editor::new(EditorOptions::new().content(bare)).unwrap();
    assert!(editor.is_empty());
}

#[test]
fn content_from_value_dispatches_on_shape() {
    assert!(matches!(Content::from_value(json!("<p>x</p>")).unwrap(), Content::Html(_)));
    assert!(matches!(
        Content::from_value(json!([{ "type": "paragraph", "children": [{ "text": "x" }] }]))
            .unwrap(),
        Content::Legacy(_)
    ));
    assert!(matches!(
        Content::from_value(json!({ "type": "doc", "content": [] })).unwrap(),
        Content::Json(_)
    ));
}

#[test]
fn legacy_content_loads_and_exports() -> anyhow::Result<()> {
    let mut editor = Editor::new(EditorOptions::new())?;
    editor.set_legacy_json(
        r#"[{"type":"heading","level":2,"children":[{"text":"Plan","bold":true}]}]"#,
    )?;
    assert_eq!(editor.get_html(), "<h2><strong>Plan</strong></h2>");

    let legacy = editor.to_legacy();
    assert_eq!(
        serde_json::to_value(&legacy)?,
        json!([{ "type": "heading", "level": 2, "children": [{ "text": "Plan", "bold": true }] }])
    );

    let err = editor.set_legacy_json("{not json").unwrap_err();
    assert!(matches!(err, EditorError::Decode(_)));
    assert_eq!(editor.get_text(), "Plan");
    Ok(())
}

#[test]
fn get_text_separates_blocks_and_breaks() {
    let editor = Editor::new(EditorOptions::new().content(
        "<h1>Title</h1><p>line one<br>line two</p><ul><li><p>item</p></li></ul><hr>",
    ))
    .unwrap();
    assert_eq!(editor.get_text(), "Title\n\nline one\nline two\n\nitem");
}

#[test]
fn get_json_matches_the_tree() -> anyhow::Result<()> {
    let editor = Editor::new(EditorOptions::new().content("<p>Hi <em>there</em></p>"))?;
    let doc: Node = serde_json::from_value(editor.get_json())?;
    assert_eq!(&doc, editor.doc());
    Ok(())
}

#[test]
fn focus_hooks_fire_on_transitions_only() {
    let focus = Arc::new(AtomicUsize::new(0));
    let blur = Arc::new(AtomicUsize::new(0));
    let (f, b) = (focus.clone(), blur.clone());
    let mut editor = Editor::new(
        EditorOptions::new()
            .on_focus(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on_blur(move |_| {
                b.fetch_add(1, Ordering::SeqCst);
                Err(HookError::new("blur handler broke"))
            }),
    )
    .unwrap();

    editor.focus();
    editor.focus();
    assert!(editor.is_focused());
    editor.blur();
    assert!(!editor.is_focused());
    assert_eq!(focus.load(Ordering::SeqCst), 1);
    assert_eq!(blur.load(Ordering::SeqCst), 1);
}

#[test]
fn autofocus_and_editable_flags() {
    let mut editor = Editor::new(EditorOptions::new().autofocus(true).editable(false)).unwrap();
    assert!(editor.is_focused());
    assert!(!editor.is_editable());
    editor.set_editable(true);
    assert!(editor.is_editable());
}

#[test]
fn queries_report_unknown_ids_and_decode_errors() {
    let editor = Editor::new(EditorOptions::new()).unwrap();
    assert!(matches!(
        editor.query::<bool>("missing.query", Value::Null),
        Err(QueryError::Unknown(id)) if id == "missing.query"
    ));
    assert!(matches!(
        editor.query::<u64>("block.active_type", Value::Null),
        Err(QueryError::Decode(_))
    ));
}

#[test]
fn new_state_starts_with_cursor_in_first_textblock() {
    let editor =
        Editor::new(EditorOptions::new().content("<blockquote><p>x</p></blockquote>")).unwrap();
    assert_eq!(editor.selection(), Selection::cursor(2));
}

#[test]
fn read_only_editors_refuse_document_changes() -> anyhow::Result<()> {
    let mut editor = Editor::new(EditorOptions::new().content("<p>fixed</p>").editable(false))?;

    assert!(!editor.can().command("core.insert_text", json!("x")).run());
    assert!(!editor.run_command("core.insert_text", json!("x")));
    assert!(!editor.chain().then("core.select_all").then("marks.toggle_bold").run());
    assert_eq!(editor.get_html(), "<p>fixed</p>");
    assert!(editor.run_command("core.set_text_selection", json!(3)));
    assert_eq!(editor.selection(), Selection::cursor(3));

    editor.set_editable(true);
    assert!(editor.run_command("core.insert_text", json!("x")));
    assert_eq!(editor.get_text(), "fixxed");
    Ok(())
}
