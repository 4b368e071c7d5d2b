use manos_doc_core::extensions::{Document, Paragraph, Text, starter_kit};
use manos_doc_core::{
    AttributeSpec, CommandSpec, Editor, EditorOptions, Extension, GlobalAttribute, NodeDefinition,
    QuerySpec, compose, composition_order,
};
use serde_json::{Value, json};

struct Named {
    name: &'static str,
    priority: i32,
}

impl Extension for Named {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let name = self.name;
        vec![CommandSpec::new("demo.who", "Who", move |_ctx, _args| name == "winner")]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        let name = self.name;
        vec![QuerySpec::new("demo.who", move |_state, _args| Value::from(name))]
    }
}

/// Registers `note` after the global attribute targeting it.
struct LateNode;

impl Extension for LateNode {
    fn name(&self) -> &str {
        "note"
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![NodeDefinition::new("note").group("block").content("inline*")]
    }
}

struct Tone;

impl Extension for Tone {
    fn name(&self) -> &str {
        "tone"
    }

    fn global_attributes(&self) -> Vec<GlobalAttribute> {
        vec![GlobalAttribute::new(
            ["note", "paragraph"],
            "tone",
            AttributeSpec::new(json!("neutral")),
        )]
    }
}

fn boxed(extensions: Vec<Box<dyn Extension>>) -> Vec<Box<dyn Extension>> {
    extensions
}

#[test]
fn composition_order_sorts_by_priority_and_keeps_list_order_for_ties() {
    let extensions = boxed(vec![
        Box::new(Named { name: "a", priority: 100 }),
        Box::new(Named { name: "b", priority: 200 }),
        Box::new(Named { name: "c", priority: 100 }),
        Box::new(Named { name: "d", priority: 50 }),
    ]);
    assert_eq!(composition_order(&extensions), vec![1, 0, 2, 3]);
}

#[test]
fn later_commands_and_queries_win() {
    let extensions = boxed(vec![
        Box::new(Named { name: "loser", priority: 100 }),
        Box::new(Named { name: "winner", priority: 100 }),
    ]);
    let composed = compose(&extensions);
    assert_eq!(composed.commands.len(), 1);

    let editor = Editor::new(
        EditorOptions::new().extensions(boxed(vec![
            Box::new(Document),
            Box::new(Text),
            Box::new(Paragraph),
            Box::new(Named { name: "loser", priority: 100 }),
            Box::new(Named { name: "winner", priority: 100 }),
        ])),
    )
    .unwrap();
    assert!(editor.can().then("demo.who").run());
    assert_eq!(editor.query::<String>("demo.who", Value::Null).unwrap(), "winner");
}

#[test]
fn priority_decides_which_command_is_composed_last() {
    let editor = Editor::new(
        EditorOptions::new().extensions(boxed(vec![
            Box::new(Document),
            Box::new(Text),
            Box::new(Paragraph),
            Box::new(Named { name: "winner", priority: 10 }),
            Box::new(Named { name: "loser", priority: 100 }),
        ])),
    )
    .unwrap();
    assert_eq!(editor.query::<String>("demo.who", Value::Null).unwrap(), "winner");
}

#[test]
fn global_attributes_reach_nodes_registered_later() {
    let extensions = boxed(vec![
        Box::new(Document),
        Box::new(Text),
        Box::new(Paragraph),
        Box::new(Tone),
        Box::new(LateNode),
    ]);
    let schema = compose(&extensions).schema;

    for kind in ["note", "paragraph"] {
        let def = schema.node(kind).unwrap();
        assert_eq!(def.attr_default("tone"), json!("neutral"), "{kind}");
    }
    assert!(schema.node("doc").unwrap().attributes.get("tone").is_none());
}

#[test]
fn starter_kit_registers_every_builtin_command() {
    let editor = Editor::new(EditorOptions::new()).unwrap();
    for id in [
        "core.set_content",
        "core.clear_content",
        "core.insert_text",
        "core.insert_content",
        "core.set_text_selection",
        "core.select_all",
        "core.delete_selection",
        "core.split_block",
        "core.set_node",
        "core.update_attributes",
        "core.focus",
        "core.blur",
        "marks.set",
        "marks.unset",
        "marks.toggle",
        "marks.toggle_bold",
        "marks.toggle_italic",
        "marks.toggle_underline",
        "marks.toggle_strike",
        "marks.toggle_code",
        "marks.set_link",
        "marks.unset_link",
        "block.set_paragraph",
        "block.set_heading",
        "block.toggle_heading",
        "block.set_text_align",
        "block.unset_text_align",
        "block.set_block_id",
        "code_block.toggle",
        "code_block.set_language",
        "blockquote.toggle",
        "list.toggle_bullet",
        "list.toggle_ordered",
        "callout.set",
        "callout.unset",
        "columns.insert",
        "image.insert",
        "divider.insert",
        "hard_break.insert",
    ] {
        assert!(editor.has_command(id), "missing command {id}");
    }

    let spec = &editor.commands()["block.set_heading"];
    assert_eq!(spec.label, "Set heading");
    assert!(spec.keywords.iter().any(|k| k == "h2"));
}

#[test]
fn starter_kit_declares_global_attributes() {
    let extensions = starter_kit();
    let schema = compose(&extensions).schema;
    for kind in ["paragraph", "heading", "listItem", "blockquote", "codeBlock", "callout"] {
        assert!(schema.node(kind).unwrap().attributes.contains_key("blockId"), "{kind}");
    }
    for kind in ["paragraph", "heading"] {
        assert!(schema.node(kind).unwrap().attributes.contains_key("textAlign"), "{kind}");
    }
    assert!(!schema.node("image").unwrap().attributes.contains_key("blockId"));
}
