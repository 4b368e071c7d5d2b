use serde_json::Value;

use crate::commands::{CommandContext, CommandSpec, FocusRequest};
use crate::editor::{Content, resolve_content};
use crate::extension::Extension;
use crate::extensions::edit::{
    attrs_arg, insert_blocks, is_inline_content, nodes_from_value, replace_inline, set_block_type,
    split_block, string_arg, text_with_breaks, typing_marks, update_attributes,
};
use crate::markup::parse_fragment;
use crate::node::Node;
use crate::state::{EditorState, Selection, Transaction};

/// Content, selection and block commands every editor carries.
pub struct Editing;

impl Extension for Editing {
    fn name(&self) -> &str {
        "editing"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("core.set_content", "Set content", set_content)
                .description("Replace the document with markup, tree JSON or a legacy document.")
                .keywords(["content", "load", "replace"]),
            CommandSpec::new("core.clear_content", "Clear content", |ctx, _args| {
                let state = EditorState::new(ctx.state().schema().clone(), Node::empty_doc());
                ctx.dispatch(
                    Transaction::new()
                        .doc(state.doc().clone())
                        .selection(state.selection())
                        .source("command:core.clear_content"),
                );
                true
            })
            .description("Replace the document with a single empty paragraph.")
            .keywords(["clear", "empty", "reset"]),
            CommandSpec::new("core.insert_text", "Insert text", |ctx, args| {
                let Some(text) = string_arg(args, "text") else {
                    return false;
                };
                if text.is_empty() {
                    return false;
                }
                let marks = typing_marks(ctx.state());
                replace_inline(ctx, vec![Node::marked_text(text, marks)], "core.insert_text")
            })
            .description("Insert text at the cursor, replacing the selection.")
            .keywords(["type", "text", "insert"]),
            CommandSpec::new("core.insert_content", "Insert content", insert_content)
                .description(
                    "Insert nodes (tree JSON or markup) at the cursor or after the current block.",
                )
                .keywords(["insert", "paste", "content"]),
            CommandSpec::new("core.set_text_selection", "Select", |ctx, args| {
                let Some(selection) = selection_arg(args) else {
                    return false;
                };
                let selection = ctx.state().clamp(selection);
                ctx.dispatch(
                    Transaction::new()
                        .selection(selection)
                        .source("command:core.set_text_selection"),
                );
                true
            })
            .keywords(["select", "cursor"]),
            CommandSpec::new("core.select_all", "Select all", |ctx, _args| {
                let state = ctx.state();
                let selection = Selection::new(state.start_position(), state.end_position());
                ctx.dispatch(
                    Transaction::new()
                        .selection(selection)
                        .source("command:core.select_all"),
                );
                true
            })
            .keywords(["select", "all"]),
            CommandSpec::new("core.delete_selection", "Delete selection", |ctx, _args| {
                if ctx.state().selection().is_collapsed() {
                    return false;
                }
                replace_inline(ctx, Vec::new(), "core.delete_selection")
            })
            .description("Delete the selected text inside one block.")
            .keywords(["delete", "remove", "cut"]),
            CommandSpec::new("core.split_block", "Split block", |ctx, _args| {
                split_block(ctx, "core.split_block")
            })
            .description("Split the current block at the cursor.")
            .keywords(["enter", "split", "new line"]),
            CommandSpec::new("core.set_node", "Set block type", |ctx, args| {
                let Some(kind) = string_arg(args, "type") else {
                    return false;
                };
                let kind = kind.to_string();
                set_block_type(ctx, &kind, attrs_arg(args, "attrs"), "core.set_node")
            })
            .description("Change the type of the selected text blocks.")
            .keywords(["block", "type", "convert"]),
            CommandSpec::new("core.update_attributes", "Update attributes", |ctx, args| {
                let Some(kind) = args.get("type").and_then(|v| v.as_str()) else {
                    return false;
                };
                let kind = kind.to_string();
                update_attributes(ctx, &kind, &attrs_arg(args, "attrs"), "core.update_attributes")
            })
            .description("Merge attributes into the nearest node of a type around the cursor.")
            .keywords(["attributes", "attrs", "update"]),
            CommandSpec::new("core.focus", "Focus", |ctx, args| {
                let state = ctx.state();
                let position = match args {
                    Value::String(s) if s == "start" => Some(state.start_position()),
                    Value::String(s) if s == "end" => Some(state.end_position()),
                    Value::Number(n) => n.as_u64().map(|n| n as usize),
                    _ => None,
                };
                let mut tx = Transaction::new().source("command:core.focus");
                if let Some(pos) = position {
                    tx = tx.selection(state.clamp(Selection::cursor(pos)));
                }
                ctx.dispatch(tx);
                ctx.request_focus(FocusRequest::Focus);
                true
            })
            .keywords(["focus"]),
            CommandSpec::new("core.blur", "Blur", |ctx, _args| {
                ctx.request_focus(FocusRequest::Blur);
                true
            })
            .keywords(["blur", "unfocus"]),
        ]
    }
}

fn set_content(ctx: &mut CommandContext, args: &Value) -> bool {
    let Ok(content) = Content::from_value(content_arg(args).clone()) else {
        return false;
    };
    let schema = ctx.state().schema().clone();
    let Ok(doc) = resolve_content(&schema, content) else {
        return false;
    };
    let state = EditorState::new(schema, doc);
    ctx.dispatch(
        Transaction::new()
            .doc(state.doc().clone())
            .selection(state.selection())
            .source("command:core.set_content"),
    );
    true
}

fn insert_content(ctx: &mut CommandContext, args: &Value) -> bool {
    let content = content_arg(args);
    let schema = ctx.state().schema().clone();
    let nodes = match content {
        Value::String(html) => {
            let nodes = parse_fragment(&schema, html);
            // A single paragraph of markup is pasted inline.
            let single_paragraph =
                matches!(nodes.as_slice(), [only] if only.kind() == crate::node::PARAGRAPH);
            if single_paragraph {
                nodes
                    .iter()
                    .flat_map(|n| n.content().iter().map(|c| c.as_ref().clone()))
                    .collect()
            } else {
                nodes
            }
        }
        other => match nodes_from_value(&schema, other) {
            Some(nodes) => nodes,
            None => return false,
        },
    };
    if nodes.is_empty() {
        return false;
    }

    if is_inline_content(&schema, &nodes) {
        let in_code = crate::extensions::edit::head_block(ctx.state())
            .and_then(|(_, el)| schema.node(&el.kind))
            .is_some_and(|def| def.code);
        let nodes = if in_code {
            let text: String = nodes.iter().map(|n| n.text_content()).collect();
            vec![Node::text(text)]
        } else {
            nodes
                .into_iter()
                .flat_map(|n| match n {
                    Node::Text(t) if t.text.contains('\n') => text_with_breaks(&t.text, t.marks)
                        .into_iter()
                        .map(|n| n.as_ref().clone())
                        .collect(),
                    other => vec![other],
                })
                .collect()
        };
        return replace_inline(ctx, nodes, "core.insert_content");
    }
    insert_blocks(ctx, nodes, "core.insert_content")
}

/// `{"content": ...}` wraps the payload unless the argument is itself a
/// node (which carries `type`).
fn content_arg(args: &Value) -> &Value {
    if args.get("type").is_some() {
        return args;
    }
    args.get("content").unwrap_or(args)
}

/// `{from, to}`, `{anchor, head}` or a single position.
fn selection_arg(args: &Value) -> Option<Selection> {
    let pos = |key: &str| args.get(key).and_then(|v| v.as_u64()).map(|v| v as usize);
    if let Some(n) = args.as_u64() {
        return Some(Selection::cursor(n as usize));
    }
    if let (Some(anchor), Some(head)) = (pos("anchor"), pos("head")) {
        return Some(Selection::new(anchor, head));
    }
    let from = pos("from")?;
    let to = pos("to").unwrap_or(from);
    Some(Selection::new(from, to))
}
