//! Attributes shared by several node types.

use serde_json::Value;

use crate::attrs::{AttributeSpec, Attrs, GlobalAttribute};
use crate::commands::{CommandContext, CommandSpec};
use crate::extension::Extension;
use crate::extensions::edit::{commit_doc, merge_attrs, string_arg};
use crate::node::Node;
use crate::transform::update_at;

pub const BLOCK_ID: &str = "blockId";
pub const TEXT_ALIGN: &str = "textAlign";

pub const BLOCK_ID_TYPES: &[&str] = &[
    "paragraph",
    "heading",
    "listItem",
    "blockquote",
    "codeBlock",
    "callout",
];
pub const TEXT_ALIGN_TYPES: &[&str] = &["paragraph", "heading"];
pub const ALIGNMENTS: &[&str] = &["left", "center", "right", "justify"];

/// Sets (or with `Value::Null` removes) `name` on every selected textblock
/// that declares it.
fn set_block_attr(ctx: &mut CommandContext, name: &str, value: Value, source: &str) -> bool {
    let state = ctx.state();
    let schema = state.schema().clone();
    let mut patch = Attrs::new();
    patch.insert(name.to_string(), value);

    let mut doc = state.doc().clone();
    let mut applied = false;
    for block in state.selected_textblocks() {
        let declared = state
            .node_at(&block.path)
            .and_then(|node| schema.node(node.kind()))
            .is_some_and(|def| def.attributes.contains_key(name));
        if !declared {
            continue;
        }
        update_at(&mut doc, &block.path, |node| {
            if let Node::Element(el) = node {
                merge_attrs(&mut el.attrs, &patch);
            }
        });
        applied = true;
    }
    if !applied {
        return false;
    }
    commit_doc(ctx, doc, source)
}

/// Stable anchor id on blocks, rendered as `id` and `data-block-id`.
pub struct BlockId;

impl Extension for BlockId {
    fn name(&self) -> &str {
        "block_id"
    }

    fn global_attributes(&self) -> Vec<GlobalAttribute> {
        vec![GlobalAttribute::new(
            BLOCK_ID_TYPES.iter().copied(),
            BLOCK_ID,
            AttributeSpec::null().extract(|el| {
                el.get_attr("data-block-id")
                    .or_else(|| el.get_attr("id"))
                    .map(|id| Value::String(id.to_string()))
            }),
        )]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_block_id", "Set block id", |ctx, args| {
                let value = match string_arg(args, "id") {
                    Some(id) if !id.is_empty() => Value::String(id.to_string()),
                    _ => Value::Null,
                };
                set_block_attr(ctx, BLOCK_ID, value, "block.set_block_id")
            })
            .description("Set or clear the anchor id of the current block.")
            .keywords(["anchor", "id"]),
        ]
    }
}

pub struct TextAlign;

impl Extension for TextAlign {
    fn name(&self) -> &str {
        "text_align"
    }

    fn global_attributes(&self) -> Vec<GlobalAttribute> {
        vec![GlobalAttribute::new(
            TEXT_ALIGN_TYPES.iter().copied(),
            TEXT_ALIGN,
            AttributeSpec::null().extract(|el| {
                el.style("text-align")
                    .filter(|align| ALIGNMENTS.contains(&align.as_str()))
                    .map(Value::String)
            }),
        )]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_text_align", "Align text", |ctx, args| {
                let Some(align) = string_arg(args, "align") else {
                    return false;
                };
                if !ALIGNMENTS.contains(&align) {
                    return false;
                }
                let align = Value::String(align.to_string());
                set_block_attr(ctx, TEXT_ALIGN, align, "block.set_text_align")
            })
            .description("Align the selected blocks.")
            .keywords(["align", "left", "center", "right", "justify"]),
            CommandSpec::new("block.unset_text_align", "Reset alignment", |ctx, _args| {
                set_block_attr(ctx, TEXT_ALIGN, Value::Null, "block.unset_text_align")
            })
            .keywords(["align", "reset"]),
        ]
    }
}
