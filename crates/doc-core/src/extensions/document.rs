use serde_json::Value;

use crate::attrs::{Attrs, ParseRule};
use crate::commands::{CommandSpec, QuerySpec};
use crate::extension::Extension;
use crate::extensions::edit::{head_block, replace_inline, set_block_type};
use crate::markup::MarkupElement;
use crate::node::{DOC, HARD_BREAK, Node, PARAGRAPH, TEXT};
use crate::schema::NodeDefinition;

/// The `doc` root.
pub struct Document;

impl Extension for Document {
    fn name(&self) -> &str {
        "document"
    }

    fn priority(&self) -> i32 {
        1000
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![NodeDefinition::new(DOC).content("block+")]
    }
}

pub struct Text;

impl Extension for Text {
    fn name(&self) -> &str {
        "text"
    }

    fn priority(&self) -> i32 {
        1000
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![NodeDefinition::new(TEXT).group("inline")]
    }
}

pub struct Paragraph;

impl Extension for Paragraph {
    fn name(&self) -> &str {
        "paragraph"
    }

    fn priority(&self) -> i32 {
        1000
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(PARAGRAPH)
                .group("block")
                .content("inline*")
                .parse_rule(ParseRule::tag("p")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_paragraph", "Paragraph", |ctx, _args| {
                set_block_type(ctx, PARAGRAPH, Attrs::new(), "block.set_paragraph")
            })
            .description("Turn the selected blocks into paragraphs.")
            .keywords(["paragraph", "text", "normal"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.active_type", |state, _args| {
            head_block(state)
                .map(|(_, el)| Value::String(el.kind.clone()))
                .unwrap_or(Value::Null)
        })]
    }
}

pub struct HardBreak;

impl Extension for HardBreak {
    fn name(&self) -> &str {
        "hard_break"
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(HARD_BREAK)
                .group("inline")
                .inline(true)
                .parse_rule(ParseRule::tag("br"))
                .render(|_, _| MarkupElement::new("br").into()),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("hard_break.insert", "Line break", |ctx, _args| {
                let in_code = head_block(ctx.state())
                    .and_then(|(_, el)| ctx.schema().node(&el.kind))
                    .is_some_and(|def| def.code);
                let node = if in_code {
                    Node::text("\n")
                } else {
                    Node::hard_break()
                };
                replace_inline(ctx, vec![node], "hard_break.insert")
            })
            .description("Insert a line break without starting a new block.")
            .keywords(["break", "newline", "shift enter"]),
        ]
    }
}
