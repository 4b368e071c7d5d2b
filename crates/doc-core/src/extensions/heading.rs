use serde_json::{Value, json};

use crate::attrs::{AttributeSpec, Attrs, ParseRule};
use crate::commands::{CommandContext, CommandSpec, QuerySpec};
use crate::extension::Extension;
use crate::extensions::edit::{head_block, set_block_type};
use crate::node::PARAGRAPH;
use crate::schema::NodeDefinition;
use crate::state::EditorState;

pub const HEADING: &str = "heading";
pub const MAX_HEADING_LEVEL: u64 = 6;

fn level_arg(args: &Value) -> u64 {
    args.get("level")
        .or(Some(args))
        .and_then(|v| v.as_u64())
        .unwrap_or(1)
        .clamp(1, MAX_HEADING_LEVEL)
}

fn active_level(state: &EditorState) -> Option<u64> {
    let (_, el) = head_block(state)?;
    if el.kind != HEADING {
        return None;
    }
    Some(el.attr("level").and_then(|v| v.as_u64()).unwrap_or(1))
}

fn set_heading(ctx: &mut CommandContext, level: u64, source: &str) -> bool {
    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), json!(level));
    set_block_type(ctx, HEADING, attrs, source)
}

/// Headings `h1` to `h6`.
pub struct Heading;

impl Extension for Heading {
    fn name(&self) -> &str {
        HEADING
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        let mut def = NodeDefinition::new(HEADING)
            .group("block")
            .content("inline*")
            .defining(true)
            .attribute("level", AttributeSpec::new(json!(1)));
        for level in 1..=MAX_HEADING_LEVEL {
            def = def.parse_rule(ParseRule::tag(format!("h{level}")).get_attrs(move |_| {
                let mut attrs = Attrs::new();
                attrs.insert("level".to_string(), json!(level));
                Some(attrs)
            }));
        }
        vec![def]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("block.set_heading", "Set heading", |ctx, args| {
                set_heading(ctx, level_arg(args), "block.set_heading")
            })
            .description("Convert the selected text blocks into headings.")
            .keywords(["heading", "title", "h1", "h2", "h3", "h4", "h5", "h6"]),
            CommandSpec::new("block.toggle_heading", "Toggle heading", |ctx, args| {
                let level = level_arg(args);
                if active_level(ctx.state()) == Some(level) {
                    return set_block_type(ctx, PARAGRAPH, Attrs::new(), "block.toggle_heading");
                }
                set_heading(ctx, level, "block.toggle_heading")
            })
            .description("Switch between a heading of the given level and a paragraph.")
            .keywords(["heading", "title", "toggle"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("block.heading_level", |state, _args| {
            active_level(state).map(Value::from).unwrap_or(Value::Null)
        })]
    }
}
