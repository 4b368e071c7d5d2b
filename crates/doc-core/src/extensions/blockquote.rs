use crate::attrs::{Attrs, ParseRule};
use crate::commands::CommandSpec;
use crate::extension::Extension;
use crate::extensions::edit::{find_ancestor, unwrap_node, wrap_blocks};
use crate::schema::NodeDefinition;

pub const BLOCKQUOTE: &str = "blockquote";

pub struct Blockquote;

impl Extension for Blockquote {
    fn name(&self) -> &str {
        BLOCKQUOTE
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(BLOCKQUOTE)
                .group("block")
                .content("block+")
                .defining(true)
                .parse_rule(ParseRule::tag("blockquote")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("blockquote.toggle", "Quote", |ctx, _args| {
                match find_ancestor(ctx.state(), &[BLOCKQUOTE]) {
                    Some(path) => unwrap_node(ctx, &path, None, "blockquote.toggle"),
                    None => wrap_blocks(ctx, BLOCKQUOTE, Attrs::new(), None, "blockquote.toggle"),
                }
            })
            .description("Wrap the selected blocks in a quote, or lift them out of one.")
            .keywords(["quote", "blockquote", "citation"]),
        ]
    }
}
