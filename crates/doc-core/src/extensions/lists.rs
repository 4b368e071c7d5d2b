use serde_json::Value;

use crate::attrs::{AttributeSpec, Attrs, ParseRule};
use crate::commands::{CommandContext, CommandSpec};
use crate::extension::Extension;
use crate::extensions::edit::{
    LIST_ITEM, LIST_KINDS, commit_doc, find_ancestor, unwrap_node, wrap_blocks,
};
use crate::node::Node;
use crate::schema::NodeDefinition;
use crate::transform::update_at;

pub const BULLET_LIST: &str = "bulletList";
pub const ORDERED_LIST: &str = "orderedList";

/// Wraps the selection in a list of `kind`, converts the enclosing list to
/// `kind`, or lifts the items out when already inside a `kind` list.
fn toggle_list(ctx: &mut CommandContext, kind: &str, source: &str) -> bool {
    let Some(path) = find_ancestor(ctx.state(), LIST_KINDS) else {
        return wrap_blocks(ctx, kind, Attrs::new(), Some(LIST_ITEM), source);
    };
    let Some(current) = ctx.state().node_at(&path).map(|n| n.kind().to_string()) else {
        return false;
    };
    if current == kind {
        return unwrap_node(ctx, &path, Some(LIST_ITEM), source);
    }

    let mut doc = ctx.state().doc().clone();
    update_at(&mut doc, &path, |node| {
        if let Node::Element(el) = node {
            el.kind = kind.to_string();
            el.attrs.remove("start");
        }
    });
    commit_doc(ctx, doc, source)
}

pub struct BulletList;

impl Extension for BulletList {
    fn name(&self) -> &str {
        BULLET_LIST
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(BULLET_LIST)
                .group("block list")
                .content("listItem+")
                .parse_rule(ParseRule::tag("ul")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("list.toggle_bullet", "Bullet list", |ctx, _args| {
                toggle_list(ctx, BULLET_LIST, "list.toggle_bullet")
            })
            .description("Toggle a bulleted list around the selected blocks.")
            .keywords(["list", "bullet", "unordered", "ul"]),
        ]
    }
}

pub struct OrderedList;

impl Extension for OrderedList {
    fn name(&self) -> &str {
        ORDERED_LIST
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(ORDERED_LIST)
                .group("block list")
                .content("listItem+")
                .attribute(
                    "start",
                    AttributeSpec::new(Value::from(1)).extract(|el| {
                        el.get_attr("start")
                            .and_then(|s| s.parse::<u64>().ok())
                            .map(Value::from)
                    }),
                )
                .parse_rule(ParseRule::tag("ol")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("list.toggle_ordered", "Numbered list", |ctx, _args| {
                toggle_list(ctx, ORDERED_LIST, "list.toggle_ordered")
            })
            .description("Toggle a numbered list around the selected blocks.")
            .keywords(["list", "numbered", "ordered", "ol"]),
        ]
    }
}

pub struct ListItem;

impl Extension for ListItem {
    fn name(&self) -> &str {
        LIST_ITEM
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(LIST_ITEM)
                .content("paragraph block*")
                .defining(true)
                .parse_rule(ParseRule::tag("li")),
        ]
    }
}
