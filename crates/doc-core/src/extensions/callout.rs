use serde_json::Value;

use crate::attrs::{AttributeSpec, Attrs, ParseRule};
use crate::commands::{CommandSpec, QuerySpec};
use crate::extension::Extension;
use crate::extensions::edit::{
    find_ancestor, string_arg, unwrap_node, update_attributes, wrap_blocks,
};
use crate::markup::{MarkupElement, block_attributes};
use crate::node::ElementNode;
use crate::schema::{NodeDefinition, Schema};

pub const CALLOUT: &str = "callout";
pub const CALLOUT_VARIANTS: &[&str] = &["info", "warning", "error", "success", "note"];
pub const DEFAULT_CALLOUT_VARIANT: &str = "info";

fn variant_of(el: &ElementNode) -> &str {
    el.attr_str("variant")
        .filter(|v| CALLOUT_VARIANTS.contains(v))
        .unwrap_or(DEFAULT_CALLOUT_VARIANT)
}

fn render_callout(el: &ElementNode, schema: &Schema) -> crate::markup::MarkupNode {
    let variant = variant_of(el);
    let attrs = block_attributes(schema, el)
        .into_iter()
        .filter(|(name, _)| name != "variant");
    MarkupElement::new("div")
        .attr("data-type", CALLOUT)
        .attr("data-variant", variant)
        .attr("class", format!("callout callout-{variant}"))
        .attrs(attrs)
        .hole()
        .into()
}

/// Highlighted box with a semantic variant.
pub struct Callout;

impl Extension for Callout {
    fn name(&self) -> &str {
        CALLOUT
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(CALLOUT)
                .group("block")
                .content("block+")
                .defining(true)
                .attribute(
                    "variant",
                    AttributeSpec::new(Value::from(DEFAULT_CALLOUT_VARIANT)).extract(|el| {
                        el.get_attr("data-variant")
                            .filter(|v| CALLOUT_VARIANTS.contains(v))
                            .map(Value::from)
                    }),
                )
                .parse_rule(
                    ParseRule::tag("div")
                        .get_attrs(|el| {
                            (el.get_attr("data-type") == Some(CALLOUT)).then(Attrs::new)
                        })
                        .priority(60),
                )
                .render(render_callout),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("callout.set", "Callout", |ctx, args| {
                let variant = string_arg(args, "variant").unwrap_or(DEFAULT_CALLOUT_VARIANT);
                if !CALLOUT_VARIANTS.contains(&variant) {
                    return false;
                }
                let mut attrs = Attrs::new();
                attrs.insert("variant".to_string(), Value::from(variant));
                if find_ancestor(ctx.state(), &[CALLOUT]).is_some() {
                    return update_attributes(ctx, CALLOUT, &attrs, "callout.set");
                }
                wrap_blocks(ctx, CALLOUT, attrs, None, "callout.set")
            })
            .description("Wrap the selected blocks in a callout, or change its variant.")
            .keywords(["callout", "info", "warning", "note", "admonition"]),
            CommandSpec::new("callout.unset", "Remove callout", |ctx, _args| {
                let Some(path) = find_ancestor(ctx.state(), &[CALLOUT]) else {
                    return false;
                };
                unwrap_node(ctx, &path, None, "callout.unset")
            })
            .keywords(["callout", "remove"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("callout.variant", |state, _args| {
            find_ancestor(state, &[CALLOUT])
                .and_then(|path| state.node_at(&path))
                .and_then(|node| node.as_element())
                .map(|el| Value::from(variant_of(el)))
                .unwrap_or(Value::Null)
        })]
    }
}
