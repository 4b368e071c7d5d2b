use serde_json::Value;

use crate::attrs::{AttributeSpec, Attrs, ParseRule};
use crate::commands::CommandSpec;
use crate::extension::Extension;
use crate::extensions::edit::insert_blocks;
use crate::node::Node;
use crate::schema::NodeDefinition;

pub const IMAGE: &str = "image";
pub const HORIZONTAL_RULE: &str = "horizontalRule";
pub const DEFAULT_IMAGE_ALIGN: &str = "center";

/// Numeric markup attributes become numbers, anything else stays a string.
fn dimension(el: &crate::markup::MarkupElement, name: &'static str) -> Option<Value> {
    let raw = el.get_attr(name)?;
    Some(
        raw.parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(raw)),
    )
}

pub struct Image;

impl Extension for Image {
    fn name(&self) -> &str {
        IMAGE
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(IMAGE)
                .group("block")
                .atom(true)
                .draggable(true)
                .attribute("src", AttributeSpec::null().from_markup_attr("src"))
                .attribute("alt", AttributeSpec::null().from_markup_attr("alt"))
                .attribute("title", AttributeSpec::null().from_markup_attr("title"))
                .attribute("width", AttributeSpec::null().extract(|el| dimension(el, "width")))
                .attribute("height", AttributeSpec::null().extract(|el| dimension(el, "height")))
                .attribute(
                    "align",
                    AttributeSpec::new(Value::from(DEFAULT_IMAGE_ALIGN))
                        .extract(|el| el.get_attr("data-align").map(Value::from))
                        .render(|value| match value.as_str() {
                            Some(align) if align != DEFAULT_IMAGE_ALIGN => {
                                vec![("data-align".to_string(), align.to_string())]
                            }
                            _ => Vec::new(),
                        }),
                )
                .parse_rule(
                    ParseRule::tag("img").get_attrs(|el| el.get_attr("src").map(|_| Attrs::new())),
                ),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("image.insert", "Image", |ctx, args| {
                let Some(src) = args.get("src").and_then(|v| v.as_str()) else {
                    return false;
                };
                let mut attrs = Attrs::new();
                attrs.insert("src".to_string(), Value::from(src));
                for key in ["alt", "title", "width", "height", "align"] {
                    if let Some(value) = args.get(key).filter(|v| !v.is_null()) {
                        attrs.insert(key.to_string(), value.clone());
                    }
                }
                insert_blocks(ctx, vec![Node::element(IMAGE, attrs, Vec::new())], "image.insert")
            })
            .description("Insert an image after the current block.")
            .keywords(["image", "picture", "photo", "img"]),
        ]
    }
}

/// Thematic break, `<hr>`.
pub struct HorizontalRule;

impl Extension for HorizontalRule {
    fn name(&self) -> &str {
        HORIZONTAL_RULE
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(HORIZONTAL_RULE)
                .group("block")
                .atom(true)
                .parse_rule(ParseRule::tag("hr")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("divider.insert", "Divider", |ctx, _args| {
                let divider = Node::element(HORIZONTAL_RULE, Attrs::new(), Vec::new());
                insert_blocks(ctx, vec![divider], "divider.insert")
            })
            .description("Insert a horizontal rule after the current block.")
            .keywords(["divider", "rule", "hr", "separator"]),
        ]
    }
}
