use serde_json::Value;

use crate::attrs::{AttributeSpec, Attrs, ParseRule};
use crate::commands::CommandSpec;
use crate::extension::Extension;
use crate::extensions::edit::insert_blocks;
use crate::markup::{MarkupElement, block_attributes};
use crate::node::Node;
use crate::schema::NodeDefinition;

pub const COLUMNS: &str = "columns";
pub const COLUMN: &str = "column";
pub const MIN_COLUMNS: u64 = 2;
pub const MAX_COLUMNS: u64 = 4;

fn data_type_rule(data_type: &'static str) -> ParseRule {
    ParseRule::tag("div")
        .get_attrs(move |el| (el.get_attr("data-type") == Some(data_type)).then(Attrs::new))
        .priority(60)
}

/// Multi-column layout; `layout` carries the column proportions verbatim.
pub struct Columns;

impl Extension for Columns {
    fn name(&self) -> &str {
        COLUMNS
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(COLUMNS)
                .group("block")
                .content("column{2,}")
                .isolating(true)
                .attribute(
                    "layout",
                    AttributeSpec::null()
                        .extract(|el| el.get_attr("data-layout").map(Value::from))
                        .render(|value| match crate::attrs::value_to_markup(value) {
                            Some(layout) => vec![("data-layout".to_string(), layout)],
                            None => Vec::new(),
                        }),
                )
                .parse_rule(data_type_rule(COLUMNS))
                .render(|el, schema| {
                    MarkupElement::new("div")
                        .attr("data-type", COLUMNS)
                        .attr("class", "columns")
                        .attrs(block_attributes(schema, el))
                        .hole()
                        .into()
                }),
            NodeDefinition::new(COLUMN)
                .content("block+")
                .isolating(true)
                .parse_rule(data_type_rule(COLUMN))
                .render(|_, _| {
                    MarkupElement::new("div")
                        .attr("data-type", COLUMN)
                        .attr("class", "column")
                        .hole()
                        .into()
                }),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("columns.insert", "Columns", |ctx, args| {
                let count = args
                    .get("count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(MIN_COLUMNS)
                    .clamp(MIN_COLUMNS, MAX_COLUMNS);
                let columns = (0..count)
                    .map(|_| Node::element(COLUMN, Attrs::new(), vec![Node::paragraph("")]))
                    .collect();
                let mut attrs = Attrs::new();
                if let Some(layout) = args.get("layout").filter(|v| !v.is_null()) {
                    attrs.insert("layout".to_string(), layout.clone());
                }
                insert_blocks(ctx, vec![Node::element(COLUMNS, attrs, columns)], "columns.insert")
            })
            .description("Insert a multi-column layout after the current block.")
            .keywords(["columns", "layout", "grid"]),
        ]
    }
}
