use serde_json::Value;

use crate::attrs::{AttributeSpec, Attrs, ParseRule};
use crate::commands::{CommandSpec, QuerySpec};
use crate::extension::Extension;
use crate::extensions::edit::{head_block, set_block_type, string_arg, update_attributes};
use crate::markup::{MarkupElement, block_attributes};
use crate::node::PARAGRAPH;
use crate::schema::NodeDefinition;

pub const CODE_BLOCK: &str = "codeBlock";
const LANGUAGE_CLASS_PREFIX: &str = "language-";

fn language_from_markup(el: &MarkupElement) -> Option<Value> {
    if let Some(lang) = el.get_attr("data-language") {
        return Some(Value::String(lang.to_string()));
    }
    let code = if el.tag == "code" { Some(el) } else { el.find("code") };
    let class = code?.get_attr("class")?;
    class
        .split_whitespace()
        .find_map(|c| c.strip_prefix(LANGUAGE_CLASS_PREFIX))
        .filter(|lang| !lang.is_empty())
        .map(|lang| Value::String(lang.to_string()))
}

/// Fenced code. Renders a header with the language label and a copy button
/// above `<pre><code>`; the code text is the node's text content.
pub struct CodeBlock;

impl Extension for CodeBlock {
    fn name(&self) -> &str {
        CODE_BLOCK
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        vec![
            NodeDefinition::new(CODE_BLOCK)
                .group("block")
                .content("text*")
                .marks("")
                .code(true)
                .defining(true)
                .attribute(
                    "language",
                    AttributeSpec::null()
                        .extract(language_from_markup)
                        .render(|value| match value.as_str() {
                            Some(lang) => vec![("data-language".to_string(), lang.to_string())],
                            None => Vec::new(),
                        }),
                )
                .parse_rule(
                    ParseRule::tag("div")
                        .get_attrs(|el| el.has_class("code-block").then(Attrs::new))
                        .priority(60)
                        .content_element("code"),
                )
                .parse_rule(ParseRule::tag("pre").content_element("code"))
                .render(|el, schema| {
                    let language = el.attr_str("language");
                    let header = MarkupElement::new("div")
                        .attr("class", "code-block-header")
                        .child(
                            MarkupElement::new("span")
                                .attr("class", "code-block-language")
                                .text(language.unwrap_or("plain text")),
                        )
                        .child(
                            MarkupElement::new("button")
                                .attr("type", "button")
                                .attr("class", "code-block-copy")
                                .text("Copy"),
                        );
                    let mut code = MarkupElement::new("code");
                    if let Some(lang) = language {
                        code = code.attr("class", format!("{LANGUAGE_CLASS_PREFIX}{lang}"));
                    }
                    MarkupElement::new("div")
                        .attr("class", "code-block")
                        .attrs(block_attributes(schema, el))
                        .child(header)
                        .child(MarkupElement::new("pre").child(code.text(el.text_content())))
                        .into()
                }),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("code_block.toggle", "Code block", |ctx, args| {
                let active = head_block(ctx.state()).is_some_and(|(_, el)| el.kind == CODE_BLOCK);
                if active {
                    return set_block_type(ctx, PARAGRAPH, Attrs::new(), "code_block.toggle");
                }
                let mut attrs = Attrs::new();
                if let Some(lang) = args.get("language").and_then(|v| v.as_str()) {
                    attrs.insert("language".to_string(), Value::String(lang.to_string()));
                }
                set_block_type(ctx, CODE_BLOCK, attrs, "code_block.toggle")
            })
            .description("Turn the selected blocks into a code block, or back into paragraphs.")
            .keywords(["code", "pre", "snippet"]),
            CommandSpec::new("code_block.set_language", "Code language", |ctx, args| {
                let language = match string_arg(args, "language") {
                    Some(lang) if !lang.is_empty() => Value::String(lang.to_string()),
                    _ => Value::Null,
                };
                let mut patch = Attrs::new();
                patch.insert("language".to_string(), language);
                update_attributes(ctx, CODE_BLOCK, &patch, "code_block.set_language")
            })
            .keywords(["code", "language", "syntax"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("code_block.is_active", |state, _args| {
            Value::Bool(head_block(state).is_some_and(|(_, el)| el.kind == CODE_BLOCK))
        })]
    }
}
