use serde_json::Value;

use crate::attrs::{AttributeSpec, Attrs, ParseRule};
use crate::commands::{CommandSpec, QuerySpec};
use crate::extension::Extension;
use crate::extensions::edit::{
    add_mark, attrs_arg, mark_active, remove_mark, string_arg, toggle_mark,
};
use crate::markup::{MarkupElement, MarkupNode};
use crate::node::Mark;
use crate::schema::MarkDefinition;

fn wrap(tag: &'static str) -> impl Fn(&Mark) -> MarkupNode + Send + Sync + 'static {
    move |_| MarkupElement::new(tag).hole().into()
}

fn mark_arg(args: &Value) -> Option<Mark> {
    let kind = string_arg(args, "type")?;
    Some(Mark {
        kind: kind.to_string(),
        attrs: attrs_arg(args, "attrs"),
    })
}

fn toggle_command(kind: &'static str, label: &'static str) -> CommandSpec {
    let id = format!("marks.toggle_{kind}");
    let source = id.clone();
    CommandSpec::new(id, label, move |ctx, _args| {
        toggle_mark(ctx, Mark::new(kind), &source)
    })
    .keywords([kind, "format", "mark"])
}

/// Generic mark commands and the `marks.is_active` query.
pub struct Formatting;

impl Extension for Formatting {
    fn name(&self) -> &str {
        "formatting"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("marks.set", "Set mark", |ctx, args| {
                let Some(mark) = mark_arg(args) else {
                    return false;
                };
                add_mark(ctx, mark, "marks.set")
            })
            .description("Add a mark to the selected text.")
            .keywords(["mark", "format"]),
            CommandSpec::new("marks.unset", "Unset mark", |ctx, args| {
                let Some(kind) = string_arg(args, "type") else {
                    return false;
                };
                let kind = kind.to_string();
                remove_mark(ctx, &kind, "marks.unset")
            })
            .description("Remove a mark from the selected text.")
            .keywords(["mark", "format", "clear"]),
            CommandSpec::new("marks.toggle", "Toggle mark", |ctx, args| {
                let Some(mark) = mark_arg(args) else {
                    return false;
                };
                toggle_mark(ctx, mark, "marks.toggle")
            })
            .keywords(["mark", "format"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("marks.is_active", |state, args| {
            let active = string_arg(args, "type").is_some_and(|kind| mark_active(state, kind));
            Value::Bool(active)
        })]
    }
}

pub struct Bold;

impl Extension for Bold {
    fn name(&self) -> &str {
        "bold"
    }

    fn marks(&self) -> Vec<MarkDefinition> {
        vec![
            MarkDefinition::new("bold")
                .parse_rule(ParseRule::tag("strong"))
                .parse_rule(ParseRule::tag("b").get_attrs(|el| {
                    // Google Docs wraps whole documents in <b style="font-weight:normal">.
                    (el.style("font-weight").as_deref() != Some("normal")).then(Attrs::new)
                }))
                .parse_rule(ParseRule::style("font-weight").get_attrs(|el| {
                    let weight = el.style("font-weight")?;
                    let bold = weight == "bold"
                        || weight == "bolder"
                        || weight.parse::<u32>().is_ok_and(|w| w >= 500);
                    bold.then(Attrs::new)
                }))
                .render(wrap("strong")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![toggle_command("bold", "Bold").keywords(["bold", "strong", "format"])]
    }
}

pub struct Italic;

impl Extension for Italic {
    fn name(&self) -> &str {
        "italic"
    }

    fn marks(&self) -> Vec<MarkDefinition> {
        vec![
            MarkDefinition::new("italic")
                .parse_rule(ParseRule::tag("em"))
                .parse_rule(ParseRule::tag("i").get_attrs(|el| {
                    (el.style("font-style").as_deref() != Some("normal")).then(Attrs::new)
                }))
                .parse_rule(
                    ParseRule::style("font-style")
                        .get_attrs(|el| (el.style("font-style")? == "italic").then(Attrs::new)),
                )
                .render(wrap("em")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![toggle_command("italic", "Italic").keywords(["italic", "emphasis", "format"])]
    }
}

pub struct Underline;

impl Extension for Underline {
    fn name(&self) -> &str {
        "underline"
    }

    fn marks(&self) -> Vec<MarkDefinition> {
        vec![
            MarkDefinition::new("underline")
                .parse_rule(ParseRule::tag("u"))
                .parse_rule(ParseRule::style("text-decoration").get_attrs(|el| {
                    el.style("text-decoration")?
                        .contains("underline")
                        .then(Attrs::new)
                }))
                .render(wrap("u")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![toggle_command("underline", "Underline")]
    }
}

pub struct Strike;

impl Extension for Strike {
    fn name(&self) -> &str {
        "strike"
    }

    fn marks(&self) -> Vec<MarkDefinition> {
        vec![
            MarkDefinition::new("strike")
                .parse_rule(ParseRule::tag("s"))
                .parse_rule(ParseRule::tag("del"))
                .parse_rule(ParseRule::tag("strike"))
                .parse_rule(ParseRule::style("text-decoration").get_attrs(|el| {
                    el.style("text-decoration")?
                        .contains("line-through")
                        .then(Attrs::new)
                }))
                .render(wrap("s")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            toggle_command("strike", "Strikethrough")
                .keywords(["strike", "strikethrough", "format"]),
        ]
    }
}

/// Inline code. Excludes every other formatting mark.
pub struct Code;

impl Extension for Code {
    fn name(&self) -> &str {
        "code"
    }

    fn marks(&self) -> Vec<MarkDefinition> {
        vec![
            MarkDefinition::new("code")
                .excludes(["bold", "italic", "link", "strike", "underline"])
                .parse_rule(ParseRule::tag("code"))
                .render(wrap("code")),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![toggle_command("code", "Inline code").keywords(["code", "monospace", "format"])]
    }
}

pub struct Link;

impl Extension for Link {
    fn name(&self) -> &str {
        "link"
    }

    fn marks(&self) -> Vec<MarkDefinition> {
        vec![
            MarkDefinition::new("link")
                .inclusive(false)
                .attribute("href", AttributeSpec::null().from_markup_attr("href"))
                .attribute("target", AttributeSpec::null().from_markup_attr("target"))
                .parse_rule(ParseRule::tag("a").get_attrs(|el| {
                    let href = el.get_attr("href")?;
                    if href.trim_start().to_ascii_lowercase().starts_with("javascript:") {
                        return None;
                    }
                    Some(Attrs::new())
                }))
                .render(|mark| {
                    let mut el = MarkupElement::new("a");
                    if let Some(href) = mark.attr("href").and_then(|v| v.as_str()) {
                        el = el.attr("href", href);
                    }
                    if let Some(target) = mark.attr("target").and_then(|v| v.as_str()) {
                        el = el.attr("target", target);
                    }
                    el.attr("rel", "noopener noreferrer nofollow").hole().into()
                }),
        ]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("marks.set_link", "Link", |ctx, args| {
                let Some(href) = string_arg(args, "href") else {
                    return false;
                };
                let mut mark = Mark::new("link").with_attr("href", href);
                if let Some(target) = args.get("target").and_then(|v| v.as_str()) {
                    mark = mark.with_attr("target", target);
                }
                add_mark(ctx, mark, "marks.set_link")
            })
            .description("Link the selected text.")
            .keywords(["link", "url", "href"]),
            CommandSpec::new("marks.unset_link", "Remove link", |ctx, _args| {
                remove_mark(ctx, "link", "marks.unset_link")
            })
            .keywords(["link", "unlink"]),
        ]
    }
}
