use std::sync::Arc;

use crate::markup::dom::render_html;
use crate::markup::fragment::{MarkupElement, MarkupNode};
use crate::node::{ElementNode, Mark, Node, TextNode};
use crate::schema::Schema;

/// Renders a single node (and its subtree) to markup fragments.
pub fn node_to_markup(schema: &Schema, node: &Node) -> MarkupNode {
    match node {
        Node::Text(t) => text_to_markup(schema, t),
        Node::Element(el) => element_to_markup(schema, el),
    }
}

pub fn content_to_markup(schema: &Schema, content: &[Arc<Node>]) -> Vec<MarkupNode> {
    content
        .iter()
        .map(|child| node_to_markup(schema, child))
        .collect()
}

pub fn node_to_html(schema: &Schema, node: &Node) -> String {
    render_html(&[node_to_markup(schema, node)])
}

/// HTML for the children of the document root (the root itself emits no tag).
pub fn doc_to_html(schema: &Schema, doc: &Node) -> String {
    render_html(&content_to_markup(schema, doc.content()))
}

fn element_to_markup(schema: &Schema, el: &ElementNode) -> MarkupNode {
    let def = schema.node(&el.kind);
    let spec = match def.and_then(|def| def.render.as_ref()) {
        Some(render) => render(el, schema),
        None => default_element_spec(schema, el),
    };
    let (node, _) = spec.fill_hole(content_to_markup(schema, &el.content));
    node
}

/// Marks are applied in schema registration order: the first registered
/// mark becomes the outermost wrapper, independent of the order in which the
/// text node lists them.
fn text_to_markup(schema: &Schema, text: &TextNode) -> MarkupNode {
    let mut marks = text.marks.clone();
    schema.sort_marks(&mut marks);

    let mut node = MarkupNode::Text(text.text.clone());
    for mark in marks.iter().rev() {
        let (wrapped, _) = mark_spec(schema, mark).fill_hole(vec![node]);
        node = wrapped;
    }
    node
}

fn mark_spec(schema: &Schema, mark: &Mark) -> MarkupNode {
    match schema.mark(&mark.kind).and_then(|def| def.render.as_ref()) {
        Some(render) => render(mark),
        None => MarkupElement::new("span")
            .attr("data-mark", mark.kind.clone())
            .hole()
            .into(),
    }
}

fn default_element_spec(schema: &Schema, el: &ElementNode) -> MarkupNode {
    let element = MarkupElement::new(tag_for(el)).attrs(block_attributes(schema, el));
    if schema.is_leaf(&el.kind) {
        element.into()
    } else {
        element.hole().into()
    }
}

/// Static node type → tag table; unknown types render as `div`.
pub fn tag_for(el: &ElementNode) -> String {
    match el.kind.as_str() {
        "paragraph" => "p".to_string(),
        "heading" => {
            let level = el.attr("level").and_then(|v| v.as_u64()).unwrap_or(1);
            format!("h{}", level.clamp(1, 6))
        }
        "bulletList" => "ul".to_string(),
        "orderedList" => "ol".to_string(),
        "listItem" => "li".to_string(),
        "blockquote" => "blockquote".to_string(),
        "horizontalRule" => "hr".to_string(),
        "hardBreak" => "br".to_string(),
        "codeBlock" => "pre".to_string(),
        "image" => "img".to_string(),
        _ => "div".to_string(),
    }
}

/// Markup attributes for a node's attribute map.
///
/// `level` is consumed by the tag name, `blockId` becomes `id` plus
/// `data-block-id`, and `textAlign` becomes an inline style. Every other
/// attribute goes through its spec's renderer, which defaults to a literal
/// `name="value"`.
pub fn block_attributes(schema: &Schema, el: &ElementNode) -> Vec<(String, String)> {
    let def = schema.node(&el.kind);
    let mut out = Vec::new();
    let mut style = Vec::new();

    for (name, value) in &el.attrs {
        if value.is_null() {
            continue;
        }
        match name.as_str() {
            "level" => {}
            "blockId" => {
                if let Some(id) = crate::attrs::value_to_markup(value) {
                    out.push(("id".to_string(), id.clone()));
                    out.push(("data-block-id".to_string(), id));
                }
            }
            "textAlign" => {
                if let Some(align) = crate::attrs::value_to_markup(value) {
                    style.push(format!("text-align:{align}"));
                }
            }
            _ => match def.and_then(|def| def.attributes.get(name)) {
                Some(spec) => out.extend(spec.render_value(name, value)),
                None => {
                    if let Some(text) = crate::attrs::value_to_markup(value) {
                        out.push((name.clone(), text));
                    }
                }
            },
        }
    }

    if !style.is_empty() {
        out.push(("style".to_string(), style.join(";")));
    }
    out
}
