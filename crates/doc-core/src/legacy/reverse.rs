use std::sync::Arc;

use tracing::debug;

use super::forward::{FLAG_MARKS, LINK_MARK};
use super::marker::{MarkerKind, encode_marker};
use super::{LegacyBlock, LegacyDocument, LegacyNode, LegacyText};
use crate::extensions::edit::LIST_ITEM;
use crate::extensions::{
    BLOCK_ID, BLOCKQUOTE, BULLET_LIST, CALLOUT, CODE_BLOCK, COLUMN, COLUMNS,
    DEFAULT_CALLOUT_VARIANT, HEADING, HORIZONTAL_RULE, IMAGE, MAX_HEADING_LEVEL, ORDERED_LIST,
    TEXT_ALIGN,
};
use crate::node::{ElementNode, HARD_BREAK, Node, PARAGRAPH, TextNode};

/// Converts a document tree into the stored block array. Metadata without a
/// slot in the stored format is carried by markers on the first run.
pub fn tree_to_legacy(doc: &Node) -> LegacyDocument {
    LegacyDocument(convert_children(doc.content()))
}

fn convert_children(content: &[Arc<Node>]) -> Vec<LegacyNode> {
    content.iter().flat_map(|node| convert_block(node)).collect()
}

fn marker(kind: MarkerKind, value: Option<&str>) -> String {
    value
        .filter(|value| !value.is_empty())
        .map(|value| encode_marker(kind, value))
        .unwrap_or_default()
}

fn anchor(el: &ElementNode) -> String {
    marker(MarkerKind::Anchor, el.attr_str(BLOCK_ID))
}

/// A void block still needs one empty run.
fn void_children() -> Vec<LegacyNode> {
    vec![LegacyNode::text("")]
}

fn convert_block(node: &Node) -> Vec<LegacyNode> {
    let Some(el) = node.as_element() else {
        debug!("dropping text at block level");
        return Vec::new();
    };
    let block = match el.kind.as_str() {
        PARAGRAPH => {
            let mut block = LegacyBlock::new("paragraph", runs(&el.content, &anchor(el)));
            block.align = el.attr_str(TEXT_ALIGN).map(str::to_string);
            block
        }
        HEADING => {
            let mut block = LegacyBlock::new("heading", runs(&el.content, &anchor(el)));
            let level = el.attr("level").and_then(|v| v.as_u64()).unwrap_or(1);
            block.level = u8::try_from(level.clamp(1, MAX_HEADING_LEVEL)).ok();
            block.align = el.attr_str(TEXT_ALIGN).map(str::to_string);
            block
        }
        BLOCKQUOTE | CALLOUT => quote(el),
        BULLET_LIST => LegacyBlock::new("unordered-list", convert_children(&el.content)),
        ORDERED_LIST => {
            let mut block = LegacyBlock::new("ordered-list", convert_children(&el.content));
            block.start = el.attr("start").and_then(|v| v.as_u64());
            block
        }
        LIST_ITEM => list_item(el),
        CODE_BLOCK => {
            let text = format!(
                "{}{}{}",
                marker(MarkerKind::Language, el.attr_str("language")),
                anchor(el),
                el.text_content()
            );
            LegacyBlock::new("code", vec![LegacyNode::text(text)])
        }
        HORIZONTAL_RULE => LegacyBlock::new("divider", void_children()),
        IMAGE => {
            let mut block = LegacyBlock::new("image", void_children());
            block.url = el.attr_str("src").map(str::to_string);
            block.alt = el.attr_str("alt").map(str::to_string);
            block.title = el.attr_str("title").map(str::to_string);
            block.width = el.attr("width").filter(|v| !v.is_null()).cloned();
            block.height = el.attr("height").filter(|v| !v.is_null()).cloned();
            block.align = el.attr_str("align").map(str::to_string);
            block
        }
        COLUMNS => {
            let mut block = LegacyBlock::new("layout", convert_children(&el.content));
            block.layout = el.attr("layout").filter(|v| !v.is_null()).cloned();
            block
        }
        COLUMN => LegacyBlock::new("layout-area", convert_children(&el.content)),
        other => {
            debug!(kind = other, "no legacy form for node, dropping");
            return Vec::new();
        }
    };
    vec![LegacyNode::Block(block)]
}

/// Container markers go in front of the first paragraph's own markers. A
/// container that does not open with a paragraph or heading gets an empty
/// one to carry them.
fn quote(el: &ElementNode) -> LegacyBlock {
    let mut children = convert_children(&el.content);
    let mut prefix = String::new();
    if el.kind == CALLOUT {
        let variant = el.attr_str("variant").unwrap_or(DEFAULT_CALLOUT_VARIANT);
        prefix.push_str(&encode_marker(MarkerKind::Callout, variant));
    }
    prefix.push_str(&anchor(el));

    if !prefix.is_empty() {
        let opens_with_text = matches!(
            children.first(),
            Some(LegacyNode::Block(first))
                if (first.kind == "paragraph" || first.kind == "heading")
                    && matches!(first.children.first(), Some(LegacyNode::Text(_)))
        );
        if !opens_with_text {
            children.insert(0, LegacyNode::Block(LegacyBlock::new("paragraph", void_children())));
        }
        if let Some(LegacyNode::Block(first)) = children.first_mut() {
            if let Some(LegacyNode::Text(run)) = first.children.first_mut() {
                run.text.insert_str(0, &prefix);
            }
        }
    }
    LegacyBlock::new("blockquote", children)
}

/// The item's first paragraph becomes its leading runs; the item anchor
/// falls back to that paragraph's.
fn list_item(el: &ElementNode) -> LegacyBlock {
    let paragraph = el
        .content
        .first()
        .and_then(|first| first.as_element())
        .filter(|first| first.kind == PARAGRAPH);
    let id = el
        .attr_str(BLOCK_ID)
        .or_else(|| paragraph.and_then(|p| p.attr_str(BLOCK_ID)));
    let prefix = marker(MarkerKind::Anchor, id);

    let (mut children, rest) = match paragraph {
        Some(p) => (runs(&p.content, &prefix), &el.content[1..]),
        None => (runs(&[], &prefix), &el.content[..]),
    };
    children.extend(convert_children(rest));
    LegacyBlock::new("list-item", children)
}

fn run_format(text: &TextNode) -> (LegacyText, Option<String>) {
    let flag = |kind: &str| text.has_mark(kind).then_some(true);
    let run = LegacyText {
        bold: flag(FLAG_MARKS[0]),
        italic: flag(FLAG_MARKS[1]),
        underline: flag(FLAG_MARKS[2]),
        strikethrough: flag(FLAG_MARKS[3]),
        code: flag(FLAG_MARKS[4]),
        ..LegacyText::default()
    };
    let link = text
        .marks
        .iter()
        .find(|mark| mark.kind == LINK_MARK)
        .and_then(|mark| mark.attr("href"))
        .and_then(|href| href.as_str())
        .map(str::to_string);
    (run, link)
}

/// Inline content as runs. Neighbouring text with the same formatting
/// shares a run; hard breaks become newlines in the run before them (or the
/// one after, at the start of a block). `prefix` is put in front of the
/// first run.
fn runs(content: &[Arc<Node>], prefix: &str) -> Vec<LegacyNode> {
    let mut segments: Vec<(LegacyText, Option<String>)> = Vec::new();
    let mut pending = String::new();
    for node in content {
        match node.as_ref() {
            Node::Text(text) => {
                let (format, link) = run_format(text);
                let piece = format!("{}{}", std::mem::take(&mut pending), text.text);
                match segments.last_mut() {
                    Some((last, last_link)) if last.same_format(&format) && *last_link == link => {
                        last.text.push_str(&piece)
                    }
                    _ => segments.push((LegacyText { text: piece, ..format }, link)),
                }
            }
            Node::Element(el) if el.kind == HARD_BREAK => match segments.last_mut() {
                Some((last, _)) => last.text.push('\n'),
                None => pending.push('\n'),
            },
            Node::Element(el) => {
                debug!(kind = %el.kind, "no legacy form for inline node, dropping")
            }
        }
    }
    if !pending.is_empty() {
        segments.push((LegacyText::new(pending), None));
    }

    let mut out: Vec<LegacyNode> = segments
        .into_iter()
        .map(|(mut run, link)| {
            let link = marker(MarkerKind::Link, link.as_deref());
            run.text.insert_str(0, &link);
            LegacyNode::Text(run)
        })
        .collect();
    match out.first_mut() {
        Some(LegacyNode::Text(first)) => first.text.insert_str(0, prefix),
        _ => out.push(LegacyNode::text(prefix)),
    }
    out
}
