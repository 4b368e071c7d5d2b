use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::marker::{MarkerKind, extract_markers};
use super::{LegacyBlock, LegacyDocument, LegacyNode, LegacyText};
use crate::attrs::Attrs;
use crate::extensions::edit::LIST_ITEM;
use crate::extensions::{
    BLOCK_ID, BLOCKQUOTE, BULLET_LIST, CALLOUT, CODE_BLOCK, COLUMN, COLUMNS,
    DEFAULT_CALLOUT_VARIANT, HEADING, HORIZONTAL_RULE, IMAGE, MAX_HEADING_LEVEL, ORDERED_LIST,
    TEXT_ALIGN,
};
use crate::node::{ElementNode, Mark, Node, PARAGRAPH, normalize_inline};

/// Run flags and the marks they become, in the order marks are attached.
pub(super) const FLAG_MARKS: &[&str] = &["bold", "italic", "underline", "strike", "code"];
pub(super) const LINK_MARK: &str = "link";
const CODE_MARK: &str = "code";

/// Converts a stored block array into a document tree.
///
/// Unknown block types are dropped. The result always has at least one
/// block.
pub fn legacy_to_tree(doc: &LegacyDocument) -> Node {
    let mut blocks = convert_blocks(&doc.0);
    if blocks.is_empty() {
        blocks.push(Node::paragraph(""));
    }
    Node::doc(blocks)
}

fn is_inline(node: &LegacyNode) -> bool {
    match node {
        LegacyNode::Text(_) => true,
        LegacyNode::Block(block) => block.kind == "link",
    }
}

/// Converts a block sequence. Loose runs between blocks are gathered into
/// paragraphs.
fn convert_blocks(nodes: &[LegacyNode]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut loose: Vec<LegacyNode> = Vec::new();
    for node in nodes {
        match node {
            node if is_inline(node) => loose.push(node.clone()),
            LegacyNode::Block(block) => {
                if !loose.is_empty() {
                    let runs = std::mem::take(&mut loose);
                    out.extend(paragraphs(&LegacyBlock::new("paragraph", runs)));
                }
                out.extend(convert_block(block));
            }
            LegacyNode::Text(_) => {}
        }
    }
    if !loose.is_empty() {
        out.extend(paragraphs(&LegacyBlock::new("paragraph", loose)));
    }
    out
}

fn convert_block(block: &LegacyBlock) -> Vec<Node> {
    match block.kind.as_str() {
        "paragraph" => paragraphs(block),
        "heading" => vec![heading(block)],
        "blockquote" | "quote" => vec![quote(block)],
        "unordered-list" | "bulleted-list" => list(block, BULLET_LIST),
        "ordered-list" | "numbered-list" => list(block, ORDERED_LIST),
        "list-item" => {
            debug!("wrapping stray list item in a bullet list");
            vec![Node::element(BULLET_LIST, Attrs::new(), vec![list_item(block)])]
        }
        "code" | "code-block" => vec![code_block(block)],
        "divider" | "hr" => vec![Node::element(HORIZONTAL_RULE, Attrs::new(), Vec::new())],
        "image" => image(block).into_iter().collect(),
        "layout" => layout(block),
        "layout-area" => {
            debug!("flattening stray layout area");
            convert_blocks(&block.children)
        }
        "link" => paragraphs(&LegacyBlock::new(
            "paragraph",
            vec![LegacyNode::Block(block.clone())],
        )),
        other => {
            debug!(kind = other, "dropping unsupported legacy block");
            Vec::new()
        }
    }
}

/// Flattens runs out of inline children. Runs inside a link element inherit
/// its url unless they carry their own.
fn flatten_runs(children: &[LegacyNode], link: Option<&str>, out: &mut Vec<LegacyText>) {
    for child in children {
        match child {
            LegacyNode::Text(run) => {
                let mut run = run.clone();
                if run.url.is_none() {
                    run.url = link.map(str::to_string);
                }
                out.push(run);
            }
            LegacyNode::Block(block) if block.kind == "link" => {
                flatten_runs(&block.children, block.url.as_deref().or(link), out)
            }
            LegacyNode::Block(block) => flatten_runs(&block.children, link, out),
        }
    }
}

/// Runs of a textblock with empty padding runs removed.
fn block_runs(children: &[LegacyNode]) -> Vec<LegacyText> {
    let mut runs = Vec::new();
    flatten_runs(children, None, &mut runs);
    runs.retain(|run| !run.text.is_empty());
    runs
}

/// Strips block-level markers off the first run.
fn take_block_markers(runs: &mut [LegacyText], kinds: &[MarkerKind]) -> Vec<(MarkerKind, String)> {
    let Some(first) = runs.first_mut() else {
        return Vec::new();
    };
    let (found, rest) = extract_markers(&first.text, kinds);
    if !found.is_empty() {
        first.text = rest;
    }
    found
}

fn marker_value(found: &[(MarkerKind, String)], kind: MarkerKind) -> Option<String> {
    found
        .iter()
        .find(|(k, value)| *k == kind && !value.is_empty())
        .map(|(_, value)| value.clone())
}

/// Marks for a run's flags and link. Inline code excludes every other mark,
/// so a code run keeps only `code`.
fn run_marks(run: &LegacyText, href: Option<String>) -> Vec<Mark> {
    if run.code == Some(true) {
        return vec![Mark::new(CODE_MARK)];
    }
    let flags = [run.bold, run.italic, run.underline, run.strikethrough, run.code];
    let mut marks: Vec<Mark> = FLAG_MARKS
        .iter()
        .zip(flags)
        .filter(|(_, flag)| *flag == Some(true))
        .map(|(kind, _)| Mark::new(*kind))
        .collect();
    if let Some(href) = href.filter(|href| !href.is_empty()) {
        marks.push(Mark::new(LINK_MARK).with_attr("href", href));
    }
    marks
}

/// Inline nodes for one run. Newlines become hard breaks.
fn run_nodes(run: &LegacyText, out: &mut Vec<Node>) {
    let (found, text) = extract_markers(&run.text, &[MarkerKind::Link]);
    let href = marker_value(&found, MarkerKind::Link).or_else(|| run.url.clone());
    let marks = run_marks(run, href);
    for (ix, part) in text.split('\n').enumerate() {
        if ix > 0 {
            out.push(Node::hard_break());
        }
        if !part.is_empty() {
            out.push(Node::marked_text(part, marks.clone()));
        }
    }
}

fn textblock(kind: &str, attrs: Attrs, runs: &[LegacyText]) -> Node {
    let mut inline = Vec::new();
    for run in runs {
        run_nodes(run, &mut inline);
    }
    Node::Element(ElementNode {
        kind: kind.to_string(),
        attrs,
        content: normalize_inline(inline.into_iter().map(Arc::new).collect()),
    })
}

fn align_attrs(block: &LegacyBlock) -> Attrs {
    let mut attrs = Attrs::new();
    if let Some(align) = block.align.as_deref().filter(|a| !a.is_empty()) {
        attrs.insert(TEXT_ALIGN.to_string(), Value::from(align));
    }
    attrs
}

/// One paragraph per run. The anchor goes to the first paragraph only,
/// alignment to all of them.
fn paragraphs(block: &LegacyBlock) -> Vec<Node> {
    let mut runs = block_runs(&block.children);
    let found = take_block_markers(&mut runs, &[MarkerKind::Anchor]);
    let align = align_attrs(block);
    if runs.is_empty() {
        return vec![textblock(PARAGRAPH, align, &[])];
    }
    let mut anchor = marker_value(&found, MarkerKind::Anchor);
    runs.iter()
        .map(|run| {
            let mut attrs = align.clone();
            if let Some(id) = anchor.take() {
                attrs.insert(BLOCK_ID.to_string(), Value::from(id));
            }
            textblock(PARAGRAPH, attrs, std::slice::from_ref(run))
        })
        .collect()
}

fn heading(block: &LegacyBlock) -> Node {
    let mut runs = block_runs(&block.children);
    let found = take_block_markers(&mut runs, &[MarkerKind::Anchor]);
    let level = u64::from(block.level.unwrap_or(1)).clamp(1, MAX_HEADING_LEVEL);
    let mut attrs = align_attrs(block);
    attrs.insert("level".to_string(), Value::from(level));
    if let Some(id) = marker_value(&found, MarkerKind::Anchor) {
        attrs.insert(BLOCK_ID.to_string(), Value::from(id));
    }
    textblock(HEADING, attrs, &runs)
}

fn code_block(block: &LegacyBlock) -> Node {
    let mut lines: Vec<String> = block
        .children
        .iter()
        .map(|child| match child {
            LegacyNode::Text(run) => run.text.clone(),
            LegacyNode::Block(line) => {
                let mut runs = Vec::new();
                flatten_runs(&line.children, None, &mut runs);
                runs.into_iter().map(|run| run.text).collect()
            }
        })
        .collect();

    let mut attrs = Attrs::new();
    if let Some(first) = lines.first_mut() {
        let (found, rest) = extract_markers(first, &[MarkerKind::Language, MarkerKind::Anchor]);
        if !found.is_empty() {
            *first = rest;
        }
        if let Some(language) = marker_value(&found, MarkerKind::Language) {
            attrs.insert("language".to_string(), Value::from(language));
        }
        if let Some(id) = marker_value(&found, MarkerKind::Anchor) {
            attrs.insert(BLOCK_ID.to_string(), Value::from(id));
        }
    }

    let text = lines.join("\n");
    let content = if text.is_empty() { Vec::new() } else { vec![Node::text(text)] };
    Node::element(CODE_BLOCK, attrs, content)
}

/// The run container markers are read from: the first child when it is a
/// run, or the first run of a leading paragraph or heading.
fn leading_run_mut(children: &mut [LegacyNode]) -> Option<&mut LegacyText> {
    match children.first_mut()? {
        LegacyNode::Text(run) => Some(run),
        LegacyNode::Block(block) if block.kind == "paragraph" || block.kind == "heading" => {
            match block.children.first_mut()? {
                LegacyNode::Text(run) => Some(run),
                LegacyNode::Block(_) => None,
            }
        }
        LegacyNode::Block(_) => None,
    }
}

/// Blockquotes become callouts when they carry a callout marker.
fn quote(block: &LegacyBlock) -> Node {
    let mut children = block.children.clone();
    let mut found = Vec::new();
    if let Some(run) = leading_run_mut(&mut children) {
        let (markers, rest) =
            extract_markers(&run.text, &[MarkerKind::Callout, MarkerKind::Anchor]);
        if !markers.is_empty() {
            run.text = rest;
            found = markers;
        }
    }

    let mut content = convert_blocks(&children);
    if content.is_empty() {
        content.push(Node::paragraph(""));
    }

    let is_callout = found.iter().any(|(kind, _)| *kind == MarkerKind::Callout);
    let mut attrs = Attrs::new();
    if is_callout {
        let variant = marker_value(&found, MarkerKind::Callout)
            .unwrap_or_else(|| DEFAULT_CALLOUT_VARIANT.to_string());
        attrs.insert("variant".to_string(), Value::from(variant));
    }
    if let Some(id) = marker_value(&found, MarkerKind::Anchor) {
        attrs.insert(BLOCK_ID.to_string(), Value::from(id));
    }
    let kind = if is_callout { CALLOUT } else { BLOCKQUOTE };
    Node::element(kind, attrs, content)
}

fn list(block: &LegacyBlock, kind: &str) -> Vec<Node> {
    let items: Vec<Node> = block
        .children
        .iter()
        .map(|child| match child {
            LegacyNode::Block(item) if item.kind == "list-item" => list_item(item),
            other => list_item(&LegacyBlock::new("list-item", vec![other.clone()])),
        })
        .collect();
    if items.is_empty() {
        debug!(kind, "dropping empty list");
        return Vec::new();
    }
    let mut attrs = Attrs::new();
    if kind == ORDERED_LIST {
        if let Some(start) = block.start {
            attrs.insert("start".to_string(), Value::from(start));
        }
    }
    vec![Node::element(kind, attrs, items)]
}

/// Leading runs (or a leading paragraph) form the item's paragraph; an
/// anchor on its first run belongs to the item.
fn list_item(block: &LegacyBlock) -> Node {
    let split = block
        .children
        .iter()
        .position(|child| !is_inline(child))
        .unwrap_or(block.children.len());
    let (leading, mut rest) = block.children.split_at(split);

    let mut runs = block_runs(leading);
    let mut para_attrs = Attrs::new();
    if leading.is_empty() {
        if let Some(LegacyNode::Block(first)) = rest.first() {
            if first.kind == "paragraph" {
                runs = block_runs(&first.children);
                para_attrs = align_attrs(first);
                rest = &rest[1..];
            }
        }
    }

    let found = take_block_markers(&mut runs, &[MarkerKind::Anchor]);
    let mut attrs = Attrs::new();
    if let Some(id) = marker_value(&found, MarkerKind::Anchor) {
        attrs.insert(BLOCK_ID.to_string(), Value::from(id));
    }

    let mut content = vec![textblock(PARAGRAPH, para_attrs, &runs)];
    content.extend(convert_blocks(rest));
    Node::element(LIST_ITEM, attrs, content)
}

fn image(block: &LegacyBlock) -> Option<Node> {
    let Some(src) = block.url.as_deref().filter(|src| !src.is_empty()) else {
        debug!("dropping image without url");
        return None;
    };
    let mut attrs = Attrs::new();
    attrs.insert("src".to_string(), Value::from(src));
    let optional = [
        ("alt", block.alt.clone().map(Value::from)),
        ("title", block.title.clone().map(Value::from)),
        ("width", block.width.clone()),
        ("height", block.height.clone()),
        ("align", block.align.clone().map(Value::from)),
    ];
    for (name, value) in optional {
        if let Some(value) = value.filter(|v| !v.is_null()) {
            attrs.insert(name.to_string(), value);
        }
    }
    Some(Node::element(IMAGE, attrs, Vec::new()))
}

/// Layouts need two areas to stay a column set; otherwise their content is
/// spliced into the parent.
fn layout(block: &LegacyBlock) -> Vec<Node> {
    let columns: Vec<Vec<Node>> = block
        .children
        .iter()
        .map(|child| match child {
            LegacyNode::Block(area) if area.kind == "layout-area" => convert_blocks(&area.children),
            other => convert_blocks(std::slice::from_ref(other)),
        })
        .filter(|blocks| !blocks.is_empty())
        .collect();

    if columns.len() < 2 {
        debug!(areas = columns.len(), "flattening layout with fewer than two areas");
        return columns.into_iter().flatten().collect();
    }

    let mut attrs = Attrs::new();
    if let Some(layout) = block.layout.clone().filter(|v| !v.is_null()) {
        attrs.insert("layout".to_string(), layout);
    }
    let columns = columns
        .into_iter()
        .map(|blocks| Node::element(COLUMN, Attrs::new(), blocks))
        .collect();
    vec![Node::element(COLUMNS, attrs, columns)]
}
