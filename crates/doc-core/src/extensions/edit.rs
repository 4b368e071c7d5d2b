//! Editing primitives shared by the built-in commands.

use std::ops::Range;
use std::sync::Arc;

use serde_json::Value;

use crate::attrs::Attrs;
use crate::commands::CommandContext;
use crate::node::{ElementNode, HARD_BREAK, Mark, Node, TEXT, normalize_inline};
use crate::schema::Schema;
use crate::state::{BlockRange, EditorState, Path, Selection, Transaction};
use crate::transform::{
    delete_inline, insert_inline, map_marks, marks_at, splice_children, split_inline,
    text_in_range, update_at,
};

pub(crate) const LIST_ITEM: &str = "listItem";
pub(crate) const LIST_KINDS: &[&str] = &["bulletList", "orderedList"];

/// Textblock holding the selection head, with its element.
pub(crate) fn head_block(state: &EditorState) -> Option<(BlockRange, &ElementNode)> {
    let block = state.textblock_at(state.selection().head)?;
    let el = state.node_at(&block.path)?.as_element()?;
    Some((block, el))
}

/// Path of the nearest node of one of `kinds` enclosing the selection head,
/// the head textblock itself included.
pub(crate) fn find_ancestor(state: &EditorState, kinds: &[&str]) -> Option<Path> {
    let block = state.textblock_at(state.selection().head)?;
    let ancestors = state.ancestors(&block.path);
    ancestors
        .iter()
        .enumerate()
        .rev()
        .find(|(_, node)| kinds.contains(&node.kind()))
        .map(|(depth, _)| block.path[..depth].to_vec())
}

/// A bare string argument, or the string field `key` of an object.
pub(crate) fn string_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    match args {
        Value::String(s) => Some(s),
        other => other.get(key).and_then(|v| v.as_str()),
    }
}

/// Object arguments as an attribute map; anything else is empty.
pub(crate) fn attrs_arg(args: &Value, key: &str) -> Attrs {
    args.get(key)
        .and_then(|v| v.as_object())
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// Dispatches a new document, carrying the selection over by textblock
/// position: each selection end stays in the same (n-th) textblock at the
/// same inline offset.
pub(crate) fn commit_doc(ctx: &mut CommandContext, doc: Node, source: &str) -> bool {
    let next = ctx.state().apply(Transaction::new().doc(doc.clone()));
    let selection = remap_selection(ctx.state(), &next);
    ctx.dispatch(
        Transaction::new()
            .doc(doc)
            .selection(selection)
            .source(format!("command:{source}")),
    );
    true
}

fn block_anchor(state: &EditorState, pos: usize) -> Option<(usize, usize)> {
    let all = state.textblocks_between(0, state.content_size());
    let ix = all
        .iter()
        .position(|b| b.start <= pos && pos <= b.end)
        .or_else(|| all.iter().position(|b| b.start >= pos))
        .or_else(|| all.len().checked_sub(1))?;
    Some((ix, all[ix].offset_of(pos)))
}

fn remap_selection(old: &EditorState, new: &EditorState) -> Selection {
    let blocks = new.textblocks_between(0, new.content_size());
    let map = |pos: usize| -> usize {
        let Some((ix, offset)) = block_anchor(old, pos) else {
            return 0;
        };
        blocks
            .get(ix)
            .or(blocks.last())
            .map(|b| (b.start + offset).min(b.end))
            .unwrap_or(0)
    };
    let selection = old.selection();
    Selection::new(map(selection.anchor), map(selection.head))
}

fn kinds_of(content: &[Arc<Node>]) -> Vec<&str> {
    content.iter().map(|c| c.kind()).collect()
}

/// Whether the node at `parent` stays legal with `range` of its children
/// replaced by nodes of `kinds`.
pub(crate) fn allows_replacing(
    schema: &Schema,
    doc: &Node,
    parent: &[usize],
    range: Range<usize>,
    kinds: &[&str],
) -> bool {
    let mut node = doc;
    for &ix in parent {
        match node.child(ix) {
            Some(child) => node = child,
            None => return false,
        }
    }
    let current = kinds_of(node.content());
    if range.end > current.len() || range.start > range.end {
        return false;
    }
    let mut next: Vec<&str> = current[..range.start].to_vec();
    next.extend_from_slice(kinds);
    next.extend_from_slice(&current[range.end..]);
    schema.allows_children(node.kind(), &next)
}

/// Converts every selected textblock to `kind`. Attributes the target type
/// declares are carried over, then `attrs` is merged in (null removes).
pub(crate) fn set_block_type(
    ctx: &mut CommandContext,
    kind: &str,
    attrs: Attrs,
    source: &str,
) -> bool {
    let state = ctx.state();
    let schema = state.schema().clone();
    let Some(def) = schema.node(kind) else {
        return false;
    };
    if !schema.is_textblock(kind) {
        return false;
    }
    let blocks = state.selected_textblocks();
    if blocks.is_empty() {
        return false;
    }

    let mut doc = state.doc().clone();
    for block in &blocks {
        let Some(Node::Element(el)) = state.node_at(&block.path) else {
            continue;
        };
        let Some((&ix, parent)) = block.path.split_last() else {
            continue;
        };
        if !allows_replacing(&schema, &doc, parent, ix..ix + 1, &[kind]) {
            return false;
        }

        let mut next_attrs: Attrs = el
            .attrs
            .iter()
            .filter(|(name, _)| def.attributes.contains_key(*name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        merge_attrs(&mut next_attrs, &attrs);

        let source_is_code = schema.node(&el.kind).is_some_and(|d| d.code);
        let content = if def.code {
            code_content(&el.content)
        } else if source_is_code {
            text_with_breaks(&el.text_content(), Vec::new())
        } else {
            el.content
                .iter()
                .map(|child| strip_disallowed_marks(&schema, def.name.as_str(), child))
                .collect()
        };

        let next = Node::Element(ElementNode {
            kind: kind.to_string(),
            attrs: next_attrs,
            content: normalize_inline(content),
        });
        update_at(&mut doc, &block.path, |node| *node = next);
    }
    commit_doc(ctx, doc, source)
}

pub(crate) fn merge_attrs(target: &mut Attrs, patch: &Attrs) {
    for (name, value) in patch {
        if value.is_null() {
            target.remove(name);
        } else {
            target.insert(name.clone(), value.clone());
        }
    }
}

/// Inline content flattened to one unmarked text node, hard breaks as `\n`.
fn code_content(content: &[Arc<Node>]) -> Vec<Arc<Node>> {
    let mut text = String::new();
    for child in content {
        match child.as_ref() {
            Node::Text(t) => text.push_str(&t.text),
            other if other.kind() == HARD_BREAK => text.push('\n'),
            _ => {}
        }
    }
    if text.is_empty() {
        return Vec::new();
    }
    vec![Arc::new(Node::text(text))]
}

/// Text split on `\n` into text nodes separated by hard breaks.
pub(crate) fn text_with_breaks(text: &str, marks: Vec<Mark>) -> Vec<Arc<Node>> {
    let mut out = Vec::new();
    for (ix, line) in text.split('\n').enumerate() {
        if ix > 0 {
            out.push(Arc::new(Node::hard_break()));
        }
        if !line.is_empty() {
            out.push(Arc::new(Node::marked_text(line, marks.clone())));
        }
    }
    out
}

fn strip_disallowed_marks(schema: &Schema, kind: &str, node: &Arc<Node>) -> Arc<Node> {
    let Some(def) = schema.node(kind) else {
        return node.clone();
    };
    match node.as_ref() {
        Node::Text(t) if t.marks.iter().any(|m| !def.allows_mark(&m.kind)) => {
            let marks = t
                .marks
                .iter()
                .filter(|m| def.allows_mark(&m.kind))
                .cloned()
                .collect();
            Arc::new(Node::marked_text(t.text.clone(), marks))
        }
        _ => node.clone(),
    }
}

/// Wraps the sibling blocks spanned by the selection into a `kind` node,
/// each one first wrapped into `item` when given.
pub(crate) fn wrap_blocks(
    ctx: &mut CommandContext,
    kind: &str,
    attrs: Attrs,
    item: Option<&str>,
    source: &str,
) -> bool {
    let state = ctx.state();
    let schema = state.schema().clone();
    if schema.node(kind).is_none() {
        return false;
    }
    let blocks = state.selected_textblocks();
    let (Some(first), Some(last)) = (blocks.first(), blocks.last()) else {
        return false;
    };

    let common = first
        .path
        .iter()
        .zip(&last.path)
        .take_while(|(a, b)| a == b)
        .count();
    let depth = common.min(first.path.len() - 1).min(last.path.len() - 1);
    let parent = &first.path[..depth];
    let range = first.path[depth]..last.path[depth] + 1;

    let Some(parent_node) = state.node_at(parent) else {
        return false;
    };
    let Some(children) = parent_node.content().get(range.clone()) else {
        return false;
    };

    let mut inner = Vec::with_capacity(children.len());
    for child in children {
        match item {
            Some(item_kind) => {
                if !schema.allows_children(item_kind, &[child.kind()]) {
                    return false;
                }
                inner.push(Node::Element(ElementNode {
                    kind: item_kind.to_string(),
                    attrs: Attrs::new(),
                    content: vec![child.clone()],
                }));
            }
            None => inner.push(child.as_ref().clone()),
        }
    }

    let inner_kinds: Vec<&str> = inner.iter().map(|n| n.kind()).collect();
    if !schema.allows_children(kind, &inner_kinds) {
        return false;
    }
    if !allows_replacing(&schema, state.doc(), parent, range.clone(), &[kind]) {
        return false;
    }

    let wrapper = Node::element(kind, attrs, inner);
    let mut doc = state.doc().clone();
    let parent = parent.to_vec();
    if !splice_children(&mut doc, &parent, range, vec![wrapper]) {
        return false;
    }
    commit_doc(ctx, doc, source)
}

/// Replaces the node at `path` with its children. Children of kind
/// `flatten` are replaced by their own children.
pub(crate) fn unwrap_node(
    ctx: &mut CommandContext,
    path: &[usize],
    flatten: Option<&str>,
    source: &str,
) -> bool {
    let state = ctx.state();
    let schema = state.schema().clone();
    let Some((&ix, parent)) = path.split_last() else {
        return false;
    };
    let Some(node) = state.node_at(path) else {
        return false;
    };

    let mut lifted: Vec<Node> = Vec::new();
    for child in node.content() {
        if Some(child.kind()) == flatten {
            lifted.extend(child.content().iter().map(|c| c.as_ref().clone()));
        } else {
            lifted.push(child.as_ref().clone());
        }
    }
    let kinds: Vec<&str> = lifted.iter().map(|n| n.kind()).collect();
    if !allows_replacing(&schema, state.doc(), parent, ix..ix + 1, &kinds) {
        return false;
    }

    let mut doc = state.doc().clone();
    let parent = parent.to_vec();
    if !splice_children(&mut doc, &parent, ix..ix + 1, lifted) {
        return false;
    }
    commit_doc(ctx, doc, source)
}

/// Inserts block nodes after the block holding the selection head, at the
/// deepest level that accepts them.
pub(crate) fn insert_blocks(ctx: &mut CommandContext, nodes: Vec<Node>, source: &str) -> bool {
    if nodes.is_empty() {
        return false;
    }
    let state = ctx.state();
    let schema = state.schema().clone();
    let kinds: Vec<&str> = nodes.iter().map(|n| n.kind()).collect();

    let path = state
        .textblock_at(state.selection().head)
        .map(|b| b.path)
        .unwrap_or_default();

    let mut target = None;
    for depth in (1..=path.len()).rev() {
        let parent = &path[..depth - 1];
        let ix = path[depth - 1] + 1;
        if allows_replacing(&schema, state.doc(), parent, ix..ix, &kinds) {
            target = Some((parent.to_vec(), ix));
            break;
        }
    }
    if target.is_none() && path.is_empty() {
        let end = state.doc().content().len();
        if allows_replacing(&schema, state.doc(), &[], end..end, &kinds) {
            target = Some((Vec::new(), end));
        }
    }
    let Some((parent, ix)) = target else {
        return false;
    };

    let mut doc = state.doc().clone();
    if !splice_children(&mut doc, &parent, ix..ix, nodes) {
        return false;
    }
    commit_doc(ctx, doc, source)
}

/// Inline offsets of the selection inside the head textblock, or `None` when
/// the selection leaves that block.
pub(crate) fn inline_range(state: &EditorState) -> Option<(BlockRange, usize, usize)> {
    let selection = state.selection();
    let block = state.textblock_at(selection.head)?;
    if !selection.is_collapsed() && (selection.from() < block.start || selection.to() > block.end) {
        return None;
    }
    let from = block.offset_of(selection.from());
    let to = block.offset_of(selection.to());
    Some((block, from, to))
}

/// Replaces the selection (within one textblock) with `nodes`, placing the
/// cursor after them.
pub(crate) fn replace_inline(ctx: &mut CommandContext, nodes: Vec<Node>, source: &str) -> bool {
    let state = ctx.state();
    let schema = state.schema().clone();
    let Some((block, from, to)) = inline_range(state) else {
        return false;
    };
    let Some(el) = state.node_at(&block.path).and_then(|n| n.as_element()) else {
        return false;
    };

    let inserted: usize = nodes.iter().map(|n| schema.node_size(n)).sum();
    let content = delete_inline(&schema, &el.content, from, to);
    let content = insert_inline(&schema, &content, from, nodes);
    let kinds = kinds_of(&content);
    if !schema.allows_children(&el.kind, &kinds) {
        return false;
    }

    let mut doc = state.doc().clone();
    update_at(&mut doc, &block.path, |node| {
        if let Node::Element(el) = node {
            el.content = content;
        }
    });
    let cursor = block.start + from + inserted;
    ctx.dispatch(
        Transaction::new()
            .doc(doc)
            .selection(Selection::cursor(cursor))
            .source(format!("command:{source}")),
    );
    true
}

/// Marks typed text at the cursor inherits, restricted to what the block
/// allows.
pub(crate) fn typing_marks(state: &EditorState) -> Vec<Mark> {
    let Some((block, from, _)) = inline_range(state) else {
        return Vec::new();
    };
    let schema = state.schema();
    let Some(el) = state.node_at(&block.path).and_then(|n| n.as_element()) else {
        return Vec::new();
    };
    let Some(def) = schema.node(&el.kind) else {
        return Vec::new();
    };
    marks_at(schema, &el.content, from)
        .into_iter()
        .filter(|m| def.allows_mark(&m.kind))
        .collect()
}

/// Rewrites the mark sets of text inside the selection, block by block.
/// Returns `false` when the selection is collapsed or nothing changed.
pub(crate) fn update_marks(
    ctx: &mut CommandContext,
    source: &str,
    f: &dyn Fn(&Schema, &str, &[Mark]) -> Vec<Mark>,
) -> bool {
    let state = ctx.state();
    let selection = state.selection();
    if selection.is_collapsed() {
        return false;
    }
    let schema = state.schema().clone();
    let mut doc = state.doc().clone();
    let mut changed = false;

    for block in state.textblocks_between(selection.from(), selection.to()) {
        let Some(el) = state.node_at(&block.path).and_then(|n| n.as_element()) else {
            continue;
        };
        let from = block.offset_of(selection.from());
        let to = block.offset_of(selection.to());
        if from == to {
            continue;
        }
        let kind = el.kind.clone();
        let content = map_marks(&schema, &el.content, from, to, &|marks| f(&schema, &kind, marks));
        if content != el.content {
            changed = true;
            update_at(&mut doc, &block.path, |node| {
                if let Node::Element(el) = node {
                    el.content = content;
                }
            });
        }
    }

    if !changed {
        return false;
    }
    ctx.dispatch(
        Transaction::new()
            .doc(doc)
            .selection(selection)
            .source(format!("command:{source}")),
    );
    true
}

pub(crate) fn add_mark(ctx: &mut CommandContext, mark: Mark, source: &str) -> bool {
    if ctx.schema().mark(&mark.kind).is_none() {
        return false;
    }
    update_marks(ctx, source, &|schema, block_kind, marks| {
        let allowed = schema.node(block_kind).is_some_and(|def| def.allows_mark(&mark.kind));
        if !allowed {
            return marks.to_vec();
        }
        schema
            .add_mark(marks, mark.clone())
            .unwrap_or_else(|| marks.to_vec())
    })
}

pub(crate) fn remove_mark(ctx: &mut CommandContext, kind: &str, source: &str) -> bool {
    update_marks(ctx, source, &|_, _, marks| {
        marks.iter().filter(|m| m.kind != kind).cloned().collect()
    })
}

/// Every text node in the selection carries `kind`; at a cursor, the marks
/// typing would inherit include it.
pub(crate) fn mark_active(state: &EditorState, kind: &str) -> bool {
    let selection = state.selection();
    if selection.is_collapsed() {
        return typing_marks(state).iter().any(|m| m.kind == kind);
    }
    let schema = state.schema();
    let mut seen = false;
    for block in state.textblocks_between(selection.from(), selection.to()) {
        let Some(el) = state.node_at(&block.path).and_then(|n| n.as_element()) else {
            continue;
        };
        let from = block.offset_of(selection.from());
        let to = block.offset_of(selection.to());
        for text in text_in_range(schema, &el.content, from, to) {
            if !text.has_mark(kind) {
                return false;
            }
            seen = true;
        }
    }
    seen
}

pub(crate) fn toggle_mark(ctx: &mut CommandContext, mark: Mark, source: &str) -> bool {
    if mark_active(ctx.state(), &mark.kind) {
        remove_mark(ctx, &mark.kind, source)
    } else {
        add_mark(ctx, mark, source)
    }
}

/// Splits the head textblock at the cursor. Splitting at the end of a
/// non-paragraph block continues with a paragraph; the new block never
/// inherits `blockId`.
pub(crate) fn split_block(ctx: &mut CommandContext, source: &str) -> bool {
    let state = ctx.state();
    let schema = state.schema().clone();
    let Some((block, from, to)) = inline_range(state) else {
        return false;
    };
    let Some(el) = state.node_at(&block.path).and_then(|n| n.as_element()) else {
        return false;
    };
    if schema.node(&el.kind).is_some_and(|def| def.code) {
        return replace_inline(ctx, vec![Node::text("\n")], source);
    }

    let content = delete_inline(&schema, &el.content, from, to);
    let (before, after) = split_inline(&schema, &content, from);
    let before = normalize_inline(before);
    let after = normalize_inline(after);

    let paragraph = crate::node::PARAGRAPH;
    let leaves_block = after.is_empty() && el.kind != paragraph;
    let (next_kind, mut next_attrs) = if leaves_block && schema.node(paragraph).is_some() {
        let keep = schema
            .node(paragraph)
            .map(|def| def.attributes.clone())
            .unwrap_or_default();
        let attrs: Attrs = el
            .attrs
            .iter()
            .filter(|(k, _)| keep.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        (paragraph.to_string(), attrs)
    } else {
        (el.kind.clone(), el.attrs.clone())
    };
    next_attrs.remove("blockId");

    let Some((&ix, parent)) = block.path.split_last() else {
        return false;
    };
    let kinds = [el.kind.as_str(), next_kind.as_str()];
    if !allows_replacing(&schema, state.doc(), parent, ix..ix + 1, &kinds) {
        return false;
    }

    let first = Node::Element(ElementNode {
        kind: el.kind.clone(),
        attrs: el.attrs.clone(),
        content: before,
    });
    let second = Node::Element(ElementNode {
        kind: next_kind,
        attrs: next_attrs,
        content: after,
    });

    let mut doc = state.doc().clone();
    let parent = parent.to_vec();
    if !splice_children(&mut doc, &parent, ix..ix + 1, vec![first, second]) {
        return false;
    }
    let cursor = block.start + from + 2;
    ctx.dispatch(
        Transaction::new()
            .doc(doc)
            .selection(Selection::cursor(cursor))
            .source(format!("command:{source}")),
    );
    true
}

/// Updates attributes on the nearest node of type `kind` around the head
/// of every selected textblock. Keys the type does not declare are ignored.
pub(crate) fn update_attributes(
    ctx: &mut CommandContext,
    kind: &str,
    patch: &Attrs,
    source: &str,
) -> bool {
    let state = ctx.state();
    let schema = state.schema().clone();
    let Some(def) = schema.node(kind) else {
        return false;
    };
    let patch: Attrs = patch
        .iter()
        .filter(|(k, _)| def.attributes.contains_key(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if patch.is_empty() {
        return false;
    }

    let mut targets: Vec<Path> = Vec::new();
    for block in state.selected_textblocks() {
        let ancestors = state.ancestors(&block.path);
        if let Some(depth) = ancestors.iter().rposition(|n| n.kind() == kind) {
            let path = block.path[..depth].to_vec();
            if !targets.contains(&path) {
                targets.push(path);
            }
        }
    }
    if targets.is_empty() {
        return false;
    }

    let mut doc = state.doc().clone();
    for path in &targets {
        update_at(&mut doc, path, |node| {
            if let Node::Element(el) = node {
                merge_attrs(&mut el.attrs, &patch);
            }
        });
    }
    commit_doc(ctx, doc, source)
}

/// Nodes from JSON: a single node object or an array of them.
pub(crate) fn nodes_from_value(schema: &Schema, value: &Value) -> Option<Vec<Node>> {
    let nodes: Vec<Node> = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).ok())
            .collect::<Option<Vec<_>>>()?,
        Value::Object(_) => vec![serde_json::from_value(value.clone()).ok()?],
        _ => return None,
    };
    let probe = Node::doc(nodes.clone());
    schema.validate(&probe).ok()?;
    Some(nodes)
}

pub(crate) fn is_inline_content(schema: &Schema, nodes: &[Node]) -> bool {
    nodes.iter().all(|n| n.kind() == TEXT || schema.is_inline(n.kind()))
}
