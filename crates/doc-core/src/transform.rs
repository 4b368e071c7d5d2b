//! Copy-on-write tree edits. Every function takes the root by `&mut` and
//! clones only the nodes along the edited path (`Arc::make_mut`), so the
//! previous document keeps sharing every untouched subtree.

use std::sync::Arc;

use crate::node::{Mark, Node, TextNode, normalize_inline};
use crate::schema::Schema;

/// Runs `f` on the node at `path`. Returns `None` when the path does not exist.
pub(crate) fn update_at<R>(
    node: &mut Node,
    path: &[usize],
    f: impl FnOnce(&mut Node) -> R,
) -> Option<R> {
    let Some((first, rest)) = path.split_first() else {
        return Some(f(node));
    };
    let Node::Element(el) = node else {
        return None;
    };
    let child = el.content.get_mut(*first)?;
    update_at(Arc::make_mut(child), rest, f)
}

/// Replaces the children of the node at `parent` in `range` with `nodes`.
pub(crate) fn splice_children(
    root: &mut Node,
    parent: &[usize],
    range: std::ops::Range<usize>,
    nodes: Vec<Node>,
) -> bool {
    update_at(root, parent, |node| match node {
        Node::Element(el) if range.start <= range.end && range.end <= el.content.len() => {
            el.content
                .splice(range, nodes.into_iter().map(Arc::new));
            true
        }
        _ => false,
    })
    .unwrap_or(false)
}

/// Splits inline content at `offset`, cutting a text node in two if needed.
pub(crate) fn split_inline(
    schema: &Schema,
    content: &[Arc<Node>],
    offset: usize,
) -> (Vec<Arc<Node>>, Vec<Arc<Node>>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut pos = 0;
    for node in content {
        let size = schema.node_size(node);
        if pos + size <= offset {
            before.push(node.clone());
        } else if pos >= offset {
            after.push(node.clone());
        } else if let Node::Text(t) = node.as_ref() {
            let cut = offset - pos;
            let head: String = t.text.chars().take(cut).collect();
            let tail: String = t.text.chars().skip(cut).collect();
            before.push(Arc::new(Node::marked_text(head, t.marks.clone())));
            after.push(Arc::new(Node::marked_text(tail, t.marks.clone())));
        } else {
            after.push(node.clone());
        }
        pos += size;
    }
    (before, after)
}

/// Applies `f` to the mark set of every text node within `[from, to)`.
pub(crate) fn map_marks(
    schema: &Schema,
    content: &[Arc<Node>],
    from: usize,
    to: usize,
    f: &dyn Fn(&[Mark]) -> Vec<Mark>,
) -> Vec<Arc<Node>> {
    let (head, rest) = split_inline(schema, content, from);
    let (middle, tail) = split_inline(schema, &rest, to.saturating_sub(from));
    let middle = middle.into_iter().map(|node| match node.as_ref() {
        Node::Text(t) => Arc::new(Node::Text(TextNode {
            text: t.text.clone(),
            marks: f(&t.marks),
        })),
        _ => node,
    });
    let joined = head.into_iter().chain(middle).chain(tail).collect();
    normalize_inline(joined)
}

/// Text nodes within `[from, to)`, cut to the range.
pub(crate) fn text_in_range(
    schema: &Schema,
    content: &[Arc<Node>],
    from: usize,
    to: usize,
) -> Vec<TextNode> {
    let (_, rest) = split_inline(schema, content, from);
    let (middle, _) = split_inline(schema, &rest, to.saturating_sub(from));
    middle
        .iter()
        .filter_map(|n| n.as_text().cloned())
        .filter(|t| !t.text.is_empty())
        .collect()
}

pub(crate) fn insert_inline(
    schema: &Schema,
    content: &[Arc<Node>],
    offset: usize,
    nodes: Vec<Node>,
) -> Vec<Arc<Node>> {
    let (head, tail) = split_inline(schema, content, offset);
    let joined = head
        .into_iter()
        .chain(nodes.into_iter().map(Arc::new))
        .chain(tail)
        .collect();
    normalize_inline(joined)
}

pub(crate) fn delete_inline(
    schema: &Schema,
    content: &[Arc<Node>],
    from: usize,
    to: usize,
) -> Vec<Arc<Node>> {
    let (head, rest) = split_inline(schema, content, from);
    let (_, tail) = split_inline(schema, &rest, to.saturating_sub(from));
    normalize_inline(head.into_iter().chain(tail).collect())
}

/// Marks a character typed at `offset` inherits: those of the text before
/// it, or of the text after it at the start of a block. Non-inclusive marks
/// do not extend past their end.
pub(crate) fn marks_at(schema: &Schema, content: &[Arc<Node>], offset: usize) -> Vec<Mark> {
    let (before, after) = split_inline(schema, content, offset);
    if let Some(t) = before.last().and_then(|n| n.as_text()) {
        let at_end = after
            .first()
            .and_then(|n| n.as_text())
            .is_none_or(|next| next.marks != t.marks);
        return t
            .marks
            .iter()
            .filter(|m| !at_end || schema.mark(&m.kind).is_none_or(|def| def.inclusive))
            .cloned()
            .collect();
    }
    if offset == 0 {
        if let Some(t) = after.first().and_then(|n| n.as_text()) {
            return t.marks.clone();
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::build_schema;
    use crate::extensions::starter_kit;

    fn content(nodes: Vec<Node>) -> Vec<Arc<Node>> {
        nodes.into_iter().map(Arc::new).collect()
    }

    #[test]
    fn split_counts_characters_not_bytes() {
        let schema = build_schema(&starter_kit());
        let inline = content(vec![Node::text("héllo"), Node::hard_break(), Node::text("wörld")]);
        let (before, after) = split_inline(&schema, &inline, 2);
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].text_content(), "hé");
        assert_eq!(after[0].text_content(), "llo");

        let (before, after) = split_inline(&schema, &inline, 6);
        assert_eq!(before.len(), 2);
        assert_eq!(after[0].text_content(), "wörld");
    }

    #[test]
    fn mapping_marks_merges_equal_neighbours() {
        let schema = build_schema(&starter_kit());
        let bold = vec![Mark::new("bold")];
        let inline = content(vec![Node::marked_text("ab", bold.clone()), Node::text("cd")]);
        let mapped = map_marks(&schema, &inline, 2, 4, &|_| bold.clone());
        assert_eq!(mapped, content(vec![Node::marked_text("abcd", bold.clone())]));

        let cleared = delete_inline(&schema, &mapped, 1, 3);
        assert_eq!(cleared, content(vec![Node::marked_text("ad", bold)]));
    }

    #[test]
    fn typing_after_a_link_does_not_extend_it() {
        let schema = build_schema(&starter_kit());
        let link = Mark::new("link").with_attr("href", "/a");
        let inline = content(vec![
            Node::marked_text("go", vec![Mark::new("bold"), link.clone()]),
            Node::text(" on"),
        ]);
        assert_eq!(marks_at(&schema, &inline, 1), vec![Mark::new("bold"), link.clone()]);
        assert_eq!(marks_at(&schema, &inline, 2), vec![Mark::new("bold")]);
        assert_eq!(marks_at(&schema, &inline, 0), vec![Mark::new("bold"), link]);
        assert!(marks_at(&schema, &inline, 3).is_empty());
    }
}
