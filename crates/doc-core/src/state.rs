use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::node::Node;
use crate::schema::Schema;

pub type Path = Vec<usize>;

/// Anchor/head pair over the flat position space of the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Replaces whichever of `doc` and `selection` is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    pub doc: Option<Node>,
    pub selection: Option<Selection>,
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doc(mut self, doc: Node) -> Self {
        self.doc = Some(doc);
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_none() && self.selection.is_none()
    }
}

/// A textblock located in the document: its path from the root and the flat
/// positions where its inline content starts and ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRange {
    pub path: Path,
    pub start: usize,
    pub end: usize,
}

impl BlockRange {
    /// Inline offset of `pos` inside this block, clamped to its content.
    pub fn offset_of(&self, pos: usize) -> usize {
        pos.clamp(self.start, self.end) - self.start
    }
}

/// Immutable snapshot of a document and its selection. Every edit produces a
/// new state; the previous one stays valid and shares unchanged subtrees.
#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Node,
    selection: Selection,
}

impl EditorState {
    /// State with the cursor at the start of the first textblock.
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        let mut state = Self {
            schema,
            doc,
            selection: Selection::default(),
        };
        state.selection = Selection::cursor(state.start_position());
        state
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = self.clamp(selection);
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Applies a transaction. A replaced document without a new selection
    /// keeps the old selection, clamped into the new document.
    pub fn apply(&self, tx: Transaction) -> EditorState {
        let doc = tx.doc.unwrap_or_else(|| self.doc.clone());
        let selection = tx.selection.unwrap_or(self.selection);
        let state = EditorState {
            schema: self.schema.clone(),
            doc,
            selection,
        };
        let selection = state.clamp(state.selection);
        EditorState { selection, ..state }
    }

    pub fn content_size(&self) -> usize {
        self.schema.content_size(&self.doc)
    }

    pub fn clamp(&self, selection: Selection) -> Selection {
        let max = self.content_size();
        Selection::new(selection.anchor.min(max), selection.head.min(max))
    }

    /// First position inside the first textblock, or 0.
    pub fn start_position(&self) -> usize {
        self.textblocks_between(0, self.content_size())
            .first()
            .map(|block| block.start)
            .unwrap_or(0)
    }

    pub fn end_position(&self) -> usize {
        self.textblocks_between(0, self.content_size())
            .last()
            .map(|block| block.end)
            .unwrap_or(0)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let mut node = &self.doc;
        for &ix in path {
            node = node.child(ix)?;
        }
        Some(node)
    }

    /// Nodes from the root down to (and including) the node at `path`.
    pub fn ancestors(&self, path: &[usize]) -> Vec<&Node> {
        let mut out = vec![&self.doc];
        let mut node = &self.doc;
        for &ix in path {
            match node.child(ix) {
                Some(child) => {
                    out.push(child);
                    node = child;
                }
                None => break,
            }
        }
        out
    }

    /// The textblock containing `pos`. Positions between blocks resolve to
    /// the next textblock, or the last one at the end of the document.
    pub fn textblock_at(&self, pos: usize) -> Option<BlockRange> {
        if let Some(block) = self.textblocks_between(pos, pos).into_iter().next() {
            return Some(block);
        }
        let all = self.textblocks_between(0, self.content_size());
        let next = all.iter().position(|block| block.start >= pos);
        match next {
            Some(ix) => all.into_iter().nth(ix),
            None => all.into_iter().last(),
        }
    }

    /// Every textblock whose content overlaps `[from, to]`, in document order.
    pub fn textblocks_between(&self, from: usize, to: usize) -> Vec<BlockRange> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        collect_textblocks(&self.schema, &self.doc, 0, &mut path, from, to, &mut out);
        out
    }

    /// Textblocks touched by the current selection.
    pub fn selected_textblocks(&self) -> Vec<BlockRange> {
        let blocks = self.textblocks_between(self.selection.from(), self.selection.to());
        if blocks.is_empty() {
            return self.textblock_at(self.selection.head).into_iter().collect();
        }
        blocks
    }
}

impl PartialEq for EditorState {
    fn eq(&self, other: &Self) -> bool {
        self.doc == other.doc && self.selection == other.selection
    }
}

fn collect_textblocks(
    schema: &Schema,
    node: &Node,
    content_start: usize,
    path: &mut Path,
    from: usize,
    to: usize,
    out: &mut Vec<BlockRange>,
) {
    let mut pos = content_start;
    for (ix, child) in node.content().iter().enumerate() {
        let size = schema.node_size(child);
        let end = pos + size;
        if child.is_text() || schema.is_leaf(child.kind()) {
            pos = end;
            continue;
        }

        let inner_start = pos + 1;
        let inner_end = end - 1;
        path.push(ix);
        if schema.is_textblock(child.kind()) {
            if inner_start <= to && inner_end >= from {
                out.push(BlockRange {
                    path: path.clone(),
                    start: inner_start,
                    end: inner_end,
                });
            }
        } else if inner_start <= to && inner_end >= from {
            collect_textblocks(schema, child, inner_start, path, from, to, out);
        }
        path.pop();
        pos = end;
    }
}
