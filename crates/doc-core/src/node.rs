use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attrs::Attrs;

pub const DOC: &str = "doc";
pub const TEXT: &str = "text";
pub const PARAGRAPH: &str = "paragraph";
pub const HARD_BREAK: &str = "hardBreak";

/// A node of the document tree. Children are shared through `Arc`, so a
/// mutated tree keeps pointing at every subtree it did not touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode", into = "RawNode")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub kind: String,
    pub attrs: Attrs,
    pub content: Vec<Arc<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub marks: Vec<Mark>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }
}

impl Node {
    pub fn element(kind: impl Into<String>, attrs: Attrs, content: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind: kind.into(),
            attrs,
            content: content.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn doc(content: Vec<Node>) -> Self {
        Self::element(DOC, Attrs::new(), content)
    }

    /// A document holding one empty paragraph.
    pub fn empty_doc() -> Self {
        Self::doc(vec![Self::element(PARAGRAPH, Attrs::new(), Vec::new())])
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Vec::new(),
        })
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    /// A paragraph with a single text child, or no children for `""`.
    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Self::text(text)]
        };
        Self::element(PARAGRAPH, Attrs::new(), content)
    }

    pub fn heading(level: u64, text: impl Into<String>) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert("level".to_string(), Value::from(level));
        let text = text.into();
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Self::text(text)]
        };
        Self::element("heading", attrs, content)
    }

    pub fn hard_break() -> Self {
        Self::element(HARD_BREAK, Attrs::new(), Vec::new())
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Node::Element(el) = &mut self {
            el.attrs.insert(name.into(), value.into());
        }
        self
    }

    pub fn kind(&self) -> &str {
        match self {
            Node::Element(el) => &el.kind,
            Node::Text(_) => TEXT,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.as_element().and_then(|el| el.attrs.get(name))
    }

    pub fn content(&self) -> &[Arc<Node>] {
        match self {
            Node::Element(el) => &el.content,
            Node::Text(_) => &[],
        }
    }

    pub fn child(&self, ix: usize) -> Option<&Node> {
        self.content().get(ix).map(|n| n.as_ref())
    }

    /// Concatenated text of every text leaf below this node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text_content(&mut out);
        out
    }

    fn push_text_content(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(el) => {
                for child in &el.content {
                    child.push_text_content(out);
                }
            }
        }
    }

    /// Visits every node below (and including) this one, depth first.
    pub fn descendants(&self, f: &mut dyn FnMut(&Node)) {
        f(self);
        for child in self.content() {
            child.descendants(f);
        }
    }
}

impl ElementNode {
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(|v| v.as_str())
    }

    pub fn text_content(&self) -> String {
        self.content.iter().map(|n| n.text_content()).collect()
    }
}

impl TextNode {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn has_mark(&self, kind: &str) -> bool {
        self.marks.iter().any(|m| m.kind == kind)
    }
}

#[derive(Serialize, Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<Mark>,
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        if raw.kind == TEXT {
            return Node::Text(TextNode {
                text: raw.text.unwrap_or_default(),
                marks: raw.marks,
            });
        }
        Node::element(raw.kind, raw.attrs, raw.content)
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        match node {
            Node::Text(t) => RawNode {
                kind: TEXT.to_string(),
                attrs: Attrs::new(),
                content: Vec::new(),
                text: Some(t.text),
                marks: t.marks,
            },
            Node::Element(el) => RawNode {
                kind: el.kind,
                attrs: el.attrs,
                content: el
                    .content
                    .into_iter()
                    .map(|n| Arc::try_unwrap(n).unwrap_or_else(|shared| (*shared).clone()))
                    .collect(),
                text: None,
                marks: Vec::new(),
            },
        }
    }
}

/// Merges neighbouring text leaves that carry identical marks and drops
/// empty ones.
pub fn normalize_inline(content: Vec<Arc<Node>>) -> Vec<Arc<Node>> {
    let mut out: Vec<Arc<Node>> = Vec::with_capacity(content.len());
    for node in content {
        if let Node::Text(t) = node.as_ref() {
            if t.text.is_empty() {
                continue;
            }
            if let Some(last) = out.last_mut() {
                if let Node::Text(prev) = last.as_ref() {
                    if prev.marks == t.marks {
                        let merged = format!("{}{}", prev.text, t.text);
                        *last = Arc::new(Node::marked_text(merged, t.marks.clone()));
                        continue;
                    }
                }
            }
        }
        out.push(node);
    }
    out
}
