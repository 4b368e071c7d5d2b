//! Bridge between the document tree and the flat, Slate-style block array
//! the persistence layer stores.
//!
//! The stored format has no attribute slot for anchors, code languages or
//! callout variants. Those travel as zero-width markers prefixed onto the
//! first text run of a block (see [`marker`]).

mod forward;
pub mod marker;
mod reverse;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use forward::legacy_to_tree;
pub use reverse::tree_to_legacy;

/// A stored document: the top-level block array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyDocument(pub Vec<LegacyNode>);

impl LegacyDocument {
    pub fn new(nodes: Vec<LegacyNode>) -> Self {
        Self(nodes)
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn nodes(&self) -> &[LegacyNode] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyNode {
    Text(LegacyText),
    Block(LegacyBlock),
}

impl LegacyNode {
    pub fn text(text: impl Into<String>) -> Self {
        LegacyNode::Text(LegacyText::new(text))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyBlock {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "href")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,

    #[serde(default)]
    pub children: Vec<LegacyNode>,
}

impl LegacyBlock {
    pub fn new(kind: impl Into<String>, children: Vec<LegacyNode>) -> Self {
        Self {
            kind: kind.into(),
            children,
            ..Default::default()
        }
    }
}

/// A text run. Formatting flags are omitted when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyText {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "strikeThrough")]
    pub strikethrough: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "href")]
    pub url: Option<String>,
}

impl LegacyText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Same formatting, ignoring the text.
    pub fn same_format(&self, other: &LegacyText) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.underline == other.underline
            && self.strikethrough == other.strikethrough
            && self.code == other.code
            && self.url == other.url
    }
}
