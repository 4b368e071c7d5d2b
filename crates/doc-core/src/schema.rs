use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::attrs::{AttributeSpec, Attrs, ParseRule};
use crate::content::ContentExpr;
use crate::error::SchemaError;
use crate::markup::MarkupNode;
use crate::node::{DOC, ElementNode, Mark, Node, TEXT};

pub type NodeRenderFn = Arc<dyn Fn(&ElementNode, &Schema) -> MarkupNode + Send + Sync>;
pub type MarkRenderFn = Arc<dyn Fn(&Mark) -> MarkupNode + Send + Sync>;

#[derive(Clone)]
pub struct NodeDefinition {
    pub name: String,
    /// Space separated group names, e.g. `"block"` or `"inline"`.
    pub group: String,
    pub content: String,
    /// Allowed marks: `None` allows all, `Some("")` allows none.
    pub marks: Option<String>,
    pub inline: bool,
    pub atom: bool,
    pub draggable: bool,
    pub defining: bool,
    pub isolating: bool,
    /// Content is raw text (code blocks).
    pub code: bool,
    pub attributes: BTreeMap<String, AttributeSpec>,
    pub parse_rules: Vec<ParseRule>,
    pub render: Option<NodeRenderFn>,
}

impl NodeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: String::new(),
            content: String::new(),
            marks: None,
            inline: false,
            atom: false,
            draggable: false,
            defining: false,
            isolating: false,
            code: false,
            attributes: BTreeMap::new(),
            parse_rules: Vec::new(),
            render: None,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn marks(mut self, marks: impl Into<String>) -> Self {
        self.marks = Some(marks.into());
        self
    }

    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    pub fn atom(mut self, atom: bool) -> Self {
        self.atom = atom;
        self
    }

    pub fn draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    pub fn defining(mut self, defining: bool) -> Self {
        self.defining = defining;
        self
    }

    pub fn isolating(mut self, isolating: bool) -> Self {
        self.isolating = isolating;
        self
    }

    pub fn code(mut self, code: bool) -> Self {
        self.code = code;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attributes.insert(name.into(), spec);
        self
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse_rules.push(rule);
        self
    }

    pub fn render(
        mut self,
        render: impl Fn(&ElementNode, &Schema) -> MarkupNode + Send + Sync + 'static,
    ) -> Self {
        self.render = Some(Arc::new(render));
        self
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.group.split_whitespace().any(|g| g == group)
    }

    pub fn allows_mark(&self, mark: &str) -> bool {
        match self.marks.as_deref() {
            None => true,
            Some("_") => true,
            Some(list) => list.split_whitespace().any(|m| m == mark),
        }
    }

    /// Declared default, or null for attributes the node does not know.
    pub fn attr_default(&self, name: &str) -> Value {
        self.attributes
            .get(name)
            .map(|spec| spec.default.clone())
            .unwrap_or(Value::Null)
    }

    /// The attribute value on `el`, falling back to the declared default.
    pub fn attr_or_default(&self, el: &ElementNode, name: &str) -> Value {
        el.attrs
            .get(name)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| self.attr_default(name))
    }
}

impl PartialEq for NodeDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.group == other.group
            && self.content == other.content
            && self.marks == other.marks
            && self.inline == other.inline
            && self.atom == other.atom
            && self.draggable == other.draggable
            && self.defining == other.defining
            && self.isolating == other.isolating
            && self.code == other.code
            && self.attributes == other.attributes
            && self.parse_rules == other.parse_rules
            && self.render.is_some() == other.render.is_some()
    }
}

impl fmt::Debug for NodeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDefinition")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("content", &self.content)
            .field("inline", &self.inline)
            .field("atom", &self.atom)
            .field("attributes", &self.attributes)
            .field("parse_rules", &self.parse_rules)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct MarkDefinition {
    pub name: String,
    pub attributes: BTreeMap<String, AttributeSpec>,
    pub parse_rules: Vec<ParseRule>,
    /// Marks that cannot coexist with this one on the same text.
    pub excludes: BTreeSet<String>,
    pub inclusive: bool,
    pub render: Option<MarkRenderFn>,
}

impl MarkDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            parse_rules: Vec::new(),
            excludes: BTreeSet::new(),
            inclusive: true,
            render: None,
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attributes.insert(name.into(), spec);
        self
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse_rules.push(rule);
        self
    }

    pub fn excludes<I, S>(mut self, marks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = marks.into_iter().map(Into::into).collect();
        self
    }

    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }

    pub fn render(mut self, render: impl Fn(&Mark) -> MarkupNode + Send + Sync + 'static) -> Self {
        self.render = Some(Arc::new(render));
        self
    }
}

impl PartialEq for MarkDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.parse_rules == other.parse_rules
            && self.excludes == other.excludes
            && self.inclusive == other.inclusive
            && self.render.is_some() == other.render.is_some()
    }
}

impl fmt::Debug for MarkDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkDefinition")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .field("excludes", &self.excludes)
            .field("inclusive", &self.inclusive)
            .finish_non_exhaustive()
    }
}

/// Node and mark tables. Immutable once built; share it behind an `Arc`.
pub struct Schema {
    nodes: Vec<NodeDefinition>,
    node_index: HashMap<String, usize>,
    marks: Vec<MarkDefinition>,
    mark_index: HashMap<String, usize>,
    content: HashMap<String, Result<ContentExpr, SchemaError>>,
}

impl Schema {
    /// Registers definitions in order. A name registered twice keeps the
    /// position of its first registration but the definition of its last:
    /// the earlier definition is discarded without an error.
    pub fn new(
        nodes: impl IntoIterator<Item = NodeDefinition>,
        marks: impl IntoIterator<Item = MarkDefinition>,
    ) -> Self {
        let mut schema = Self {
            nodes: Vec::new(),
            node_index: HashMap::new(),
            marks: Vec::new(),
            mark_index: HashMap::new(),
            content: HashMap::new(),
        };

        for node in nodes {
            match schema.node_index.get(&node.name) {
                Some(&ix) => {
                    warn!(node = %node.name, "duplicate node definition, last registration wins");
                    schema.nodes[ix] = node;
                }
                None => {
                    schema.node_index.insert(node.name.clone(), schema.nodes.len());
                    schema.nodes.push(node);
                }
            }
        }

        for mark in marks {
            match schema.mark_index.get(&mark.name) {
                Some(&ix) => {
                    warn!(mark = %mark.name, "duplicate mark definition, last registration wins");
                    schema.marks[ix] = mark;
                }
                None => {
                    schema.mark_index.insert(mark.name.clone(), schema.marks.len());
                    schema.marks.push(mark);
                }
            }
        }

        for node in &schema.nodes {
            let compiled = ContentExpr::parse(&node.content);
            if let Err(err) = &compiled {
                warn!(node = %node.name, error = %err, "content expression does not compile");
            }
            schema.content.insert(node.name.clone(), compiled);
        }

        schema
    }

    pub fn node(&self, name: &str) -> Option<&NodeDefinition> {
        self.node_index.get(name).map(|&ix| &self.nodes[ix])
    }

    pub fn mark(&self, name: &str) -> Option<&MarkDefinition> {
        self.mark_index.get(name).map(|&ix| &self.marks[ix])
    }

    pub(crate) fn node_mut(&mut self, name: &str) -> Option<&mut NodeDefinition> {
        self.node_index.get(name).map(|&ix| &mut self.nodes[ix])
    }

    /// Node definitions in registration order.
    pub fn nodes(&self) -> &[NodeDefinition] {
        &self.nodes
    }

    /// Mark definitions in registration order.
    pub fn marks(&self) -> &[MarkDefinition] {
        &self.marks
    }

    /// Registration index of a mark; unknown marks sort last.
    pub fn mark_rank(&self, name: &str) -> usize {
        self.mark_index.get(name).copied().unwrap_or(usize::MAX)
    }

    pub fn content_expr(&self, kind: &str) -> Option<&ContentExpr> {
        self.content.get(kind).and_then(|c| c.as_ref().ok())
    }

    /// Whether a child of type `kind` satisfies the content term `term`.
    pub fn is_member(&self, term: &str, kind: &str) -> bool {
        if term == kind {
            return true;
        }
        self.node(kind).is_some_and(|def| def.in_group(term))
    }

    pub fn is_inline(&self, kind: &str) -> bool {
        kind == TEXT || self.node(kind).is_some_and(|def| def.inline)
    }

    pub fn is_leaf(&self, kind: &str) -> bool {
        kind != TEXT && self.content_expr(kind).is_none_or(|expr| expr.is_empty())
    }

    /// A block whose content expression only admits inline nodes.
    pub fn is_textblock(&self, kind: &str) -> bool {
        let Some(def) = self.node(kind) else {
            return false;
        };
        if def.inline {
            return false;
        }
        let Some(expr) = self.content_expr(kind) else {
            return false;
        };
        let names = expr.names();
        !names.is_empty() && names.iter().all(|name| self.term_is_inline(name))
    }

    fn term_is_inline(&self, term: &str) -> bool {
        if term == TEXT || term == "inline" {
            return true;
        }
        if let Some(def) = self.node(term) {
            return def.inline;
        }
        let mut members = self.nodes.iter().filter(|def| def.in_group(term)).peekable();
        members.peek().is_some() && members.all(|def| def.inline)
    }

    /// Size of a node in the flat position space: one token per character,
    /// one per leaf node, two boundary tokens around every other element.
    pub fn node_size(&self, node: &Node) -> usize {
        match node {
            Node::Text(t) => t.char_len(),
            Node::Element(el) if self.is_leaf(&el.kind) => 1,
            Node::Element(_) => self.content_size(node) + 2,
        }
    }

    pub fn content_size(&self, node: &Node) -> usize {
        node.content().iter().map(|child| self.node_size(child)).sum()
    }

    pub fn allows_children(&self, kind: &str, children: &[&str]) -> bool {
        match self.content_expr(kind) {
            Some(expr) => expr.matches(children, |term, child| self.is_member(term, child)),
            None => false,
        }
    }

    /// Adds `mark` to a mark set honouring exclusions. Returns `None` when an
    /// existing mark excludes it. The result is ordered by mark rank.
    pub fn add_mark(&self, marks: &[Mark], mark: Mark) -> Option<Vec<Mark>> {
        let blocked = marks.iter().any(|existing| {
            existing.kind != mark.kind
                && self
                    .mark(&existing.kind)
                    .is_some_and(|def| def.excludes.contains(&mark.kind))
        });
        if blocked {
            return None;
        }

        let excluded = self
            .mark(&mark.kind)
            .map(|def| def.excludes.clone())
            .unwrap_or_default();
        let mut out: Vec<Mark> = marks
            .iter()
            .filter(|m| m.kind != mark.kind && !excluded.contains(&m.kind))
            .cloned()
            .collect();
        out.push(mark);
        self.sort_marks(&mut out);
        Some(out)
    }

    pub fn sort_marks(&self, marks: &mut [Mark]) {
        marks.sort_by_key(|m| self.mark_rank(&m.kind));
    }

    /// Structural check: root is `doc`, every node/mark type is known and
    /// every attribute key is declared for its node type.
    pub fn validate_document(&self, doc: &Node) -> bool {
        match self.check_document(doc, false) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "document rejected");
                false
            }
        }
    }

    /// [`Schema::validate_document`] with the reason for a rejection.
    pub fn validate(&self, doc: &Node) -> Result<(), SchemaError> {
        self.check_document(doc, false)
    }

    /// [`Schema::validate_document`] plus content-expression conformance of
    /// every element.
    pub fn validate_content(&self, doc: &Node) -> Result<(), SchemaError> {
        self.check_document(doc, true)
    }

    fn check_document(&self, doc: &Node, strict: bool) -> Result<(), SchemaError> {
        if doc.kind() != DOC {
            return Err(SchemaError::InvalidRoot(doc.kind().to_string()));
        }
        self.check_node(doc, strict)
    }

    fn check_node(&self, node: &Node, strict: bool) -> Result<(), SchemaError> {
        match node {
            Node::Text(t) => {
                if self.node(TEXT).is_none() {
                    return Err(SchemaError::UnknownNode(TEXT.to_string()));
                }
                for mark in &t.marks {
                    let def = self
                        .mark(&mark.kind)
                        .ok_or_else(|| SchemaError::UnknownMark(mark.kind.clone()))?;
                    check_attrs(&mark.kind, &mark.attrs, &def.attributes)?;
                }
                Ok(())
            }
            Node::Element(el) => {
                let def = self
                    .node(&el.kind)
                    .ok_or_else(|| SchemaError::UnknownNode(el.kind.clone()))?;
                check_attrs(&el.kind, &el.attrs, &def.attributes)?;

                if strict {
                    let expr = match self.content.get(&el.kind) {
                        Some(Ok(expr)) => expr,
                        Some(Err(err)) => return Err(err.clone()),
                        None => return Err(SchemaError::UnknownNode(el.kind.clone())),
                    };
                    for name in expr.names() {
                        let known = self.node(name).is_some()
                            || self.nodes.iter().any(|def| def.in_group(name));
                        if !known {
                            return Err(SchemaError::UnknownNode(name.to_string()));
                        }
                    }
                    let kinds: Vec<&str> = el.content.iter().map(|c| c.kind()).collect();
                    if !expr.matches(&kinds, |term, kind| self.is_member(term, kind)) {
                        return Err(SchemaError::ContentMismatch {
                            node: el.kind.clone(),
                            expr: def.content.clone(),
                        });
                    }
                }

                for child in &el.content {
                    self.check_node(child, strict)?;
                }
                Ok(())
            }
        }
    }
}

fn check_attrs(
    kind: &str,
    attrs: &Attrs,
    specs: &BTreeMap<String, AttributeSpec>,
) -> Result<(), SchemaError> {
    match attrs.keys().find(|key| !specs.contains_key(*key)) {
        Some(key) => Err(SchemaError::UnknownAttribute {
            node: kind.to_string(),
            attr: key.clone(),
        }),
        None => Ok(()),
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.marks == other.marks
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.nodes.iter().map(|n| &n.name).collect::<Vec<_>>())
            .field("marks", &self.marks.iter().map(|m| &m.name).collect::<Vec<_>>())
            .finish()
    }
}
