use std::sync::Arc;

use tracing::debug;

use crate::attrs::{Attrs, ParseRule};
use crate::markup::dom::read_html;
use crate::markup::fragment::{MarkupElement, MarkupNode};
use crate::node::{DOC, ElementNode, Mark, Node, PARAGRAPH, normalize_inline};
use crate::schema::{MarkDefinition, NodeDefinition, Schema};

/// Parses an HTML string into a `doc` node.
pub fn parse_markup(schema: &Schema, html: &str) -> Node {
    parse_markup_nodes(schema, &read_html(html))
}

/// Parses already-read markup into a `doc` node.
pub fn parse_markup_nodes(schema: &Schema, markup: &[MarkupNode]) -> Node {
    let parser = DomParser::new(schema);
    let content = parser.parse_nodes(markup, &[], false);
    let content = parser.fit_content(DOC, content);
    Node::Element(ElementNode {
        kind: DOC.to_string(),
        attrs: Attrs::new(),
        content: content.into_iter().map(Arc::new).collect(),
    })
}

/// Parses an HTML fragment into block nodes (no `doc` wrapper).
pub fn parse_fragment(schema: &Schema, html: &str) -> Vec<Node> {
    let parser = DomParser::new(schema);
    let content = parser.parse_nodes(&read_html(html), &[], false);
    parser.wrap_inline_runs(content)
}

enum RuleTarget<'s> {
    Node(&'s NodeDefinition),
    Mark(&'s MarkDefinition),
}

struct Rule<'s> {
    target: RuleTarget<'s>,
    rule: &'s ParseRule,
}

/// Applies schema parse rules to markup. Rules are tried by descending
/// priority, then in declaration order (node rules before mark rules).
pub struct DomParser<'s> {
    schema: &'s Schema,
    rules: Vec<Rule<'s>>,
}

impl<'s> DomParser<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        let mut rules = Vec::new();
        for def in schema.nodes() {
            for rule in &def.parse_rules {
                rules.push(Rule {
                    target: RuleTarget::Node(def),
                    rule,
                });
            }
        }
        for def in schema.marks() {
            for rule in &def.parse_rules {
                rules.push(Rule {
                    target: RuleTarget::Mark(def),
                    rule,
                });
            }
        }
        rules.sort_by_key(|r| std::cmp::Reverse(r.rule.priority));
        Self { schema, rules }
    }

    fn match_element(&self, el: &MarkupElement) -> Option<(&Rule<'s>, Attrs)> {
        self.rules
            .iter()
            .find_map(|rule| rule.rule.matches(el).map(|attrs| (rule, attrs)))
    }

    fn parse_nodes(&self, nodes: &[MarkupNode], marks: &[Mark], inline: bool) -> Vec<Node> {
        let mut out = Vec::new();
        for node in nodes {
            match node {
                MarkupNode::Hole => {}
                MarkupNode::Text(text) => {
                    if !inline && text.trim().is_empty() {
                        continue;
                    }
                    let collapsed = collapse_whitespace(text);
                    if !collapsed.is_empty() {
                        out.push(Node::marked_text(collapsed, marks.to_vec()));
                    }
                }
                MarkupNode::Element(el) => self.parse_element(el, marks, inline, &mut out),
            }
        }
        out
    }

    fn parse_element(&self, el: &MarkupElement, marks: &[Mark], inline: bool, out: &mut Vec<Node>) {
        let Some((rule, attrs)) = self.match_element(el) else {
            debug!(tag = %el.tag, "no parse rule matched, reading children only");
            out.extend(self.parse_nodes(&el.children, marks, inline));
            return;
        };

        match rule.target {
            RuleTarget::Mark(def) => {
                let mark = Mark {
                    kind: def.name.clone(),
                    attrs: collect_attrs(attrs, &def.attributes, el),
                };
                let marks = self
                    .schema
                    .add_mark(marks, mark)
                    .unwrap_or_else(|| marks.to_vec());
                out.extend(self.parse_nodes(&el.children, &marks, inline));
            }
            RuleTarget::Node(def) => {
                let attrs = collect_attrs(attrs, &def.attributes, el);
                let source = rule
                    .rule
                    .content_element
                    .as_deref()
                    .and_then(|tag| el.find(tag))
                    .unwrap_or(el);

                let content = if def.code {
                    let text = source.text_content();
                    if text.is_empty() {
                        Vec::new()
                    } else {
                        vec![Node::text(text)]
                    }
                } else if self.schema.is_leaf(&def.name) {
                    Vec::new()
                } else {
                    let textblock = self.schema.is_textblock(&def.name);
                    let child_marks: &[Mark] = if textblock { marks } else { &[] };
                    let children = self.parse_nodes(&source.children, child_marks, textblock);
                    self.fit_content(&def.name, children)
                };

                out.push(Node::Element(ElementNode {
                    kind: def.name.clone(),
                    attrs,
                    content: content.into_iter().map(Arc::new).collect(),
                }));
            }
        }
    }

    /// Coerces parsed children into something the parent type accepts:
    /// textblocks get flattened inline content, block containers get loose
    /// inline runs wrapped in paragraphs and a leading paragraph when their
    /// expression demands one.
    fn fit_content(&self, kind: &str, children: Vec<Node>) -> Vec<Node> {
        if self.schema.is_textblock(kind) {
            let mut inline = Vec::new();
            for child in children {
                self.flatten_inline(child, &mut inline);
            }
            return normalize_inline(inline.into_iter().map(Arc::new).collect())
                .into_iter()
                .map(|n| Arc::try_unwrap(n).unwrap_or_else(|shared| (*shared).clone()))
                .collect();
        }

        let mut blocks = self.wrap_inline_runs(children);
        let kinds: Vec<&str> = blocks.iter().map(|b| b.kind()).collect();
        if !self.schema.allows_children(kind, &kinds) && self.schema.node(PARAGRAPH).is_some() {
            let mut with_paragraph = vec![PARAGRAPH];
            with_paragraph.extend(kinds.iter().copied());
            if self.schema.allows_children(kind, &with_paragraph) {
                blocks.insert(0, Node::paragraph(""));
            }
        }
        blocks
    }

    fn flatten_inline(&self, node: Node, out: &mut Vec<Node>) {
        if self.schema.is_inline(node.kind()) {
            out.push(node);
            return;
        }
        if let Node::Element(el) = node {
            for child in el.content {
                let child = Arc::try_unwrap(child).unwrap_or_else(|shared| (*shared).clone());
                self.flatten_inline(child, out);
            }
        }
    }

    fn wrap_inline_runs(&self, children: Vec<Node>) -> Vec<Node> {
        let mut blocks = Vec::new();
        let mut run: Vec<Node> = Vec::new();

        let flush = |run: &mut Vec<Node>, blocks: &mut Vec<Node>| {
            if run.is_empty() {
                return;
            }
            let content = normalize_inline(std::mem::take(run).into_iter().map(Arc::new).collect());
            let blank = content.iter().all(|n| match n.as_ref() {
                Node::Text(t) => t.text.trim().is_empty(),
                Node::Element(_) => false,
            });
            if !blank {
                blocks.push(Node::Element(ElementNode {
                    kind: PARAGRAPH.to_string(),
                    attrs: Attrs::new(),
                    content,
                }));
            }
        };

        for child in children {
            if self.schema.is_inline(child.kind()) {
                run.push(child);
            } else {
                flush(&mut run, &mut blocks);
                blocks.push(child);
            }
        }
        flush(&mut run, &mut blocks);
        blocks
    }
}

/// Rule attributes plus whatever the attribute specs extract themselves.
/// Nulls and values equal to the declared default are left out.
fn collect_attrs(
    mut attrs: Attrs,
    specs: &std::collections::BTreeMap<String, crate::attrs::AttributeSpec>,
    el: &MarkupElement,
) -> Attrs {
    attrs.retain(|_, v| !v.is_null());
    for (name, spec) in specs {
        if attrs.contains_key(name) {
            continue;
        }
        if let Some(value) = spec.extract_from(el) {
            if !value.is_null() && value != spec.default {
                attrs.insert(name.clone(), value);
            }
        }
    }
    attrs
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
