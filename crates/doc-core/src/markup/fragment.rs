/// Declarative markup tree produced by node/mark renderers and by the DOM
/// reader. `Hole` marks where a renderer wants its node's content placed.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
    Hole,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkupElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn attrs<I>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.attrs.extend(attrs);
        self
    }

    pub fn child(mut self, child: impl Into<MarkupNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(MarkupNode::Text(text.into()))
    }

    pub fn hole(self) -> Self {
        self.child(MarkupNode::Hole)
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Value of an inline style declaration, e.g. `style("text-align")`.
    pub fn style(&self, property: &str) -> Option<String> {
        let style = self.get_attr("style")?;
        style.split(';').find_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case(property)
                .then(|| value.trim().to_string())
        })
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        push_text(&self.children, &mut out);
        out
    }

    /// First descendant (depth first) with the given tag.
    pub fn find(&self, tag: &str) -> Option<&MarkupElement> {
        for child in &self.children {
            if let MarkupNode::Element(el) = child {
                if el.tag.eq_ignore_ascii_case(tag) {
                    return Some(el);
                }
                if let Some(found) = el.find(tag) {
                    return Some(found);
                }
            }
        }
        None
    }
}

fn push_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element(el) => push_text(&el.children, out),
            MarkupNode::Hole => {}
        }
    }
}

impl From<MarkupElement> for MarkupNode {
    fn from(el: MarkupElement) -> Self {
        MarkupNode::Element(el)
    }
}

impl MarkupNode {
    /// Replaces the first `Hole` with `content`. Returns the leftover content
    /// when the tree has no hole.
    pub fn fill_hole(self, content: Vec<MarkupNode>) -> (MarkupNode, Option<Vec<MarkupNode>>) {
        let mut pending = Some(content);
        let node = fill(self, &mut pending);
        (node, pending)
    }
}

fn fill(node: MarkupNode, pending: &mut Option<Vec<MarkupNode>>) -> MarkupNode {
    match node {
        MarkupNode::Element(mut el) => {
            let mut children = Vec::with_capacity(el.children.len());
            for child in el.children {
                match child {
                    MarkupNode::Hole => {
                        if let Some(content) = pending.take() {
                            children.extend(content);
                        }
                    }
                    other => children.push(fill(other, pending)),
                }
            }
            el.children = children;
            MarkupNode::Element(el)
        }
        other => other,
    }
}
