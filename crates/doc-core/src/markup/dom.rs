//! Conversion between HTML strings and [`MarkupNode`] trees, via html5ever
//! and its reference-counted DOM.

use std::cell::RefCell;

use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, QualName, ns, parse_document, serialize};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use tracing::warn;

use crate::markup::fragment::{MarkupElement, MarkupNode};

/// Subtrees that never carry document content.
const IGNORED_TAGS: &[&str] = &["head", "script", "style", "template", "title", "meta", "link"];

/// Parses an HTML document or fragment and returns the children of `<body>`.
pub fn read_html(html: &str) -> Vec<MarkupNode> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);

    let Some(body) = find_element(&dom.document, "body") else {
        return Vec::new();
    };
    body.children
        .borrow()
        .iter()
        .filter_map(convert)
        .collect()
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if &*name.local == tag {
            return Some(handle.clone());
        }
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn convert(handle: &Handle) -> Option<MarkupNode> {
    match &handle.data {
        NodeData::Text { contents } => {
            let contents = contents.borrow();
            let text: &str = &contents;
            Some(MarkupNode::Text(text.to_string()))
        }
        NodeData::Element { name, attrs, .. } => {
            let local: &str = &name.local;
            let tag = local.to_ascii_lowercase();
            if IGNORED_TAGS.contains(&tag.as_str()) {
                return None;
            }
            let attrs = attrs
                .borrow()
                .iter()
                .map(|attr| {
                    let name: &str = &attr.name.local;
                    let value: &str = &attr.value;
                    (name.to_ascii_lowercase(), value.to_string())
                })
                .collect();
            let children = handle
                .children
                .borrow()
                .iter()
                .filter_map(convert)
                .collect();
            Some(MarkupNode::Element(MarkupElement {
                tag,
                attrs,
                children,
            }))
        }
        _ => None,
    }
}

/// Renders markup nodes to an HTML string. Attribute order is preserved, so
/// equal trees always render byte-identical output.
pub fn render_html(nodes: &[MarkupNode]) -> String {
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    let mut output = Vec::new();
    for handle in nodes.iter().filter_map(to_handle) {
        let serializable = SerializableHandle::from(handle);
        if let Err(err) = serialize(&mut output, &serializable, opts.clone()) {
            warn!(error = %err, "HTML serialization failed");
            break;
        }
    }
    String::from_utf8_lossy(&output).into_owned()
}

fn to_handle(node: &MarkupNode) -> Option<Handle> {
    match node {
        MarkupNode::Hole => None,
        MarkupNode::Text(text) => Some(Node::new(NodeData::Text {
            contents: RefCell::new(text.as_str().into()),
        })),
        MarkupNode::Element(el) => {
            let attrs = el
                .attrs
                .iter()
                .map(|(name, value)| Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(name.as_str())),
                    value: value.as_str().into(),
                })
                .collect();
            let handle = Node::new(NodeData::Element {
                name: QualName::new(None, ns!(html), LocalName::from(el.tag.as_str())),
                attrs: RefCell::new(attrs),
                template_contents: RefCell::new(None),
                mathml_annotation_xml_integration_point: false,
            });
            handle
                .children
                .borrow_mut()
                .extend(el.children.iter().filter_map(to_handle));
            Some(handle)
        }
    }
}
