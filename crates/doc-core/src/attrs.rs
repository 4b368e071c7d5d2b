use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::markup::MarkupElement;

pub type Attrs = BTreeMap<String, Value>;

/// Reads an attribute value out of a markup element.
pub type ExtractFn = Arc<dyn Fn(&MarkupElement) -> Option<Value> + Send + Sync>;

/// Turns an attribute value into markup attributes.
pub type RenderAttrFn = Arc<dyn Fn(&Value) -> Vec<(String, String)> + Send + Sync>;

/// Returns `None` to reject the element, or the attributes it carries.
pub type GetAttrsFn = Arc<dyn Fn(&MarkupElement) -> Option<Attrs> + Send + Sync>;

pub const DEFAULT_PARSE_PRIORITY: i32 = 50;

/// Typed attribute descriptor owned by a node or mark definition.
#[derive(Clone)]
pub struct AttributeSpec {
    pub default: Value,
    pub extract: Option<ExtractFn>,
    pub render: Option<RenderAttrFn>,
}

impl AttributeSpec {
    pub fn new(default: Value) -> Self {
        Self {
            default,
            extract: None,
            render: None,
        }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn extract(
        mut self,
        extract: impl Fn(&MarkupElement) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.extract = Some(Arc::new(extract));
        self
    }

    /// Shorthand for an attribute read verbatim from a markup attribute.
    pub fn from_markup_attr(self, name: &'static str) -> Self {
        self.extract(move |el| el.get_attr(name).map(|v| Value::String(v.to_string())))
    }

    pub fn render(
        mut self,
        render: impl Fn(&Value) -> Vec<(String, String)> + Send + Sync + 'static,
    ) -> Self {
        self.render = Some(Arc::new(render));
        self
    }

    pub fn extract_from(&self, el: &MarkupElement) -> Option<Value> {
        self.extract.as_ref().and_then(|extract| extract(el))
    }

    /// Literal `name="value"` unless the spec carries its own renderer.
    pub fn render_value(&self, name: &str, value: &Value) -> Vec<(String, String)> {
        if let Some(render) = &self.render {
            return render(value);
        }
        match value_to_markup(value) {
            Some(text) => vec![(name.to_string(), text)],
            None => Vec::new(),
        }
    }
}

impl PartialEq for AttributeSpec {
    fn eq(&self, other: &Self) -> bool {
        self.default == other.default
            && self.extract.is_some() == other.extract.is_some()
            && self.render.is_some() == other.render.is_some()
    }
}

impl fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("default", &self.default)
            .field("extract", &self.extract.is_some())
            .field("render", &self.render.is_some())
            .finish()
    }
}

/// `None` for null; strings verbatim; everything else as JSON text.
pub fn value_to_markup(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Matcher deciding which markup elements become a given node or mark.
#[derive(Clone)]
pub struct ParseRule {
    pub tag: Option<String>,
    pub style: Option<String>,
    pub get_attrs: Option<GetAttrsFn>,
    pub priority: i32,
    /// Descendant tag whose content is parsed instead of the element's own.
    pub content_element: Option<String>,
}

impl ParseRule {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into().to_ascii_lowercase()),
            style: None,
            get_attrs: None,
            priority: DEFAULT_PARSE_PRIORITY,
            content_element: None,
        }
    }

    /// Matches elements whose inline style declares `property`.
    pub fn style(property: impl Into<String>) -> Self {
        Self {
            tag: None,
            style: Some(property.into().to_ascii_lowercase()),
            get_attrs: None,
            priority: DEFAULT_PARSE_PRIORITY,
            content_element: None,
        }
    }

    pub fn get_attrs(
        mut self,
        get_attrs: impl Fn(&MarkupElement) -> Option<Attrs> + Send + Sync + 'static,
    ) -> Self {
        self.get_attrs = Some(Arc::new(get_attrs));
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn content_element(mut self, tag: impl Into<String>) -> Self {
        self.content_element = Some(tag.into());
        self
    }

    pub fn matches(&self, el: &MarkupElement) -> Option<Attrs> {
        if let Some(tag) = &self.tag {
            if !el.tag.eq_ignore_ascii_case(tag) {
                return None;
            }
        }
        if let Some(property) = &self.style {
            el.style(property)?;
        }
        if self.tag.is_none() && self.style.is_none() {
            return None;
        }
        match &self.get_attrs {
            Some(get_attrs) => get_attrs(el),
            None => Some(Attrs::new()),
        }
    }
}

impl PartialEq for ParseRule {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.style == other.style
            && self.priority == other.priority
            && self.content_element == other.content_element
            && self.get_attrs.is_some() == other.get_attrs.is_some()
    }
}

impl fmt::Debug for ParseRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseRule")
            .field("tag", &self.tag)
            .field("style", &self.style)
            .field("priority", &self.priority)
            .field("content_element", &self.content_element)
            .finish_non_exhaustive()
    }
}

/// Attribute injected into every node whose type is listed in `types`.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalAttribute {
    pub types: Vec<String>,
    pub name: String,
    pub spec: AttributeSpec,
}

impl GlobalAttribute {
    pub fn new<I, S>(types: I, name: impl Into<String>, spec: AttributeSpec) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            name: name.into(),
            spec,
        }
    }
}
