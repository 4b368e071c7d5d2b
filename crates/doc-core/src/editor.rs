use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::commands::{Chain, CommandContext, CommandTable, FocusRequest, QueryTable};
use crate::error::{EditorError, HookError, QueryError};
use crate::extension::{Composed, Extension, HookContext, compose, composition_order};
use crate::legacy::{LegacyDocument, legacy_to_tree, tree_to_legacy};
use crate::markup::{doc_to_html, parse_markup};
use crate::node::{HARD_BREAK, Node, PARAGRAPH};
use crate::schema::Schema;
use crate::state::{EditorState, Selection};

pub type EditorHook = Arc<dyn Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync>;

/// Anything the editor can load as a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Html(String),
    Legacy(LegacyDocument),
    /// Tree JSON as produced by [`Editor::get_json`].
    Json(Value),
    Node(Node),
}

impl Content {
    /// Strings are markup, arrays are legacy documents, objects are tree JSON.
    pub fn from_value(value: Value) -> Result<Self, EditorError> {
        match value {
            Value::String(html) => Ok(Content::Html(html)),
            Value::Array(_) => Ok(Content::Legacy(serde_json::from_value(value)?)),
            other => Ok(Content::Json(other)),
        }
    }
}

impl From<&str> for Content {
    fn from(html: &str) -> Self {
        Content::Html(html.to_string())
    }
}

impl From<String> for Content {
    fn from(html: String) -> Self {
        Content::Html(html)
    }
}

impl From<LegacyDocument> for Content {
    fn from(doc: LegacyDocument) -> Self {
        Content::Legacy(doc)
    }
}

impl From<Node> for Content {
    fn from(doc: Node) -> Self {
        Content::Node(doc)
    }
}

impl From<Value> for Content {
    fn from(json: Value) -> Self {
        Content::Json(json)
    }
}

/// Turns content into a document accepted by `schema`.
pub fn resolve_content(schema: &Schema, content: Content) -> Result<Node, EditorError> {
    let doc = match content {
        Content::Html(html) => parse_markup(schema, &html),
        Content::Legacy(legacy) => legacy_to_tree(&legacy),
        Content::Json(json) => serde_json::from_value(json)?,
        Content::Node(doc) => doc,
    };
    schema.validate(&doc)?;
    Ok(doc)
}

pub struct EditorOptions {
    pub editable: bool,
    pub autofocus: bool,
    pub content: Option<Content>,
    pub extensions: Vec<Box<dyn Extension>>,
    pub on_update: Option<EditorHook>,
    pub on_create: Option<EditorHook>,
    pub on_focus: Option<EditorHook>,
    pub on_blur: Option<EditorHook>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            editable: true,
            autofocus: false,
            content: None,
            extensions: crate::extensions::starter_kit(),
            on_update: None,
            on_create: None,
            on_focus: None,
            on_blur: None,
        }
    }
}

impl EditorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn autofocus(mut self, autofocus: bool) -> Self {
        self.autofocus = autofocus;
        self
    }

    pub fn content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Replaces the extension list (the default is the starter kit).
    pub fn extensions(mut self, extensions: Vec<Box<dyn Extension>>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    pub fn on_update(
        mut self,
        hook: impl Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        self.on_update = Some(Arc::new(hook));
        self
    }

    pub fn on_create(
        mut self,
        hook: impl Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        self.on_create = Some(Arc::new(hook));
        self
    }

    pub fn on_focus(
        mut self,
        hook: impl Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        self.on_focus = Some(Arc::new(hook));
        self
    }

    pub fn on_blur(
        mut self,
        hook: impl Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        self.on_blur = Some(Arc::new(hook));
        self
    }
}

/// Name used in logs and errors for hooks passed through [`EditorOptions`].
const OPTIONS_HOOK: &str = "editor";

#[derive(Default)]
struct EditorHooks {
    on_update: Option<EditorHook>,
    on_focus: Option<EditorHook>,
    on_blur: Option<EditorHook>,
}

/// Owns one current [`EditorState`] and replaces it on every change.
pub struct Editor {
    extensions: Vec<Box<dyn Extension>>,
    commands: Arc<CommandTable>,
    queries: QueryTable,
    state: EditorState,
    editable: bool,
    focused: bool,
    hooks: EditorHooks,
}

impl Editor {
    /// Composes the extensions, loads the initial content and runs every
    /// `on_create` hook. A failing `on_create` aborts construction; content
    /// that cannot be loaded falls back to an empty document.
    pub fn new(options: EditorOptions) -> Result<Self, EditorError> {
        let EditorOptions {
            editable,
            autofocus,
            content,
            extensions,
            on_update,
            on_create,
            on_focus,
            on_blur,
        } = options;

        let order = composition_order(&extensions);
        let Composed {
            schema,
            commands,
            queries,
        } = compose(&extensions);
        let mut slots: Vec<Option<Box<dyn Extension>>> = extensions.into_iter().map(Some).collect();
        let extensions = order.into_iter().filter_map(|ix| slots[ix].take()).collect();

        let schema = Arc::new(schema);
        let doc = match content {
            Some(content) => load_or_empty(&schema, content).0,
            None => Node::empty_doc(),
        };

        let editor = Self {
            extensions,
            commands: Arc::new(commands),
            queries,
            state: EditorState::new(schema, doc),
            editable,
            focused: autofocus,
            hooks: EditorHooks {
                on_update,
                on_focus,
                on_blur,
            },
        };

        let ctx = editor.hook_context();
        for ext in &editor.extensions {
            ext.on_create(&ctx)
                .map_err(|source| EditorError::Construction {
                    extension: ext.name().to_string(),
                    source,
                })?;
        }
        if let Some(hook) = &on_create {
            hook(&ctx).map_err(|source| EditorError::Construction {
                extension: OPTIONS_HOOK.to_string(),
                source,
            })?;
        }

        Ok(editor)
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.state.schema()
    }

    pub fn doc(&self) -> &Node {
        self.state.doc()
    }

    pub fn selection(&self) -> Selection {
        self.state.selection()
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn has_command(&self, id: &str) -> bool {
        self.commands.contains_key(id)
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn chain(&mut self) -> Chain<'_> {
        let commands = self.commands.clone();
        let ctx = CommandContext::new(self.state.clone(), self.editable);
        Chain::new(commands, Some(self), ctx)
    }

    /// A chain that reports whether its commands would apply and never
    /// commits.
    pub fn can(&self) -> Chain<'static> {
        let ctx = CommandContext::new(self.state.clone(), self.editable).dry_run();
        Chain::new(self.commands.clone(), None, ctx)
    }

    pub fn run_command(&mut self, id: &str, args: Value) -> bool {
        self.chain().command(id, args).run()
    }

    pub fn query_json(&self, id: &str, args: Value) -> Result<Value, QueryError> {
        let Some(query) = self.queries.get(id) else {
            return Err(QueryError::Unknown(id.to_string()));
        };
        Ok((query.handler)(&self.state, &args))
    }

    pub fn query<T>(&self, id: &str, args: Value) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.query_json(id, args)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Replaces the document, resetting the selection. Returns `false` when
    /// the content was rejected and an empty document was loaded instead.
    pub fn set_content(&mut self, content: impl Into<Content>) -> bool {
        let schema = self.state.schema().clone();
        let (doc, accepted) = load_or_empty(&schema, content.into());
        self.state = EditorState::new(schema, doc);
        self.notify_update();
        accepted
    }

    pub fn set_legacy_json(&mut self, json: &str) -> Result<(), EditorError> {
        let legacy = LegacyDocument::from_json_str(json)?;
        let schema = self.state.schema().clone();
        let doc = resolve_content(&schema, Content::Legacy(legacy))?;
        self.state = EditorState::new(schema, doc);
        self.notify_update();
        Ok(())
    }

    pub fn get_html(&self) -> String {
        doc_to_html(self.schema(), self.doc())
    }

    pub fn get_json(&self) -> Value {
        serde_json::to_value(self.doc()).unwrap_or_default()
    }

    /// Plain text: blocks separated by a blank line, hard breaks as `\n`.
    pub fn get_text(&self) -> String {
        let mut blocks = Vec::new();
        collect_block_text(self.schema(), self.doc(), &mut blocks);
        blocks.join("\n\n")
    }

    pub fn to_legacy(&self) -> LegacyDocument {
        tree_to_legacy(self.doc())
    }

    /// True for a document holding at most one empty paragraph.
    pub fn is_empty(&self) -> bool {
        let content = self.doc().content();
        match content {
            [] => true,
            [only] => {
                only.kind() == PARAGRAPH
                    && only
                        .content()
                        .iter()
                        .all(|n| n.as_text().is_some_and(|t| t.text.is_empty()))
            }
            _ => false,
        }
    }

    pub fn focus(&mut self) {
        self.set_focused(true);
    }

    pub fn blur(&mut self) {
        self.set_focused(false);
    }

    fn set_focused(&mut self, focused: bool) {
        if self.focused == focused {
            return;
        }
        self.focused = focused;
        let hook = if focused {
            self.hooks.on_focus.clone()
        } else {
            self.hooks.on_blur.clone()
        };
        if let Some(hook) = hook {
            if let Err(err) = hook(&self.hook_context()) {
                warn!(extension = OPTIONS_HOOK, error = %err, focused, "focus hook failed");
            }
        }
    }

    pub(crate) fn commit(&mut self, ctx: CommandContext) {
        let (state, doc_changed, focus) = ctx.into_parts();
        self.state = state;
        match focus {
            Some(FocusRequest::Focus) => self.set_focused(true),
            Some(FocusRequest::Blur) => self.set_focused(false),
            None => {}
        }
        if doc_changed {
            self.notify_update();
        }
    }

    /// Runs every `on_update` hook against the already replaced state. A
    /// failing hook is logged and does not stop the others.
    fn notify_update(&self) {
        let ctx = self.hook_context();
        for ext in &self.extensions {
            if let Err(err) = ext.on_update(&ctx) {
                warn!(extension = ext.name(), error = %err, "on_update hook failed");
            }
        }
        if let Some(hook) = &self.hooks.on_update {
            if let Err(err) = hook(&ctx) {
                warn!(extension = OPTIONS_HOOK, error = %err, "on_update hook failed");
            }
        }
    }

    fn hook_context(&self) -> HookContext<'_> {
        HookContext {
            state: &self.state,
            editable: self.editable,
        }
    }
}

fn load_or_empty(schema: &Schema, content: Content) -> (Node, bool) {
    match resolve_content(schema, content) {
        Ok(doc) => (doc, true),
        Err(err) => {
            warn!(error = %err, "content rejected, loading an empty document");
            (Node::empty_doc(), false)
        }
    }
}

fn collect_block_text(schema: &Schema, node: &Node, out: &mut Vec<String>) {
    for child in node.content() {
        if schema.is_textblock(child.kind()) {
            let mut text = String::new();
            for inline in child.content() {
                match inline.as_ref() {
                    Node::Text(t) => text.push_str(&t.text),
                    other if other.kind() == HARD_BREAK => text.push('\n'),
                    _ => {}
                }
            }
            out.push(text);
        } else if !child.is_text() {
            collect_block_text(schema, child, out);
        }
    }
}
