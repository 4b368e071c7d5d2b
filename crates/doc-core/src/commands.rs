use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::schema::Schema;
use crate::state::{EditorState, Transaction};

/// A command reads its arguments, inspects `ctx.state()` and dispatches a
/// transaction. It returns whether it applied (or, in a dry run, would
/// apply).
pub type CommandFn = Arc<dyn Fn(&mut CommandContext, &Value) -> bool + Send + Sync>;

/// Read-only counterpart of a command.
pub type QueryFn = Arc<dyn Fn(&EditorState, &Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub handler: CommandFn,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut CommandContext, &Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryFn,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&EditorState, &Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

impl std::fmt::Debug for QuerySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySpec")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Focus change requested by a command; applied by the editor on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequest {
    Focus,
    Blur,
}

/// What a command sees: a working copy of the editor state. Dispatched
/// transactions apply to the working copy immediately, so later commands in
/// a chain observe earlier ones. Nothing reaches the editor until the chain
/// is committed.
pub struct CommandContext {
    state: EditorState,
    editable: bool,
    dry_run: bool,
    doc_changed: bool,
    /// Set when a document change was dispatched into a read-only context.
    refused: bool,
    focus: Option<FocusRequest>,
}

impl CommandContext {
    pub fn new(state: EditorState, editable: bool) -> Self {
        Self {
            state,
            editable,
            dry_run: false,
            doc_changed: false,
            refused: false,
            focus: None,
        }
    }

    pub(crate) fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn schema(&self) -> &Schema {
        self.state.schema()
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    /// True inside `Editor::can()` chains.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Applies `tx` to the working state. A read-only context refuses
    /// transactions that replace the document, selection included.
    pub fn dispatch(&mut self, tx: Transaction) {
        if tx.is_empty() {
            return;
        }
        if tx.doc.is_some() && !self.editable {
            debug!(source = ?tx.meta.source, "editor is read-only, document change refused");
            self.refused = true;
            return;
        }
        debug!(source = ?tx.meta.source, "dispatch");
        if tx.doc.is_some() {
            self.doc_changed = true;
        }
        self.state = self.state.apply(tx);
    }

    pub fn request_focus(&mut self, focus: FocusRequest) {
        self.focus = Some(focus);
    }

    pub fn doc_changed(&self) -> bool {
        self.doc_changed
    }

    pub(crate) fn into_parts(self) -> (EditorState, bool, Option<FocusRequest>) {
        (self.state, self.doc_changed, self.focus)
    }
}

/// Flat command table produced by composing extensions.
pub type CommandTable = HashMap<String, CommandSpec>;
pub type QueryTable = HashMap<String, QuerySpec>;

/// Runs `id` against `ctx`. Unknown commands fail, and so do commands whose
/// document change a read-only context refused.
pub(crate) fn invoke(
    commands: &CommandTable,
    ctx: &mut CommandContext,
    id: &str,
    args: &Value,
) -> bool {
    let Some(command) = commands.get(id) else {
        warn!(command = id, "unknown command");
        return false;
    };
    ctx.refused = false;
    let applied = (command.handler)(ctx, args);
    applied && !ctx.refused
}

/// Short-circuiting command sequence. After the first command that returns
/// `false` every later step is skipped without being invoked.
pub struct Chain<'e> {
    commands: Arc<CommandTable>,
    target: Option<&'e mut crate::editor::Editor>,
    ctx: CommandContext,
    ok: bool,
}

impl<'e> Chain<'e> {
    /// `target` receives the working state on `run()`; `None` makes a dry run.
    pub(crate) fn new(
        commands: Arc<CommandTable>,
        target: Option<&'e mut crate::editor::Editor>,
        ctx: CommandContext,
    ) -> Self {
        Self {
            commands,
            target,
            ctx,
            ok: true,
        }
    }

    pub fn command(mut self, id: &str, args: Value) -> Self {
        if !self.ok {
            debug!(command = id, "chain already failed, skipping");
            return self;
        }
        self.ok = invoke(&self.commands, &mut self.ctx, id, &args);
        self
    }

    /// Shorthand for a command that takes no arguments.
    pub fn then(self, id: &str) -> Self {
        self.command(id, Value::Null)
    }

    /// Finishes the chain. A committing chain hands its working state to the
    /// editor even when a later step failed: steps that already dispatched
    /// are not rolled back.
    pub fn run(self) -> bool {
        if let Some(editor) = self.target {
            editor.commit(self.ctx);
        }
        self.ok
    }
}
