use std::sync::Arc;

use tracing::debug;

use crate::attrs::GlobalAttribute;
use crate::commands::{CommandSpec, CommandTable, QuerySpec, QueryTable};
use crate::error::HookError;
use crate::schema::{MarkDefinition, NodeDefinition, Schema};
use crate::state::EditorState;

pub const DEFAULT_EXTENSION_PRIORITY: i32 = 100;

/// What lifecycle hooks get to see.
pub struct HookContext<'a> {
    pub state: &'a EditorState,
    pub editable: bool,
}

/// A feature bundle contributing schema entries, commands and hooks.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    /// Higher priorities are composed first. Equal priorities keep list order.
    fn priority(&self) -> i32 {
        DEFAULT_EXTENSION_PRIORITY
    }

    fn nodes(&self) -> Vec<NodeDefinition> {
        Vec::new()
    }

    fn marks(&self) -> Vec<MarkDefinition> {
        Vec::new()
    }

    fn global_attributes(&self) -> Vec<GlobalAttribute> {
        Vec::new()
    }

    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }

    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }

    fn on_create(&self, _ctx: &HookContext<'_>) -> Result<(), HookError> {
        Ok(())
    }

    fn on_update(&self, _ctx: &HookContext<'_>) -> Result<(), HookError> {
        Ok(())
    }
}

pub struct Composed {
    pub schema: Schema,
    pub commands: CommandTable,
    pub queries: QueryTable,
}

/// Extension indices in composition order.
pub fn composition_order(extensions: &[Box<dyn Extension>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..extensions.len()).collect();
    order.sort_by_key(|&ix| std::cmp::Reverse(extensions[ix].priority()));
    order
}

/// Merges extensions into one schema and one command/query table.
///
/// Node and mark definitions are collected from every extension before any
/// global attribute is injected, so an attribute may target a node that a
/// later extension registers. Same-named commands and queries: the last one
/// composed wins.
pub fn compose(extensions: &[Box<dyn Extension>]) -> Composed {
    let order = composition_order(extensions);

    let mut nodes = Vec::new();
    let mut marks = Vec::new();
    let mut globals = Vec::new();
    let mut commands = CommandTable::new();
    let mut queries = QueryTable::new();

    for &ix in &order {
        let ext = &extensions[ix];
        nodes.extend(ext.nodes());
        marks.extend(ext.marks());
        globals.extend(ext.global_attributes());
        for command in ext.commands() {
            if commands.contains_key(&command.id) {
                debug!(command = %command.id, extension = ext.name(), "command overridden");
            }
            commands.insert(command.id.clone(), command);
        }
        for query in ext.queries() {
            queries.insert(query.id.clone(), query);
        }
    }

    let mut schema = Schema::new(nodes, marks);
    for global in globals {
        for kind in &global.types {
            if let Some(def) = schema.node_mut(kind) {
                def.attributes.insert(global.name.clone(), global.spec.clone());
            }
        }
    }

    Composed {
        schema,
        commands,
        queries,
    }
}

pub fn build_schema(extensions: &[Box<dyn Extension>]) -> Arc<Schema> {
    Arc::new(compose(extensions).schema)
}
