mod attrs;
mod commands;
mod content;
mod editor;
mod error;
pub mod extensions;
mod extension;
pub mod legacy;
pub mod markup;
mod node;
mod schema;
mod state;
mod transform;

pub use crate::attrs::*;
pub use crate::commands::*;
pub use crate::content::*;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::extension::*;
pub use crate::node::*;
pub use crate::schema::*;
pub use crate::state::*;
