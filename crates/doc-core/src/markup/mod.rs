//! Markup (HTML) serialization and parsing.
//!
//! Rendering goes node → declarative [`MarkupNode`] fragment → html5ever DOM →
//! string. Parsing reads HTML with html5ever into the same fragment type and
//! then matches schema parse rules against it.

mod dom;
mod fragment;
mod parse;
mod serialize;

pub use dom::{read_html, render_html};
pub use fragment::*;
pub use parse::*;
pub use serialize::*;
