//! Built-in extensions. [`starter_kit`] bundles all of them.

mod blockquote;
mod callout;
mod code_block;
mod columns;
mod document;
pub(crate) mod edit;
mod editing;
mod global;
mod heading;
mod image;
mod lists;
mod marks;

pub use blockquote::{BLOCKQUOTE, Blockquote};
pub use callout::{CALLOUT, CALLOUT_VARIANTS, Callout, DEFAULT_CALLOUT_VARIANT};
pub use code_block::{CODE_BLOCK, CodeBlock};
pub use columns::{COLUMN, COLUMNS, Columns};
pub use document::{Document, HardBreak, Paragraph, Text};
pub use editing::Editing;
pub use global::{
    ALIGNMENTS, BLOCK_ID, BLOCK_ID_TYPES, BlockId, TEXT_ALIGN, TEXT_ALIGN_TYPES, TextAlign,
};
pub use heading::{HEADING, Heading, MAX_HEADING_LEVEL};
pub use image::{DEFAULT_IMAGE_ALIGN, HORIZONTAL_RULE, HorizontalRule, IMAGE, Image};
pub use lists::{BULLET_LIST, BulletList, ListItem, ORDERED_LIST, OrderedList};
pub use marks::{Bold, Code, Formatting, Italic, Link, Strike, Underline};

use crate::extension::Extension;

/// Every built-in extension, in the order their nodes and marks register.
/// Mark order here is the wrap order used when rendering markup.
pub fn starter_kit() -> Vec<Box<dyn Extension>> {
    vec![
        Box::new(Document),
        Box::new(Text),
        Box::new(Paragraph),
        Box::new(Editing),
        Box::new(HardBreak),
        Box::new(Heading),
        Box::new(Blockquote),
        Box::new(BulletList),
        Box::new(OrderedList),
        Box::new(ListItem),
        Box::new(CodeBlock),
        Box::new(HorizontalRule),
        Box::new(Image),
        Box::new(Callout),
        Box::new(Columns),
        Box::new(Formatting),
        Box::new(Bold),
        Box::new(Italic),
        Box::new(Underline),
        Box::new(Strike),
        Box::new(Code),
        Box::new(Link),
        Box::new(BlockId),
        Box::new(TextAlign),
    ]
}
