//! Structured document model produced by reconstruction.

mod document;
mod page;
mod paragraph;
mod resource;
mod table;

pub use document::{Document, Metadata, Outline, OutlineItem};
pub use page::{Block, Page};
pub use paragraph::{ListInfo, Paragraph, ParagraphStyle, TextRun, TextStyle};
pub use resource::{Resource, ResourceType};
pub use table::{Table, TableCell, TableRow};
