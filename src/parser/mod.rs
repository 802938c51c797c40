//! Reconstruction pipeline: object graph, page tree, content replay,
//! fonts, images and layout.

pub mod content;
pub mod engine;
pub mod filters;
pub mod fonts;
pub mod images;
pub mod layout;
pub mod lexer;
pub mod object;
pub mod options;
pub mod pages;
pub mod store;
pub mod table_detector;

pub use content::{
    ContentToken, GraphicsState, ImagePlacement, LineSegment, Matrix, PositionedTextRun,
};
pub use engine::DocumentParser;
pub use fonts::FontInfo;
pub use object::{Object, ObjectId};
pub use options::{ErrorMode, PageSelection, ParseOptions};
pub use pages::PageHandle;
pub use store::ObjectStore;
pub use table_detector::{DetectedTable, TableDetector};
