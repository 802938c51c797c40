//! # repdf
//!
//! Structured document reconstruction from raw PDF bytes.
//!
//! This library takes an in-memory byte buffer containing a PDF file and
//! rebuilds a structured, styled document model — paragraphs, tables and
//! images in reading order — without any external rendering engine. Line
//! breaks, headings, tables and bold/italic runs are recovered purely from
//! the positional and graphical side effects of the file's drawing
//! operators.
//!
//! ## Quick Start
//!
//! ```no_run
//! use repdf::parse_bytes;
//!
//! fn main() -> repdf::Result<()> {
//!     let data = std::fs::read("document.pdf").expect("read file");
//!     let doc = parse_bytes(&data)?;
//!
//!     println!("{} pages, version {}", doc.page_count(), doc.metadata.pdf_version);
//!     for warning in &doc.warnings {
//!         eprintln!("warning: {}", warning);
//!     }
//!     println!("{}", doc.plain_text());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Structure recovery**: headings, paragraphs, list hints, tables from
//!   ruled grids, underline/strikethrough from drawn lines
//! - **Image extraction**: JPEG/JPEG 2000 pass through byte-identical, raw
//!   samples re-encode losslessly to PNG
//! - **Damage tolerance**: broken cross-references fall back to a full
//!   scan; anomalies become warnings, never panics
//! - **Parallel processing**: pages replay on a Rayon pool, with output
//!   order independent of scheduling
//!
//! The engine performs no I/O of its own: callers supply the bytes and
//! receive an in-memory [`Document`]. Serializing that model into other
//! formats is deliberately left to downstream crates.

pub mod detect;
pub mod error;
pub mod model;
pub mod parser;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, is_pdf_bytes, PdfFormat};
pub use error::{Error, Result};
pub use model::{
    Block, Document, ListInfo, Metadata, Outline, OutlineItem, Page, Paragraph, ParagraphStyle,
    Resource, ResourceType, Table, TableCell, TableRow, TextRun, TextStyle,
};
pub use parser::{DocumentParser, ErrorMode, PageSelection, ParseOptions};

/// Parse a PDF from bytes and reconstruct its structured document.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("document.pdf").unwrap();
/// let doc = repdf::parse_bytes(&data).unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn parse_bytes(data: &[u8]) -> Result<Document> {
    let parser = DocumentParser::from_bytes(data)?;
    parser.parse()
}

/// Parse a PDF from bytes with custom options.
///
/// # Example
///
/// ```no_run
/// use repdf::{parse_bytes_with_options, PageSelection, ParseOptions};
///
/// let data = std::fs::read("document.pdf").unwrap();
/// let options = ParseOptions::new()
///     .sequential()
///     .with_pages(PageSelection::Range(1..=5));
/// let doc = parse_bytes_with_options(&data, options).unwrap();
/// ```
pub fn parse_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Document> {
    let parser = DocumentParser::from_bytes_with_options(data, options)?;
    parser.parse()
}

/// Extract plain text from a PDF byte buffer.
pub fn extract_text(data: &[u8]) -> Result<String> {
    let doc = parse_bytes(data)?;
    Ok(doc.plain_text())
}
