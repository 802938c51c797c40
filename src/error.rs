//! Error types for the repdf library.

use thiserror::Error;

/// Result type alias for repdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during document reconstruction.
///
/// Only unrecoverable conditions surface here. Structural anomalies in the
/// input (broken cross-reference sections, unreadable streams, malformed
/// images) are recorded as warning strings on the returned
/// [`Document`](crate::Document) instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The buffer does not start with a recognizable PDF header.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The buffer is too damaged for any object graph to be located.
    #[error("Corrupted PDF structure: {0}")]
    Corrupted(String),

    /// A required object is missing from the object graph.
    #[error("Missing required object: {0}")]
    MissingObject(String),

    /// Error extracting text content from a page.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// Error extracting an image resource.
    #[error("Image extraction error: {0}")]
    ImageExtract(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Encoding error while decoding text bytes.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
