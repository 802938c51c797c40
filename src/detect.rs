//! PDF format detection and validation.

use crate::error::{Error, Result};

/// PDF format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version declared in the header (e.g., "1.7", "2.0")
    pub version: String,
    /// Whether the file appears to be linearized (fast web view)
    pub linearized: bool,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Detect PDF format from bytes.
///
/// # Arguments
/// * `data` - Byte slice containing at least the first bytes of the file
///
/// # Returns
/// * `Ok(PdfFormat)` if the data starts with a valid PDF header
/// * `Err(Error::UnknownFormat)` if the data is not a PDF
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    if data.len() < PDF_MAGIC.len() + VERSION_LEN {
        return Err(Error::UnknownFormat);
    }

    if !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let version_bytes = &data[PDF_MAGIC.len()..PDF_MAGIC.len() + VERSION_LEN];
    let version = std::str::from_utf8(version_bytes)
        .map_err(|_| Error::UnknownFormat)?
        .to_string();

    // Expect a digit, a dot, a digit ("1.4", "2.0", ...)
    let chars: Vec<char> = version.chars().collect();
    if chars.len() != 3 || !chars[0].is_ascii_digit() || chars[1] != '.' || !chars[2].is_ascii_digit()
    {
        return Err(Error::UnknownFormat);
    }

    // Linearized files declare a /Linearized dictionary in the first KB.
    let probe_len = data.len().min(1024);
    let linearized = memchr::memmem::find(&data[..probe_len], b"/Linearized").is_some();

    Ok(PdfFormat {
        version,
        linearized,
    })
}

/// Check whether a byte buffer looks like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}
