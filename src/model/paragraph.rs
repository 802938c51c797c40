//! Paragraph and text-level types.

use serde::{Deserialize, Serialize};

/// A paragraph: an ordered sequence of styled text runs.
///
/// Headings and list items are style hints on the paragraph, not separate
/// node types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    /// Styled runs in reading order
    pub runs: Vec<TextRun>,

    /// Paragraph-level style hints
    pub style: ParagraphStyle,
}

impl Paragraph {
    /// Create a new empty paragraph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a paragraph with a single unstyled run.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            runs: vec![TextRun::new(text)],
            style: ParagraphStyle::default(),
        }
    }

    /// Create a heading paragraph.
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        let mut p = Self::with_text(text);
        p.style.heading_level = Some(level.clamp(1, 6));
        p
    }

    /// Append a styled run.
    pub fn push_run(&mut self, run: TextRun) {
        self.runs.push(run);
    }

    /// Unstyled text content of the paragraph.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() || self.plain_text().trim().is_empty()
    }

    pub fn is_heading(&self) -> bool {
        self.style.heading_level.is_some()
    }

    pub fn heading_level(&self) -> Option<u8> {
        self.style.heading_level
    }

    pub fn is_list_item(&self) -> bool {
        self.style.list_info.is_some()
    }
}

/// A run of text with consistent styling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Text styling
    pub style: TextStyle,
}

impl TextRun {
    /// Create a new text run with default style.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
        }
    }

    /// Create a styled run.
    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Character-level styling recovered from fonts and line segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub superscript: bool,
    pub subscript: bool,

    /// Base font name
    pub font_name: Option<String>,

    /// Effective font size in points
    pub font_size: Option<f32>,

    /// Fill color as "#RRGGBB"
    pub color: Option<String>,
}

impl TextStyle {
    /// Check if any styling is applied.
    pub fn has_styling(&self) -> bool {
        self.bold
            || self.italic
            || self.underline
            || self.strikethrough
            || self.superscript
            || self.subscript
    }

    /// Format an RGB triple in the 0..=1 range as a hex color, omitting
    /// plain black (the overwhelming default).
    pub fn color_from_rgb(rgb: [f32; 3]) -> Option<String> {
        let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b) = (to_byte(rgb[0]), to_byte(rgb[1]), to_byte(rgb[2]));
        if (r, g, b) == (0, 0, 0) {
            None
        } else {
            Some(format!("#{:02X}{:02X}{:02X}", r, g, b))
        }
    }
}

/// Paragraph-level style hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParagraphStyle {
    /// Heading rank (1-6), None for body text
    pub heading_level: Option<u8>,

    /// Present when the text matches a list-item pattern
    pub list_info: Option<ListInfo>,
}

/// Information about a detected list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListInfo {
    /// Ordered (numbered) vs unordered (bulleted)
    pub ordered: bool,

    /// Item number for ordered lists
    pub number: Option<u32>,
}

impl ListInfo {
    pub fn bullet() -> Self {
        Self {
            ordered: false,
            number: None,
        }
    }

    pub fn numbered(number: u32) -> Self {
        Self {
            ordered: true,
            number: Some(number),
        }
    }
}
