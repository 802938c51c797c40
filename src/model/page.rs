//! Page-level types.

use serde::{Deserialize, Serialize};

use super::{Paragraph, Table};

/// A single reconstructed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: u16,

    /// Content elements in reading order
    pub elements: Vec<Block>,
}

impl Page {
    /// Create a new page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            rotation: 0,
            elements: Vec::new(),
        }
    }

    pub fn add_paragraph(&mut self, paragraph: Paragraph) {
        self.elements.push(Block::Paragraph(paragraph));
    }

    pub fn add_table(&mut self, table: Table) {
        self.elements.push(Block::Table(table));
    }

    pub fn add_block(&mut self, block: Block) {
        self.elements.push(block);
    }

    /// Plain text content of the page, paragraph per line.
    pub fn plain_text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph(p) => Some(p.plain_text()),
                Block::Table(t) => Some(t.plain_text()),
                Block::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// A content element on a page, ordered by reading position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// A paragraph of text
    Paragraph(Paragraph),

    /// A table
    Table(Table),

    /// An image placed at a layout position
    Image {
        /// Key into the document's resource map
        resource_id: String,
        /// Placement width in points
        width: f32,
        /// Placement height in points
        height: f32,
        /// Page-space origin
        x: f32,
        y: f32,
    },
}

impl Block {
    pub fn is_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Block::Table(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Block::Image { .. })
    }
}
