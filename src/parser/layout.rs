//! Layout reconstruction.
//!
//! Takes one page's positioned primitives and rebuilds the visible
//! structure: text decorations from nearby line segments, tables from rule
//! grids, then paragraphs from vertical/horizontal gap heuristics, all
//! ordered by reading position (top-to-bottom, then left-to-right).

use regex::Regex;

use crate::model::{
    Block, ListInfo, Paragraph, Table, TableCell, TableRow, TextRun, TextStyle,
};

use super::content::{ImagePlacement, LineSegment, PositionedTextRun};
use super::table_detector::{DetectedTable, TableDetector};

/// Tunable layout thresholds.
///
/// These are empirical policy values, not anything the file format
/// mandates; they live here in one place so they can be adjusted against
/// real-world inputs without touching the reconstruction logic.
pub mod constants {
    /// A vertical gap above this multiple of the previous run's font size
    /// starts a new paragraph.
    pub const PARAGRAPH_GAP_FACTOR: f32 = 1.5;

    /// A horizontal gap this wide on one visual line separates columns or
    /// callouts rather than words.
    pub const COLUMN_GAP_THRESHOLD: f32 = 100.0;

    /// Runs closer than this on one line are contiguous text; anything
    /// wider (up to the column threshold) gets a single space.
    pub const GLYPH_GAP_TOLERANCE: f32 = 0.5;

    /// Baseline distance within which two runs share a visual line.
    pub const LINE_MERGE_TOLERANCE: f32 = 2.0;

    /// Font size bands mapping to heading ranks 1, 2 and 3.
    pub const HEADING_BANDS: [(f32, u8); 3] = [(24.0, 1), (18.0, 2), (16.0, 3)];

    /// An underline sits below the baseline within this fraction of the
    /// font size.
    pub const UNDERLINE_BAND_FACTOR: f32 = 0.5;

    /// A strikethrough sits near 30% of the font size above the baseline.
    pub const STRIKETHROUGH_CENTER_FACTOR: f32 = 0.3;
    pub const STRIKETHROUGH_BAND_FACTOR: f32 = 0.15;

    /// Estimated glyph advance as a fraction of the font size, used when
    /// exact metrics are unavailable.
    pub const RUN_WIDTH_FACTOR: f32 = 0.5;

    /// Text rise beyond this many points marks super/subscript.
    pub const TEXT_RISE_THRESHOLD: f32 = 0.5;
}

use constants::*;

/// Reconstruct one page's elements in reading order.
///
/// `images` pairs each placement with the resource key its payload was
/// stored under; placements whose image failed to materialize carry
/// `None` and are dropped.
pub fn reconstruct(
    texts: Vec<PositionedTextRun>,
    segments: &[LineSegment],
    images: Vec<(ImagePlacement, Option<String>)>,
) -> Vec<Block> {
    let texts = apply_decorations(texts, segments);
    let (tables, free_texts) = TableDetector::new().detect(segments, texts);
    log::debug!(
        "layout: {} free runs, {} tables, {} segments",
        free_texts.len(),
        tables.len(),
        segments.len()
    );

    let mut items: Vec<LayoutItem> = Vec::new();
    for run in free_texts {
        items.push(LayoutItem::Text(run));
    }
    for table in tables {
        items.push(LayoutItem::Table(table));
    }
    for (placement, resource_id) in images {
        if let Some(resource_id) = resource_id {
            items.push(LayoutItem::Image {
                placement,
                resource_id,
            });
        }
    }

    // Reading order: top-to-bottom, then left-to-right. The sort is
    // stable, so runs at identical positions keep their stream order.
    items.sort_by(|a, b| {
        b.y()
            .partial_cmp(&a.y())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.x().partial_cmp(&b.x()).unwrap_or(std::cmp::Ordering::Equal))
    });

    sweep(items)
}

enum LayoutItem {
    Text(PositionedTextRun),
    Table(DetectedTable),
    Image {
        placement: ImagePlacement,
        resource_id: String,
    },
}

impl LayoutItem {
    fn y(&self) -> f32 {
        match self {
            LayoutItem::Text(run) => run.y,
            LayoutItem::Table(table) => table.top(),
            LayoutItem::Image { placement, .. } => placement.y + placement.height,
        }
    }

    fn x(&self) -> f32 {
        match self {
            LayoutItem::Text(run) => run.x,
            LayoutItem::Table(table) => table.left(),
            LayoutItem::Image { placement, .. } => placement.x,
        }
    }
}

/// Set underline/strikethrough flags from horizontal segments that overlap
/// a run's horizontal span.
fn apply_decorations(
    mut texts: Vec<PositionedTextRun>,
    segments: &[LineSegment],
) -> Vec<PositionedTextRun> {
    let horizontal: Vec<&LineSegment> = segments.iter().filter(|s| s.is_horizontal()).collect();
    if horizontal.is_empty() {
        return texts;
    }

    for run in &mut texts {
        let run_end = run.x + estimated_width(run);
        for segment in &horizontal {
            let overlaps = segment.min_x() < run_end && segment.max_x() > run.x;
            if !overlaps {
                continue;
            }
            let dy = segment.y1 - run.y; // positive above baseline
            if dy < 0.0 && -dy <= run.font_size * UNDERLINE_BAND_FACTOR {
                run.underline = true;
            }
            let strike_center = run.font_size * STRIKETHROUGH_CENTER_FACTOR;
            if (dy - strike_center).abs() <= run.font_size * STRIKETHROUGH_BAND_FACTOR {
                run.strikethrough = true;
            }
        }
    }
    texts
}

/// Estimated run width from the glyph-advance approximation.
fn estimated_width(run: &PositionedTextRun) -> f32 {
    run.text.chars().count() as f32 * run.font_size * RUN_WIDTH_FACTOR
}

/// Sweep sorted items into paragraphs, tables and images.
fn sweep(items: Vec<LayoutItem>) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<PositionedTextRun> = Vec::new();

    for item in items {
        match item {
            LayoutItem::Table(table) => {
                flush_paragraph(&mut paragraph, &mut blocks);
                blocks.push(Block::Table(table_to_model(table)));
            }
            LayoutItem::Image {
                placement,
                resource_id,
            } => {
                flush_paragraph(&mut paragraph, &mut blocks);
                blocks.push(Block::Image {
                    resource_id,
                    width: placement.width,
                    height: placement.height,
                    x: placement.x,
                    y: placement.y,
                });
            }
            LayoutItem::Text(run) => {
                if let Some(prev) = paragraph.last() {
                    if breaks_paragraph(prev, &run) {
                        flush_paragraph(&mut paragraph, &mut blocks);
                    }
                }
                paragraph.push(run);
            }
        }
    }
    flush_paragraph(&mut paragraph, &mut blocks);
    blocks
}

/// Paragraph-break decision between two consecutive runs in reading order.
fn breaks_paragraph(prev: &PositionedTextRun, next: &PositionedTextRun) -> bool {
    let vertical_gap = (prev.y - next.y).abs();
    if vertical_gap > prev.font_size * PARAGRAPH_GAP_FACTOR {
        return true;
    }

    let same_line = vertical_gap <= LINE_MERGE_TOLERANCE;
    if same_line {
        let gap = next.x - (prev.x + estimated_width(prev));
        if gap > COLUMN_GAP_THRESHOLD {
            return true;
        }
        // An x that jumps backwards on the same baseline signals a new
        // visual column.
        if next.x < prev.x {
            return true;
        }
    }

    false
}

fn flush_paragraph(runs: &mut Vec<PositionedTextRun>, blocks: &mut Vec<Block>) {
    if runs.is_empty() {
        return;
    }
    let runs = std::mem::take(runs);
    let paragraph = build_paragraph(runs);
    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph(paragraph));
    }
}

/// Join a paragraph's runs, inserting spaces at word gaps and line wraps.
fn build_paragraph(runs: Vec<PositionedTextRun>) -> Paragraph {
    let mut paragraph = Paragraph::new();

    for (i, run) in runs.iter().enumerate() {
        let mut text = run.text.clone();
        if i > 0 {
            let prev = &runs[i - 1];
            if needs_space(prev, run) {
                text.insert(0, ' ');
            }
        }
        push_merged(&mut paragraph, TextRun::styled(text, style_of(run)));
    }

    classify(&mut paragraph, &runs);
    paragraph
}

/// Whether a space belongs between two adjacent runs of one paragraph.
fn needs_space(prev: &PositionedTextRun, next: &PositionedTextRun) -> bool {
    let prev_text = prev.text.as_str();
    if prev_text.ends_with(' ') || next.text.starts_with(' ') {
        return false;
    }

    let same_line = (prev.y - next.y).abs() <= LINE_MERGE_TOLERANCE;
    if same_line {
        let gap = next.x - (prev.x + estimated_width(prev));
        return gap > GLYPH_GAP_TOLERANCE;
    }

    // Wrapped line: join with a space unless the prior line hyphenates.
    !(prev_text.ends_with('-') || prev_text.ends_with('\u{00AD}'))
}

/// Append a run, merging into the previous one when styles are identical.
fn push_merged(paragraph: &mut Paragraph, run: TextRun) {
    if let Some(last) = paragraph.runs.last_mut() {
        if last.style == run.style {
            last.text.push_str(&run.text);
            return;
        }
    }
    paragraph.push_run(run);
}

fn style_of(run: &PositionedTextRun) -> TextStyle {
    TextStyle {
        bold: run.bold,
        italic: run.italic,
        underline: run.underline,
        strikethrough: run.strikethrough,
        superscript: run.rise > TEXT_RISE_THRESHOLD,
        subscript: run.rise < -TEXT_RISE_THRESHOLD,
        font_name: if run.font.is_empty() {
            None
        } else {
            Some(run.font.clone())
        },
        font_size: Some(run.font_size),
        color: TextStyle::color_from_rgb(run.color),
    }
}

/// Attach heading and list-item style hints.
fn classify(paragraph: &mut Paragraph, runs: &[PositionedTextRun]) {
    if let Some(first) = runs.first() {
        for (threshold, rank) in HEADING_BANDS {
            if first.font_size >= threshold {
                paragraph.style.heading_level = Some(rank);
                break;
            }
        }
    }

    paragraph.style.list_info = detect_list_marker(&paragraph.plain_text());
}

/// Leading bullet or `N.` numbering pattern.
fn detect_list_marker(text: &str) -> Option<ListInfo> {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:([\u{2022}\u{2023}\u{25AA}\u{25CF}\u{25CB}\u{25E6}\u{2043}\u{2219}*\-\u{2013}])|(\d{1,3})[.)])\s+\S").unwrap()
    });
    let caps = pattern.captures(text)?;
    if caps.get(1).is_some() {
        return Some(ListInfo::bullet());
    }
    let number = caps.get(2)?.as_str().parse().ok()?;
    Some(ListInfo::numbered(number))
}

/// Convert a detected grid into the output table model.
fn table_to_model(table: DetectedTable) -> Table {
    let mut model = Table::new();
    model.header_rows = if table.rows() > 1 { 1 } else { 0 };
    model.column_widths = Some(table.column_widths());

    for (row_index, row) in table.cells.into_iter().enumerate() {
        let cells: Vec<TableCell> = row
            .into_iter()
            .map(|mut cell_runs| {
                // Reading order inside the cell.
                cell_runs.sort_by(|a, b| {
                    b.y.partial_cmp(&a.y)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| {
                            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
                        })
                });
                TableCell::with_runs(
                    cell_runs
                        .iter()
                        .map(|r| TextRun::styled(r.text.clone(), style_of(r)))
                        .collect(),
                )
            })
            .collect();
        let row = if row_index == 0 && model.header_rows > 0 {
            TableRow::header(cells)
        } else {
            TableRow::new(cells)
        };
        model.add_row(row);
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_at(text: &str, x: f32, y: f32, size: f32) -> PositionedTextRun {
        PositionedTextRun {
            text: text.to_string(),
            x,
            y,
            font_size: size,
            color: [0.0, 0.0, 0.0],
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            rise: 0.0,
            font: "Helvetica".to_string(),
        }
    }

    fn paragraphs(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p.plain_text()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_small_gap_merges_with_one_space() {
        // "ab" at size 10 is 10 units wide; second run starts 1.5 past it.
        let runs = vec![run_at("ab", 0.0, 700.0, 10.0), run_at("cd", 11.5, 700.0, 10.0)];
        let blocks = reconstruct(runs, &[], vec![]);
        assert_eq!(paragraphs(&blocks), vec!["ab cd".to_string()]);
    }

    #[test]
    fn test_large_gap_starts_new_paragraph() {
        let runs = vec![run_at("ab", 0.0, 700.0, 10.0), run_at("cd", 160.0, 700.0, 10.0)];
        let blocks = reconstruct(runs, &[], vec![]);
        assert_eq!(
            paragraphs(&blocks),
            vec!["ab".to_string(), "cd".to_string()]
        );
    }

    #[test]
    fn test_tight_runs_join_without_space() {
        let runs = vec![run_at("he", 0.0, 700.0, 10.0), run_at("llo", 10.2, 700.0, 10.0)];
        let blocks = reconstruct(runs, &[], vec![]);
        assert_eq!(paragraphs(&blocks), vec!["hello".to_string()]);
    }

    #[test]
    fn test_vertical_gap_breaks_paragraph() {
        let runs = vec![
            run_at("first", 0.0, 700.0, 10.0),
            run_at("wrapped", 0.0, 688.0, 10.0),
            run_at("second", 0.0, 640.0, 10.0),
        ];
        let blocks = reconstruct(runs, &[], vec![]);
        assert_eq!(
            paragraphs(&blocks),
            vec!["first wrapped".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn test_hyphenated_wrap_joins_without_space() {
        let runs = vec![
            run_at("recon-", 0.0, 700.0, 10.0),
            run_at("struction", 0.0, 688.0, 10.0),
        ];
        let blocks = reconstruct(runs, &[], vec![]);
        assert_eq!(paragraphs(&blocks), vec!["recon-struction".to_string()]);
    }

    #[test]
    fn test_heading_bands() {
        let runs = vec![run_at("Title", 0.0, 700.0, 26.0)];
        let blocks = reconstruct(runs, &[], vec![]);
        let Block::Paragraph(p) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.heading_level(), Some(1));

        let runs = vec![run_at("Sub", 0.0, 700.0, 19.0)];
        let blocks = reconstruct(runs, &[], vec![]);
        let Block::Paragraph(p) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.heading_level(), Some(2));

        let runs = vec![run_at("Body", 0.0, 700.0, 10.0)];
        let blocks = reconstruct(runs, &[], vec![]);
        let Block::Paragraph(p) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.heading_level(), None);
    }

    #[test]
    fn test_list_detection() {
        assert_eq!(detect_list_marker("1. first item"), Some(ListInfo::numbered(1)));
        assert_eq!(detect_list_marker("12) twelfth"), Some(ListInfo::numbered(12)));
        assert_eq!(detect_list_marker("\u{2022} bullet"), Some(ListInfo::bullet()));
        assert_eq!(detect_list_marker("- dash item"), Some(ListInfo::bullet()));
        assert_eq!(detect_list_marker("no marker here"), None);
        assert_eq!(detect_list_marker("1.5 units wide"), None);
    }

    #[test]
    fn test_underline_detection() {
        let runs = vec![run_at("link", 0.0, 700.0, 10.0)];
        // Segment 2pt below the baseline, spanning the run.
        let segments = vec![LineSegment::new(0.0, 698.0, 20.0, 698.0)];
        let blocks = reconstruct(runs, &segments, vec![]);
        let Block::Paragraph(p) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(p.runs[0].style.underline);
        assert!(!p.runs[0].style.strikethrough);
    }

    #[test]
    fn test_strikethrough_detection() {
        let runs = vec![run_at("gone", 0.0, 700.0, 10.0)];
        // Segment 3pt above the baseline (30% of 10pt).
        let segments = vec![LineSegment::new(0.0, 703.0, 20.0, 703.0)];
        let blocks = reconstruct(runs, &segments, vec![]);
        let Block::Paragraph(p) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(p.runs[0].style.strikethrough);
        assert!(!p.runs[0].style.underline);
    }

    #[test]
    fn test_reading_order_top_down_left_right() {
        let runs = vec![
            run_at("bottom", 0.0, 100.0, 10.0),
            run_at("top-right", 300.0, 700.0, 10.0),
            run_at("top-left", 0.0, 700.0, 10.0),
        ];
        let blocks = reconstruct(runs, &[], vec![]);
        let texts = paragraphs(&blocks);
        // The wide gap splits the two columns into separate paragraphs.
        assert_eq!(
            texts,
            vec![
                "top-left".to_string(),
                "top-right".to_string(),
                "bottom".to_string()
            ]
        );
    }

    #[test]
    fn test_table_consumes_runs_and_interleaves() {
        let mut segments = Vec::new();
        for y in [200.0, 225.0, 250.0] {
            segments.push(LineSegment::new(0.0, y, 100.0, y));
        }
        for x in [0.0, 50.0, 100.0] {
            segments.push(LineSegment::new(x, 200.0, x, 250.0));
        }
        let runs = vec![
            run_at("above", 0.0, 700.0, 10.0),
            run_at("a", 10.0, 240.0, 10.0),
            run_at("b", 60.0, 240.0, 10.0),
            run_at("c", 10.0, 210.0, 10.0),
            run_at("d", 60.0, 210.0, 10.0),
            run_at("below", 0.0, 100.0, 10.0),
        ];
        let blocks = reconstruct(runs, &segments, vec![]);
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].is_paragraph());
        assert!(blocks[1].is_table());
        assert!(blocks[2].is_paragraph());

        let Block::Table(table) = &blocks[1] else {
            panic!("expected table");
        };
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.cell(0, 0).unwrap().plain_text(), "a");
        assert_eq!(table.cell(1, 1).unwrap().plain_text(), "d");
        assert!(table.rows[0].is_header);

        // Cell text must not leak into the paragraphs.
        let texts = paragraphs(&blocks);
        assert_eq!(texts, vec!["above".to_string(), "below".to_string()]);
    }

    #[test]
    fn test_image_interleaved_at_position() {
        let runs = vec![
            run_at("above", 0.0, 700.0, 10.0),
            run_at("below", 0.0, 100.0, 10.0),
        ];
        let placement = ImagePlacement {
            name: "Im1".to_string(),
            x: 0.0,
            y: 300.0,
            width: 100.0,
            height: 80.0,
        };
        let blocks = reconstruct(runs, &[], vec![(placement, Some("page1_Im1".to_string()))]);
        assert_eq!(blocks.len(), 3);
        assert!(blocks[1].is_image());
    }

    #[test]
    fn test_style_merging_within_paragraph() {
        let runs = vec![run_at("one", 0.0, 700.0, 10.0), run_at("two", 16.0, 700.0, 10.0)];
        let blocks = reconstruct(runs, &[], vec![]);
        let Block::Paragraph(p) = &blocks[0] else {
            panic!("expected paragraph");
        };
        // Same style: a single merged run with the space preserved.
        assert_eq!(p.runs.len(), 1);
        assert_eq!(p.runs[0].text, "one two");
    }

    #[test]
    fn test_superscript_from_rise() {
        let mut run = run_at("2", 0.0, 700.0, 6.0);
        run.rise = 3.0;
        let style = style_of(&run);
        assert!(style.superscript);
        assert!(!style.subscript);
    }
}
