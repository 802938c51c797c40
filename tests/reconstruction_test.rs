//! End-to-end reconstruction tests over synthetic documents.

mod common;

use common::{build_pdf, document_with_pages, document_with_pages_and_xobjects, PdfObject};
use repdf::{parse_bytes, parse_bytes_with_options, Block, PageSelection, ParseOptions};

#[test]
fn page_count_matches_leaf_pages() {
    let data = document_with_pages(&[b"", b"", b""]);
    let doc = parse_bytes(&data).unwrap();
    assert_eq!(doc.page_count(), 3);
    assert_eq!(doc.metadata.page_count, 3);
    assert_eq!(doc.metadata.pdf_version, "1.4");
}

#[test]
fn text_runs_become_paragraphs_with_spacing() {
    // Two runs on one baseline 1.5 units apart (the first run's estimated
    // width is 10), then a run far to the right, then a paragraph lower
    // down the page.
    let content: &[u8] = b"BT /F1 10 Tf 72 700 Td (ab) Tj 11.5 0 Td (cd) Tj ET \
BT /F1 10 Tf 250 700 Td (callout) Tj ET \
BT /F1 10 Tf 72 600 Td (next paragraph) Tj ET";
    let data = document_with_pages(&[content]);
    let doc = parse_bytes(&data).unwrap();

    let paragraphs: Vec<String> = doc.pages[0]
        .elements
        .iter()
        .filter_map(|b| match b {
            Block::Paragraph(p) => Some(p.plain_text()),
            _ => None,
        })
        .collect();

    assert_eq!(
        paragraphs,
        vec![
            "ab cd".to_string(),
            "callout".to_string(),
            "next paragraph".to_string()
        ]
    );
}

#[test]
fn hex_strings_decode_as_latin1_without_cmap() {
    let content: &[u8] = b"BT /F1 12 Tf 72 700 Td <48656C6C6F> Tj ET";
    let data = document_with_pages(&[content]);
    let doc = parse_bytes(&data).unwrap();
    assert_eq!(doc.pages[0].plain_text(), "Hello");
}

#[test]
fn heading_rank_from_font_size() {
    let content: &[u8] = b"BT /F1 26 Tf 72 700 Td (Big Title) Tj ET \
BT /F1 10 Tf 72 600 Td (body text) Tj ET";
    let data = document_with_pages(&[content]);
    let doc = parse_bytes(&data).unwrap();

    let headings: Vec<Option<u8>> = doc.pages[0]
        .elements
        .iter()
        .filter_map(|b| match b {
            Block::Paragraph(p) => Some(p.heading_level()),
            _ => None,
        })
        .collect();
    assert_eq!(headings, vec![Some(1), None]);
}

#[test]
fn list_items_are_tagged() {
    let content: &[u8] = b"BT /F1 10 Tf 72 700 Td (1. first thing) Tj ET";
    let data = document_with_pages(&[content]);
    let doc = parse_bytes(&data).unwrap();
    let Block::Paragraph(p) = &doc.pages[0].elements[0] else {
        panic!("expected a paragraph");
    };
    assert!(p.is_list_item());
}

#[test]
fn ruled_grid_becomes_table_and_consumes_runs() {
    // 3 horizontal + 3 vertical rules forming a 2x2 grid, one run per cell,
    // plus one free paragraph above the grid.
    let content: &[u8] = b"BT /F1 10 Tf 72 700 Td (intro) Tj ET \
100 300 m 300 300 l S \
100 350 m 300 350 l S \
100 400 m 300 400 l S \
100 300 m 100 400 l S \
200 300 m 200 400 l S \
300 300 m 300 400 l S \
BT /F1 10 Tf 110 380 Td (r1c1) Tj ET \
BT /F1 10 Tf 210 380 Td (r1c2) Tj ET \
BT /F1 10 Tf 110 320 Td (r2c1) Tj ET \
BT /F1 10 Tf 210 320 Td (r2c2) Tj ET";
    let data = document_with_pages(&[content]);
    let doc = parse_bytes(&data).unwrap();

    let tables: Vec<_> = doc.pages[0]
        .elements
        .iter()
        .filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
        .collect();
    assert_eq!(tables.len(), 1);
    let table = tables[0];
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column_count(), 2);
    assert_eq!(table.cell(0, 0).unwrap().plain_text(), "r1c1");
    assert_eq!(table.cell(0, 1).unwrap().plain_text(), "r1c2");
    assert_eq!(table.cell(1, 0).unwrap().plain_text(), "r2c1");
    assert_eq!(table.cell(1, 1).unwrap().plain_text(), "r2c2");

    // Cell text must not reappear as free paragraphs.
    let free_text: String = doc.pages[0]
        .elements
        .iter()
        .filter_map(|b| match b {
            Block::Paragraph(p) => Some(p.plain_text()),
            _ => None,
        })
        .collect();
    assert_eq!(free_text, "intro");
}

#[test]
fn jpeg_image_passes_through_byte_identical() {
    let payload: &[u8] = b"\xFF\xD8\xFF\xE0notarealjpegbutpreserved";
    let image = PdfObject::stream(
        6,
        "/Subtype /Image /Width 8 /Height 4 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode",
        payload,
    );
    let content: &[u8] = b"q 120 0 0 60 50 500 cm /Im1 Do Q";
    let data = document_with_pages_and_xobjects(&[content], &[("Im1", image)]);
    let doc = parse_bytes(&data).unwrap();

    let resource = doc.get_resource("page1_Im1").expect("image resource");
    assert_eq!(resource.data, payload);
    assert_eq!(resource.mime_type, "image/jpeg");
    assert_eq!(resource.width, Some(8));
    assert_eq!(resource.height, Some(4));

    let images: Vec<_> = doc.pages[0]
        .elements
        .iter()
        .filter(|b| b.is_image())
        .collect();
    assert_eq!(images.len(), 1);
    let Block::Image { width, height, .. } = images[0] else {
        unreachable!();
    };
    assert_eq!(*width, 120.0);
    assert_eq!(*height, 60.0);
}

#[test]
fn raw_rgb_image_roundtrips_to_png() {
    // 2x1 pixels: red then blue.
    let samples: &[u8] = &[255, 0, 0, 0, 0, 255];
    let image = PdfObject::stream(
        6,
        "/Subtype /Image /Width 2 /Height 1 /ColorSpace /DeviceRGB /BitsPerComponent 8",
        samples,
    );
    let content: &[u8] = b"q 20 0 0 10 50 500 cm /Im1 Do Q";
    let data = document_with_pages_and_xobjects(&[content], &[("Im1", image)]);
    let doc = parse_bytes(&data).unwrap();

    let resource = doc.get_resource("page1_Im1").expect("image resource");
    assert_eq!(resource.mime_type, "image/png");

    let decoded = image::load_from_memory(&resource.data).expect("decodable PNG");
    assert_eq!(decoded.width(), 2);
    assert_eq!(decoded.height(), 1);
    let rgb = decoded.to_rgb8();
    assert_eq!(rgb.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 255]);
}

#[test]
fn flate_compressed_content_stream_is_decoded() {
    use std::io::Write;
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(b"BT /F1 12 Tf 72 700 Td (compressed) Tj ET")
        .unwrap();
    let compressed = encoder.finish().unwrap();

    let objects = vec![
        PdfObject::new(1, "<< /Type /Catalog /Pages 2 0 R >>"),
        PdfObject::new(
            2,
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>",
        ),
        PdfObject::new(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>",
        ),
        PdfObject::stream(4, "/Filter /FlateDecode", &compressed),
        PdfObject::new(5, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"),
    ];
    let data = build_pdf(&objects, 1);
    let doc = parse_bytes(&data).unwrap();
    assert_eq!(doc.pages[0].plain_text(), "compressed");
}

#[test]
fn truncated_buffer_yields_document_with_warnings() {
    let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 9 0 R";
    let doc = parse_bytes(data).unwrap();
    assert_eq!(doc.page_count(), 0);
    assert!(!doc.warnings.is_empty());
}

#[test]
fn parallel_and_sequential_output_match() {
    let page: &[u8] = b"BT /F1 12 Tf 72 700 Td (deterministic output) Tj ET";
    let data = document_with_pages(&[page, page, page, page]);

    let parallel = parse_bytes(&data).unwrap();
    let sequential =
        parse_bytes_with_options(&data, ParseOptions::new().sequential()).unwrap();

    assert_eq!(parallel.plain_text(), sequential.plain_text());
    assert_eq!(parallel.page_count(), sequential.page_count());
}

#[test]
fn page_selection_limits_reconstruction() {
    let data = document_with_pages(&[
        b"BT /F1 12 Tf 72 700 Td (one) Tj ET",
        b"BT /F1 12 Tf 72 700 Td (two) Tj ET",
        b"BT /F1 12 Tf 72 700 Td (three) Tj ET",
    ]);
    let doc =
        parse_bytes_with_options(&data, ParseOptions::new().with_pages(PageSelection::Single(2)))
            .unwrap();

    // Full page count is still reported, but only page 2 is materialized.
    assert_eq!(doc.metadata.page_count, 3);
    assert_eq!(doc.pages.len(), 1);
    assert_eq!(doc.pages[0].number, 2);
    assert_eq!(doc.pages[0].plain_text(), "two");
}

#[test]
fn metadata_from_info_dictionary() {
    let objects = vec![
        PdfObject::new(1, "<< /Type /Catalog /Pages 2 0 R >>"),
        PdfObject::new(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
        PdfObject::new(3, "<< /Type /Page >>"),
        PdfObject::new(
            4,
            "<< /Title (Quarterly Report) /Author (Jordan) /CreationDate (D:20240115103045) >>",
        ),
    ];
    let data = common::build_pdf_with_trailer(&objects, "/Root 1 0 R /Info 4 0 R");
    let doc = parse_bytes(&data).unwrap();

    assert_eq!(doc.metadata.title.as_deref(), Some("Quarterly Report"));
    assert_eq!(doc.metadata.author.as_deref(), Some("Jordan"));
    assert!(doc.metadata.created.is_some());
}

#[test]
fn outline_items_resolve_page_targets() {
    let objects = vec![
        PdfObject::new(1, "<< /Type /Catalog /Pages 2 0 R /Outlines 5 0 R >>"),
        PdfObject::new(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>"),
        PdfObject::new(3, "<< /Type /Page >>"),
        PdfObject::new(4, "<< /Type /Page >>"),
        PdfObject::new(5, "<< /Type /Outlines /First 6 0 R >>"),
        PdfObject::new(6, "<< /Title (Chapter 1) /Dest [4 0 R /Fit] >>"),
    ];
    let data = build_pdf(&objects, 1);
    let doc = parse_bytes(&data).unwrap();

    let outline = doc.outline.expect("outline present");
    assert_eq!(outline.items.len(), 1);
    assert_eq!(outline.items[0].title, "Chapter 1");
    assert_eq!(outline.items[0].page, Some(2));
}

#[test]
fn underline_segment_styles_text() {
    // Text at y=700 with a rule 2 points below spanning its width.
    let content: &[u8] = b"BT /F1 10 Tf 72 700 Td (underlined) Tj ET \
72 698 m 130 698 l S";
    let data = document_with_pages(&[content]);
    let doc = parse_bytes(&data).unwrap();
    let Block::Paragraph(p) = &doc.pages[0].elements[0] else {
        panic!("expected a paragraph");
    };
    assert!(p.runs[0].style.underline);
}

#[test]
fn model_survives_json_roundtrip() {
    let data = document_with_pages(&[b"BT /F1 12 Tf 72 700 Td (hello json) Tj ET"]);
    let doc = parse_bytes(&data).unwrap();

    let json = serde_json::to_string(&doc).unwrap();
    let back: repdf::Document = serde_json::from_str(&json).unwrap();
    assert_eq!(back.plain_text(), doc.plain_text());
}
