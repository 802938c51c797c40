//! Shared synthetic-document builder for integration tests.
//!
//! Assembles well-formed PDF byte buffers with a correct cross-reference
//! table so the tests exercise the declared-offset path, not just the
//! fallback scan.

/// One indirect object: number plus body bytes (without obj/endobj).
pub struct PdfObject {
    pub number: u32,
    pub body: Vec<u8>,
}

impl PdfObject {
    pub fn new(number: u32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            number,
            body: body.into(),
        }
    }

    /// A stream object with a correct /Length and optional extra dict keys.
    pub fn stream(number: u32, extra_keys: &str, payload: &[u8]) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!("<< {} /Length {} >>\nstream\n", extra_keys, payload.len()).as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\nendstream");
        Self { number, body }
    }
}

/// Serialize objects into a complete file with header, xref and trailer.
pub fn build_pdf(objects: &[PdfObject], root: u32) -> Vec<u8> {
    build_pdf_with_trailer(objects, &format!("/Root {} 0 R", root))
}

pub fn build_pdf_with_trailer(objects: &[PdfObject], trailer_keys: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let max_number = objects.iter().map(|o| o.number).max().unwrap_or(0);
    let mut offsets = vec![0usize; (max_number + 1) as usize];

    for object in objects {
        offsets[object.number as usize] = out.len();
        out.extend_from_slice(format!("{} 0 obj\n", object.number).as_bytes());
        out.extend_from_slice(&object.body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", max_number + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for number in 1..=max_number {
        out.extend_from_slice(format!("{:010} 00000 n \n", offsets[number as usize]).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n",
            max_number + 1,
            trailer_keys,
            xref_offset
        )
        .as_bytes(),
    );
    out
}

/// A document whose pages each run one content stream, sharing a Helvetica
/// font as /F1 and any given XObjects.
pub fn document_with_pages(content_streams: &[&[u8]]) -> Vec<u8> {
    document_with_pages_and_xobjects(content_streams, &[])
}

/// `xobjects`: (name, object body) registered on every page as /XObject.
pub fn document_with_pages_and_xobjects(
    content_streams: &[&[u8]],
    xobjects: &[(&str, PdfObject)],
) -> Vec<u8> {
    let page_count = content_streams.len() as u32;
    let font_number = 3 + 2 * page_count;

    let mut xobject_entries = String::new();
    for (name, object) in xobjects {
        xobject_entries.push_str(&format!("/{} {} 0 R ", name, object.number));
    }
    let resources = format!(
        "/Resources << /Font << /F1 {} 0 R >> /XObject << {} >> >>",
        font_number, xobject_entries
    );

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 3 + 2 * i))
        .collect();

    let mut objects = vec![
        PdfObject::new(1, "<< /Type /Catalog /Pages 2 0 R >>"),
        PdfObject::new(
            2,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792] >>",
                kids.join(" "),
                page_count
            ),
        ),
    ];

    for (i, content) in content_streams.iter().enumerate() {
        let page_number = 3 + 2 * i as u32;
        let content_number = page_number + 1;
        objects.push(PdfObject::new(
            page_number,
            format!(
                "<< /Type /Page /Parent 2 0 R /Contents {} 0 R {} >>",
                content_number, resources
            ),
        ));
        objects.push(PdfObject::stream(content_number, "", content));
    }

    objects.push(PdfObject::new(
        font_number,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>",
    ));

    for (_, object) in xobjects {
        objects.push(PdfObject::new(object.number, object.body.clone()));
    }

    build_pdf(&objects, 1)
}
