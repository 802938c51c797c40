//! Per-document orchestration.
//!
//! Ties the pipeline together: object store, page tree, per-page content
//! replay, font resolution, image materialization and layout
//! reconstruction. Pages share only the read-only object store, so they
//! are processed in parallel unless the options say otherwise; results
//! are merged back in page order, keeping output deterministic.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::detect::{detect_format_from_bytes, PdfFormat};
use crate::error::{Error, Result};
use crate::model::{Document, Metadata, Outline, OutlineItem, Page, Resource};

use super::content;
use super::fonts;
use super::images;
use super::layout;
use super::object::{Object, ObjectId};
use super::options::{ErrorMode, PageSelection, ParseOptions};
use super::pages::{self, PageHandle, DEFAULT_PAGE_SIZE};
use super::store::ObjectStore;

const MAX_OUTLINE_DEPTH: u8 = 32;
const MAX_OUTLINE_SIBLINGS: usize = 256;

/// Reconstructs a structured document from raw PDF bytes.
pub struct DocumentParser {
    store: ObjectStore,
    format: PdfFormat,
    options: ParseOptions,
}

impl DocumentParser {
    /// Parse the object graph out of a byte buffer with default options.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse the object graph out of a byte buffer.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        let format = detect_format_from_bytes(data)?;
        let store = ObjectStore::parse(data)?;
        Ok(Self {
            store,
            format,
            options,
        })
    }

    /// Number of leaf pages in the page tree.
    pub fn page_count(&self) -> u32 {
        pages::count_pages(&self.store)
    }

    /// Version string from the file header.
    pub fn version(&self) -> &str {
        &self.format.version
    }

    /// Reconstruct the structured document.
    pub fn parse(&self) -> Result<Document> {
        let mut document = Document::new();

        // Warnings recorded while loading the object graph come first.
        document.warnings.extend(self.store.take_warnings());

        // The full walk supplies the page count, the id→number mapping for
        // outline targets, and the default page geometry.
        let (all_pages, tree_warnings) = pages::resolve_pages(&self.store, &PageSelection::All);
        document.warnings.extend(tree_warnings);

        document.metadata = self.extract_metadata(all_pages.len() as u32, &all_pages);

        let selected: Vec<&PageHandle> = all_pages
            .iter()
            .filter(|h| self.options.pages.includes(h.number))
            .collect();

        let results: Result<Vec<PageResult>> = if self.options.parallel && selected.len() > 1 {
            selected.par_iter().map(|h| self.process_page(h)).collect()
        } else {
            selected.iter().map(|h| self.process_page(h)).collect()
        };

        for result in results? {
            document.add_page(result.page);
            for (id, resource) in result.resources {
                document.add_resource(id, resource);
            }
            document.warnings.extend(result.warnings);
        }

        if let Some(outline) = self.extract_outline(&all_pages) {
            if !outline.is_empty() {
                document.outline = Some(outline);
            }
        }

        // Store warnings last: they include lazily-recorded decode issues.
        document.warnings.extend(self.store.take_warnings());

        Ok(document)
    }

    fn extract_metadata(&self, page_count: u32, all_pages: &[PageHandle]) -> Metadata {
        let mut metadata = Metadata::with_version(self.format.version.clone());
        metadata.page_count = page_count;

        let (width, height) = all_pages
            .first()
            .map(|p| (p.width, p.height))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        metadata.page_width = width;
        metadata.page_height = height;

        if let Some(info) = self
            .store
            .dict_get(self.store.trailer(), "Info")
            .and_then(|v| v.as_dict())
        {
            metadata.title = self.info_string(info, "Title");
            metadata.author = self.info_string(info, "Author");
            metadata.subject = self.info_string(info, "Subject");
            metadata.keywords = self.info_string(info, "Keywords");
            metadata.creator = self.info_string(info, "Creator");
            metadata.producer = self.info_string(info, "Producer");
            metadata.created = self.info_string(info, "CreationDate").and_then(|d| parse_pdf_date(&d));
            metadata.modified = self.info_string(info, "ModDate").and_then(|d| parse_pdf_date(&d));
        }

        metadata
    }

    fn info_string(&self, dict: &HashMap<String, Object>, key: &str) -> Option<String> {
        match self.store.dict_get(dict, key)? {
            Object::String(bytes) => Some(fonts::decode_text_simple(bytes)),
            Object::Name(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// Replay one page's content and reconstruct its layout.
    fn process_page(&self, handle: &PageHandle) -> Result<PageResult> {
        let mut warnings = Vec::new();

        let mut content_bytes = Vec::new();
        for &id in &handle.contents {
            match self.store.stream_content(id) {
                Some(bytes) => {
                    content_bytes.extend_from_slice(bytes);
                    content_bytes.push(b' ');
                }
                None => {
                    let message =
                        format!("page {}: content stream {} {} unreadable", handle.number, id.0, id.1);
                    if self.options.error_mode == ErrorMode::Strict {
                        return Err(Error::TextExtract(message));
                    }
                    log::warn!("{}", message);
                    warnings.push(message);
                }
            }
        }

        let resolved_fonts = fonts::resolve_fonts(&self.store, &handle.resources);
        let (xobject_kinds, xobject_ids) = self.xobject_catalog(handle);

        let tokens = content::tokenize(&content_bytes);
        let output = content::replay(&tokens, &resolved_fonts, &xobject_kinds);
        warnings.extend(
            output
                .warnings
                .into_iter()
                .map(|w| format!("page {}: {}", handle.number, w)),
        );

        // Materialize each referenced image once per page.
        let mut resources: Vec<(String, Resource)> = Vec::new();
        let mut materialized: HashMap<String, Option<String>> = HashMap::new();
        let mut placements = Vec::new();
        for placement in output.images {
            let entry = materialized
                .entry(placement.name.clone())
                .or_insert_with(|| {
                    if !self.options.extract_resources {
                        return None;
                    }
                    let object_id = xobject_ids.get(&placement.name)?;
                    match images::materialize_image(&self.store, *object_id) {
                        Ok(resource) => {
                            let key = format!("page{}_{}", handle.number, placement.name);
                            resources.push((key.clone(), resource));
                            Some(key)
                        }
                        Err(message) => {
                            let message = format!("page {}: {}", handle.number, message);
                            log::warn!("{}", message);
                            warnings.push(message);
                            None
                        }
                    }
                })
                .clone();
            placements.push((placement, entry));
        }

        let blocks = layout::reconstruct(output.texts, &output.segments, placements);

        let mut page = Page::new(handle.number, handle.width, handle.height);
        page.rotation = handle.rotation;
        for block in blocks {
            page.add_block(block);
        }

        Ok(PageResult {
            page,
            resources,
            warnings,
        })
    }

    /// Classify the page's XObjects: name → is-image, plus their ids.
    fn xobject_catalog(
        &self,
        handle: &PageHandle,
    ) -> (HashMap<String, bool>, HashMap<String, ObjectId>) {
        let mut kinds = HashMap::new();
        let mut ids = HashMap::new();
        let Some(xobjects) = self
            .store
            .dict_get(&handle.resources, "XObject")
            .and_then(|v| v.as_dict())
        else {
            return (kinds, ids);
        };

        for (name, value) in xobjects {
            let Some(id) = value.as_reference() else {
                continue;
            };
            let is_image = self
                .store
                .get(id)
                .and_then(|o| o.as_dict())
                .and_then(|d| d.get("Subtype"))
                .and_then(|v| v.as_name())
                == Some("Image");
            kinds.insert(name.clone(), is_image);
            ids.insert(name.clone(), id);
        }
        (kinds, ids)
    }

    /// Walk the catalog's outline tree into nested bookmark items.
    fn extract_outline(&self, all_pages: &[PageHandle]) -> Option<Outline> {
        let catalog = self.store.catalog()?;
        let outlines = self.store.dict_get(catalog, "Outlines")?.as_dict()?;
        let first = outlines.get("First")?.as_reference()?;

        let page_numbers: HashMap<ObjectId, u32> =
            all_pages.iter().map(|p| (p.id, p.number)).collect();

        let mut outline = Outline::new();
        self.collect_outline_items(first, 0, &page_numbers, &mut outline.items);
        Some(outline)
    }

    fn collect_outline_items(
        &self,
        first: ObjectId,
        level: u8,
        page_numbers: &HashMap<ObjectId, u32>,
        items: &mut Vec<OutlineItem>,
    ) {
        if level >= MAX_OUTLINE_DEPTH {
            return;
        }
        let mut next = Some(first);
        let mut seen = 0usize;
        while let Some(id) = next {
            if seen >= MAX_OUTLINE_SIBLINGS {
                break;
            }
            seen += 1;
            let Some(dict) = self.store.get(id).and_then(|o| o.as_dict()) else {
                break;
            };

            let title = match dict.get("Title").map(|t| self.store.resolve(t)) {
                Some(Object::String(bytes)) => fonts::decode_text_simple(bytes),
                _ => String::new(),
            };
            let page = self.outline_target(dict, page_numbers);

            let mut item = OutlineItem::new(title, page, level);
            if let Some(child) = dict.get("First").and_then(|v| v.as_reference()) {
                self.collect_outline_items(child, level + 1, page_numbers, &mut item.children);
            }
            items.push(item);

            next = dict.get("Next").and_then(|v| v.as_reference());
        }
    }

    /// Resolve an outline item's destination to a 1-indexed page number.
    fn outline_target(
        &self,
        dict: &HashMap<String, Object>,
        page_numbers: &HashMap<ObjectId, u32>,
    ) -> Option<u32> {
        let dest = self
            .store
            .dict_get(dict, "Dest")
            .or_else(|| {
                let action = self.store.dict_get(dict, "A")?.as_dict()?;
                self.store.dict_get(action, "D")
            })?;
        let target = dest.as_array()?.first()?.as_reference()?;
        page_numbers.get(&target).copied()
    }
}

struct PageResult {
    page: Page,
    resources: Vec<(String, Resource)>,
    warnings: Vec<String>,
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSS...).
fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|v| v.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|v| v.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|v| v.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|v| v.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|v| v.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}
