//! Page tree traversal.
//!
//! The catalog's `Pages` tree is a hierarchy of intermediate nodes (with
//! `Kids`) and leaf pages. Inheritable attributes declared on an
//! intermediate node apply to every descendant that does not redeclare
//! them, so the walk threads the nearest-ancestor values down instead of
//! re-reading from the root.

use std::collections::HashMap;

use super::object::{Object, ObjectId};
use super::options::PageSelection;
use super::store::ObjectStore;

/// US Letter, the fallback when no page box is declared anywhere.
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

const MAX_TREE_DEPTH: usize = 64;

/// A resolved leaf page with its inherited attributes flattened.
#[derive(Debug, Clone)]
pub struct PageHandle {
    /// Id of the page object.
    pub id: ObjectId,
    /// 1-indexed position in document order.
    pub number: u32,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// Rotation in degrees (0/90/180/270).
    pub rotation: u16,
    /// Resolved resource dictionary (own or inherited).
    pub resources: HashMap<String, Object>,
    /// Content stream object ids, in declared order.
    pub contents: Vec<ObjectId>,
}

/// Attributes that intermediate nodes pass down to their descendants.
#[derive(Debug, Clone, Default)]
struct Inherited {
    media_box: Option<[f64; 4]>,
    resources: Option<HashMap<String, Object>>,
    rotation: Option<i64>,
}

/// Resolve the ordered list of leaf pages reachable from the catalog.
///
/// `selection` drives the subtree-skip optimization: an intermediate node
/// whose declared `Count` of descendant pages cannot overlap the selected
/// range is skipped without descending. Skipped pages still advance the
/// numbering so that later pages keep their document position.
pub fn resolve_pages(
    store: &ObjectStore,
    selection: &PageSelection,
) -> (Vec<PageHandle>, Vec<String>) {
    let mut pages = Vec::new();
    let mut warnings = Vec::new();

    let Some(catalog) = store.catalog() else {
        warnings.push("document catalog not found".to_string());
        return (pages, warnings);
    };
    let Some(root) = store.dict_get(catalog, "Pages") else {
        warnings.push("catalog has no page tree root".to_string());
        return (pages, warnings);
    };
    let Some(root_dict) = root.as_dict() else {
        warnings.push("page tree root is not a dictionary".to_string());
        return (pages, warnings);
    };

    let mut walker = Walker {
        store,
        selection,
        emitted: 0,
        visited: Vec::new(),
        warnings: &mut warnings,
    };
    walker.descend(root_dict, catalog_reference(catalog, store), Inherited::default(), 0, &mut pages);

    (pages, warnings)
}

/// Total number of leaf pages reachable from the root, ignoring selection.
pub fn count_pages(store: &ObjectStore) -> u32 {
    let (pages, _) = resolve_pages(store, &PageSelection::All);
    pages.len() as u32
}

fn catalog_reference(catalog: &HashMap<String, Object>, _store: &ObjectStore) -> Option<ObjectId> {
    catalog.get("Pages").and_then(|v| v.as_reference())
}

struct Walker<'a> {
    store: &'a ObjectStore,
    selection: &'a PageSelection,
    emitted: u32,
    visited: Vec<ObjectId>,
    warnings: &'a mut Vec<String>,
}

impl Walker<'_> {
    fn descend(
        &mut self,
        node: &HashMap<String, Object>,
        node_id: Option<ObjectId>,
        inherited: Inherited,
        depth: usize,
        out: &mut Vec<PageHandle>,
    ) {
        if depth > MAX_TREE_DEPTH {
            self.warnings.push("page tree deeper than expected, truncated".to_string());
            return;
        }
        if let Some(id) = node_id {
            if self.visited.contains(&id) {
                self.warnings.push(format!("page tree cycle at object {} {}", id.0, id.1));
                return;
            }
            self.visited.push(id);
        }

        let inherited = self.merge_inherited(node, inherited);

        let Some(kids) = self.store.dict_get(node, "Kids").and_then(|v| v.as_array()) else {
            // A node without kids is a leaf even when its Type is missing.
            self.emit_page(node, node_id, &inherited, out);
            return;
        };
        let kids: Vec<Object> = kids.to_vec();

        for kid in kids {
            let kid_id = kid.as_reference();
            let resolved = self.store.resolve(&kid);
            let Some(kid_dict) = resolved.as_dict() else {
                self.warnings.push("page tree kid is not a dictionary".to_string());
                continue;
            };

            let is_intermediate = kid_dict.contains_key("Kids");
            if is_intermediate {
                if let Some(count) = self
                    .store
                    .dict_get(kid_dict, "Count")
                    .and_then(|v| v.as_i64())
                    .and_then(|v| u32::try_from(v).ok())
                {
                    let first = self.emitted + 1;
                    let last = self.emitted.saturating_add(count);
                    if count > 0 && !self.selection.overlaps(first, last) {
                        // Whole subtree outside the selection: skip the
                        // descent but keep the page numbering aligned.
                        self.emitted = last;
                        continue;
                    }
                }
                let kid_dict = kid_dict.clone();
                self.descend(&kid_dict, kid_id, inherited.clone(), depth + 1, out);
            } else {
                let kid_dict = kid_dict.clone();
                let merged = self.merge_inherited(&kid_dict, inherited.clone());
                self.emit_page(&kid_dict, kid_id, &merged, out);
            }
        }
    }

    fn merge_inherited(&self, node: &HashMap<String, Object>, mut inherited: Inherited) -> Inherited {
        if let Some(media_box) = self
            .store
            .dict_get(node, "MediaBox")
            .and_then(|v| v.as_array())
            .and_then(parse_rect)
        {
            inherited.media_box = Some(media_box);
        }
        if let Some(resources) = self
            .store
            .dict_get(node, "Resources")
            .and_then(|v| v.as_dict())
        {
            inherited.resources = Some(resources.clone());
        }
        if let Some(rotation) = self.store.dict_get(node, "Rotate").and_then(|v| v.as_i64()) {
            inherited.rotation = Some(rotation);
        }
        inherited
    }

    fn emit_page(
        &mut self,
        node: &HashMap<String, Object>,
        node_id: Option<ObjectId>,
        inherited: &Inherited,
        out: &mut Vec<PageHandle>,
    ) {
        self.emitted += 1;
        let number = self.emitted;
        if !self.selection.includes(number) {
            return;
        }

        let media_box = inherited.media_box.unwrap_or([
            0.0,
            0.0,
            DEFAULT_PAGE_SIZE.0 as f64,
            DEFAULT_PAGE_SIZE.1 as f64,
        ]);
        let width = (media_box[2] - media_box[0]).abs() as f32;
        let height = (media_box[3] - media_box[1]).abs() as f32;

        let rotation = inherited
            .rotation
            .map(|r| r.rem_euclid(360) as u16)
            .unwrap_or(0);

        let contents = match node.get("Contents") {
            Some(Object::Reference(id)) => vec![*id],
            Some(Object::Array(items)) => items.iter().filter_map(|o| o.as_reference()).collect(),
            _ => Vec::new(),
        };

        out.push(PageHandle {
            id: node_id.unwrap_or((0, 0)),
            number,
            width,
            height,
            rotation,
            resources: inherited.resources.clone().unwrap_or_default(),
            contents,
        });
    }
}

fn parse_rect(array: &[Object]) -> Option<[f64; 4]> {
    if array.len() < 4 {
        return None;
    }
    let mut rect = [0.0f64; 4];
    for (slot, value) in rect.iter_mut().zip(array) {
        *slot = value.as_f64()?;
    }
    Some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_page_doc() -> Vec<u8> {
        b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 595 842] /Resources << /Font << >> >> >>\nendobj\n\
3 0 obj\n<< /Type /Page >>\nendobj\n\
4 0 obj\n<< /Type /Page /MediaBox [0 0 612 792] /Rotate 90 >>\nendobj\n"
            .to_vec()
    }

    #[test]
    fn test_pages_in_order_with_inheritance() {
        let store = ObjectStore::parse(&two_page_doc()).unwrap();
        let (pages, warnings) = resolve_pages(&store, &PageSelection::All);
        assert!(warnings.is_empty());
        assert_eq!(pages.len(), 2);

        // Page 1 inherits the intermediate node's MediaBox.
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].width, 595.0);
        assert_eq!(pages[0].height, 842.0);
        assert_eq!(pages[0].rotation, 0);

        // Page 2 redeclares its own box and rotation.
        assert_eq!(pages[1].number, 2);
        assert_eq!(pages[1].width, 612.0);
        assert_eq!(pages[1].rotation, 90);
    }

    #[test]
    fn test_count_pages_matches_leaves() {
        let store = ObjectStore::parse(&two_page_doc()).unwrap();
        assert_eq!(count_pages(&store), 2);
    }

    #[test]
    fn test_selection_skips_but_keeps_numbering() {
        let store = ObjectStore::parse(&two_page_doc()).unwrap();
        let (pages, _) = resolve_pages(&store, &PageSelection::Single(2));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 2);
        assert_eq!(pages[0].width, 612.0);
    }

    #[test]
    fn test_subtree_skip_by_count() {
        // Nested intermediate holding pages 1-2, then a leaf page 3.
        let input = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R 6 0 R] /Count 3 >>\nendobj\n\
3 0 obj\n<< /Type /Pages /Kids [4 0 R 5 0 R] /Count 2 >>\nendobj\n\
4 0 obj\n<< /Type /Page >>\nendobj\n\
5 0 obj\n<< /Type /Page >>\nendobj\n\
6 0 obj\n<< /Type /Page >>\nendobj\n";
        let store = ObjectStore::parse(input).unwrap();
        let (pages, _) = resolve_pages(&store, &PageSelection::Single(3));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 3);
        assert_eq!(pages[0].id, (6, 0));
    }

    #[test]
    fn test_cycle_is_warned_not_fatal() {
        let input = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [2 0 R] /Count 1 >>\nendobj\n";
        let store = ObjectStore::parse(input).unwrap();
        let (pages, warnings) = resolve_pages(&store, &PageSelection::All);
        assert!(pages.is_empty());
        assert!(warnings.iter().any(|w| w.contains("cycle")));
    }
}
