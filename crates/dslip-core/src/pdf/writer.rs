//! Reassembly of pages taken from several source PDFs into a new document.

use std::collections::{BTreeMap, HashMap};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{Result, SourceDocument};
use crate::error::PdfError;
use crate::models::page::PageKey;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// Copies pages verbatim out of loaded source documents.
///
/// Page objects and everything they reference are moved over unchanged;
/// only the page tree is rebuilt.
pub struct PageCopier<'a> {
    sources: HashMap<&'a str, &'a SourceDocument>,
}

impl<'a> PageCopier<'a> {
    /// Create a copier over a set of source documents, addressed by name.
    pub fn new(sources: impl IntoIterator<Item = &'a SourceDocument>) -> Self {
        Self {
            sources: sources.into_iter().map(|s| (s.name(), s)).collect(),
        }
    }

    /// Build a PDF holding the given pages, in the given order.
    pub fn assemble(&self, pages: &[PageKey]) -> Result<Vec<u8>> {
        let mut output = Document::with_version("1.5");
        let mut next_id = 1;
        let mut imported: HashMap<&str, BTreeMap<u32, ObjectId>> = HashMap::new();
        let mut kids = Vec::with_capacity(pages.len());

        for key in pages {
            if !imported.contains_key(key.document.as_str()) {
                let source = self
                    .sources
                    .get(key.document.as_str())
                    .ok_or_else(|| PdfError::UnknownDocument(key.document.clone()))?;

                let mut doc = source.document().clone();
                doc.renumber_objects_with(next_id);
                next_id = doc.max_id + 1;

                let page_ids = doc.get_pages();
                output.objects.extend(doc.objects);
                trace!("Imported '{}' ({} pages)", key.document, page_ids.len());
                imported.insert(key.document.as_str(), page_ids);
            }

            let page_id = imported
                .get(key.document.as_str())
                .and_then(|ids| ids.get(&key.page))
                .copied()
                .ok_or_else(|| PdfError::InvalidPage {
                    document: key.document.clone(),
                    page: key.page,
                })?;
            kids.push(page_id);
        }

        let pages_id = (next_id, 0);
        let catalog_id = (next_id + 1, 0);
        output.max_id = next_id + 1;

        for page_id in &kids {
            materialize_inherited(&mut output, *page_id);
            if let Ok(page) = output.get_dictionary_mut(*page_id) {
                page.set("Parent", Object::Reference(pages_id));
            }
        }

        let count = kids.len() as i64;
        let kids: Vec<Object> = kids.into_iter().map(Object::Reference).collect();
        output.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        output.objects.insert(
            catalog_id,
            Object::Dictionary(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            }),
        );
        output.trailer.set("Root", catalog_id);

        // Drops source catalogs, old page trees and pages not selected.
        let pruned = output.prune_objects();
        output.renumber_objects();
        debug!("Assembled {} pages, pruned {} unused objects", count, pruned.len());

        let mut data = Vec::new();
        output
            .save_to(&mut data)
            .map_err(|e| PdfError::Write(e.to_string()))?;
        Ok(data)
    }
}

/// Copy attributes a page inherits from its ancestors onto the page itself,
/// so it keeps rendering the same once re-parented.
fn materialize_inherited(doc: &mut Document, page_id: ObjectId) {
    let mut inherited = Vec::new();
    if let Ok(page) = doc.get_dictionary(page_id) {
        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            if let Some(value) = find_inherited(doc, page, key, 0) {
                inherited.push((key, value));
            }
        }
    }

    if inherited.is_empty() {
        return;
    }
    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

fn find_inherited(doc: &Document, node: &Dictionary, key: &[u8], depth: usize) -> Option<Object> {
    if depth >= MAX_TREE_DEPTH {
        return None;
    }
    let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
    let parent = doc.get_dictionary(parent_id).ok()?;
    match parent.get(key) {
        Ok(value) => Some(value.clone()),
        Err(_) => find_inherited(doc, parent, key, depth + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::{page_content, sample_document};

    fn source(name: &str, pages: &[&str]) -> SourceDocument {
        let texts = pages.iter().map(|s| s.to_string()).collect();
        SourceDocument::from_parts(name, sample_document(pages), texts).unwrap()
    }

    #[test]
    fn test_assemble_selected_pages_in_order() {
        let a = source("a.pdf", &["A ONE", "A TWO", "A THREE"]);
        let b = source("b.pdf", &["B ONE", "B TWO"]);
        let copier = PageCopier::new([&a, &b]);

        let data = copier
            .assemble(&[
                PageKey::new("a.pdf", 3),
                PageKey::new("b.pdf", 1),
                PageKey::new("a.pdf", 1),
            ])
            .unwrap();

        let doc = Document::load_mem(&data).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        assert!(page_content(&doc, 1).contains("A THREE"));
        assert!(page_content(&doc, 2).contains("B ONE"));
        assert!(page_content(&doc, 3).contains("A ONE"));
    }

    #[test]
    fn test_inherited_attributes_are_copied() {
        let a = source("a.pdf", &["ONLY"]);
        let data = PageCopier::new([&a]).assemble(&[PageKey::new("a.pdf", 1)]).unwrap();

        let doc = Document::load_mem(&data).unwrap();
        let page_id = doc.get_pages()[&1];
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
    }

    #[test]
    fn test_unknown_page_is_an_error() {
        let a = source("a.pdf", &["ONLY"]);
        let err = PageCopier::new([&a])
            .assemble(&[PageKey::new("a.pdf", 2)])
            .unwrap_err();
        assert!(matches!(err, PdfError::InvalidPage { page: 2, .. }));

        let err = PageCopier::new([&a])
            .assemble(&[PageKey::new("missing.pdf", 1)])
            .unwrap_err();
        assert!(matches!(err, PdfError::UnknownDocument(_)));
    }
}
