use crate::error::PdfError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::{Path, PathBuf};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `/Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

pub struct PdfDocument {
    pub doc: Document,
    pub path: PathBuf,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PdfError> {
        let path = path.as_ref().to_path_buf();
        let doc = Document::load(&path).map_err(|source| PdfError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(PdfDocument { doc, path })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Get 1-indexed page object IDs
    pub fn page_ids(&self) -> Vec<(u32, ObjectId)> {
        let mut pages: Vec<_> = self.doc.get_pages().into_iter().collect();
        pages.sort_by_key(|(num, _)| *num);
        pages
    }

    /// Extract specific pages to a new document
    pub fn extract_pages(&self, pages: &[u32]) -> Result<Document, PdfError> {
        let mut new_doc = self.doc.clone();
        let all_pages = self.page_ids();
        let total = all_pages.len() as u32;

        for &page in pages {
            if page == 0 || page > total {
                return Err(PdfError::PageOutOfRange { page, total });
            }
        }

        let pages_to_delete: Vec<u32> = all_pages
            .iter()
            .filter(|(num, _)| !pages.contains(num))
            .map(|(num, _)| *num)
            .collect();

        if !pages_to_delete.is_empty() {
            new_doc.delete_pages(&pages_to_delete);
            // Drop fonts, images and content streams only the deleted pages used.
            new_doc.prune_objects();
        }

        Ok(new_doc)
    }

    /// Clone a page dictionary with inherited attributes made explicit, so the
    /// page renders the same once it is detached from its original page tree.
    pub fn page_with_inherited_attributes(
        &self,
        page_id: ObjectId,
    ) -> Result<Dictionary, PdfError> {
        let parse_error = |source| PdfError::Parse {
            path: self.path.clone(),
            source,
        };

        let mut page = self.doc.get_dictionary(page_id).map_err(parse_error)?.clone();
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;

        while let Some(node_id) = parent {
            if depth >= MAX_TREE_DEPTH {
                break;
            }
            let node = self.doc.get_dictionary(node_id).map_err(parse_error)?;
            for key in INHERITABLE {
                if !page.has(key) {
                    if let Ok(value) = node.get(key) {
                        page.set(key, value.clone());
                    }
                }
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }

        Ok(page)
    }

    /// Save to a file
    pub fn save<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<(), PdfError> {
        doc.save(&path).map_err(|source| PdfError::Write {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Serialise into any writer, e.g. a temp file that is renamed afterwards.
    pub fn write_to<W: std::io::Write>(
        doc: &mut Document,
        target: &mut W,
        path: &Path,
    ) -> Result<(), PdfError> {
        doc.save_to(target).map_err(|source| PdfError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
