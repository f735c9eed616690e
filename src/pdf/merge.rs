use crate::error::PdfError;
use crate::pdf::PdfDocument;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::path::Path;
use tracing::debug;

/// Order in which input documents are concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MergeOrder {
    /// Inputs in upload order.
    #[default]
    Forward,
    /// Last upload first. Each document's own pages stay in forward order.
    Reversed,
}

impl MergeOrder {
    pub fn arrange<T>(self, items: &mut [T]) {
        if self == MergeOrder::Reversed {
            items.reverse();
        }
    }
}

/// Concatenate the pages of `inputs` into one new document.
pub fn merge_documents<P: AsRef<Path>>(
    inputs: &[P],
    order: MergeOrder,
) -> Result<Document, PdfError> {
    if inputs.len() < 2 {
        return Err(PdfError::NotEnoughInputs { got: inputs.len() });
    }

    let mut ordered: Vec<&Path> = inputs.iter().map(|p| p.as_ref()).collect();
    order.arrange(&mut ordered);

    let mut merged = Document::with_version("1.5");
    let mut max_id = 1;
    let mut kids: Vec<(ObjectId, Dictionary)> = Vec::new();

    for path in ordered {
        let mut source = PdfDocument::open(path)?;

        // Shift object IDs so they cannot clash with earlier inputs
        source.doc.renumber_objects_with(max_id);
        max_id = source.doc.max_id + 1;

        for (_, page_id) in source.page_ids() {
            let page = source.page_with_inherited_attributes(page_id)?;
            kids.push((page_id, page));
        }
        debug!(path = %path.display(), pages = source.page_count(), "appending document");

        // Page tree and outline nodes are rebuilt below; everything else
        // (content streams, fonts, images) is carried over as is.
        for (object_id, object) in source.doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    merged.objects.insert(object_id, object);
                }
            }
        }
    }

    if kids.is_empty() {
        return Err(PdfError::EmptyDocument {
            path: inputs[0].as_ref().to_path_buf(),
        });
    }

    merged.max_id = max_id;
    let pages_id = merged.new_object_id();

    let mut kid_refs = Vec::with_capacity(kids.len());
    for (page_id, mut page) in kids {
        page.set("Parent", Object::Reference(pages_id));
        merged.objects.insert(page_id, Object::Dictionary(page));
        kid_refs.push(Object::Reference(page_id));
    }

    let count = kid_refs.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kid_refs,
            "Count" => count,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", Object::Reference(catalog_id));
    merged.renumber_objects();

    Ok(merged)
}

/// Merge `inputs` and write the result to `output`, replacing any existing
/// file atomically. Returns the number of pages written.
pub fn merge_into<P: AsRef<Path>, Q: AsRef<Path>>(
    inputs: &[P],
    order: MergeOrder,
    output: Q,
) -> Result<u32, PdfError> {
    let output = output.as_ref();
    let mut merged = merge_documents(inputs, order)?;
    let total_pages = merged.get_pages().len() as u32;

    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    let io_error = |source| PdfError::Io {
        path: output.to_path_buf(),
        source,
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
    PdfDocument::write_to(&mut merged, staged.as_file_mut(), output)?;
    staged.persist(output).map_err(|e| io_error(e.error))?;

    Ok(total_pages)
}
