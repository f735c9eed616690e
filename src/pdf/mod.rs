pub mod document;
pub mod merge;
pub mod split;

#[cfg(test)]
pub mod fixtures;

pub use document::PdfDocument;
pub use merge::{merge_into, MergeOrder};
pub use split::split_into_pages;
