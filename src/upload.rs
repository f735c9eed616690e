use crate::error::UploadError;
use axum::body::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Lowercased extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

/// Stored name used when sanitisation strips the name down to a bare extension.
const FALLBACK_NAME: &str = "upload.pdf";

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// One file part of a multipart request, exactly as submitted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Untrusted client-supplied name. Browsers send an empty name when no
    /// file was chosen.
    pub filename: String,
    pub content: Bytes,
}

/// An upload that passed validation, with the name it will be stored under.
#[derive(Debug, Clone)]
pub struct AcceptedFile {
    pub stored_name: String,
    pub content: Bytes,
}

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduce an untrusted filename to a flat, ASCII-only basename.
///
/// Path separators become `_`, anything outside `[A-Za-z0-9_.-]` is dropped and
/// leading dots/underscores are trimmed, so the result can never name a parent
/// directory or a hidden file. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = RE_UNSAFE.replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

fn accept(file: UploadedFile, taken: &mut HashSet<String>) -> Result<AcceptedFile, UploadError> {
    if file.filename.is_empty() {
        return Err(UploadError::NoFileSelected);
    }
    if !allowed_file(&file.filename) {
        return Err(UploadError::InvalidFormat {
            filename: file.filename,
        });
    }

    let mut name = secure_filename(&file.filename);
    if !allowed_file(&name) {
        name = FALLBACK_NAME.to_string();
    }
    let stored_name = unique_name(&name, taken);
    taken.insert(stored_name.clone());

    Ok(AcceptedFile {
        stored_name,
        content: file.content,
    })
}

/// `a.pdf`, then `a_1.pdf`, `a_2.pdf`, ... for names already used in a batch.
fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (name, String::new()),
    };
    (1..)
        .map(|n| format!("{}_{}{}", stem, n, ext))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Validate the single file of a split request.
pub fn validate_single(file: Option<UploadedFile>) -> Result<AcceptedFile, UploadError> {
    let file = file.ok_or(UploadError::NoFileSelected)?;
    accept(file, &mut HashSet::new())
}

/// Validate every file of a merge request, keeping submission order.
///
/// The batch-size check comes first, so a single bad file in a batch of one
/// still reports [`UploadError::InsufficientFiles`].
pub fn validate_batch(files: Vec<UploadedFile>) -> Result<Vec<AcceptedFile>, UploadError> {
    if files.len() < 2 {
        return Err(UploadError::InsufficientFiles { got: files.len() });
    }
    let mut taken = HashSet::new();
    files
        .into_iter()
        .map(|file| accept(file, &mut taken))
        .collect()
}
