use crate::error::PdfError;
use crate::pdf::PdfDocument;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the file holding 1-based page `page_num` of a split.
pub fn page_file_name(page_num: u32) -> String {
    format!("page_{}.pdf", page_num)
}

/// Write every page of `input` to `output_dir` as `page_N.pdf`.
///
/// Pages are rendered into a hidden staging directory inside `output_dir` and
/// only moved into place once every page has been written. If anything fails,
/// `output_dir` is left as it was, including pages from an earlier split.
pub fn split_into_pages<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_dir: Q,
) -> Result<Vec<PathBuf>, PdfError> {
    let output_dir = output_dir.as_ref();

    let doc = PdfDocument::open(&input)?;
    let total_pages = doc.page_count();
    if total_pages == 0 {
        return Err(PdfError::EmptyDocument { path: doc.path });
    }

    let staging = tempfile::Builder::new()
        .prefix(".split-")
        .tempdir_in(output_dir)
        .map_err(|source| PdfError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let mut names = Vec::with_capacity(total_pages as usize);
    for page_num in 1..=total_pages {
        let name = page_file_name(page_num);
        let mut page = doc.extract_pages(&[page_num])?;
        PdfDocument::save(&mut page, staging.path().join(&name))?;
        debug!(page = page_num, "staged page");
        names.push(name);
    }

    commit(staging.path(), output_dir, &names)
}

/// Move staged pages into `output_dir`. Files they replace are parked in the
/// staging directory and put back if a later move fails.
fn commit(staging: &Path, output_dir: &Path, names: &[String]) -> Result<Vec<PathBuf>, PdfError> {
    for name in names {
        let target = output_dir.join(name);
        if let Ok(meta) = std::fs::symlink_metadata(&target) {
            if !meta.is_file() {
                return Err(PdfError::Io {
                    path: target,
                    source: io::Error::new(io::ErrorKind::AlreadyExists, "not a regular file"),
                });
            }
        }
    }

    let previous = staging.join("previous");
    std::fs::create_dir(&previous).map_err(|source| PdfError::Io {
        path: previous.clone(),
        source,
    })?;

    let mut committed: Vec<(PathBuf, Option<PathBuf>)> = Vec::with_capacity(names.len());
    for name in names {
        let target = output_dir.join(name);
        match replace(&staging.join(name), &target, &previous.join(name)) {
            Ok(backup) => committed.push((target, backup)),
            Err(source) => {
                rollback(&committed);
                return Err(PdfError::Io {
                    path: target,
                    source,
                });
            }
        }
    }

    Ok(committed.into_iter().map(|(target, _)| target).collect())
}

/// Rename `staged` onto `target`, returning where the old `target` was parked.
fn replace(staged: &Path, target: &Path, backup: &Path) -> io::Result<Option<PathBuf>> {
    let parked = if target.exists() {
        std::fs::rename(target, backup)?;
        Some(backup.to_path_buf())
    } else {
        None
    };

    if let Err(e) = std::fs::rename(staged, target) {
        if let Some(parked) = &parked {
            restore(parked, target);
        }
        return Err(e);
    }
    Ok(parked)
}

fn rollback(committed: &[(PathBuf, Option<PathBuf>)]) {
    for (target, parked) in committed.iter().rev() {
        match parked {
            Some(parked) => restore(parked, target),
            None => {
                if let Err(e) = std::fs::remove_file(target) {
                    warn!(path = %target.display(), error = %e, "failed to remove partial output");
                }
            }
        }
    }
}

fn restore(parked: &Path, target: &Path) {
    if let Err(e) = std::fs::rename(parked, target) {
        warn!(path = %target.display(), error = %e, "failed to restore previous output");
    }
}
