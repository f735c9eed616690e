use crate::pdf::{merge_into, MergeOrder};
use anyhow::{Context, Result};
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    inputs: &[P],
    output: Q,
    order: MergeOrder,
) -> Result<()> {
    let output = output.as_ref();

    let total_pages = merge_into(inputs, order, output)
        .with_context(|| format!("Failed to merge into {}", output.display()))?;

    println!(
        "Merged {} files ({} pages) into {}",
        inputs.len(),
        total_pages,
        output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures;

    #[test]
    fn merges_in_requested_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = fixtures::write_pdf(dir.path(), "a.pdf", &["a1"]);
        let b = fixtures::write_pdf(dir.path(), "b.pdf", &["b1", "b2"]);
        let out = dir.path().join("out.pdf");

        run(&[&a, &b], &out, MergeOrder::Reversed).unwrap();

        assert_eq!(fixtures::file_labels(&out), vec!["b1", "b2", "a1"]);
    }

    #[test]
    fn single_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = fixtures::write_pdf(dir.path(), "a.pdf", &["a1"]);
        let err = run(&[&a], dir.path().join("out.pdf"), MergeOrder::Forward).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to merge"));
    }
}
