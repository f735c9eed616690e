use crate::pdf::split_into_pages;
use anyhow::{Context, Result};
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output_dir: Q) -> Result<()> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    let pages = split_into_pages(input, output_dir)
        .with_context(|| format!("Failed to split {}", input.display()))?;

    println!("Split {} pages into {}", pages.len(), output_dir.display());

    Ok(())
}
