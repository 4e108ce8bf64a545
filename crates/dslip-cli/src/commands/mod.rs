//! Subcommands of the `dslip` binary.

pub mod config;
pub mod preview;
pub mod split;

use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;

use dslip_core::batch::{BatchInput, InputDocument};
use dslip_core::directory::DirectoryFormat;
use dslip_core::models::association::ManualAssignments;

/// Expand file arguments and glob patterns into PDF paths, sorted and
/// without duplicates.
pub fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matched: Vec<PathBuf> = glob(pattern)?
            .filter_map(|r| r.ok())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
            })
            .collect();
        if matched.is_empty() {
            anyhow::bail!("No PDF files found for: {}", pattern);
        }
        files.extend(matched);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Read the directory and every source PDF into a batch input.
pub fn read_batch_input(
    files: &[PathBuf],
    directory: &Path,
    assignments: ManualAssignments,
) -> anyhow::Result<BatchInput> {
    let directory_format = DirectoryFormat::from_path(directory)?;
    let directory_data = fs::read(directory)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", directory.display(), e))?;

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());
        let data = fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        documents.push(InputDocument::new(name, data));
    }

    Ok(BatchInput {
        directory: directory_data,
        directory_format,
        documents,
        assignments,
    })
}
