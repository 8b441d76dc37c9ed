use crate::error::PipelineError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively lists PDF files under `folder`, sorted by path so ingestion
/// order is stable across runs.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_pdf_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort_unstable();
    files
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// SHA-256 of the file contents as lowercase hex.
pub fn digest_file(path: &Path) -> Result<String, PipelineError> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// The bare file name used to label a document's chunks and registry entry.
pub fn source_file_name(path: &Path) -> Result<String, PipelineError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| {
            PipelineError::MissingFileName(format!("path missing filename: {}", path.display()))
        })
}
