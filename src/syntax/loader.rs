//! Loads script files on demand.
//!
//! Collects `*.txt` paths, reads and parses each one, and records the
//! content checksum at load time so later patch saves can detect external
//! edits. Per-file failures are accumulated, not fatal.

use std::path::{Path, PathBuf};

use crate::base::Checksum;
use crate::diagnostics::{Diagnostic, DiagnosticSink};

use super::node::Node;
use super::reader::read_source;

/// One loaded and parsed script file.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub content: String,
    pub checksum: Checksum,
    pub roots: Vec<Node>,
}

/// Collect every script file path under a directory, sorted for
/// deterministic ordering.
pub fn collect_script_paths(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::other)?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load and read a single file; structural errors become diagnostics.
pub fn load_and_read(path: &Path, sink: &DiagnosticSink) -> std::io::Result<ParsedFile> {
    let content = std::fs::read_to_string(path)?;
    let checksum = Checksum::of(&content);
    let result = read_source(&content);
    for error in &result.errors {
        let (line, column) = match error {
            super::reader::ReadError::UnexpectedToken { line, column, .. }
            | super::reader::ReadError::MissingValue { line, column, .. }
            | super::reader::ReadError::UnterminatedBlock { line, column, .. } => (*line, *column),
        };
        sink.push(Diagnostic::error(path, line, column, "syntax: {}").with_arg(error));
    }
    Ok(ParsedFile {
        path: path.to_path_buf(),
        content,
        checksum,
        roots: result.roots,
    })
}

/// Load every script file under a directory.
///
/// Files that cannot be read are reported and skipped; the rest still load.
pub fn load_directory(dir: &Path, sink: &DiagnosticSink) -> std::io::Result<Vec<ParsedFile>> {
    let paths = collect_script_paths(dir)?;
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match load_and_read(&path, sink) {
            Ok(file) => files.push(file),
            Err(e) => {
                tracing::warn!("failed to load {}: {e}", path.display());
                sink.push(Diagnostic::error(&path, 0, 0, "failed to load file: {}").with_arg(e));
            }
        }
    }
    Ok(files)
}
