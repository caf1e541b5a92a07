//! Per-file bookkeeping: path, checksum, and object back-references.

use std::path::PathBuf;

use super::object::{ObjectId, OverrideId};
use crate::base::Checksum;

/// Index of a file record in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub usize);

/// One source file.
///
/// The recorded spans of this file's objects are valid only while
/// `checksum` matches the live file content; the persistence engine
/// re-verifies before every patch.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Checksum of the content the spans were computed against.
    pub checksum: Checksum,
    /// Whether the file belongs to the mod layer (as opposed to the base
    /// game corpus).
    pub is_modded: bool,
    /// Objects originating from this file.
    pub objects: Vec<ObjectId>,
    /// Override records read from this file.
    pub overrides: Vec<OverrideId>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, checksum: Checksum, is_modded: bool) -> Self {
        Self {
            path: path.into(),
            checksum,
            is_modded,
            objects: Vec::new(),
            overrides: Vec::new(),
        }
    }
}
