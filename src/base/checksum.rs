use std::hash::Hasher;

use rustc_hash::FxHasher;

/// Content checksum of a script file.
///
/// Recorded when a file is parsed and re-verified before every patch save:
/// a mismatch means the file changed on disk behind our back and every span
/// recorded for its objects is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(pub u64);

impl Checksum {
    /// Checksum of a file's full text.
    pub fn of(content: &str) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(content.as_bytes());
        Self(hasher.finish())
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
