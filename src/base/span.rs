/// Position tracking for script nodes and discovered objects.
///
/// Stores the exact byte range (offset + length) of a node in its origin
/// file, plus the line/column of its first character for diagnostics.
/// A span is only trustworthy while the owning file's checksum matches the
/// live file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Byte offset of the first character.
    pub offset: usize,
    /// Length in bytes.
    pub length: usize,
    /// Line of the first character (0-indexed).
    pub line: usize,
    /// Column of the first character (0-indexed).
    pub column: usize,
}

impl Span {
    pub fn new(offset: usize, length: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            length,
            line,
            column,
        }
    }

    /// Byte offset one past the last character.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Check if a byte offset falls within this span.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.end()
    }

    /// Check if `other` is nested entirely inside this span.
    ///
    /// Used by the patch engine to drop edits that are subsumed by an
    /// enclosing rewrite. A span does not fully contain itself.
    pub fn fully_contains(&self, other: &Span) -> bool {
        (self.offset <= other.offset && other.end() < self.end())
            || (self.offset < other.offset && other.end() <= self.end())
    }

    /// Check if two spans overlap without either containing the other.
    ///
    /// Partial overlap between object spans in one file is an invariant
    /// violation and is rejected by the patch engine.
    pub fn partially_overlaps(&self, other: &Span) -> bool {
        let intersects = self.offset < other.end() && other.offset < self.end();
        intersects
            && !self.fully_contains(other)
            && !other.fully_contains(self)
            && !(self.offset == other.offset && self.length == other.length)
    }
}
