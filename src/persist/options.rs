//! Save options.

/// Options for formatting and saving script objects.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Emit properties even when they equal their declared default.
    pub write_all_defaults: bool,
    /// Column budget before a plain collection block wraps onto a new line.
    pub wrap_column: usize,
    /// Object count above which full-file formatting is partitioned across
    /// rayon workers.
    pub parallel_threshold: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            write_all_defaults: false,
            wrap_column: 100,
            parallel_threshold: 64,
        }
    }
}

impl SaveOptions {
    /// Indentation string for the given nesting level. Script files use
    /// tabs throughout.
    pub fn indent(&self, level: usize) -> String {
        "\t".repeat(level)
    }
}
