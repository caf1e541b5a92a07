//! Diagnostics — location-keyed problem reporting.
//!
//! Every recoverable problem found while parsing, merging, or saving is
//! reported here rather than thrown: one bad file yields many diagnostics,
//! not an early abort. Entries carry a message template plus positional
//! arguments so the UI layer can localize or re-style them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// A diagnostic message with source location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// The file this diagnostic points into.
    pub path: PathBuf,
    /// Line of the offending construct (0-indexed).
    pub line: usize,
    /// Column of the offending construct (0-indexed).
    pub column: usize,
    /// Severity level.
    pub severity: Severity,
    /// Message template with `{}` placeholders.
    pub template: &'static str,
    /// Positional arguments substituted into the template.
    pub args: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(path: impl Into<PathBuf>, line: usize, column: usize, template: &'static str) -> Self {
        Self {
            path: path.into(),
            line,
            column,
            severity: Severity::Error,
            template,
            args: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(path: impl Into<PathBuf>, line: usize, column: usize, template: &'static str) -> Self {
        Self {
            path: path.into(),
            line,
            column,
            severity: Severity::Warning,
            template,
            args: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn with_arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Render the template with its positional arguments substituted.
    pub fn message(&self) -> String {
        let mut out = String::with_capacity(self.template.len() + 16);
        let mut args = self.args.iter();
        let mut rest = self.template;
        while let Some(idx) = rest.find("{}") {
            out.push_str(&rest[..idx]);
            match args.next() {
                Some(arg) => out.push_str(arg),
                None => out.push_str("{}"),
            }
            rest = &rest[idx + 2..];
        }
        out.push_str(rest);
        out
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.path.display(),
            self.line + 1,
            self.column + 1,
            self.severity.as_str(),
            self.message()
        )
    }
}

// ============================================================================
// DIAGNOSTIC SINK
// ============================================================================

/// Shared accumulator for diagnostics produced across concurrent steps.
///
/// Cheap to clone; all clones feed one backing list.
#[derive(Clone, Default)]
pub struct DiagnosticSink {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        tracing::debug!("diagnostic: {diagnostic}");
        self.entries.lock().push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of all entries collected so far.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Entries pointing into one file, for UI gutter display.
    pub fn for_file(&self, path: &Path) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.path == path)
            .cloned()
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_substitution() {
        let d = Diagnostic::error("a.txt", 2, 4, "duplicate key '{}' for type '{}'")
            .with_arg("sword")
            .with_arg("equipment");
        assert_eq!(d.message(), "duplicate key 'sword' for type 'equipment'");
    }

    #[test]
    fn test_missing_args_left_verbatim() {
        let d = Diagnostic::error("a.txt", 0, 0, "unknown token '{}'");
        assert_eq!(d.message(), "unknown token '{}'");
    }

    #[test]
    fn test_sink_filters_by_file() {
        let sink = DiagnosticSink::new();
        sink.push(Diagnostic::error("a.txt", 0, 0, "one"));
        sink.push(Diagnostic::warning("b.txt", 1, 0, "two"));
        assert_eq!(sink.for_file(Path::new("a.txt")).len(), 1);
        assert!(sink.has_errors());
        assert_eq!(sink.len(), 2);
    }
}
