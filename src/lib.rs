//! # modforge-base
//!
//! Core engine for editing a large corpus of hierarchical script files for a
//! strategy-game mod: discovery and population of typed objects from a syntax
//! tree, dependency-ordered parallel loading, incremental patch-based saves,
//! and inject/replace override resolution.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! schedule  → dependency-ordered parallel loading
//!   ↓
//! persist   → incremental patch-based saves
//!   ↓
//! populate  → two-phase object discovery & dispatch
//!   ↓
//! merge     → inject/replace override resolution
//!   ↓
//! model     → DomainObject, FileRecord, Schema, Registry
//!   ↓
//! syntax    → script node tree, logos lexer, reader
//!   ↓
//! base      → primitives (Span, Checksum)
//! ```

// ============================================================================
// MODULES (dependency order: base → syntax → model → merge → populate → ...)
// ============================================================================

/// Foundation types: Span, Checksum
pub mod base;

/// Diagnostics: severity, source location, template + positional arguments
pub mod diagnostics;

/// Syntax: script node tree, logos lexer, recursive-descent reader, loading
pub mod syntax;

/// Object model: DomainObject, FileRecord, property schemas, global registry
pub mod model;

/// Inject/replace override resolution between mod layers
pub mod merge;

/// Two-phase population: discovery then per-field dispatch
pub mod populate;

/// Incremental patch-based persistence
pub mod persist;

/// Dependency-ordered parallel loading scheduler
pub mod schedule;

// Re-export foundation types
pub use base::{Checksum, Span};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
