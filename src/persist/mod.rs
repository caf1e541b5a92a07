//! Incremental patch-based persistence.
//!
//! Only modified objects are re-serialized; each one's freshly formatted
//! text is spliced into its exact original byte span so every byte outside
//! modified spans survives verbatim. Writes are gated by the file's content
//! checksum.

mod format;
mod options;
mod patch;
mod save;

pub use format::{format_object, format_override, render_literal};
pub use options::SaveOptions;
pub use patch::{PatchError, PatchOp, PatchOutcome, apply_patches};
pub use save::{SaveError, SaveReport, format_file_content, save_file, save_new_objects};
