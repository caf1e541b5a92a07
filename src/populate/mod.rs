//! Two-phase population: discovery then per-field dispatch.
//!
//! Discovery mints one object per top-level block (key + span only) and
//! inserts it into the registry; dispatch then populates properties by
//! routing each child node through the type's handler table. Failure
//! handling is fail-soft throughout: one bad file yields many diagnostics,
//! not an early abort.

mod discover;
mod dispatch;

pub use discover::{PopulateContext, populate_file, populate_files};
pub use dispatch::dispatch_children;
