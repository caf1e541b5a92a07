//! Discovery — minting objects from top-level blocks.
//!
//! Phase one walks a file's top-level blocks and mints one object per plain
//! key, inserting it into the registry under the caller-supplied lock.
//! Marker-prefixed keys are collected and resolved through the merge
//! resolver after the file's plain objects are populated, so injects within
//! one file can target objects defined earlier in it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::merge::{self, MergeOutcome};
use crate::model::{DomainObject, InsertOutcome, ObjectId, Registry, TypeId};
use crate::populate::dispatch::dispatch_children;
use crate::syntax::{Node, ParsedFile};

/// Shared state for one population run.
///
/// The validation flag starts true and is flipped by any field failure;
/// sibling fields keep processing.
#[derive(Clone)]
pub struct PopulateContext {
    pub sink: DiagnosticSink,
    pub valid: Arc<AtomicBool>,
}

impl PopulateContext {
    pub fn new(sink: DiagnosticSink) -> Self {
        Self {
            sink,
            valid: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }
}

/// Discover and populate every object of one category in one file.
///
/// Returns false when anything in the file failed to parse; the registry
/// still holds every object that did parse.
pub fn populate_file(
    registry: &Mutex<Registry>,
    file: &ParsedFile,
    type_id: TypeId,
    is_modded: bool,
    ctx: &PopulateContext,
) -> bool {
    let (file_id, schemas) = {
        let mut registry = registry.lock();
        (
            registry.add_file(&file.path, file.checksum, is_modded),
            registry.schemas_arc(),
        )
    };
    let schema = schemas.get(type_id);
    let mut ok = true;

    // Phase 1: discovery. Mint key + span, insert, remember the node for
    // the dispatch phase. Marker keys are deferred.
    let mut minted: Vec<(ObjectId, &Node)> = Vec::new();
    let mut deferred: Vec<(&Node, crate::model::OverrideKind, &str)> = Vec::new();
    for node in &file.roots {
        if !node.is_block() {
            if !schema.tolerate_unknown {
                ctx.sink.push(
                    Diagnostic::warning(&file.path, node.span.line, node.span.column, "stray statement '{}' at top level")
                        .with_arg(&node.key),
                );
            }
            continue;
        }
        if let Some((kind, target)) = merge::parse_marker(&node.key) {
            deferred.push((node, kind, target));
            continue;
        }

        let object = DomainObject::new(node.key.clone(), type_id, Some(file_id), node.span);
        match registry.lock().insert(object) {
            InsertOutcome::Inserted(id) => minted.push((id, node)),
            InsertOutcome::Duplicate(_) => {
                ctx.sink.push(
                    Diagnostic::error(&file.path, node.span.line, node.span.column, "duplicate key '{}' for type '{}'")
                        .with_arg(&node.key)
                        .with_arg(&schema.type_name),
                );
                ok = false;
            }
        }
    }

    // Phase 2: dispatch. Each object is populated under the lock; the
    // schema lives outside the registry so the borrow is clean.
    for (id, node) in &minted {
        let mut registry = registry.lock();
        let Some(object) = registry.get_mut(*id) else {
            continue;
        };
        if !dispatch_children(node, object, schema, &schemas, &file.path, &ctx.sink) {
            ok = false;
        }
    }

    // Phase 3: overrides, in file order.
    for (node, kind, target) in deferred {
        let mut detached = DomainObject::new(node.key.clone(), type_id, Some(file_id), node.span);
        if !dispatch_children(node, &mut detached, schema, &schemas, &file.path, &ctx.sink) {
            ok = false;
        }
        let outcome = merge::apply_override(
            &mut registry.lock(),
            kind,
            target,
            type_id,
            detached,
            file_id,
            node.span,
            &ctx.sink,
        );
        if outcome == MergeOutcome::TargetNotFound {
            ok = false;
        }
    }

    if !ok {
        ctx.invalidate();
    }
    tracing::debug!(
        "populated {} ({} objects, ok={ok})",
        file.path.display(),
        minted.len()
    );
    ok
}

/// Populate many files of one category, in parallel when there are several.
pub fn populate_files(
    registry: &Mutex<Registry>,
    files: &[ParsedFile],
    type_id: TypeId,
    is_modded: bool,
    ctx: &PopulateContext,
) -> bool {
    if files.len() < 2 {
        return files
            .iter()
            .all(|file| populate_file(registry, file, type_id, is_modded, ctx));
    }
    files
        .par_iter()
        .map(|file| populate_file(registry, file, type_id, is_modded, ctx))
        .reduce(|| true, |a, b| a && b)
}
