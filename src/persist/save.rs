//! Save orchestration: checksum gate, patch pass, new-file creation, and
//! full-file formatting.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::base::{Checksum, Span};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::model::{FileId, ObjectId, OverrideId, OverrideKind, OverrideRecord, Registry};

use super::format::{format_object, format_override};
use super::options::SaveOptions;
use super::patch::{PatchError, apply_patches};

/// What a save call accomplished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub path: PathBuf,
    /// Spans rewritten in this pass.
    pub patched: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The file changed on disk since it was parsed; spans are stale and
    /// the write is refused without touching the file.
    #[error("illegal file state: {path} was modified on disk since last parse")]
    IllegalFileState { path: PathBuf },

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Patch-handle space: object ids first, override record ids after.
enum Handle {
    Object(ObjectId),
    Override(OverrideId),
}

/// Save one file incrementally: re-serialize only modified objects and
/// splice them into their original spans.
///
/// A caller must serialize concurrent saves to the same file; saves to
/// different files are independent.
pub fn save_file(
    registry: &mut Registry,
    file_id: FileId,
    opts: &SaveOptions,
    sink: &DiagnosticSink,
) -> Result<SaveReport, SaveError> {
    let path = registry.file(file_id).path.clone();
    let original = std::fs::read_to_string(&path).map_err(|source| SaveError::Io {
        path: path.clone(),
        source,
    })?;

    // Checksum gate: refuse to patch against content the spans were not
    // computed from.
    let expected = registry.file(file_id).checksum;
    if Checksum::of(&original) != expected {
        sink.push(Diagnostic::error(
            &path,
            0,
            0,
            "file changed on disk since last parse; reload before saving",
        ));
        return Err(SaveError::IllegalFileState { path });
    }

    let (targets, handles) = collect_targets(registry, file_id, opts);
    if targets.is_empty() {
        return Ok(SaveReport { path, patched: 0 });
    }

    let outcome = apply_patches(&original, targets)?;
    std::fs::write(&path, &outcome.content).map_err(|source| SaveError::Io {
        path: path.clone(),
        source,
    })?;

    let patched = outcome.new_spans.len();
    for (handle, span) in outcome.new_spans {
        match handles[handle] {
            Handle::Object(id) => {
                if let Some(object) = registry.get_mut(id) {
                    object.span = span;
                    object.dirty = false;
                }
            }
            Handle::Override(_) => {}
        }
    }
    update_override_spans(registry, file_id, &outcome.content);
    registry.file_mut(file_id).checksum = Checksum::of(&outcome.content);

    tracing::debug!("saved {} ({patched} spans patched)", path.display());
    Ok(SaveReport { path, patched })
}

/// Gather the dirty spans of one file: dirty plain objects originating in
/// it, plus override records whose merged target is dirty.
fn collect_targets(
    registry: &Registry,
    file_id: FileId,
    opts: &SaveOptions,
) -> (Vec<(Span, String, usize)>, Vec<Handle>) {
    let schemas = registry.schemas_arc();
    let record = registry.file(file_id);
    let mut targets = Vec::new();
    let mut handles = Vec::new();

    for &object_id in &record.objects {
        let Some(object) = registry.get(object_id) else {
            continue;
        };
        if !object.dirty || object.file != Some(file_id) {
            continue;
        }
        let schema = schemas.get(object.type_id);
        let text = match object.override_kind {
            // Or-create objects live in the override file under their
            // marker header; find their record for the supplied subset.
            OverrideKind::None => format_object(object, schema, &schemas, opts),
            _ => match find_record_for(registry, file_id, &object.key) {
                Some(record) => format_override(record, object, schema, &schemas, opts),
                None => format_object(object, schema, &schemas, opts),
            },
        };
        handles.push(Handle::Object(object_id));
        targets.push((object.span, text, handles.len() - 1));
    }

    for &override_id in &record.overrides {
        let Some(layer) = registry.get_override(override_id) else {
            continue;
        };
        let Some(base_id) = registry.find(layer.type_id, &layer.target) else {
            continue;
        };
        let Some(base) = registry.get(base_id) else {
            continue;
        };
        // The or-create case is already handled through the object walk.
        if base.file == Some(file_id) || !base.dirty {
            continue;
        }
        let schema = schemas.get(layer.type_id);
        let text = format_override(layer, base, schema, &schemas, opts);
        handles.push(Handle::Override(override_id));
        targets.push((layer.span, text, handles.len() - 1));
    }

    (targets, handles)
}

/// Override record in `file_id` targeting `key`, if any.
fn find_record_for<'a>(
    registry: &'a Registry,
    file_id: FileId,
    key: &str,
) -> Option<&'a OverrideRecord> {
    registry
        .file(file_id)
        .overrides
        .iter()
        .filter_map(|&id| registry.get_override(id))
        .find(|record| record.target == key)
}

/// Record-keeping for override layers after a patch: their spans moved with
/// the rewrite, so recompute them from the saved content.
fn update_override_spans(registry: &mut Registry, file_id: FileId, content: &str) {
    let override_ids: Vec<OverrideId> = registry.file(file_id).overrides.clone();
    if override_ids.is_empty() {
        return;
    }
    let roots = crate::syntax::read_source(content).roots;
    for id in override_ids {
        let Some(record) = registry.get_override(id) else {
            continue;
        };
        let header = match record.kind.marker() {
            Some(marker) => format!("{marker} {}", record.target),
            None => record.target.to_string(),
        };
        let span = roots
            .iter()
            .find(|node| node.key == header && node.is_block())
            .map(|node| node.span);
        if let (Some(span), Some(record)) = (span, registry.override_mut(id)) {
            record.span = span;
        }
    }
}

/// Write objects that have no origin file yet, deriving a deterministic
/// filename by convention: `<type name>/<key>.txt` under the save root.
pub fn save_new_objects(
    registry: &mut Registry,
    root: &Path,
    opts: &SaveOptions,
) -> Result<Vec<SaveReport>, SaveError> {
    let schemas = registry.schemas_arc();
    let fresh: Vec<ObjectId> = (0..schemas.len())
        .flat_map(|t| registry.of_type(crate::model::TypeId(t)))
        .filter(|&id| registry.get(id).is_some_and(|o| o.file.is_none() && o.dirty))
        .collect();

    let mut reports = Vec::with_capacity(fresh.len());
    for id in fresh {
        let (text, path, key) = {
            let object = registry.get(id).expect("id collected above");
            let schema = schemas.get(object.type_id);
            let dir = root.join(schema.type_name.as_str());
            let path = dir.join(format!("{}.txt", object.key));
            (
                format_object(object, schema, &schemas, opts),
                path,
                object.key.clone(),
            )
        };
        let content = format!("{text}\n");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SaveError::Io {
                path: path.clone(),
                source,
            })?;
        }
        std::fs::write(&path, &content).map_err(|source| SaveError::Io {
            path: path.clone(),
            source,
        })?;

        let file_id = registry.add_file(&path, Checksum::of(&content), true);
        registry.file_mut(file_id).objects.push(id);
        if let Some(object) = registry.get_mut(id) {
            object.file = Some(file_id);
            object.span = Span::new(0, text.len(), 0, 0);
            object.dirty = false;
        }
        tracing::debug!("created {} for new object '{key}'", path.display());
        reports.push(SaveReport { path, patched: 1 });
    }
    Ok(reports)
}

/// Format a whole file from scratch (non-incremental).
///
/// Objects are emitted in original span order. Above the parallel
/// threshold the work is partitioned into contiguous ranges built by
/// independent buffers and concatenated in order; formatting one object
/// never reads another's formatted output, so the partition is safe.
pub fn format_file_content(registry: &Registry, file_id: FileId, opts: &SaveOptions) -> String {
    let schemas = registry.schemas_arc();
    let mut objects: Vec<&crate::model::DomainObject> = registry
        .file(file_id)
        .objects
        .iter()
        .filter_map(|&id| registry.get(id))
        .collect();
    objects.sort_by_key(|o| o.span.offset);

    let format_one =
        |object: &crate::model::DomainObject| -> String {
            format_object(object, schemas.get(object.type_id), &schemas, opts)
        };

    let blocks: Vec<String> = if objects.len() > opts.parallel_threshold {
        let chunk = objects.len().div_ceil(rayon::current_num_threads().max(1));
        objects
            .par_chunks(chunk.max(1))
            .map(|range| {
                range
                    .iter()
                    .map(|o| format_one(o))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    } else {
        objects.iter().map(|o| format_one(o)).collect()
    };

    let mut content = blocks.join("\n");
    content.push('\n');
    content
}
