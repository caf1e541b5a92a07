//! Inject/replace merge resolution between mod layers.
//!
//! A top-level key prefixed by a reserved marker is not an ordinary object:
//! it targets a previously discovered base object and either merges its
//! explicitly supplied properties into it (inject family) or substitutes the
//! whole object (replace family). The missing-target policy is tri-state:
//! plain markers fail validation, "try" markers no-op silently, "or-create"
//! markers register the override as a new base object.

use smol_str::SmolStr;

use crate::base::Span;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::model::{
    DomainObject, FileId, InsertOutcome, ObjectId, OverrideKind, OverrideRecord, Registry, TypeId,
};
use crate::syntax::keywords;

/// Split a block header into its override marker and target key.
///
/// Returns `None` for ordinary keys. The first-character guard runs before
/// the set lookup since almost every key is a plain lowercase identifier.
pub fn parse_marker(header: &str) -> Option<(OverrideKind, &str)> {
    if !keywords::may_be_marker(header) {
        return None;
    }
    let (word, rest) = header.split_once(' ')?;
    let kind = OverrideKind::from_marker(word)?;
    Some((kind, rest))
}

/// Outcome of applying one override block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Properties merged into (or substituted over) the base object.
    Applied(ObjectId),
    /// Override registered as a new base object (or-create variants).
    Created(ObjectId),
    /// Missing target tolerated by a "try" variant.
    Skipped,
    /// Missing target, plain variant: validation failed for this object.
    TargetNotFound,
}

/// Apply one override: `detached` holds the properties this layer supplied,
/// already populated from the override block.
///
/// On success an [`OverrideRecord`] is attached so later saves of the
/// override file emit exactly this layer's properties, never the merged
/// effective value. Conflicting layers resolve last-writer-wins in load
/// order.
pub fn apply_override(
    registry: &mut Registry,
    kind: OverrideKind,
    target: &str,
    type_id: TypeId,
    mut detached: DomainObject,
    file: FileId,
    span: Span,
    sink: &DiagnosticSink,
) -> MergeOutcome {
    let supplied: Vec<SmolStr> = detached.props.keys().cloned().collect();

    let Some(base_id) = registry.find(type_id, target) else {
        if kind.tolerates_missing() {
            tracing::trace!("override target '{target}' absent, try-variant no-op");
            return MergeOutcome::Skipped;
        }
        if kind.creates_missing() {
            detached.key = SmolStr::from(target);
            detached.override_kind = kind;
            let id = match registry.insert(detached) {
                InsertOutcome::Inserted(id) | InsertOutcome::Duplicate(id) => id,
            };
            registry.add_override(OverrideRecord {
                target: SmolStr::from(target),
                type_id,
                kind,
                supplied,
                file,
                span,
            });
            return MergeOutcome::Created(id);
        }
        let path = registry.file(file).path.clone();
        sink.push(
            Diagnostic::error(path, span.line, span.column, "override target '{}' not found for {}")
                .with_arg(target)
                .with_arg(kind.marker().unwrap_or("?")),
        );
        return MergeOutcome::TargetNotFound;
    };

    {
        let base = registry
            .get_mut(base_id)
            .expect("key index points at a live object");
        if kind.is_replace() {
            // Wholesale substitution keeps the base identity and origin but
            // takes the override's property set.
            base.props = detached.props;
            base.valid = detached.valid;
        } else {
            for (keyword, value) in detached.props {
                base.props.insert(keyword, value);
            }
            base.valid &= detached.valid;
        }
    }

    registry.add_override(OverrideRecord {
        target: SmolStr::from(target),
        type_id,
        kind,
        supplied,
        file,
        span,
    });
    MergeOutcome::Applied(base_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Checksum;
    use crate::model::{Schema, SchemaSet, Value};
    use std::sync::Arc;

    fn setup() -> (Registry, TypeId, FileId) {
        let mut set = SchemaSet::new();
        let type_id = set.register(Schema::new("equipment", vec![]));
        let mut registry = Registry::new(Arc::new(set));
        let file = registry.add_file("override.txt", Checksum::of(""), true);
        (registry, type_id, file)
    }

    fn base_sword(registry: &mut Registry, type_id: TypeId) -> ObjectId {
        let mut sword = DomainObject::new("sword", type_id, None, Span::new(0, 30, 0, 0));
        sword.populate("damage", Value::Int(3));
        sword.populate("weight", Value::Float(1.5));
        match registry.insert(sword) {
            InsertOutcome::Inserted(id) => id,
            InsertOutcome::Duplicate(_) => unreachable!(),
        }
    }

    #[test]
    fn test_parse_marker() {
        assert_eq!(
            parse_marker("TRY_INJECT sword"),
            Some((OverrideKind::TryInject, "sword"))
        );
        assert_eq!(parse_marker("sword"), None);
        assert_eq!(parse_marker("UPPER sword"), None);
    }

    #[test]
    fn test_inject_merges_supplied_only() {
        let (mut registry, type_id, file) = setup();
        let id = base_sword(&mut registry, type_id);

        let mut layer = DomainObject::new("x", type_id, Some(file), Span::new(0, 20, 0, 0));
        layer.populate("damage", Value::Int(5));
        let sink = DiagnosticSink::new();
        let outcome = apply_override(
            &mut registry,
            OverrideKind::TryInject,
            "sword",
            type_id,
            layer,
            file,
            Span::new(0, 20, 0, 0),
            &sink,
        );

        assert_eq!(outcome, MergeOutcome::Applied(id));
        let sword = registry.get(id).unwrap();
        assert_eq!(sword.get("damage"), Some(&Value::Int(5)));
        assert_eq!(sword.get("weight"), Some(&Value::Float(1.5)));
        let record = registry.get_override(crate::model::OverrideId(0)).unwrap();
        assert_eq!(record.supplied, vec![SmolStr::from("damage")]);
    }

    #[test]
    fn test_try_inject_missing_target_no_ops() {
        let (mut registry, type_id, file) = setup();
        let layer = DomainObject::new("x", type_id, Some(file), Span::new(0, 10, 0, 0));
        let sink = DiagnosticSink::new();
        let outcome = apply_override(
            &mut registry,
            OverrideKind::TryInject,
            "shield",
            type_id,
            layer,
            file,
            Span::new(0, 10, 0, 0),
            &sink,
        );
        assert_eq!(outcome, MergeOutcome::Skipped);
        assert!(registry.find(type_id, "shield").is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_plain_inject_missing_target_fails_validation() {
        let (mut registry, type_id, file) = setup();
        let layer = DomainObject::new("x", type_id, Some(file), Span::new(0, 10, 2, 1));
        let sink = DiagnosticSink::new();
        let outcome = apply_override(
            &mut registry,
            OverrideKind::Inject,
            "shield",
            type_id,
            layer,
            file,
            Span::new(0, 10, 2, 1),
            &sink,
        );
        assert_eq!(outcome, MergeOutcome::TargetNotFound);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_or_create_registers_new_base() {
        let (mut registry, type_id, file) = setup();
        let mut layer = DomainObject::new("x", type_id, Some(file), Span::new(0, 10, 0, 0));
        layer.populate("damage", Value::Int(7));
        let sink = DiagnosticSink::new();
        let outcome = apply_override(
            &mut registry,
            OverrideKind::InjectOrCreate,
            "axe",
            type_id,
            layer,
            file,
            Span::new(0, 10, 0, 0),
            &sink,
        );
        let MergeOutcome::Created(id) = outcome else {
            panic!("expected creation, got {outcome:?}");
        };
        assert_eq!(registry.find(type_id, "axe"), Some(id));
        assert_eq!(registry.get(id).unwrap().get("damage"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_replace_substitutes_whole_object() {
        let (mut registry, type_id, file) = setup();
        let id = base_sword(&mut registry, type_id);

        let mut layer = DomainObject::new("x", type_id, Some(file), Span::new(0, 10, 0, 0));
        layer.populate("damage", Value::Int(9));
        let sink = DiagnosticSink::new();
        apply_override(
            &mut registry,
            OverrideKind::Replace,
            "sword",
            type_id,
            layer,
            file,
            Span::new(0, 10, 0, 0),
            &sink,
        );
        let sword = registry.get(id).unwrap();
        assert_eq!(sword.get("damage"), Some(&Value::Int(9)));
        // Replace drops properties the layer did not supply.
        assert_eq!(sword.get("weight"), None);
    }

    #[test]
    fn test_later_layer_wins() {
        let (mut registry, type_id, file) = setup();
        let id = base_sword(&mut registry, type_id);
        let sink = DiagnosticSink::new();

        for damage in [5, 6] {
            let mut layer = DomainObject::new("x", type_id, Some(file), Span::new(0, 10, 0, 0));
            layer.populate("damage", Value::Int(damage));
            apply_override(
                &mut registry,
                OverrideKind::TryInject,
                "sword",
                type_id,
                layer,
                file,
                Span::new(0, 10, 0, 0),
                &sink,
            );
        }
        assert_eq!(registry.get(id).unwrap().get("damage"), Some(&Value::Int(6)));
    }
}
