//! Shared fixtures for integration tests.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use modforge::diagnostics::DiagnosticSink;
use modforge::model::{PropertyPlan, Registry, Schema, SchemaSet, TypeId, Value, ValueKind};
use modforge::populate::{PopulateContext, populate_file};
use modforge::syntax::load_and_read;

/// The equipment category used across the suites: scalar fields, a flag set
/// and a tag list.
static EQUIPMENT: Lazy<(Arc<SchemaSet>, TypeId)> = Lazy::new(|| {
    let mut set = SchemaSet::new();
    let type_id = set.register(Schema::new(
        "equipment",
        vec![
            PropertyPlan::new("damage", ValueKind::Int, Value::Int(0)),
            PropertyPlan::new("weight", ValueKind::Float, Value::Float(0.0)),
            PropertyPlan::new("name", ValueKind::Str, Value::Str(String::new())).required(),
            PropertyPlan::new(
                "tags",
                ValueKind::List(Box::new(ValueKind::Ident)),
                Value::List(vec![]),
            ),
            PropertyPlan::new("category", ValueKind::Flags, Value::Flags(0))
                .names(["melee", "ranged", "siege"])
                .shattered(),
        ],
    ));
    (Arc::new(set), type_id)
});

pub fn equipment_schemas() -> (Arc<SchemaSet>, TypeId) {
    let (set, type_id) = &*EQUIPMENT;
    (Arc::clone(set), *type_id)
}

/// Parse and populate one script file into a fresh registry.
pub fn load_one(
    path: &Path,
    set: &Arc<SchemaSet>,
    type_id: TypeId,
    is_modded: bool,
) -> (Registry, DiagnosticSink) {
    let sink = DiagnosticSink::new();
    let parsed = load_and_read(path, &sink).expect("fixture file readable");
    let registry = Mutex::new(Registry::new(Arc::clone(set)));
    let ctx = PopulateContext::new(sink.clone());
    populate_file(&registry, &parsed, type_id, is_modded, &ctx);
    (registry.into_inner(), sink)
}

/// Populate several script files into one registry, in path order.
pub fn load_layers(
    paths: &[(&Path, bool)],
    set: &Arc<SchemaSet>,
    type_id: TypeId,
) -> (Registry, DiagnosticSink) {
    let sink = DiagnosticSink::new();
    let registry = Mutex::new(Registry::new(Arc::clone(set)));
    for (path, is_modded) in paths {
        let parsed = load_and_read(path, &sink).expect("fixture file readable");
        let ctx = PopulateContext::new(sink.clone());
        populate_file(&registry, &parsed, type_id, *is_modded, &ctx);
    }
    (registry.into_inner(), sink)
}
