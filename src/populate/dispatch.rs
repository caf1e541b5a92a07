//! Per-field dispatch: routing block children through the handler table.
//!
//! Each child is matched by its lexeme key against the static keyword index
//! first; failing that, the ordered dynamic handlers each get a chance to
//! claim it. Unmatched children are ignored when on the schema's ignore
//! list, otherwise reported, unless the type tolerates unknown nodes.

use std::path::Path;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::model::{
    CollectionShape, DomainObject, EmbeddedPolicy, PropertyPlan, Schema, SchemaSet, Value,
    ValueKind,
};
use crate::syntax::{Node, NodeKind};

/// Populate `object` from the children of its block node.
///
/// Returns false when any field failed to parse; sibling fields are still
/// processed and each failure is reported through the sink.
pub fn dispatch_children(
    block: &Node,
    object: &mut DomainObject,
    schema: &Schema,
    schemas: &SchemaSet,
    path: &Path,
    sink: &DiagnosticSink,
) -> bool {
    let mut ok = true;
    for child in block.children() {
        if let Some(plan) = schema.plan_for(&child.key) {
            if !apply_static(plan, child, object, schemas, path, sink) {
                ok = false;
            }
            continue;
        }

        // Dynamic handlers, in registration order; first claim wins.
        if let Some(handler) = schema.dynamic.iter().find(|h| (h.claims)(child)) {
            tracing::trace!("dynamic handler '{}' claimed '{}'", handler.name, child.key);
            if !(handler.apply)(child, object, sink) {
                ok = false;
            }
            continue;
        }

        if schema.is_ignored(&child.key) || schema.tolerate_unknown {
            continue;
        }
        sink.push(
            Diagnostic::warning(path, child.span.line, child.span.column, "unknown child '{}' in {} '{}'")
                .with_arg(&child.key)
                .with_arg(&schema.type_name)
                .with_arg(&object.key),
        );
    }
    object.valid &= ok;
    ok
}

/// Apply one statically matched plan. Repeated keywords accumulate for
/// shattered collections and flag bits; everything else is last-writer-wins.
fn apply_static(
    plan: &PropertyPlan,
    child: &Node,
    object: &mut DomainObject,
    schemas: &SchemaSet,
    path: &Path,
    sink: &DiagnosticSink,
) -> bool {
    let Some(parsed) = parse_field(plan, child, schemas, path, sink) else {
        return false;
    };

    match (&plan.shape, object.props.get_mut(&plan.keyword)) {
        (CollectionShape::Shattered, Some(Value::List(existing))) => {
            if let Value::List(mut new) = parsed {
                existing.append(&mut new);
            }
        }
        (_, Some(Value::Flags(existing))) => {
            if let Value::Flags(bits) = parsed {
                *existing |= bits;
            }
        }
        _ => {
            object.populate(plan.keyword.clone(), parsed);
        }
    }
    true
}

/// Parse one node according to a plan. `None` means a reported failure.
fn parse_field(
    plan: &PropertyPlan,
    node: &Node,
    schemas: &SchemaSet,
    path: &Path,
    sink: &DiagnosticSink,
) -> Option<Value> {
    match (&plan.kind, &plan.shape) {
        (ValueKind::Flags, CollectionShape::Plain) => parse_flag_block(plan, node, path, sink),
        (ValueKind::Flags, CollectionShape::Shattered) => {
            let name = content_value(node, plan, path, sink)?;
            match plan.name_index(name) {
                Some(bit) => Some(Value::Flags(1 << bit)),
                None => {
                    report_invalid(plan, node, name, path, sink);
                    None
                }
            }
        }
        (ValueKind::List(element), CollectionShape::Plain) => {
            parse_list_block(plan, element, node, path, sink)
        }
        (ValueKind::List(element), CollectionShape::Shattered) => {
            let text = content_value(node, plan, path, sink)?;
            match parse_literal(element, text) {
                Some(value) => Some(Value::List(vec![value])),
                None => {
                    report_invalid(plan, node, text, path, sink);
                    None
                }
            }
        }
        (ValueKind::Object, _) => parse_embedded(plan, node, schemas, path, sink),
        (scalar, _) => {
            let text = content_value(node, plan, path, sink)?;
            let unquoted = node.unquoted_value().unwrap_or(text);
            let value = match scalar {
                ValueKind::Str => Some(Value::Str(unquoted.to_string())),
                ValueKind::Enum => plan
                    .name_index(text)
                    .map(|_| Value::Ident(SmolStr::from(text))),
                _ => parse_literal(scalar, text),
            };
            match value {
                Some(value) => Some(value),
                None => {
                    report_invalid(plan, node, text, path, sink);
                    None
                }
            }
        }
    }
}

/// Parse a bare literal by element kind (list elements, scalar values).
fn parse_literal(kind: &ValueKind, text: &str) -> Option<Value> {
    match kind {
        ValueKind::Bool => match text {
            "yes" => Some(Value::Bool(true)),
            "no" => Some(Value::Bool(false)),
            _ => None,
        },
        ValueKind::Int => text.parse().ok().map(Value::Int),
        ValueKind::Float => text.parse().ok().map(Value::Float),
        ValueKind::Str => Some(Value::Str(text.trim_matches('"').to_string())),
        ValueKind::Ident => Some(Value::Ident(SmolStr::from(text))),
        _ => None,
    }
}

fn parse_flag_block(
    plan: &PropertyPlan,
    node: &Node,
    path: &Path,
    sink: &DiagnosticSink,
) -> Option<Value> {
    if !node.is_block() {
        report_shape(plan, node, "a block", path, sink);
        return None;
    }
    let mut bits = 0u64;
    let mut ok = true;
    for child in node.children() {
        match plan.name_index(&child.key) {
            Some(bit) => bits |= 1 << bit,
            None => {
                report_invalid(plan, child, &child.key, path, sink);
                ok = false;
            }
        }
    }
    ok.then_some(Value::Flags(bits))
}

fn parse_list_block(
    plan: &PropertyPlan,
    element: &ValueKind,
    node: &Node,
    path: &Path,
    sink: &DiagnosticSink,
) -> Option<Value> {
    if !node.is_block() {
        report_shape(plan, node, "a block", path, sink);
        return None;
    }
    let mut items = Vec::with_capacity(node.children().len());
    let mut ok = true;
    for child in node.children() {
        match parse_literal(element, &child.key) {
            Some(value) => items.push(value),
            None => {
                report_invalid(plan, child, &child.key, path, sink);
                ok = false;
            }
        }
    }
    ok.then_some(Value::List(items))
}

/// Embedded nested objects: either full inline blocks parsed against the
/// embedded type's schema, or identifier references to foreign objects.
fn parse_embedded(
    plan: &PropertyPlan,
    node: &Node,
    schemas: &SchemaSet,
    path: &Path,
    sink: &DiagnosticSink,
) -> Option<Value> {
    if !node.is_block() {
        report_shape(plan, node, "a block", path, sink);
        return None;
    }
    match plan.embedded_policy {
        EmbeddedPolicy::Identifier => {
            let idents = node
                .children()
                .iter()
                .map(|c| Value::Ident(c.key.clone()))
                .collect();
            Some(Value::List(idents))
        }
        EmbeddedPolicy::Inline => {
            let embedded_type = plan.embedded_type?;
            let schema = schemas.get(embedded_type);
            let mut children: IndexMap<SmolStr, Value> = IndexMap::new();
            let mut ok = true;
            for child in node.children() {
                if !child.is_block() {
                    report_shape(plan, child, "a nested block", path, sink);
                    ok = false;
                    continue;
                }
                let mut nested = DomainObject::new(
                    child.key.clone(),
                    embedded_type,
                    None,
                    child.span,
                );
                if !dispatch_children(child, &mut nested, schema, schemas, path, sink) {
                    ok = false;
                }
                children.insert(child.key.clone(), Value::Object(nested.props));
            }
            ok.then_some(Value::Object(children))
        }
    }
}

fn content_value<'n>(
    node: &'n Node,
    plan: &PropertyPlan,
    path: &Path,
    sink: &DiagnosticSink,
) -> Option<&'n str> {
    match &node.kind {
        NodeKind::Content { value, .. } => Some(value.as_str()),
        _ => {
            report_shape(plan, node, "a single value", path, sink);
            None
        }
    }
}

fn report_invalid(plan: &PropertyPlan, node: &Node, text: &str, path: &Path, sink: &DiagnosticSink) {
    sink.push(
        Diagnostic::error(path, node.span.line, node.span.column, "invalid value '{}' for '{}'")
            .with_arg(text)
            .with_arg(&plan.keyword),
    );
}

fn report_shape(plan: &PropertyPlan, node: &Node, expected: &str, path: &Path, sink: &DiagnosticSink) {
    sink.push(
        Diagnostic::error(path, node.span.line, node.span.column, "expected {} for '{}'")
            .with_arg(expected)
            .with_arg(&plan.keyword),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DynamicHandler, TypeId};
    use crate::syntax::read_source;

    fn first_block(src: &str) -> Node {
        read_source(src).roots.into_iter().next().unwrap()
    }

    fn dispatch(
        src: &str,
        type_id: TypeId,
        schemas: &SchemaSet,
        sink: &DiagnosticSink,
    ) -> (DomainObject, bool) {
        let node = first_block(src);
        let mut object = DomainObject::new(node.key.clone(), type_id, None, node.span);
        let ok = dispatch_children(
            &node,
            &mut object,
            schemas.get(type_id),
            schemas,
            Path::new("test.txt"),
            sink,
        );
        (object, ok)
    }

    #[test]
    fn test_dynamic_handler_claims_unmatched_child() {
        let mut set = SchemaSet::new();
        let type_id = set.register(
            Schema::new(
                "country",
                vec![PropertyPlan::new("capital", ValueKind::Int, Value::Int(0))],
            )
            .with_dynamic(DynamicHandler {
                name: "leader_rows",
                claims: Box::new(|node| node.key.starts_with("leader_")),
                apply: Box::new(|node, object, _| {
                    let Some(value) = node.value() else {
                        return false;
                    };
                    object
                        .props
                        .insert(node.key.clone(), Value::Ident(SmolStr::from(value)));
                    true
                }),
            }),
        );

        let sink = DiagnosticSink::new();
        let (object, ok) = dispatch(
            "ger = {\n\tcapital = 64\n\tleader_army = von_falken\n\tmystery = 1\n}",
            type_id,
            &set,
            &sink,
        );
        assert!(ok);
        assert_eq!(object.get("capital"), Some(&Value::Int(64)));
        assert_eq!(
            object.get("leader_army"),
            Some(&Value::Ident("von_falken".into()))
        );
        // The unclaimed child warns without failing the parse.
        assert_eq!(sink.len(), 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_dynamic_handler_failure_fails_field() {
        let mut set = SchemaSet::new();
        let type_id = set.register(Schema::new("country", vec![]).with_dynamic(DynamicHandler {
            name: "strict_rows",
            claims: Box::new(|node| node.key.starts_with("leader_")),
            apply: Box::new(|_, _, _| false),
        }));

        let sink = DiagnosticSink::new();
        let (object, ok) = dispatch("ger = {\n\tleader_army = x\n}", type_id, &set, &sink);
        assert!(!ok);
        assert!(!object.valid);
    }

    fn embedded_set(policy: EmbeddedPolicy) -> (SchemaSet, TypeId) {
        let mut set = SchemaSet::new();
        let regiment = set.register(Schema::new(
            "regiment",
            vec![PropertyPlan::new("count", ValueKind::Int, Value::Int(0))],
        ));
        let division = set.register(Schema::new(
            "division",
            vec![
                PropertyPlan::new("regiments", ValueKind::Object, Value::Object(IndexMap::new()))
                    .embedded(regiment, policy),
            ],
        ));
        (set, division)
    }

    #[test]
    fn test_embedded_inline_children() {
        let (set, division) = embedded_set(EmbeddedPolicy::Inline);
        let sink = DiagnosticSink::new();
        let (object, ok) = dispatch(
            "panzer = {\n\tregiments = {\n\t\tinfantry = { count = 2 }\n\t\tartillery = { count = 1 }\n\t}\n}",
            division,
            &set,
            &sink,
        );
        assert!(ok);
        let Some(Value::Object(children)) = object.get("regiments") else {
            panic!("expected embedded object value");
        };
        assert_eq!(children.len(), 2);
        let Some(Value::Object(infantry)) = children.get("infantry") else {
            panic!("expected nested property set");
        };
        assert_eq!(infantry.get("count"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_embedded_identifier_references() {
        let (set, division) = embedded_set(EmbeddedPolicy::Identifier);
        let sink = DiagnosticSink::new();
        let (object, ok) = dispatch(
            "panzer = {\n\tregiments = { infantry artillery }\n}",
            division,
            &set,
            &sink,
        );
        assert!(ok);
        assert_eq!(
            object.get("regiments"),
            Some(&Value::List(vec![
                Value::Ident("infantry".into()),
                Value::Ident("artillery".into()),
            ]))
        );
    }
}
