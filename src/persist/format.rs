//! Per-property formatting against the serialization plans.
//!
//! Every property is compared against its declared default (floats within
//! epsilon) and elided unless always-required or the write-all-defaults
//! override is set. Collections serialize in one of three shapes: a plain
//! block wrapped at the column budget, shattered into one line per item, or
//! nested embedded-object blocks.

use smol_str::SmolStr;

use crate::model::{
    CollectionShape, DomainObject, EmbeddedPolicy, OverrideRecord, PropertyPlan, Schema,
    SchemaSet, Value, ValueKind,
};

use super::options::SaveOptions;

/// Format one object as a full top-level block.
pub fn format_object(
    object: &DomainObject,
    schema: &Schema,
    schemas: &SchemaSet,
    opts: &SaveOptions,
) -> String {
    let mut out = String::with_capacity(128);
    out.push_str(&object.key);
    out.push_str(" = {\n");
    write_properties(&mut out, &object.props, schema, schemas, opts, 1, None);
    out.push('}');
    out
}

/// Format one override layer as a minimal diff.
///
/// Emits the marker-prefixed header and only the properties recorded in the
/// layer's [`OverrideRecord`], taking their current values from the merged
/// base object — never the full effective value set.
pub fn format_override(
    record: &OverrideRecord,
    base: &DomainObject,
    schema: &Schema,
    schemas: &SchemaSet,
    opts: &SaveOptions,
) -> String {
    let mut out = String::with_capacity(64);
    if let Some(marker) = record.kind.marker() {
        out.push_str(marker);
        out.push(' ');
    }
    out.push_str(&record.target);
    out.push_str(" = {\n");
    write_properties(
        &mut out,
        &base.props,
        schema,
        schemas,
        opts,
        1,
        Some(&record.supplied),
    );
    out.push('}');
    out
}

/// Emit properties in plan order. `restrict` limits emission to an
/// override layer's supplied keywords.
fn write_properties(
    out: &mut String,
    props: &indexmap::IndexMap<SmolStr, Value>,
    schema: &Schema,
    schemas: &SchemaSet,
    opts: &SaveOptions,
    level: usize,
    restrict: Option<&[SmolStr]>,
) {
    for plan in &schema.plans {
        if restrict.is_some_and(|allowed| !allowed.contains(&plan.keyword)) {
            continue;
        }
        let Some(value) = props.get(&plan.keyword) else {
            continue;
        };
        let restricted = restrict.is_some();
        if !restricted
            && !opts.write_all_defaults
            && !plan.always_required
            && value.approx_eq(&plan.default)
        {
            continue;
        }
        write_property(out, plan, value, schemas, opts, level);
    }
}

fn write_property(
    out: &mut String,
    plan: &PropertyPlan,
    value: &Value,
    schemas: &SchemaSet,
    opts: &SaveOptions,
    level: usize,
) {
    let indent = opts.indent(level);
    match (&plan.kind, &plan.shape) {
        (ValueKind::Flags, CollectionShape::Shattered) => {
            // One top-level line per currently-set bit.
            let Value::Flags(bits) = value else { return };
            for (bit, name) in plan.names.iter().enumerate() {
                if bits & (1 << bit) != 0 {
                    out.push_str(&format!(
                        "{indent}{} {} {}\n",
                        plan.keyword,
                        plan.separator.as_str(),
                        name
                    ));
                }
            }
        }
        (ValueKind::Flags, _) => {
            let Value::Flags(bits) = value else { return };
            out.push_str(&format!("{indent}{} = {{\n", plan.keyword));
            for (bit, name) in plan.names.iter().enumerate() {
                if bits & (1 << bit) != 0 {
                    out.push_str(&format!("{}{}\n", opts.indent(level + 1), name));
                }
            }
            out.push_str(&format!("{indent}}}\n"));
        }
        (ValueKind::List(_), CollectionShape::Shattered) => {
            let Value::List(items) = value else { return };
            for item in items {
                out.push_str(&format!(
                    "{indent}{} {} {}\n",
                    plan.keyword,
                    plan.separator.as_str(),
                    render_literal(item, plan.precision)
                ));
            }
        }
        (ValueKind::List(_), _) => {
            let Value::List(items) = value else { return };
            write_wrapped_block(out, plan, items, opts, level);
        }
        (ValueKind::Object, _) => match plan.embedded_policy {
            EmbeddedPolicy::Identifier => {
                let Value::List(items) = value else { return };
                write_wrapped_block(out, plan, items, opts, level);
            }
            EmbeddedPolicy::Inline => {
                let Value::Object(children) = value else { return };
                let Some(embedded_type) = plan.embedded_type else {
                    return;
                };
                let embedded = schemas.get(embedded_type);
                out.push_str(&format!("{indent}{} = {{\n", plan.keyword));
                for (child_key, child_value) in children {
                    let Value::Object(child_props) = child_value else {
                        continue;
                    };
                    out.push_str(&format!("{}{child_key} = {{\n", opts.indent(level + 1)));
                    write_properties(out, child_props, embedded, schemas, opts, level + 2, None);
                    out.push_str(&format!("{}}}\n", opts.indent(level + 1)));
                }
                out.push_str(&format!("{indent}}}\n"));
            }
        },
        _ => {
            out.push_str(&format!(
                "{indent}{} {} {}\n",
                plan.keyword,
                plan.separator.as_str(),
                render_literal(value, plan.precision)
            ));
        }
    }
}

/// A plain collection block with automatic line-wrapping at the column
/// budget.
fn write_wrapped_block(
    out: &mut String,
    plan: &PropertyPlan,
    items: &[Value],
    opts: &SaveOptions,
    level: usize,
) {
    let indent = opts.indent(level);
    let rendered: Vec<String> = items
        .iter()
        .map(|item| render_literal(item, plan.precision))
        .collect();

    let one_line_width =
        indent.len() + plan.keyword.len() + 6 + rendered.iter().map(|r| r.len() + 1).sum::<usize>();
    if one_line_width <= opts.wrap_column {
        out.push_str(&format!("{indent}{} = {{", plan.keyword));
        for item in &rendered {
            out.push(' ');
            out.push_str(item);
        }
        out.push_str(" }\n");
        return;
    }

    let inner = opts.indent(level + 1);
    out.push_str(&format!("{indent}{} = {{\n", plan.keyword));
    let mut column = 0usize;
    for item in &rendered {
        if column == 0 {
            out.push_str(&inner);
            column = inner.len();
        } else if column + item.len() + 1 > opts.wrap_column {
            out.push('\n');
            out.push_str(&inner);
            column = inner.len();
        } else {
            out.push(' ');
            column += 1;
        }
        out.push_str(item);
        column += item.len();
    }
    out.push('\n');
    out.push_str(&format!("{indent}}}\n"));
}

/// Render one scalar value as script text.
pub fn render_literal(value: &Value, precision: usize) -> String {
    match value {
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => {
            let formatted = format!("{v:.precision$}");
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
        Value::Str(v) => format!("\"{v}\""),
        Value::Ident(v) => v.to_string(),
        Value::List(items) => items
            .iter()
            .map(|i| render_literal(i, precision))
            .collect::<Vec<_>>()
            .join(" "),
        Value::Flags(bits) => format!("{bits:#x}"),
        Value::Object(_) => String::new(),
    }
}
