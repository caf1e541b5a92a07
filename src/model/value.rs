//! Property values — the closed union every typed property set is built of.

use indexmap::IndexMap;
use smol_str::SmolStr;

/// Tolerance for float default comparison. Formatting rounds to a plan's
/// declared precision, so bit equality would misreport round-tripped values
/// as edited.
pub const FLOAT_EPSILON: f64 = 1e-4;

/// A property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Unquoted identifier, including cross-references to foreign objects.
    Ident(SmolStr),
    List(Vec<Value>),
    /// Bit-flag enum; bit N corresponds to the plan's Nth registered name.
    Flags(u64),
    /// An embedded nested object's own property set.
    Object(IndexMap<SmolStr, Value>),
}

/// Value-type tag carried by a property plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    Ident,
    /// Single registered name out of the plan's name list.
    Enum,
    /// One bit per registered name.
    Flags,
    /// Homogeneous collection of the element kind.
    List(Box<ValueKind>),
    /// Embedded nested objects.
    Object,
}

impl Value {
    /// Equality against a declared default. Floats compare within
    /// [`FLOAT_EPSILON`]; collections compare element-wise.
    pub fn approx_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => (a - b).abs() < FLOAT_EPSILON,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.approx_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.approx_eq(vb))
            }
            _ => self == other,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            Value::Ident(v) => Some(v.as_str()),
            _ => None,
        }
    }
}
