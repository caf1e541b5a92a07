//! Per-type serialization and dispatch tables.
//!
//! A [`Schema`] is the handler table the build-time code-generation step
//! emits for one annotated object type. The engine depends only on the
//! table's shape: one [`PropertyPlan`] per property, a keyword index for
//! static dispatch, and an ordered list of [`DynamicHandler`]s for children
//! whose key is itself a foreign-object identifier.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::object::DomainObject;
use super::value::{Value, ValueKind};
use crate::diagnostics::DiagnosticSink;
use crate::syntax::{Node, Separator};

/// Index of a type's schema within the [`SchemaSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub usize);

/// How a collection property is laid out in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionShape {
    /// One block, elements line-wrapped at the column budget.
    #[default]
    Plain,
    /// One top-level `keyword = value` line per element.
    Shattered,
    /// Nested embedded-object blocks.
    Embedded,
}

/// How embedded nested objects are referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddedPolicy {
    /// Full nested block per child.
    #[default]
    Inline,
    /// Children referenced by identifier only.
    Identifier,
}

/// Per-property serialization contract. Immutable after generation time.
#[derive(Debug, Clone)]
pub struct PropertyPlan {
    pub keyword: SmolStr,
    pub separator: Separator,
    pub kind: ValueKind,
    /// Declared default; default-valued properties are elided on save.
    pub default: Value,
    pub shape: CollectionShape,
    /// Emitted even when equal to the default.
    pub always_required: bool,
    /// Decimal places for float formatting.
    pub precision: usize,
    /// Registered display names for enum variants / flag bits.
    pub names: Vec<SmolStr>,
    /// Schema of embedded nested objects, when `shape` is `Embedded`.
    pub embedded_type: Option<TypeId>,
    pub embedded_policy: EmbeddedPolicy,
}

impl PropertyPlan {
    pub fn new(keyword: impl Into<SmolStr>, kind: ValueKind, default: Value) -> Self {
        Self {
            keyword: keyword.into(),
            separator: Separator::Equals,
            kind,
            default,
            shape: CollectionShape::Plain,
            always_required: false,
            precision: 3,
            names: Vec::new(),
            embedded_type: None,
            embedded_policy: EmbeddedPolicy::default(),
        }
    }

    pub fn shattered(mut self) -> Self {
        self.shape = CollectionShape::Shattered;
        self
    }

    pub fn embedded(mut self, embedded_type: TypeId, policy: EmbeddedPolicy) -> Self {
        self.shape = CollectionShape::Embedded;
        self.embedded_type = Some(embedded_type);
        self.embedded_policy = policy;
        self
    }

    pub fn required(mut self) -> Self {
        self.always_required = true;
        self
    }

    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn separator(mut self, separator: Separator) -> Self {
        self.separator = separator;
        self
    }

    /// Position of a registered display name, for enum/flag parsing.
    pub fn name_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// A dynamic field handler, tried in order when no static keyword matches.
///
/// Used for children whose key is itself a foreign-object identifier, e.g.
/// per-category override rows inside a block.
pub struct DynamicHandler {
    /// Stable name for diagnostics and tracing.
    pub name: &'static str,
    /// Whether this handler claims the node.
    pub claims: Box<dyn Fn(&Node) -> bool + Send + Sync>,
    /// Populate the object from the claimed node. Returns false on a field
    /// parse failure (already reported through the sink).
    pub apply: Box<dyn Fn(&Node, &mut DomainObject, &DiagnosticSink) -> bool + Send + Sync>,
}

/// The full handler table for one object type.
pub struct Schema {
    pub type_name: SmolStr,
    pub plans: Vec<PropertyPlan>,
    keyword_index: FxHashMap<SmolStr, usize>,
    pub dynamic: Vec<DynamicHandler>,
    /// Child keys that are expected and deliberately not parsed.
    pub ignored: Vec<SmolStr>,
    /// Suppress unknown-child diagnostics entirely for this type.
    pub tolerate_unknown: bool,
}

impl Schema {
    pub fn new(type_name: impl Into<SmolStr>, plans: Vec<PropertyPlan>) -> Self {
        let keyword_index = plans
            .iter()
            .enumerate()
            .map(|(i, p)| (p.keyword.clone(), i))
            .collect();
        Self {
            type_name: type_name.into(),
            plans,
            keyword_index,
            dynamic: Vec::new(),
            ignored: Vec::new(),
            tolerate_unknown: false,
        }
    }

    pub fn with_dynamic(mut self, handler: DynamicHandler) -> Self {
        self.dynamic.push(handler);
        self
    }

    pub fn with_ignored<I, S>(mut self, ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.ignored = ignored.into_iter().map(Into::into).collect();
        self
    }

    pub fn tolerate_unknown(mut self) -> Self {
        self.tolerate_unknown = true;
        self
    }

    /// Static dispatch: plan for a child's lexeme key.
    pub fn plan_for(&self, keyword: &str) -> Option<&PropertyPlan> {
        self.keyword_index.get(keyword).map(|&i| &self.plans[i])
    }

    pub fn is_ignored(&self, keyword: &str) -> bool {
        self.ignored.iter().any(|k| k == keyword)
    }
}

/// All schemas known to one editing session, indexed by [`TypeId`].
#[derive(Default)]
pub struct SchemaSet {
    schemas: Vec<Schema>,
    by_name: FxHashMap<SmolStr, TypeId>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: Schema) -> TypeId {
        let id = TypeId(self.schemas.len());
        self.by_name.insert(schema.type_name.clone(), id);
        self.schemas.push(schema);
        id
    }

    pub fn get(&self, id: TypeId) -> &Schema {
        &self.schemas[id.0]
    }

    pub fn id_of(&self, type_name: &str) -> Option<TypeId> {
        self.by_name.get(type_name).copied()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
