//! Discovered objects and the override records layered on top of them.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::file::FileId;
use super::schema::TypeId;
use super::value::Value;
use crate::base::Span;
use crate::syntax::keywords;

/// Index of an object in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub usize);

/// Index of an override record in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverrideId(pub usize);

/// Mod-layer override semantics attached to a discovered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrideKind {
    /// Ordinary discovery, no marker.
    #[default]
    None,
    /// Merge supplied properties into the base; missing target is an error.
    Inject,
    /// Merge; missing target is a silent no-op.
    TryInject,
    /// Merge; missing target registers the override as a new base object.
    InjectOrCreate,
    /// Substitute the whole object; missing target is an error.
    Replace,
    /// Substitute; missing target is a silent no-op.
    TryReplace,
    /// Substitute; missing target registers the override as a new base.
    ReplaceOrCreate,
}

impl OverrideKind {
    /// Map a reserved marker word to its kind.
    pub fn from_marker(word: &str) -> Option<Self> {
        match word {
            keywords::INJECT => Some(Self::Inject),
            keywords::TRY_INJECT => Some(Self::TryInject),
            keywords::INJECT_OR_CREATE => Some(Self::InjectOrCreate),
            keywords::REPLACE => Some(Self::Replace),
            keywords::TRY_REPLACE => Some(Self::TryReplace),
            keywords::REPLACE_OR_CREATE => Some(Self::ReplaceOrCreate),
            _ => None,
        }
    }

    /// The marker word, for re-serializing override headers.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Inject => Some(keywords::INJECT),
            Self::TryInject => Some(keywords::TRY_INJECT),
            Self::InjectOrCreate => Some(keywords::INJECT_OR_CREATE),
            Self::Replace => Some(keywords::REPLACE),
            Self::TryReplace => Some(keywords::TRY_REPLACE),
            Self::ReplaceOrCreate => Some(keywords::REPLACE_OR_CREATE),
        }
    }

    pub fn is_inject(&self) -> bool {
        matches!(self, Self::Inject | Self::TryInject | Self::InjectOrCreate)
    }

    pub fn is_replace(&self) -> bool {
        matches!(self, Self::Replace | Self::TryReplace | Self::ReplaceOrCreate)
    }

    /// Missing-target tolerance: the "try" variants no-op silently.
    pub fn tolerates_missing(&self) -> bool {
        matches!(self, Self::TryInject | Self::TryReplace)
    }

    /// Missing-target creation: the "or-create" variants register the
    /// override as a new base object.
    pub fn creates_missing(&self) -> bool {
        matches!(self, Self::InjectOrCreate | Self::ReplaceOrCreate)
    }
}

/// A discovered or edited script object.
///
/// Minted during discovery with key and span only, property-populated during
/// dispatch, mutated by edit commands, and re-spanned after every save.
#[derive(Debug, Clone)]
pub struct DomainObject {
    pub key: SmolStr,
    pub type_id: TypeId,
    /// Origin file; `None` for objects created in the editor and not yet
    /// written anywhere.
    pub file: Option<FileId>,
    /// Byte span in the origin file at last successful parse or save.
    pub span: Span,
    /// Typed property set in declaration order.
    pub props: IndexMap<SmolStr, Value>,
    pub override_kind: OverrideKind,
    /// Set by edit commands; cleared by a successful save.
    pub dirty: bool,
    /// False when any field of this object failed to parse.
    pub valid: bool,
}

impl DomainObject {
    pub fn new(key: impl Into<SmolStr>, type_id: TypeId, file: Option<FileId>, span: Span) -> Self {
        Self {
            key: key.into(),
            type_id,
            file,
            span,
            props: IndexMap::new(),
            override_kind: OverrideKind::None,
            dirty: false,
            valid: true,
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.props.get(keyword)
    }

    /// Set a property and mark the object dirty. This is the mutation entry
    /// point the editor layer calls.
    pub fn set(&mut self, keyword: impl Into<SmolStr>, value: Value) {
        self.props.insert(keyword.into(), value);
        self.dirty = true;
    }

    /// Set a property without dirtying, for population from disk.
    pub(crate) fn populate(&mut self, keyword: impl Into<SmolStr>, value: Value) {
        self.props.insert(keyword.into(), value);
    }
}

/// Wraps an object discovered under an override marker.
///
/// Records exactly which properties this layer supplied so re-saving the
/// override emits a minimal diff, never the merged effective value.
#[derive(Debug, Clone)]
pub struct OverrideRecord {
    /// Key of the base object this layer targets.
    pub target: SmolStr,
    pub type_id: TypeId,
    pub kind: OverrideKind,
    /// Keywords this layer supplied, in file order.
    pub supplied: Vec<SmolStr>,
    /// The override file this record was read from.
    pub file: FileId,
    /// Span of the override block in its own file.
    pub span: Span,
}
