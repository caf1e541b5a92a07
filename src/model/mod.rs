//! Object model — the shared data model for discovered script objects.
//!
//! Objects carry identity, origin file, and the exact byte span they were
//! read from; the registry is the single source of truth that discovery,
//! merging, and persistence all work against.

mod file;
mod object;
mod registry;
mod schema;
mod value;

pub use file::{FileId, FileRecord};
pub use object::{DomainObject, ObjectId, OverrideId, OverrideKind, OverrideRecord};
pub use registry::{InsertOutcome, Registry};
pub use schema::{
    CollectionShape, DynamicHandler, EmbeddedPolicy, PropertyPlan, Schema, SchemaSet, TypeId,
};
pub use value::{FLOAT_EPSILON, Value, ValueKind};
