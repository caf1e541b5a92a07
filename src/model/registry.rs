//! The global object registry.
//!
//! Arena storage with hash indexes for O(1) key and path lookups. The
//! registry is the principal shared mutable state of the pipeline: during
//! parallel loading every write goes through a caller-supplied lock, and
//! tests run against their own isolated instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::file::{FileId, FileRecord};
use super::object::{DomainObject, ObjectId, OverrideId, OverrideRecord};
use super::schema::{SchemaSet, TypeId};
use crate::base::Checksum;

/// Outcome of an insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(ObjectId),
    /// Key already taken for this type; the first insert stays canonical.
    Duplicate(ObjectId),
}

pub struct Registry {
    schemas: Arc<SchemaSet>,
    /// Arena storage; unloaded slots are tombstoned.
    objects: Vec<Option<DomainObject>>,
    files: Vec<FileRecord>,
    overrides: Vec<Option<OverrideRecord>>,
    /// O(1) key lookup within a type.
    by_key: FxHashMap<(TypeId, SmolStr), ObjectId>,
    by_path: FxHashMap<PathBuf, FileId>,
}

impl Registry {
    pub fn new(schemas: Arc<SchemaSet>) -> Self {
        Self {
            schemas,
            objects: Vec::new(),
            files: Vec::new(),
            overrides: Vec::new(),
            by_key: FxHashMap::default(),
            by_path: FxHashMap::default(),
        }
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    pub fn schemas_arc(&self) -> Arc<SchemaSet> {
        Arc::clone(&self.schemas)
    }

    // ============================================================
    // Files
    // ============================================================

    pub fn add_file(&mut self, path: impl Into<PathBuf>, checksum: Checksum, is_modded: bool) -> FileId {
        let path = path.into();
        if let Some(&id) = self.by_path.get(&path) {
            self.files[id.0].checksum = checksum;
            return id;
        }
        let id = FileId(self.files.len());
        self.by_path.insert(path.clone(), id);
        self.files.push(FileRecord::new(path, checksum, is_modded));
        id
    }

    pub fn file(&self, id: FileId) -> &FileRecord {
        &self.files[id.0]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut FileRecord {
        &mut self.files[id.0]
    }

    pub fn file_by_path(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileRecord)> {
        self.files.iter().enumerate().map(|(i, f)| (FileId(i), f))
    }

    // ============================================================
    // Objects
    // ============================================================

    /// Insert a discovered object. Duplicate keys keep the first insert;
    /// the caller reports the diagnostic and continues.
    pub fn insert(&mut self, object: DomainObject) -> InsertOutcome {
        let index_key = (object.type_id, object.key.clone());
        if let Some(&existing) = self.by_key.get(&index_key) {
            return InsertOutcome::Duplicate(existing);
        }
        let id = ObjectId(self.objects.len());
        tracing::trace!(
            "registry insert {}::{} ({:?})",
            self.schemas.get(object.type_id).type_name,
            object.key,
            object.file
        );
        if let Some(file) = object.file {
            self.files[file.0].objects.push(id);
        }
        self.by_key.insert(index_key, id);
        self.objects.push(Some(object));
        InsertOutcome::Inserted(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&DomainObject> {
        self.objects.get(id.0).and_then(|o| o.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut DomainObject> {
        self.objects.get_mut(id.0).and_then(|o| o.as_mut())
    }

    pub fn find(&self, type_id: TypeId, key: &str) -> Option<ObjectId> {
        self.by_key.get(&(type_id, SmolStr::from(key))).copied()
    }

    /// All live objects of one type, in insertion order.
    pub fn of_type(&self, type_id: TypeId) -> Vec<ObjectId> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.as_ref().is_some_and(|o| o.type_id == type_id))
            .map(|(i, _)| ObjectId(i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.iter().filter(|o| o.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ============================================================
    // Overrides
    // ============================================================

    pub fn add_override(&mut self, record: OverrideRecord) -> OverrideId {
        let id = OverrideId(self.overrides.len());
        self.files[record.file.0].overrides.push(id);
        self.overrides.push(Some(record));
        id
    }

    pub fn get_override(&self, id: OverrideId) -> Option<&OverrideRecord> {
        self.overrides.get(id.0).and_then(|o| o.as_ref())
    }

    pub fn override_mut(&mut self, id: OverrideId) -> Option<&mut OverrideRecord> {
        self.overrides.get_mut(id.0).and_then(|o| o.as_mut())
    }

    // ============================================================
    // Unloading (step retry support)
    // ============================================================

    /// Remove every object and override record of the given types.
    ///
    /// Called before a recoverable step retry so re-parsing starts from a
    /// clean slate for exactly the types that step owns.
    pub fn unload_types(&mut self, types: &[TypeId]) {
        let mut removed = 0usize;
        for slot in self.objects.iter_mut() {
            if slot.as_ref().is_some_and(|o| types.contains(&o.type_id)) {
                let object = slot.take().unwrap();
                self.by_key.remove(&(object.type_id, object.key));
                removed += 1;
            }
        }
        for slot in self.overrides.iter_mut() {
            if slot.as_ref().is_some_and(|r| types.contains(&r.type_id)) {
                *slot = None;
            }
        }
        for file in &mut self.files {
            file.objects.retain(|id| self.objects[id.0].is_some());
            file.overrides.retain(|id| self.overrides[id.0].is_some());
        }
        tracing::debug!("unloaded {removed} objects across {} types", types.len());
    }
}
