//! In-memory document store.

use std::sync::Arc;

use parking_lot::RwLock;
use snapseed_core::store::{self, Group};
use snapseed_core::{Context, Document, Pattern, Registry, SnapError, Store, Value};

use crate::object_id::{oid_directive, ObjectId};

/// Field holding a record's identifier.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone)]
struct Collection {
    name: String,
    records: Vec<Document>,
}

impl Collection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
        }
    }

    /// Append a record, assigning an id when it has none. Returns the id,
    /// and the generated ObjectId if there was one.
    fn insert(&mut self, mut record: Document) -> Result<(Value, Option<ObjectId>), SnapError> {
        let generated = match record.get(ID_FIELD) {
            Some(_) => None,
            None => {
                let id = ObjectId::new();
                record.insert(0, ID_FIELD, id);
                Some(id)
            }
        };
        let id = record.get(ID_FIELD).cloned().unwrap_or_default();

        if self.records.iter().any(|r| r.get(ID_FIELD) == Some(&id)) {
            return Err(SnapError::backend(
                Some(&self.name),
                "insert",
                format!("duplicate {} {}", ID_FIELD, id),
            ));
        }
        self.records.push(record);
        Ok((id, generated))
    }

    fn position(&self, field: &str, value: &Value) -> Option<usize> {
        self.records.iter().position(|r| r.get(field) == Some(value))
    }
}

/// Named collections of records, kept in creation order.
///
/// Implements [`Store`] for tests, and exposes a small collection API for
/// the component under test.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Vec<Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection. No-op if it exists.
    pub fn create_collection(&self, name: &str) {
        let mut collections = self.collections.write();
        collection_mut(&mut collections, name);
    }

    /// Drop a collection and its records. Returns whether it existed.
    pub fn drop_collection(&self, name: &str) -> bool {
        let mut collections = self.collections.write();
        let before = collections.len();
        collections.retain(|c| c.name != name);
        before != collections.len()
    }

    /// Collection names in creation order.
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.read().iter().map(|c| c.name.clone()).collect()
    }

    /// Insert one record, creating the collection if needed. Returns its id.
    pub fn insert_one(&self, name: &str, record: Document) -> Result<Value, SnapError> {
        let mut collections = self.collections.write();
        let (id, _) = collection_mut(&mut collections, name).insert(record)?;
        log::debug!("Inserted {} into {}", id, name);
        Ok(id)
    }

    /// Insert records in order; stops at the first duplicate id, keeping
    /// the records inserted before it.
    pub fn insert_many(&self, name: &str, records: Vec<Document>) -> Result<Vec<Value>, SnapError> {
        let mut collections = self.collections.write();
        let collection = collection_mut(&mut collections, name);
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let (id, _) = collection.insert(record)?;
            ids.push(id);
        }
        log::debug!("Inserted {} records into {}", ids.len(), name);
        Ok(ids)
    }

    /// All records of a collection, in insertion order.
    pub fn find(&self, name: &str) -> Vec<Document> {
        self.collections
            .read()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.records.clone())
            .unwrap_or_default()
    }

    /// First record whose `field` equals `value`.
    pub fn find_one(&self, name: &str, field: &str, value: &Value) -> Option<Document> {
        let collections = self.collections.read();
        let collection = collections.iter().find(|c| c.name == name)?;
        let pos = collection.position(field, value)?;
        Some(collection.records[pos].clone())
    }

    /// Set the fields of `update` on the first record whose `field` equals
    /// `value`. Returns whether a record matched.
    pub fn update_one(&self, name: &str, field: &str, value: &Value, update: Document) -> bool {
        let mut collections = self.collections.write();
        let Some(collection) = collections.iter_mut().find(|c| c.name == name) else {
            return false;
        };
        let Some(pos) = collection.position(field, value) else {
            return false;
        };
        let record = &mut collection.records[pos];
        for entry in update {
            record.set(entry.key, entry.value);
        }
        true
    }

    /// Delete the first record whose `field` equals `value`.
    pub fn delete_one(&self, name: &str, field: &str, value: &Value) -> bool {
        let mut collections = self.collections.write();
        let Some(collection) = collections.iter_mut().find(|c| c.name == name) else {
            return false;
        };
        match collection.position(field, value) {
            Some(pos) => {
                collection.records.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Delete every record whose `field` equals `value`. Returns the count.
    pub fn delete_many(&self, name: &str, field: &str, value: &Value) -> usize {
        let mut collections = self.collections.write();
        let Some(collection) = collections.iter_mut().find(|c| c.name == name) else {
            return 0;
        };
        let before = collection.records.len();
        collection.records.retain(|r| r.get(field) != Some(value));
        before - collection.records.len()
    }

    pub fn count(&self, name: &str) -> usize {
        self.collections
            .read()
            .iter()
            .find(|c| c.name == name)
            .map_or(0, |c| c.records.len())
    }
}

fn collection_mut<'a>(collections: &'a mut Vec<Collection>, name: &str) -> &'a mut Collection {
    match collections.iter().position(|c| c.name == name) {
        Some(pos) => &mut collections[pos],
        None => {
            collections.push(Collection::new(name));
            let last = collections.len() - 1;
            &mut collections[last]
        }
    }
}

impl Store for MemoryStore {
    fn seed(&self, cx: &Context, tree: Document) -> Result<Document, SnapError> {
        cx.check()?;
        let groups = store::groups(&tree)?;

        let mut collections = self.collections.write();
        // Staged copy so a failing group leaves the store untouched.
        let mut staged = collections.clone();
        let mut generated = Vec::new();
        let mut total = 0;

        for (group_index, Group { name, records }) in groups.iter().enumerate() {
            if records.is_empty() {
                continue;
            }
            cx.check()?;
            log::debug!("Seeding {} records into {}", records.len(), name);
            let collection = collection_mut(&mut staged, name);
            for (index, record) in records.iter().enumerate() {
                let (_, fresh) = collection.insert(store::concretize_document(record))?;
                if let Some(id) = fresh {
                    generated.push(GeneratedId {
                        group: group_index,
                        record: index,
                        id,
                    });
                }
            }
            total += records.len();
        }

        *collections = staged;
        drop(collections);
        log::info!("Seeded {} records into {} collections", total, groups.len());

        Ok(echo_generated_ids(tree, &generated))
    }

    fn snapshot(&self, cx: &Context) -> Result<Document, SnapError> {
        cx.check()?;
        let collections = self.collections.read();
        let mut doc = Document::with_capacity(collections.len());
        for collection in collections.iter() {
            let records: Vec<Value> = collection
                .records
                .iter()
                .cloned()
                .map(Value::from)
                .collect();
            doc.push(collection.name.clone(), records);
        }
        Ok(store::sort_groups(doc))
    }

    fn teardown(&self, cx: &Context) -> Result<(), SnapError> {
        cx.check()?;
        let mut collections = self.collections.write();
        let dropped = collections.len();
        collections.clear();
        log::info!("Dropped {} collections", dropped);
        Ok(())
    }

    fn register_types(&self, registry: &mut Registry) -> Result<(), SnapError> {
        registry.register(oid_directive())
    }
}

/// Position of a record that received a generated id during seeding.
struct GeneratedId {
    group: usize,
    record: usize,
    id: ObjectId,
}

/// Return `tree` with an `_id` wildcard on every record that received a
/// generated id, so asserting the echo ignores the generated values.
fn echo_generated_ids(mut tree: Document, generated: &[GeneratedId]) -> Document {
    for generated in generated {
        let Some(entry) = tree.entries_mut().get_mut(generated.group) else {
            continue;
        };
        let Value::Array(items) = &mut entry.value else {
            continue;
        };
        let Some(Value::Document(record)) = Arc::make_mut(items).get_mut(generated.record) else {
            continue;
        };
        Arc::make_mut(record).insert(0, ID_FIELD, Pattern::any(generated.id));
    }
    tree
}
