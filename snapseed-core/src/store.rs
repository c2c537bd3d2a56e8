//! Backing-store contract.
//!
//! A store holds named groups of records (tables, collections). The harness
//! only ever talks to it through [`Store`]:
//!
//! - `seed` writes every record of a group/array/document tree
//! - `snapshot` reads the current contents back as the same shape
//! - `teardown` drops everything the store holds
//! - `register_types` lets the store add its own fixture directives

use std::sync::Arc;

use crate::context::Context;
use crate::error::{ShapeError, SnapError};
use crate::model::{Document, Value};
use crate::registry::Registry;

/// Lifecycle operations of a backing store.
pub trait Store: Send + Sync {
    /// Write `tree` (group name → array of records) and return the tree as
    /// written. Placeholders are written as their concrete values.
    fn seed(&self, cx: &Context, tree: Document) -> Result<Document, SnapError>;

    /// Read all groups, sorted by name, records in store order.
    fn snapshot(&self, cx: &Context) -> Result<Document, SnapError>;

    /// Remove everything. Calling it twice is not an error.
    fn teardown(&self, cx: &Context) -> Result<(), SnapError>;

    /// Add store-specific directives. Called once before any fixture is
    /// decoded.
    fn register_types(&self, _registry: &mut Registry) -> Result<(), SnapError> {
        Ok(())
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn seed(&self, cx: &Context, tree: Document) -> Result<Document, SnapError> {
        (**self).seed(cx, tree)
    }

    fn snapshot(&self, cx: &Context) -> Result<Document, SnapError> {
        (**self).snapshot(cx)
    }

    fn teardown(&self, cx: &Context) -> Result<(), SnapError> {
        (**self).teardown(cx)
    }

    fn register_types(&self, registry: &mut Registry) -> Result<(), SnapError> {
        (**self).register_types(registry)
    }
}

/// One validated group of a seed tree.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    pub name: &'a str,
    pub records: Vec<&'a Document>,
}

/// Check that every top-level value is an array of documents.
pub fn groups(tree: &Document) -> Result<Vec<Group<'_>>, SnapError> {
    let mut groups = Vec::with_capacity(tree.len());
    for entry in tree {
        let items = entry.value.as_array().ok_or_else(|| ShapeError::NotAnArray {
            key: entry.key.clone(),
            actual: entry.value.kind(),
        })?;

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let record = item.as_document().ok_or_else(|| ShapeError::NotADocument {
                key: entry.key.clone(),
                index,
                actual: item.kind(),
            })?;
            records.push(record);
        }

        groups.push(Group {
            name: &entry.key,
            records,
        });
    }
    Ok(groups)
}

/// Sort top-level entries by name. The sort is stable.
pub fn sort_groups(mut doc: Document) -> Document {
    doc.entries_mut().sort_by(|a, b| a.key.cmp(&b.key));
    doc
}

/// Replace every placeholder in `value` with its concrete payload.
pub fn concretize(value: &Value) -> Value {
    match value {
        Value::Pattern(p) => concretize(&p.unwrap_value()),
        Value::Document(doc) => Value::from(concretize_document(doc)),
        Value::Array(items) => Value::from(items.iter().map(concretize).collect::<Vec<_>>()),
        other => other.clone(),
    }
}

/// [`concretize`] applied to each entry of a document.
pub fn concretize_document(doc: &Document) -> Document {
    doc.iter()
        .map(|entry| (entry.key.clone(), concretize(&entry.value)))
        .collect()
}
