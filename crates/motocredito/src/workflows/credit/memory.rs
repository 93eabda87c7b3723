use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use uuid::Uuid;

use super::domain::{Collection, RecordId};
use super::gateway::{DocumentFields, DocumentStore, StoreError};

type Collections = BTreeMap<Collection, BTreeMap<RecordId, DocumentFields>>;

/// Process-local document store backing the service when no hosted database
/// is configured, and the test suites.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<Collections>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub fn count(&self, collection: Collection) -> usize {
        self.lock()
            .map(|guard| guard.get(&collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn create(
        &self,
        collection: Collection,
        fields: DocumentFields,
    ) -> Result<RecordId, StoreError> {
        let id = RecordId(Uuid::new_v4().to_string());
        let mut guard = self.lock()?;
        guard
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let document = guard
            .get_mut(&collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.clone(),
            })?;
        document.insert(field.to_string(), value);
        Ok(())
    }

    fn get(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<DocumentFields>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(&collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    fn list(&self, collection: Collection) -> Result<Vec<(RecordId, DocumentFields)>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(&collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, fields)| (id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard
            .get_mut(&collection)
            .and_then(|documents| documents.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.clone(),
            })
    }
}
