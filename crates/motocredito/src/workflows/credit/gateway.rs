use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::domain::{Collection, RecordId, Stored};

/// Raw document shape exchanged with the store.
pub type DocumentFields = Map<String, Value>;

/// Storage abstraction over the hosted document database.
///
/// Every method is a single round trip; nothing is batched or retried.
pub trait DocumentStore: Send + Sync {
    fn create(&self, collection: Collection, fields: DocumentFields)
        -> Result<RecordId, StoreError>;
    fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;
    fn get(&self, collection: Collection, id: &RecordId)
        -> Result<Option<DocumentFields>, StoreError>;
    fn list(&self, collection: Collection) -> Result<Vec<(RecordId, DocumentFields)>, StoreError>;
    fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), StoreError>;
}

/// Error enumeration for document database failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {id} not found in {collection}")]
    NotFound { collection: Collection, id: RecordId },
    #[error("permission denied on {0}")]
    PermissionDenied(Collection),
    #[error("document database unavailable: {0}")]
    Unavailable(String),
    #[error("document could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("record encoded as {0}, expected an object")]
    NotAnObject(&'static str),
}

impl StoreError {
    /// Message suitable for an operator-facing toast.
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "El registro solicitado no existe.",
            StoreError::PermissionDenied(_) => "No tiene permisos para realizar esta operación.",
            StoreError::Unavailable(_) => {
                "La base de datos no está disponible. Intente nuevamente más tarde."
            }
            StoreError::Serialization(_) | StoreError::NotAnObject(_) => {
                "Los datos del registro no tienen un formato válido."
            }
        }
    }
}

/// Typed create/update facade over a [`DocumentStore`].
pub struct PersistenceGateway<S> {
    store: Arc<S>,
}

impl<S> Clone for PersistenceGateway<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> PersistenceGateway<S>
where
    S: DocumentStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create<T: Serialize>(
        &self,
        collection: Collection,
        record: &T,
    ) -> Result<RecordId, StoreError> {
        let fields = to_fields(record)?;
        self.store.create(collection, fields)
    }

    pub fn update<V: Serialize>(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        value: V,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.store.update(collection, id, field, value)
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<Stored<T>>, StoreError> {
        match self.store.get(collection, id)? {
            Some(fields) => {
                let data = serde_json::from_value(Value::Object(fields))?;
                Ok(Some(Stored {
                    id: id.clone(),
                    data,
                }))
            }
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get) but treats absence as [`StoreError::NotFound`].
    pub fn require<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Stored<T>, StoreError> {
        self.get(collection, id)?.ok_or_else(|| StoreError::NotFound {
            collection,
            id: id.clone(),
        })
    }

    pub fn list<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<Stored<T>>, StoreError> {
        self.store
            .list(collection)?
            .into_iter()
            .map(|(id, fields)| {
                let data = serde_json::from_value(Value::Object(fields))?;
                Ok::<_, StoreError>(Stored { id, data })
            })
            .collect()
    }

    pub fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), StoreError> {
        self.store.delete(collection, id)
    }
}

fn to_fields<T: Serialize>(record: &T) -> Result<DocumentFields, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(fields),
        Value::Array(_) => Err(StoreError::NotAnObject("array")),
        Value::String(_) => Err(StoreError::NotAnObject("string")),
        Value::Number(_) => Err(StoreError::NotAnObject("number")),
        Value::Bool(_) => Err(StoreError::NotAnObject("bool")),
        Value::Null => Err(StoreError::NotAnObject("null")),
    }
}
