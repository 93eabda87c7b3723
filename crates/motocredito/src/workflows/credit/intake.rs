use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Collection, IntakeSubmission, RecordId, Stored};
use super::gateway::{DocumentStore, PersistenceGateway, StoreError};

/// Intake as kept in `formularios`, with its migration marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeRecord {
    #[serde(flatten)]
    pub submission: IntakeSubmission,
    pub recibido_en: DateTime<Utc>,
    #[serde(default)]
    pub solicitud_id: Option<RecordId>,
}

/// Access to public web form submissions awaiting migration.
pub struct IntakeRepository<S> {
    gateway: PersistenceGateway<S>,
}

impl<S> IntakeRepository<S>
where
    S: DocumentStore,
{
    pub fn new(gateway: PersistenceGateway<S>) -> Self {
        Self { gateway }
    }

    pub fn insert(&self, submission: IntakeSubmission) -> Result<RecordId, StoreError> {
        let record = IntakeRecord {
            submission,
            recibido_en: Utc::now(),
            solicitud_id: None,
        };
        self.gateway.create(Collection::Formularios, &record)
    }

    pub fn fetch(&self, id: &RecordId) -> Result<Option<Stored<IntakeRecord>>, StoreError> {
        self.gateway.get(Collection::Formularios, id)
    }

    /// Intakes not yet turned into an application.
    pub fn pending(&self) -> Result<Vec<Stored<IntakeRecord>>, StoreError> {
        Ok(self
            .gateway
            .list::<IntakeRecord>(Collection::Formularios)?
            .into_iter()
            .filter(|stored| stored.data.solicitud_id.is_none())
            .collect())
    }

    pub fn mark_migrated(&self, id: &RecordId, solicitud_id: &RecordId) -> Result<(), StoreError> {
        self.gateway
            .update(Collection::Formularios, id, "solicitud_id", solicitud_id)
    }
}
