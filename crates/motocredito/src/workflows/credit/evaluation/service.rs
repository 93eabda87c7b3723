use std::sync::Mutex;

use chrono::Utc;
use tracing::info;

use super::super::domain::{Application, Collection, RecordId, Stored};
use super::super::gateway::{DocumentStore, PersistenceGateway, StoreError};
use super::{
    BureauCheck, ClientEvaluation, DocumentaryReview, EvaluationEngine, IncomeReview,
};

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("application {0} does not exist")]
    UnknownApplication(RecordId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EvaluationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            EvaluationError::UnknownApplication(_) => "La solicitud indicada no existe.",
            EvaluationError::Store(err) => err.user_message(),
        }
    }
}

/// Keeps one evaluation per application and recomputes its score every time a
/// sub-evaluation changes. Updates are serialized so the find-or-create and the
/// rescoring always see the latest record.
pub struct EvaluationService<S> {
    gateway: PersistenceGateway<S>,
    engine: EvaluationEngine,
    writes: Mutex<()>,
}

impl<S> EvaluationService<S>
where
    S: DocumentStore,
{
    pub fn new(gateway: PersistenceGateway<S>, engine: EvaluationEngine) -> Self {
        Self {
            gateway,
            engine,
            writes: Mutex::new(()),
        }
    }

    pub fn find(
        &self,
        solicitud_id: &RecordId,
    ) -> Result<Option<Stored<ClientEvaluation>>, EvaluationError> {
        let found = self
            .gateway
            .list::<ClientEvaluation>(Collection::Evaluaciones)?
            .into_iter()
            .find(|stored| &stored.data.solicitud_id == solicitud_id);
        Ok(found)
    }

    pub fn update_documentary(
        &self,
        solicitud_id: &RecordId,
        review: DocumentaryReview,
    ) -> Result<Stored<ClientEvaluation>, EvaluationError> {
        self.apply(solicitud_id, "documental", |evaluation| {
            evaluation.documental = Some(review);
            serde_json::to_value(&evaluation.documental)
        })
    }

    pub fn update_bureau_checks(
        &self,
        solicitud_id: &RecordId,
        checks: Vec<BureauCheck>,
    ) -> Result<Stored<ClientEvaluation>, EvaluationError> {
        self.apply(solicitud_id, "centrales", |evaluation| {
            evaluation.centrales = checks;
            serde_json::to_value(&evaluation.centrales)
        })
    }

    pub fn update_income(
        &self,
        solicitud_id: &RecordId,
        review: IncomeReview,
    ) -> Result<Stored<ClientEvaluation>, EvaluationError> {
        self.apply(solicitud_id, "ingresos", |evaluation| {
            evaluation.ingresos = Some(review);
            serde_json::to_value(&evaluation.ingresos)
        })
    }

    fn apply<F>(
        &self,
        solicitud_id: &RecordId,
        field: &str,
        mutate: F,
    ) -> Result<Stored<ClientEvaluation>, EvaluationError>
    where
        F: FnOnce(&mut ClientEvaluation) -> Result<serde_json::Value, serde_json::Error>,
    {
        if self
            .gateway
            .get::<Application>(Collection::Solicitudes, solicitud_id)?
            .is_none()
        {
            return Err(EvaluationError::UnknownApplication(solicitud_id.clone()));
        }

        let _writes = self
            .writes
            .lock()
            .map_err(|_| StoreError::Unavailable("evaluation lock poisoned".to_string()))?;

        let now = Utc::now();
        let existing = self.find(solicitud_id)?;

        let (id, mut evaluation) = match existing {
            Some(stored) => (Some(stored.id), stored.data),
            None => (None, ClientEvaluation::new(solicitud_id.clone(), now)),
        };

        let value = mutate(&mut evaluation).map_err(StoreError::from)?;
        let outcome = self.engine.score(&evaluation);
        evaluation.resultado = Some(outcome.clone());
        evaluation.actualizado_en = now;

        let id = match id {
            Some(id) => {
                self.gateway
                    .update(Collection::Evaluaciones, &id, field, value)?;
                self.gateway
                    .update(Collection::Evaluaciones, &id, "resultado", &outcome)?;
                self.gateway
                    .update(Collection::Evaluaciones, &id, "actualizado_en", now)?;
                id
            }
            None => self.gateway.create(Collection::Evaluaciones, &evaluation)?,
        };

        info!(
            solicitud_id = %solicitud_id,
            field,
            puntaje = outcome.puntaje_total,
            recomendacion = outcome.recomendacion.label(),
            "client evaluation recomputed"
        );

        Ok(Stored {
            id,
            data: evaluation,
        })
    }
}
