use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::domain::{
    Application, ApplicationStatus, Collection, Document, FinancialTerms, IntakeSubmission,
    Person, PersonalData, RecordId, Reference, Stored, Vehicle,
};
use super::evaluation::{
    BureauCheck, ClientEvaluation, DocumentaryReview, EvaluationEngine, EvaluationError,
    EvaluationService, IncomeReview,
};
use super::gateway::{DocumentStore, PersistenceGateway, StoreError};
use super::intake::IntakeRepository;
use super::pipeline::{MigrationFailure, MigrationPipeline, MigrationReport};
use super::status::InvalidTransition;

/// Facade composing the migration pipeline, evaluation scoring, and status
/// changes over one document store.
pub struct CreditApplicationService<S> {
    gateway: PersistenceGateway<S>,
    pipeline: MigrationPipeline<S>,
    intakes: IntakeRepository<S>,
    evaluations: EvaluationService<S>,
    in_flight: Mutex<HashSet<RecordId>>,
}

impl<S> CreditApplicationService<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, engine: EvaluationEngine) -> Self {
        let gateway = PersistenceGateway::new(store);
        Self {
            pipeline: MigrationPipeline::new(gateway.clone()),
            intakes: IntakeRepository::new(gateway.clone()),
            evaluations: EvaluationService::new(gateway.clone(), engine),
            gateway,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Migrate an intake that was never stored.
    pub fn migrate(
        &self,
        intake: &IntakeSubmission,
    ) -> Result<MigrationReport, CreditServiceError> {
        Ok(self.pipeline.migrate(intake, None)?)
    }

    pub fn submit_intake(&self, intake: IntakeSubmission) -> Result<RecordId, CreditServiceError> {
        let id = self.intakes.insert(intake)?;
        info!(formulario_id = %id, "intake stored");
        Ok(id)
    }

    /// Migrate a stored intake at most once. The intake stays claimed for the
    /// whole call and the migrated marker is written as the pipeline's final
    /// step, inside its rollback.
    pub fn migrate_intake(
        &self,
        intake_id: &RecordId,
    ) -> Result<MigrationReport, CreditServiceError> {
        let _claim = IntakeClaim::acquire(&self.in_flight, intake_id)?;

        let stored = self
            .intakes
            .fetch(intake_id)?
            .ok_or_else(|| CreditServiceError::IntakeNotFound(intake_id.clone()))?;

        if let Some(solicitud_id) = stored.data.solicitud_id {
            return Err(CreditServiceError::IntakeAlreadyMigrated {
                intake_id: intake_id.clone(),
                solicitud_id,
            });
        }

        Ok(self.pipeline.migrate_with(
            &stored.data.submission,
            Some(intake_id.clone()),
            |report| self.intakes.mark_migrated(intake_id, &report.solicitud_id),
        )?)
    }

    pub fn pending_intakes(&self) -> Result<Vec<RecordId>, CreditServiceError> {
        Ok(self
            .intakes
            .pending()?
            .into_iter()
            .map(|stored| stored.id)
            .collect())
    }

    pub fn application(&self, id: &RecordId) -> Result<ApplicationView, CreditServiceError> {
        let solicitud = self
            .gateway
            .get::<Application>(Collection::Solicitudes, id)?
            .ok_or_else(|| CreditServiceError::ApplicationNotFound(id.clone()))?;

        let titular = self.person_view(solicitud.data.titular_id.as_ref())?;
        let fiador = self.person_view(solicitud.data.fiador_id.as_ref())?;
        let referencias = solicitud
            .data
            .referencias_ids
            .iter()
            .filter_map(|ref_id| {
                self.gateway
                    .get::<Reference>(Collection::Referencias, ref_id)
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let datos_financieros = self.optional::<FinancialTerms>(
            Collection::DatosFinancieros,
            solicitud.data.datos_financieros_id.as_ref(),
        )?;
        let vehiculo =
            self.optional::<Vehicle>(Collection::Vehiculos, solicitud.data.vehiculo_id.as_ref())?;
        let evaluacion = self.evaluations.find(id)?;

        Ok(ApplicationView {
            solicitud,
            titular,
            fiador,
            referencias,
            datos_financieros,
            vehiculo,
            evaluacion,
        })
    }

    /// Validated status change; see `ApplicationStatus::allowed_transitions`.
    pub fn change_status(
        &self,
        id: &RecordId,
        to: ApplicationStatus,
    ) -> Result<Stored<Application>, CreditServiceError> {
        let mut stored = self
            .gateway
            .get::<Application>(Collection::Solicitudes, id)?
            .ok_or_else(|| CreditServiceError::ApplicationNotFound(id.clone()))?;

        let from = stored.data.estado;
        let next = from.transition(to)?;
        let now = Utc::now();

        self.gateway
            .update(Collection::Solicitudes, id, "estado", next)?;
        self.gateway
            .update(Collection::Solicitudes, id, "actualizado_en", now)?;

        info!(solicitud_id = %id, from = from.label(), to = next.label(), "application status changed");

        stored.data.estado = next;
        stored.data.actualizado_en = now;
        Ok(stored)
    }

    pub fn update_documentary(
        &self,
        id: &RecordId,
        review: DocumentaryReview,
    ) -> Result<Stored<ClientEvaluation>, CreditServiceError> {
        Ok(self.evaluations.update_documentary(id, review)?)
    }

    pub fn update_bureau_checks(
        &self,
        id: &RecordId,
        checks: Vec<BureauCheck>,
    ) -> Result<Stored<ClientEvaluation>, CreditServiceError> {
        Ok(self.evaluations.update_bureau_checks(id, checks)?)
    }

    pub fn update_income(
        &self,
        id: &RecordId,
        review: IncomeReview,
    ) -> Result<Stored<ClientEvaluation>, CreditServiceError> {
        Ok(self.evaluations.update_income(id, review)?)
    }

    fn person_view(&self, id: Option<&RecordId>) -> Result<Option<PersonView>, StoreError> {
        let Some(persona) = self.optional::<Person>(Collection::Personas, id)? else {
            return Ok(None);
        };

        let datos_personales = self.optional::<PersonalData>(
            Collection::DatosPersonales,
            persona.data.datos_personales_id.as_ref(),
        )?;
        let documentos = persona
            .data
            .documentos_ids
            .iter()
            .filter_map(|doc_id| {
                self.gateway
                    .get::<Document>(Collection::Documentos, doc_id)
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(PersonView {
            persona,
            datos_personales,
            documentos,
        }))
    }

    fn optional<T: serde::de::DeserializeOwned>(
        &self,
        collection: Collection,
        id: Option<&RecordId>,
    ) -> Result<Option<Stored<T>>, StoreError> {
        match id {
            Some(id) => self.gateway.get(collection, id),
            None => Ok(None),
        }
    }
}

/// Marks an intake as in flight for the lifetime of the value.
struct IntakeClaim<'a> {
    in_flight: &'a Mutex<HashSet<RecordId>>,
    intake_id: RecordId,
}

impl<'a> IntakeClaim<'a> {
    fn acquire(
        in_flight: &'a Mutex<HashSet<RecordId>>,
        intake_id: &RecordId,
    ) -> Result<Self, CreditServiceError> {
        let mut claimed = in_flight
            .lock()
            .map_err(|_| StoreError::Unavailable("intake claim lock poisoned".to_string()))?;
        if !claimed.insert(intake_id.clone()) {
            return Err(CreditServiceError::IntakeInProgress(intake_id.clone()));
        }
        Ok(Self {
            in_flight,
            intake_id: intake_id.clone(),
        })
    }
}

impl Drop for IntakeClaim<'_> {
    fn drop(&mut self) {
        if let Ok(mut claimed) = self.in_flight.lock() {
            claimed.remove(&self.intake_id);
        }
    }
}

/// Application graph assembled for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub solicitud: Stored<Application>,
    pub titular: Option<PersonView>,
    pub fiador: Option<PersonView>,
    pub referencias: Vec<Stored<Reference>>,
    pub datos_financieros: Option<Stored<FinancialTerms>>,
    pub vehiculo: Option<Stored<Vehicle>>,
    pub evaluacion: Option<Stored<ClientEvaluation>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonView {
    pub persona: Stored<Person>,
    pub datos_personales: Option<Stored<PersonalData>>,
    pub documentos: Vec<Stored<Document>>,
}

/// Error raised by the credit application service.
#[derive(Debug, thiserror::Error)]
pub enum CreditServiceError {
    #[error(transparent)]
    Migration(#[from] MigrationFailure),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("intake {0} not found")]
    IntakeNotFound(RecordId),
    #[error("intake {intake_id} was already migrated into application {solicitud_id}")]
    IntakeAlreadyMigrated {
        intake_id: RecordId,
        solicitud_id: RecordId,
    },
    #[error("intake {0} is already being migrated")]
    IntakeInProgress(RecordId),
    #[error("application {0} not found")]
    ApplicationNotFound(RecordId),
}

impl CreditServiceError {
    /// Spanish message for the operator; falls back to a generic one.
    pub fn user_message(&self) -> &'static str {
        match self {
            CreditServiceError::Migration(failure) => failure.error.user_message(),
            CreditServiceError::Evaluation(err) => err.user_message(),
            CreditServiceError::Transition(_) => {
                "El cambio de estado no está permitido para esta solicitud."
            }
            CreditServiceError::Store(err) => err.user_message(),
            CreditServiceError::IntakeNotFound(_) => "El formulario indicado no existe.",
            CreditServiceError::IntakeAlreadyMigrated { .. } => {
                "Este formulario ya fue convertido en solicitud."
            }
            CreditServiceError::IntakeInProgress(_) => {
                "Este formulario se está procesando. Espere un momento."
            }
            CreditServiceError::ApplicationNotFound(_) => "La solicitud indicada no existe.",
        }
    }
}
