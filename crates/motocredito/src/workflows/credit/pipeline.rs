//! Fans one intake out into the normalized application graph.
//!
//! Steps run strictly in order because each one needs identifiers produced by
//! the previous one. Per-run bookkeeping lives in [`MigrationContext`], so a
//! single pipeline can serve concurrent callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::builders::{
    application_code, build_application, build_documents, build_financial_terms, build_person,
    build_personal_data, build_references, build_vehicle,
};
use super::domain::{Collection, IntakePerson, IntakeSubmission, PersonRole, RecordId};
use super::gateway::{DocumentStore, PersistenceGateway, StoreError};

/// Stage of the migration, reported on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    Validate,
    Application,
    Persons,
    ApplicantGraph,
    GuarantorGraph,
    References,
    FinancialTerms,
    Vehicle,
    Denormalize,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub collection: Collection,
    pub id: RecordId,
}

/// Identifiers produced by a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub solicitud_id: RecordId,
    pub codigo: String,
    pub titular_id: RecordId,
    pub fiador_id: RecordId,
    pub titular_datos_personales_id: RecordId,
    pub titular_documentos_ids: Vec<RecordId>,
    pub fiador_datos_personales_id: Option<RecordId>,
    pub fiador_documentos_ids: Vec<RecordId>,
    pub referencias_ids: Vec<RecordId>,
    pub datos_financieros_id: RecordId,
    pub vehiculo_id: RecordId,
    pub registros_creados: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("intake is missing the {0} section")]
    MissingSection(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MigrationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            MigrationError::MissingSection("titular") => {
                "Faltan los datos del titular en el formulario."
            }
            MigrationError::MissingSection("vehiculo") => {
                "Falta el vehículo seleccionado en el formulario."
            }
            MigrationError::MissingSection(_) => {
                "Faltan los datos de financiamiento en el formulario."
            }
            MigrationError::Store(err) => err.user_message(),
        }
    }
}

/// Outcome of compensating deletes after an aborted run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackOutcome {
    pub deleted: Vec<CreatedRecord>,
    pub failed: Vec<RollbackFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackFailure {
    pub record: CreatedRecord,
    pub reason: String,
}

impl RollbackOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Failure result handed back to the caller of [`MigrationPipeline::migrate`].
#[derive(Debug, thiserror::Error)]
#[error("credit migration failed during {step:?}: {error}")]
pub struct MigrationFailure {
    pub step: MigrationStep,
    #[source]
    pub error: MigrationError,
    pub created: Vec<CreatedRecord>,
    pub rollback: RollbackOutcome,
}

/// Per-run state threaded through the steps.
#[derive(Debug)]
pub struct MigrationContext {
    started_at: DateTime<Utc>,
    step: MigrationStep,
    created: Vec<CreatedRecord>,
}

impl MigrationContext {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            step: MigrationStep::Validate,
            created: Vec::new(),
        }
    }

    fn enter(&mut self, step: MigrationStep) {
        debug!(?step, created = self.created.len(), "credit migration step");
        self.step = step;
    }
}

struct PersonGraph {
    datos_personales_id: RecordId,
    documentos_ids: Vec<RecordId>,
}

pub struct MigrationPipeline<S> {
    gateway: PersistenceGateway<S>,
}

impl<S> MigrationPipeline<S>
where
    S: DocumentStore,
{
    pub fn new(gateway: PersistenceGateway<S>) -> Self {
        Self { gateway }
    }

    /// Run the full sequence for one intake. `formulario_id` links the
    /// application back to the stored intake it came from, when there is one.
    pub fn migrate(
        &self,
        intake: &IntakeSubmission,
        formulario_id: Option<RecordId>,
    ) -> Result<MigrationReport, MigrationFailure> {
        self.migrate_with(intake, formulario_id, |_| Ok(()))
    }

    /// Like [`migrate`](Self::migrate), with `finalize` run as the last step.
    /// A `finalize` error rolls the whole graph back like any other step.
    pub fn migrate_with<F>(
        &self,
        intake: &IntakeSubmission,
        formulario_id: Option<RecordId>,
        finalize: F,
    ) -> Result<MigrationReport, MigrationFailure>
    where
        F: FnOnce(&MigrationReport) -> Result<(), StoreError>,
    {
        let mut ctx = MigrationContext::new(Utc::now());

        let result = self
            .run(intake, formulario_id, &mut ctx)
            .and_then(|report| {
                ctx.enter(MigrationStep::Finalize);
                finalize(&report)?;
                Ok(report)
            });

        match result {
            Ok(report) => {
                info!(
                    solicitud_id = %report.solicitud_id,
                    codigo = %report.codigo,
                    registros = report.registros_creados,
                    "credit application migrated"
                );
                Ok(report)
            }
            Err(err) => {
                error!(step = ?ctx.step, error = %err, "credit migration aborted");
                let rollback = self.rollback(&ctx.created);
                Err(MigrationFailure {
                    step: ctx.step,
                    error: err,
                    created: ctx.created,
                    rollback,
                })
            }
        }
    }

    fn run(
        &self,
        intake: &IntakeSubmission,
        formulario_id: Option<RecordId>,
        ctx: &mut MigrationContext,
    ) -> Result<MigrationReport, MigrationError> {
        let applicant = intake
            .titular
            .as_ref()
            .filter(|person| person.is_present())
            .ok_or(MigrationError::MissingSection("titular"))?;
        let vehicle = intake
            .vehiculo
            .as_ref()
            .ok_or(MigrationError::MissingSection("vehiculo"))?;
        let financing = intake
            .financiamiento
            .as_ref()
            .ok_or(MigrationError::MissingSection("financiamiento"))?;
        let now = ctx.started_at;

        ctx.enter(MigrationStep::Application);
        let codigo = application_code(now);
        let application = build_application(intake, codigo.clone(), formulario_id, now);
        let solicitud_id = self.create(ctx, Collection::Solicitudes, &application)?;

        ctx.enter(MigrationStep::Persons);
        let titular_id = self.create(
            ctx,
            Collection::Personas,
            &build_person(PersonRole::Titular, &solicitud_id, now),
        )?;
        let fiador_id = self.create(
            ctx,
            Collection::Personas,
            &build_person(PersonRole::Fiador, &solicitud_id, now),
        )?;
        self.patch(Collection::Solicitudes, &solicitud_id, "titular_id", &titular_id)?;
        self.patch(Collection::Solicitudes, &solicitud_id, "fiador_id", &fiador_id)?;

        ctx.enter(MigrationStep::ApplicantGraph);
        let titular_graph = self.person_graph(ctx, &titular_id, applicant)?;

        let guarantor = intake.fiador.as_ref().filter(|person| person.is_present());
        let fiador_graph = match guarantor {
            Some(guarantor) => {
                ctx.enter(MigrationStep::GuarantorGraph);
                Some(self.person_graph(ctx, &fiador_id, guarantor)?)
            }
            None => {
                debug!(solicitud_id = %solicitud_id, "guarantor absent, skipping its graph");
                None
            }
        };

        ctx.enter(MigrationStep::References);
        let mut referencias_ids = Vec::new();
        for reference in build_references(&solicitud_id, &titular_id, &intake.referencias) {
            referencias_ids.push(self.create(ctx, Collection::Referencias, &reference)?);
        }
        self.patch(Collection::Personas, &titular_id, "referencias_ids", &referencias_ids)?;
        self.patch(
            Collection::Solicitudes,
            &solicitud_id,
            "referencias_ids",
            &referencias_ids,
        )?;

        ctx.enter(MigrationStep::FinancialTerms);
        let datos_financieros_id = self.create(
            ctx,
            Collection::DatosFinancieros,
            &build_financial_terms(&solicitud_id, financing),
        )?;
        self.patch(
            Collection::Solicitudes,
            &solicitud_id,
            "datos_financieros_id",
            &datos_financieros_id,
        )?;

        ctx.enter(MigrationStep::Vehicle);
        let vehiculo_id = self.create(
            ctx,
            Collection::Vehiculos,
            &build_vehicle(&solicitud_id, vehicle),
        )?;
        self.patch(Collection::Solicitudes, &solicitud_id, "vehiculo_id", &vehiculo_id)?;

        ctx.enter(MigrationStep::Denormalize);
        if let Some(vendedor_id) = present(&intake.vendedor_id) {
            self.patch(Collection::Solicitudes, &solicitud_id, "vendedor_id", vendedor_id)?;
        }
        if let Some(tienda_id) = present(&intake.tienda_id) {
            self.patch(Collection::Solicitudes, &solicitud_id, "tienda_id", tienda_id)?;
        }
        self.patch(
            Collection::Solicitudes,
            &solicitud_id,
            "actualizado_en",
            Utc::now(),
        )?;

        let (fiador_datos_personales_id, fiador_documentos_ids) = match fiador_graph {
            Some(graph) => (Some(graph.datos_personales_id), graph.documentos_ids),
            None => (None, Vec::new()),
        };

        Ok(MigrationReport {
            solicitud_id,
            codigo,
            titular_id,
            fiador_id,
            titular_datos_personales_id: titular_graph.datos_personales_id,
            titular_documentos_ids: titular_graph.documentos_ids,
            fiador_datos_personales_id,
            fiador_documentos_ids,
            referencias_ids,
            datos_financieros_id,
            vehiculo_id,
            registros_creados: ctx.created.len(),
        })
    }

    fn person_graph(
        &self,
        ctx: &mut MigrationContext,
        persona_id: &RecordId,
        person: &IntakePerson,
    ) -> Result<PersonGraph, MigrationError> {
        let datos = build_personal_data(persona_id, person, ctx.started_at.date_naive());
        let datos_personales_id = self.create(ctx, Collection::DatosPersonales, &datos)?;

        let mut documentos_ids = Vec::new();
        for document in build_documents(persona_id, person, ctx.started_at) {
            documentos_ids.push(self.create(ctx, Collection::Documentos, &document)?);
        }

        self.patch(
            Collection::Personas,
            persona_id,
            "datos_personales_id",
            &datos_personales_id,
        )?;
        self.patch(Collection::Personas, persona_id, "documentos_ids", &documentos_ids)?;

        Ok(PersonGraph {
            datos_personales_id,
            documentos_ids,
        })
    }

    fn create<T: Serialize>(
        &self,
        ctx: &mut MigrationContext,
        collection: Collection,
        record: &T,
    ) -> Result<RecordId, MigrationError> {
        let id = self.gateway.create(collection, record)?;
        ctx.created.push(CreatedRecord {
            collection,
            id: id.clone(),
        });
        Ok(id)
    }

    fn patch<V: Serialize>(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        value: V,
    ) -> Result<(), MigrationError> {
        self.gateway.update(collection, id, field, value)?;
        Ok(())
    }

    /// Compensating deletes in reverse creation order. Failures are collected,
    /// never raised, so the original error reaches the caller.
    fn rollback(&self, created: &[CreatedRecord]) -> RollbackOutcome {
        let mut outcome = RollbackOutcome::default();

        for record in created.iter().rev() {
            match self.gateway.delete(record.collection, &record.id) {
                Ok(()) => outcome.deleted.push(record.clone()),
                Err(err) => {
                    warn!(
                        collection = %record.collection,
                        id = %record.id,
                        error = %err,
                        "rollback delete failed"
                    );
                    outcome.failed.push(RollbackFailure {
                        record: record.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if !created.is_empty() {
            info!(
                deleted = outcome.deleted.len(),
                failed = outcome.failed.len(),
                "credit migration rolled back"
            );
        }
        outcome
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
