use super::common::*;
use std::sync::Arc;

use crate::workflows::credit::domain::{
    Application, ApplicationStatus, Collection, Document, Person, PersonRole, PersonalData,
    Priority, Vehicle,
};
use crate::workflows::credit::gateway::{PersistenceGateway, StoreError};
use crate::workflows::credit::{
    MemoryDocumentStore, MigrationError, MigrationPipeline, MigrationStep,
};

#[test]
fn migrate_builds_the_full_application_graph() {
    let store = Arc::new(MemoryDocumentStore::new());
    let report = pipeline(store.clone())
        .migrate(&intake(), None)
        .expect("migration succeeds");

    assert_eq!(store.count(Collection::Solicitudes), 1);
    assert_eq!(store.count(Collection::Personas), 2);
    assert_eq!(store.count(Collection::DatosPersonales), 2);
    assert_eq!(store.count(Collection::Documentos), 7);
    assert_eq!(store.count(Collection::Referencias), 3);
    assert_eq!(store.count(Collection::DatosFinancieros), 1);
    assert_eq!(store.count(Collection::Vehiculos), 1);
    assert_eq!(report.registros_creados, 17);
    assert_eq!(report.titular_documentos_ids.len(), 5);
    assert_eq!(report.fiador_documentos_ids.len(), 2);
    assert!(report.codigo.starts_with("SOL-"));
}

#[test]
fn migrate_cross_links_records_by_identifier() {
    let store = Arc::new(MemoryDocumentStore::new());
    let gateway = PersistenceGateway::new(store.clone());
    let report = MigrationPipeline::new(gateway.clone())
        .migrate(&intake(), None)
        .expect("migration succeeds");

    let application = gateway
        .require::<Application>(Collection::Solicitudes, &report.solicitud_id)
        .expect("application stored")
        .data;
    assert_eq!(application.estado, ApplicationStatus::Pendiente);
    assert_eq!(application.prioridad, Priority::Alta);
    assert_eq!(application.titular_id.as_ref(), Some(&report.titular_id));
    assert_eq!(application.fiador_id.as_ref(), Some(&report.fiador_id));
    assert_eq!(application.vehiculo_id.as_ref(), Some(&report.vehiculo_id));
    assert_eq!(
        application.datos_financieros_id.as_ref(),
        Some(&report.datos_financieros_id)
    );
    assert_eq!(application.referencias_ids, report.referencias_ids);
    assert_eq!(application.vendedor_id.as_deref(), Some("VEN-014"));
    assert_eq!(application.tienda_id.as_deref(), Some("TDA-CHICLAYO"));

    let titular = gateway
        .require::<Person>(Collection::Personas, &report.titular_id)
        .expect("applicant stored")
        .data;
    assert_eq!(titular.rol, PersonRole::Titular);
    assert_eq!(titular.solicitud_id, report.solicitud_id);
    assert_eq!(
        titular.datos_personales_id.as_ref(),
        Some(&report.titular_datos_personales_id)
    );
    assert_eq!(titular.documentos_ids, report.titular_documentos_ids);
    assert_eq!(titular.referencias_ids, report.referencias_ids);

    let datos = gateway
        .require::<PersonalData>(Collection::DatosPersonales, &report.titular_datos_personales_id)
        .expect("personal data stored")
        .data;
    assert_eq!(datos.nombre_completo, "Rosa Elena Huamán Torres");
    assert!(datos.edad.is_some());

    for id in &report.titular_documentos_ids {
        let document = gateway
            .require::<Document>(Collection::Documentos, id)
            .expect("document stored")
            .data;
        assert_eq!(document.persona_id, report.titular_id);
    }

    let vehicle = gateway
        .require::<Vehicle>(Collection::Vehiculos, &report.vehiculo_id)
        .expect("vehicle stored")
        .data;
    assert_eq!(vehicle.modelo, "CB125F");
}

#[test]
fn absent_guarantor_skips_its_graph_but_keeps_the_application() {
    let store = Arc::new(MemoryDocumentStore::new());
    let report = pipeline(store.clone())
        .migrate(&intake_without_guarantor(), None)
        .expect("migration succeeds without guarantor");

    assert_eq!(store.count(Collection::Solicitudes), 1);
    assert_eq!(store.count(Collection::Personas), 2);
    assert_eq!(store.count(Collection::DatosPersonales), 1);
    assert_eq!(store.count(Collection::Documentos), 5);
    assert!(report.fiador_datos_personales_id.is_none());
    assert!(report.fiador_documentos_ids.is_empty());

    let gateway = PersistenceGateway::new(store);
    let fiador = gateway
        .require::<Person>(Collection::Personas, &report.fiador_id)
        .expect("guarantor person still created")
        .data;
    assert_eq!(fiador.rol, PersonRole::Fiador);
    assert!(fiador.datos_personales_id.is_none());
    assert!(fiador.documentos_ids.is_empty());
}

#[test]
fn rerunning_the_same_intake_creates_an_independent_graph() {
    let store = Arc::new(MemoryDocumentStore::new());
    let pipeline = pipeline(store.clone());

    let first = pipeline.migrate(&intake(), None).expect("first run");
    let second = pipeline.migrate(&intake(), None).expect("second run");

    assert_ne!(first.solicitud_id, second.solicitud_id);
    assert_ne!(first.titular_id, second.titular_id);
    assert_eq!(store.count(Collection::Solicitudes), 2);
    assert_eq!(store.count(Collection::Personas), 4);
    assert_eq!(store.count(Collection::Documentos), 14);
}

#[test]
fn missing_sections_abort_before_any_write() {
    let store = Arc::new(MemoryDocumentStore::new());
    let mut incomplete = intake();
    incomplete.vehiculo = None;

    let failure = pipeline(store.clone())
        .migrate(&incomplete, None)
        .expect_err("vehicle is required");

    assert_eq!(failure.step, MigrationStep::Validate);
    assert!(matches!(
        failure.error,
        MigrationError::MissingSection("vehiculo")
    ));
    assert!(failure.created.is_empty());
    assert!(failure.rollback.deleted.is_empty());
    assert_eq!(store.count(Collection::Solicitudes), 0);

    let mut no_applicant = intake();
    no_applicant.titular = Some(Default::default());
    let failure = pipeline(store)
        .migrate(&no_applicant, None)
        .expect_err("applicant is required");
    assert!(matches!(
        failure.error,
        MigrationError::MissingSection("titular")
    ));
}

#[test]
fn mid_sequence_failure_rolls_back_created_records() {
    let store = Arc::new(FlakyStore::failing_on(Collection::Vehiculos));
    let pipeline = MigrationPipeline::new(PersistenceGateway::new(store.clone()));

    let failure = pipeline
        .migrate(&intake(), None)
        .expect_err("vehicle create fails");

    assert_eq!(failure.step, MigrationStep::Vehicle);
    assert!(matches!(
        failure.error,
        MigrationError::Store(StoreError::Unavailable(_))
    ));
    assert_eq!(failure.created.len(), 16);
    assert_eq!(failure.rollback.deleted.len(), 16);
    assert!(failure.rollback.is_clean());
    assert_eq!(
        failure.rollback.deleted.last().map(|record| record.collection),
        Some(Collection::Solicitudes),
        "the application is deleted last"
    );
    assert_eq!(store.total_documents(), 0);
}

#[test]
fn rollback_failures_are_reported_without_masking_the_cause() {
    let mut flaky = FlakyStore::failing_on(Collection::Referencias);
    flaky.fail_deletes = true;
    let store = Arc::new(flaky);
    let pipeline = MigrationPipeline::new(PersistenceGateway::new(store.clone()));

    let failure = pipeline
        .migrate(&intake(), None)
        .expect_err("reference create fails");

    assert_eq!(failure.step, MigrationStep::References);
    assert!(matches!(
        failure.error,
        MigrationError::Store(StoreError::Unavailable(_))
    ));
    assert!(!failure.rollback.is_clean());
    assert_eq!(failure.rollback.failed.len(), failure.created.len());
    assert!(store.total_documents() > 0, "partial graph remains");
}
