use std::sync::Arc;
use std::thread;
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::credit::domain::{
    Collection, IntakeFinancing, IntakePerson, IntakeReference, IntakeSubmission, IntakeVehicle,
    Priority, RecordId,
};
use crate::workflows::credit::gateway::{DocumentFields, DocumentStore, StoreError};
use crate::workflows::credit::{
    CreditApplicationService, EvaluationConfig, EvaluationEngine, MemoryDocumentStore,
    MigrationPipeline, PersistenceGateway,
};

pub(super) fn applicant() -> IntakePerson {
    IntakePerson {
        nombres: "Rosa Elena".to_string(),
        apellido_paterno: "Huamán".to_string(),
        apellido_materno: "Torres".to_string(),
        numero_documento: "45678912".to_string(),
        fecha_nacimiento: Some(NaiveDate::from_ymd_opt(1991, 4, 12).expect("valid date")),
        email: Some("rosa.huaman@correo.pe".to_string()),
        telefono: Some("987654321".to_string()),
        direccion: Some("Av. Grau 123".to_string()),
        distrito: Some("Chiclayo".to_string()),
        ocupacion: Some("Comerciante".to_string()),
        ingreso_mensual: Some(2_800.0),
        dni_frontal_url: Some("https://storage.local/motocredito/dni-f.jpg".to_string()),
        dni_reverso_url: Some("https://storage.local/motocredito/dni-r.jpg".to_string()),
        licencia_frontal_url: Some("https://storage.local/motocredito/lic-f.jpg".to_string()),
        licencia_reverso_url: None,
        recibo_servicio_url: Some("https://storage.local/motocredito/recibo.jpg".to_string()),
        selfie_url: Some("https://storage.local/motocredito/selfie.jpg".to_string()),
        foto_casa_url: Some(String::new()),
        ..IntakePerson::default()
    }
}

pub(super) fn guarantor() -> IntakePerson {
    IntakePerson {
        nombres: "Jorge".to_string(),
        apellido_paterno: "Huamán".to_string(),
        apellido_materno: "Díaz".to_string(),
        numero_documento: "40112233".to_string(),
        telefono: Some("976543210".to_string()),
        dni_frontal_url: Some("https://storage.local/motocredito/fiador-dni-f.jpg".to_string()),
        dni_reverso_url: Some("https://storage.local/motocredito/fiador-dni-r.jpg".to_string()),
        ..IntakePerson::default()
    }
}

pub(super) fn intake() -> IntakeSubmission {
    IntakeSubmission {
        vendedor_id: Some("VEN-014".to_string()),
        tienda_id: Some("TDA-CHICLAYO".to_string()),
        prioridad: Some(Priority::Alta),
        titular: Some(applicant()),
        fiador: Some(guarantor()),
        referencias: vec![
            IntakeReference {
                nombre: "Ana Torres".to_string(),
                telefono: "955111222".to_string(),
                parentesco: Some("hermana".to_string()),
            },
            IntakeReference {
                nombre: "Luis Pérez".to_string(),
                telefono: "955111333".to_string(),
                parentesco: Some("amigo".to_string()),
            },
            IntakeReference {
                nombre: "Marta Ruiz".to_string(),
                telefono: "955111444".to_string(),
                parentesco: None,
            },
        ],
        vehiculo: Some(IntakeVehicle {
            producto_id: Some("PRD-125".to_string()),
            marca: "Honda".to_string(),
            modelo: "CB125F".to_string(),
            anio: Some(2025),
            color: Some("rojo".to_string()),
            precio: 8_500.0,
        }),
        financiamiento: Some(IntakeFinancing {
            precio: 8_500.0,
            cuota_inicial: 1_700.0,
            monto_cuota: 412.5,
            numero_cuotas: 18,
        }),
    }
}

pub(super) fn intake_without_guarantor() -> IntakeSubmission {
    let mut intake = intake();
    intake.fiador = Some(IntakePerson {
        nombres: String::new(),
        numero_documento: "   ".to_string(),
        dni_frontal_url: Some("https://storage.local/motocredito/orphan.jpg".to_string()),
        ..IntakePerson::default()
    });
    intake
}

pub(super) fn pipeline(store: Arc<MemoryDocumentStore>) -> MigrationPipeline<MemoryDocumentStore> {
    MigrationPipeline::new(PersistenceGateway::new(store))
}

pub(super) fn build_service() -> (
    CreditApplicationService<MemoryDocumentStore>,
    Arc<MemoryDocumentStore>,
) {
    let store = Arc::new(MemoryDocumentStore::new());
    let service = CreditApplicationService::new(
        store.clone(),
        EvaluationEngine::new(EvaluationConfig::default()),
    );
    (service, store)
}

/// Memory store with scripted faults: every create against `fail_create_in`,
/// every update against `fail_update_in`, and optionally every delete fail.
/// Reads of `slow_in` sleep for `read_delay` so concurrent callers interleave.
#[derive(Default)]
pub(super) struct FlakyStore {
    pub(super) inner: MemoryDocumentStore,
    pub(super) fail_create_in: Option<Collection>,
    pub(super) fail_update_in: Option<Collection>,
    pub(super) fail_deletes: bool,
    pub(super) slow_in: Option<Collection>,
    pub(super) read_delay: Duration,
}

impl FlakyStore {
    pub(super) fn failing_on(collection: Collection) -> Self {
        Self {
            fail_create_in: Some(collection),
            ..Self::default()
        }
    }

    pub(super) fn failing_updates_on(collection: Collection) -> Self {
        Self {
            fail_update_in: Some(collection),
            ..Self::default()
        }
    }

    pub(super) fn slow_reads_on(collection: Collection, delay: Duration) -> Self {
        Self {
            slow_in: Some(collection),
            read_delay: delay,
            ..Self::default()
        }
    }

    pub(super) fn total_documents(&self) -> usize {
        [
            Collection::Solicitudes,
            Collection::Personas,
            Collection::DatosPersonales,
            Collection::Documentos,
            Collection::Referencias,
            Collection::DatosFinancieros,
            Collection::Vehiculos,
        ]
        .into_iter()
        .map(|collection| self.inner.count(collection))
        .sum()
    }

    fn pause_on(&self, collection: Collection) {
        if self.slow_in == Some(collection) {
            thread::sleep(self.read_delay);
        }
    }
}

impl DocumentStore for FlakyStore {
    fn create(
        &self,
        collection: Collection,
        fields: DocumentFields,
    ) -> Result<RecordId, StoreError> {
        if self.fail_create_in == Some(collection) {
            return Err(StoreError::Unavailable("network timeout".to_string()));
        }
        self.inner.create(collection, fields)
    }

    fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        if self.fail_update_in == Some(collection) {
            return Err(StoreError::PermissionDenied(collection));
        }
        self.inner.update(collection, id, field, value)
    }

    fn get(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<DocumentFields>, StoreError> {
        self.pause_on(collection);
        self.inner.get(collection, id)
    }

    fn list(&self, collection: Collection) -> Result<Vec<(RecordId, DocumentFields)>, StoreError> {
        self.pause_on(collection);
        self.inner.list(collection)
    }

    fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), StoreError> {
        if self.fail_deletes {
            return Err(StoreError::PermissionDenied(collection));
        }
        self.inner.delete(collection, id)
    }
}

/// Store whose every call fails, standing in for an unreachable database.
pub(super) struct OfflineStore;

impl DocumentStore for OfflineStore {
    fn create(&self, _: Collection, _: DocumentFields) -> Result<RecordId, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _: Collection, _: &RecordId, _: &str, _: Value) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn get(&self, _: Collection, _: &RecordId) -> Result<Option<DocumentFields>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _: Collection) -> Result<Vec<(RecordId, DocumentFields)>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _: Collection, _: &RecordId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
