use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque document identifier generated by the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Document database collections, named the way the back office stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Solicitudes,
    Personas,
    DatosPersonales,
    Documentos,
    Referencias,
    DatosFinancieros,
    Vehiculos,
    Evaluaciones,
    Formularios,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Collection::Solicitudes => "solicitudes",
            Collection::Personas => "personas",
            Collection::DatosPersonales => "datos_personales",
            Collection::Documentos => "documentos",
            Collection::Referencias => "referencias",
            Collection::DatosFinancieros => "datos_financieros",
            Collection::Vehiculos => "vehiculos",
            Collection::Evaluaciones => "evaluaciones",
            Collection::Formularios => "formularios",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record together with the identifier it is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: RecordId,
    #[serde(flatten)]
    pub data: T,
}

// ---------------------------------------------------------------------------
// Intake: the loosely structured record captured by the public web form.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeSubmission {
    #[serde(default)]
    pub vendedor_id: Option<String>,
    #[serde(default)]
    pub tienda_id: Option<String>,
    #[serde(default)]
    pub prioridad: Option<Priority>,
    #[serde(default)]
    pub titular: Option<IntakePerson>,
    #[serde(default)]
    pub fiador: Option<IntakePerson>,
    #[serde(default)]
    pub referencias: Vec<IntakeReference>,
    #[serde(default)]
    pub vehiculo: Option<IntakeVehicle>,
    #[serde(default)]
    pub financiamiento: Option<IntakeFinancing>,
}

/// Applicant or guarantor section of an intake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakePerson {
    pub nombres: String,
    pub apellido_paterno: String,
    pub apellido_materno: String,
    pub tipo_documento: IdentityDocumentType,
    pub numero_documento: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub distrito: Option<String>,
    pub estado_civil: Option<String>,
    pub ocupacion: Option<String>,
    pub ingreso_mensual: Option<f64>,
    pub dni_frontal_url: Option<String>,
    pub dni_reverso_url: Option<String>,
    pub licencia_frontal_url: Option<String>,
    pub licencia_reverso_url: Option<String>,
    pub recibo_servicio_url: Option<String>,
    pub selfie_url: Option<String>,
    pub foto_casa_url: Option<String>,
}

impl IntakePerson {
    /// Presence check used to decide whether a person graph is created.
    pub fn is_present(&self) -> bool {
        !self.nombres.trim().is_empty() && !self.numero_documento.trim().is_empty()
    }

    /// Non-empty file URLs paired with the document type they represent.
    pub fn document_urls(&self) -> Vec<(DocumentKind, &str)> {
        [
            (DocumentKind::DniFrontal, &self.dni_frontal_url),
            (DocumentKind::DniReverso, &self.dni_reverso_url),
            (DocumentKind::LicenciaFrontal, &self.licencia_frontal_url),
            (DocumentKind::LicenciaReverso, &self.licencia_reverso_url),
            (DocumentKind::ReciboServicio, &self.recibo_servicio_url),
            (DocumentKind::Selfie, &self.selfie_url),
            (DocumentKind::FotoCasa, &self.foto_casa_url),
        ]
        .into_iter()
        .filter_map(|(kind, url)| {
            url.as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(|url| (kind, url))
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeReference {
    pub nombre: String,
    pub telefono: String,
    pub parentesco: Option<String>,
}

impl IntakeReference {
    pub fn is_blank(&self) -> bool {
        self.nombre.trim().is_empty() && self.telefono.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeVehicle {
    pub producto_id: Option<String>,
    pub marca: String,
    pub modelo: String,
    pub anio: Option<u16>,
    pub color: Option<String>,
    pub precio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeFinancing {
    pub precio: f64,
    pub cuota_inicial: f64,
    pub monto_cuota: f64,
    pub numero_cuotas: u32,
}

// ---------------------------------------------------------------------------
// Normalized records.
// ---------------------------------------------------------------------------

/// The credit application aggregate ("solicitud").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub codigo: String,
    pub estado: ApplicationStatus,
    pub prioridad: Priority,
    pub titular_id: Option<RecordId>,
    pub fiador_id: Option<RecordId>,
    pub vehiculo_id: Option<RecordId>,
    pub datos_financieros_id: Option<RecordId>,
    #[serde(default)]
    pub referencias_ids: Vec<RecordId>,
    pub vendedor_id: Option<String>,
    pub tienda_id: Option<String>,
    pub formulario_id: Option<RecordId>,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Baja,
    #[default]
    Media,
    Alta,
    Urgente,
}

/// Lifecycle of an application; see `status.rs` for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pendiente,
    EnRevision,
    Observada,
    Condicionada,
    Aprobada,
    Rechazada,
    Cancelada,
    Entregada,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pendiente => "pendiente",
            ApplicationStatus::EnRevision => "en_revision",
            ApplicationStatus::Observada => "observada",
            ApplicationStatus::Condicionada => "condicionada",
            ApplicationStatus::Aprobada => "aprobada",
            ApplicationStatus::Rechazada => "rechazada",
            ApplicationStatus::Cancelada => "cancelada",
            ApplicationStatus::Entregada => "entregada",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Titular,
    Fiador,
}

/// Applicant or guarantor role record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub rol: PersonRole,
    pub solicitud_id: RecordId,
    pub datos_personales_id: Option<RecordId>,
    #[serde(default)]
    pub documentos_ids: Vec<RecordId>,
    #[serde(default)]
    pub referencias_ids: Vec<RecordId>,
    pub creado_en: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityDocumentType {
    #[default]
    Dni,
    Ce,
    Pasaporte,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalData {
    pub persona_id: RecordId,
    pub nombres: String,
    pub apellido_paterno: String,
    pub apellido_materno: String,
    pub nombre_completo: String,
    pub tipo_documento: IdentityDocumentType,
    pub numero_documento: String,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub edad: Option<u32>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub distrito: Option<String>,
    pub estado_civil: Option<String>,
    pub ocupacion: Option<String>,
    pub ingreso_mensual: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    DniFrontal,
    DniReverso,
    LicenciaFrontal,
    LicenciaReverso,
    ReciboServicio,
    Selfie,
    FotoCasa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentReviewStatus {
    Pendiente,
    Aprobado,
    Observado,
    Rechazado,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHistoryEntry {
    pub fecha: DateTime<Utc>,
    pub accion: String,
    pub detalle: Option<String>,
}

/// One uploaded file plus its review metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub tipo: DocumentKind,
    pub persona_id: RecordId,
    pub url: String,
    pub estado_revision: DocumentReviewStatus,
    #[serde(default)]
    pub historial: Vec<DocumentHistoryEntry>,
}

/// Character reference named by the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub solicitud_id: RecordId,
    pub persona_id: RecordId,
    pub nombre: String,
    pub telefono: String,
    pub parentesco: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialTerms {
    pub solicitud_id: RecordId,
    pub precio: f64,
    pub cuota_inicial: f64,
    pub monto_cuota: f64,
    pub numero_cuotas: u32,
    pub monto_financiado: f64,
    pub total_a_pagar: f64,
    pub porcentaje_inicial: f64,
}

/// Make/model/price snapshot tied to the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub solicitud_id: RecordId,
    pub producto_id: Option<String>,
    pub marca: String,
    pub modelo: String,
    pub anio: Option<u16>,
    pub color: Option<String>,
    pub precio: f64,
}
