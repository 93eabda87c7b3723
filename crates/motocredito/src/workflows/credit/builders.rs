//! Pure assemblers turning one intake slice into one normalized record.
//!
//! Nothing here touches the store; the pipeline decides when each record is
//! persisted and patches the cross-links afterwards.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

use super::domain::{
    Application, ApplicationStatus, Document, DocumentHistoryEntry, DocumentReviewStatus,
    FinancialTerms, IntakeFinancing, IntakePerson, IntakeReference, IntakeSubmission,
    IntakeVehicle, Person, PersonRole, PersonalData, RecordId, Reference, Vehicle,
};

pub const MAX_REFERENCES: usize = 3;

/// Human-readable application code: `SOL-YYYYMMDD-XXXXXX`.
pub fn application_code(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_ascii_uppercase();
    format!("SOL-{}-{}", now.format("%Y%m%d"), suffix)
}

pub fn build_application(
    intake: &IntakeSubmission,
    codigo: String,
    formulario_id: Option<RecordId>,
    now: DateTime<Utc>,
) -> Application {
    Application {
        codigo,
        estado: ApplicationStatus::Pendiente,
        prioridad: intake.prioridad.unwrap_or_default(),
        titular_id: None,
        fiador_id: None,
        vehiculo_id: None,
        datos_financieros_id: None,
        referencias_ids: Vec::new(),
        vendedor_id: None,
        tienda_id: None,
        formulario_id,
        creado_en: now,
        actualizado_en: now,
    }
}

pub fn build_person(rol: PersonRole, solicitud_id: &RecordId, now: DateTime<Utc>) -> Person {
    Person {
        rol,
        solicitud_id: solicitud_id.clone(),
        datos_personales_id: None,
        documentos_ids: Vec::new(),
        referencias_ids: Vec::new(),
        creado_en: now,
    }
}

pub fn build_personal_data(
    persona_id: &RecordId,
    person: &IntakePerson,
    today: NaiveDate,
) -> PersonalData {
    let nombres = person.nombres.trim().to_string();
    let apellido_paterno = person.apellido_paterno.trim().to_string();
    let apellido_materno = person.apellido_materno.trim().to_string();
    let nombre_completo = [
        nombres.as_str(),
        apellido_paterno.as_str(),
        apellido_materno.as_str(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

    PersonalData {
        persona_id: persona_id.clone(),
        nombres,
        apellido_paterno,
        apellido_materno,
        nombre_completo,
        tipo_documento: person.tipo_documento,
        numero_documento: person.numero_documento.trim().to_string(),
        fecha_nacimiento: person.fecha_nacimiento,
        edad: person.fecha_nacimiento.map(|birth| age_on(birth, today)),
        email: non_empty(&person.email),
        telefono: non_empty(&person.telefono),
        direccion: non_empty(&person.direccion),
        distrito: non_empty(&person.distrito),
        estado_civil: non_empty(&person.estado_civil),
        ocupacion: non_empty(&person.ocupacion),
        ingreso_mensual: person.ingreso_mensual,
    }
}

/// One document per non-empty file URL on the person section.
pub fn build_documents(
    persona_id: &RecordId,
    person: &IntakePerson,
    now: DateTime<Utc>,
) -> Vec<Document> {
    person
        .document_urls()
        .into_iter()
        .map(|(tipo, url)| Document {
            tipo,
            persona_id: persona_id.clone(),
            url: url.to_string(),
            estado_revision: DocumentReviewStatus::Pendiente,
            historial: vec![DocumentHistoryEntry {
                fecha: now,
                accion: "creado".to_string(),
                detalle: Some("migrado desde formulario".to_string()),
            }],
        })
        .collect()
}

pub fn build_references(
    solicitud_id: &RecordId,
    persona_id: &RecordId,
    references: &[IntakeReference],
) -> Vec<Reference> {
    references
        .iter()
        .filter(|reference| !reference.is_blank())
        .take(MAX_REFERENCES)
        .map(|reference| Reference {
            solicitud_id: solicitud_id.clone(),
            persona_id: persona_id.clone(),
            nombre: reference.nombre.trim().to_string(),
            telefono: reference.telefono.trim().to_string(),
            parentesco: non_empty(&reference.parentesco),
        })
        .collect()
}

pub fn build_financial_terms(solicitud_id: &RecordId, terms: &IntakeFinancing) -> FinancialTerms {
    let monto_financiado = round2(terms.precio - terms.cuota_inicial);
    let total_a_pagar = round2(terms.cuota_inicial + terms.monto_cuota * terms.numero_cuotas as f64);
    let porcentaje_inicial = if terms.precio > 0.0 {
        round2(terms.cuota_inicial / terms.precio * 100.0)
    } else {
        0.0
    };

    FinancialTerms {
        solicitud_id: solicitud_id.clone(),
        precio: terms.precio,
        cuota_inicial: terms.cuota_inicial,
        monto_cuota: terms.monto_cuota,
        numero_cuotas: terms.numero_cuotas,
        monto_financiado,
        total_a_pagar,
        porcentaje_inicial,
    }
}

pub fn build_vehicle(solicitud_id: &RecordId, vehicle: &IntakeVehicle) -> Vehicle {
    Vehicle {
        solicitud_id: solicitud_id.clone(),
        producto_id: non_empty(&vehicle.producto_id),
        marca: vehicle.marca.trim().to_string(),
        modelo: vehicle.modelo.trim().to_string(),
        anio: vehicle.anio,
        color: non_empty(&vehicle.color),
        precio: vehicle.precio,
    }
}

/// Whole years elapsed between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    if today < birth {
        return 0;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::credit::domain::DocumentKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn age_accounts_for_birthday_not_yet_reached() {
        assert_eq!(age_on(date(1990, 6, 15), date(2025, 6, 14)), 34);
        assert_eq!(age_on(date(1990, 6, 15), date(2025, 6, 15)), 35);
        assert_eq!(age_on(date(2030, 1, 1), date(2025, 1, 1)), 0);
    }

    #[test]
    fn documents_skip_blank_urls() {
        let person = IntakePerson {
            nombres: "Rosa".to_string(),
            numero_documento: "45678912".to_string(),
            dni_frontal_url: Some("https://files/dni-f.png".to_string()),
            dni_reverso_url: Some("   ".to_string()),
            selfie_url: Some("https://files/selfie.png".to_string()),
            ..IntakePerson::default()
        };
        let documents = build_documents(&RecordId::from("per-1"), &person, Utc::now());

        let kinds: Vec<_> = documents.iter().map(|doc| doc.tipo).collect();
        assert_eq!(kinds, vec![DocumentKind::DniFrontal, DocumentKind::Selfie]);
        assert!(documents
            .iter()
            .all(|doc| doc.estado_revision == DocumentReviewStatus::Pendiente
                && doc.historial.len() == 1));
    }

    #[test]
    fn references_are_capped_and_blank_entries_dropped() {
        let refs = vec![
            IntakeReference::default(),
            IntakeReference {
                nombre: "Ana".to_string(),
                telefono: "999111222".to_string(),
                parentesco: Some("hermana".to_string()),
            },
            IntakeReference {
                nombre: "Luis".to_string(),
                telefono: "999111223".to_string(),
                parentesco: None,
            },
            IntakeReference {
                nombre: "Marta".to_string(),
                telefono: "999111224".to_string(),
                parentesco: Some(" ".to_string()),
            },
            IntakeReference {
                nombre: "Pedro".to_string(),
                telefono: "999111225".to_string(),
                parentesco: None,
            },
        ];

        let built = build_references(&RecordId::from("sol-1"), &RecordId::from("per-1"), &refs);
        let names: Vec<_> = built.iter().map(|r| r.nombre.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Luis", "Marta"]);
        assert_eq!(built[2].parentesco, None);
    }

    #[test]
    fn financial_terms_derive_totals() {
        let terms = build_financial_terms(
            &RecordId::from("sol-1"),
            &IntakeFinancing {
                precio: 8_500.0,
                cuota_inicial: 1_700.0,
                monto_cuota: 412.5,
                numero_cuotas: 18,
            },
        );
        assert_eq!(terms.monto_financiado, 6_800.0);
        assert_eq!(terms.total_a_pagar, 9_125.0);
        assert_eq!(terms.porcentaje_inicial, 20.0);

        let free = build_financial_terms(&RecordId::from("sol-2"), &IntakeFinancing::default());
        assert_eq!(free.porcentaje_inicial, 0.0);
    }

    #[test]
    fn application_code_has_date_and_suffix() {
        let now = DateTime::parse_from_rfc3339("2025-03-04T10:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        let code = application_code(now);
        assert!(code.starts_with("SOL-20250304-"));
        assert_eq!(code.len(), "SOL-20250304-".len() + 6);
    }

    #[test]
    fn personal_data_joins_name_parts() {
        let person = IntakePerson {
            nombres: " Carlos ".to_string(),
            apellido_paterno: "Quispe".to_string(),
            apellido_materno: String::new(),
            numero_documento: "41234567".to_string(),
            fecha_nacimiento: Some(date(1995, 2, 1)),
            email: Some(String::new()),
            ..IntakePerson::default()
        };
        let data = build_personal_data(&RecordId::from("per-1"), &person, date(2025, 2, 1));
        assert_eq!(data.nombre_completo, "Carlos Quispe");
        assert_eq!(data.edad, Some(30));
        assert_eq!(data.email, None);
    }
}
