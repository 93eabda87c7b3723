use chrono::NaiveDate;
use clap::Args;
use motocredito::error::AppError;
use motocredito::workflows::credit::{
    ApplicationStatus, BureauCheck, BureauResult, CreditApplicationService, DocumentaryReview,
    EvaluationEngine, IncomeReview, IntakeFinancing, IntakePerson, IntakeReference,
    IntakeSubmission, IntakeVehicle, MemoryDocumentStore, Priority, Recommendation,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stop after the migration step
    #[arg(long)]
    pub(crate) skip_evaluation: bool,
    /// Record a bureau rejection to show the automatic-reject override
    #[arg(long)]
    pub(crate) bureau_rejection: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        skip_evaluation,
        bureau_rejection,
    } = args;

    println!("Demostración de la mesa de créditos Motocredito");
    let store = Arc::new(MemoryDocumentStore::new());
    let service = CreditApplicationService::new(store, EvaluationEngine::default());

    let intake_id = service.submit_intake(demo_intake())?;
    println!("- Formulario {} recibido desde la web pública", intake_id);

    let report = service.migrate_intake(&intake_id)?;
    println!(
        "- Solicitud {} ({}) creada con {} registros",
        report.codigo, report.solicitud_id, report.registros_creados
    );
    println!(
        "  Documentos del titular: {} | documentos del fiador: {} | referencias: {}",
        report.titular_documentos_ids.len(),
        report.fiador_documentos_ids.len(),
        report.referencias_ids.len()
    );

    if let Err(err) = service.migrate_intake(&intake_id) {
        println!("  Segunda migración rechazada: {}", err.user_message());
    }

    if skip_evaluation {
        return Ok(());
    }

    let id = report.solicitud_id;
    service.change_status(&id, ApplicationStatus::EnRevision)?;
    println!("\nEvaluación (estado en_revision)");

    service.update_documentary(
        &id,
        DocumentaryReview {
            puntaje: 88.0,
            documentos_adulterados: false,
            observaciones: Some("Recibo de luz a nombre de la madre".to_string()),
        },
    )?;
    let bureau_result = if bureau_rejection {
        BureauResult::Rechazo
    } else {
        BureauResult::Aprobado
    };
    service.update_bureau_checks(
        &id,
        vec![
            BureauCheck {
                central: "equifax".to_string(),
                resultado: BureauResult::Aprobado,
                detalle: None,
            },
            BureauCheck {
                central: "sentinel".to_string(),
                resultado: bureau_result,
                detalle: None,
            },
        ],
    )?;
    let evaluation = service.update_income(
        &id,
        IncomeReview {
            ingreso_declarado: 2_800.0,
            ingreso_verificado: 2_450.0,
        },
    )?;

    let Some(outcome) = evaluation.data.resultado else {
        println!("  No se registró puntaje");
        return Ok(());
    };
    for component in &outcome.componentes {
        println!(
            "  - {:?}: {:.2} x {:.2} = {:.2} ({})",
            component.factor, component.puntaje, component.peso, component.aporte, component.notas
        );
    }
    println!("  Resultado: {}", outcome.summary());

    let next = match outcome.recomendacion {
        Recommendation::Aprobar => ApplicationStatus::Aprobada,
        Recommendation::AprobarCondicionado => ApplicationStatus::Condicionada,
        Recommendation::Rechazar => ApplicationStatus::Rechazada,
    };
    let updated = service.change_status(&id, next)?;
    println!("- Solicitud {} -> {}", updated.data.codigo, updated.data.estado.label());

    Ok(())
}

fn demo_intake() -> IntakeSubmission {
    IntakeSubmission {
        vendedor_id: Some("VEN-001".to_string()),
        tienda_id: Some("TDA-LIMA-NORTE".to_string()),
        prioridad: Some(Priority::Alta),
        titular: Some(IntakePerson {
            nombres: "María Fernanda".to_string(),
            apellido_paterno: "Salazar".to_string(),
            apellido_materno: "Rojas".to_string(),
            numero_documento: "46781234".to_string(),
            fecha_nacimiento: NaiveDate::from_ymd_opt(1993, 2, 17),
            telefono: Some("987111222".to_string()),
            ocupacion: Some("Mototaxista".to_string()),
            ingreso_mensual: Some(2_800.0),
            dni_frontal_url: Some("https://storage.local/motocredito/demo/dni-f.jpg".to_string()),
            dni_reverso_url: Some("https://storage.local/motocredito/demo/dni-r.jpg".to_string()),
            recibo_servicio_url: Some(
                "https://storage.local/motocredito/demo/recibo.jpg".to_string(),
            ),
            selfie_url: Some("https://storage.local/motocredito/demo/selfie.jpg".to_string()),
            ..IntakePerson::default()
        }),
        fiador: Some(IntakePerson {
            nombres: "Jorge Luis".to_string(),
            apellido_paterno: "Salazar".to_string(),
            numero_documento: "09876543".to_string(),
            dni_frontal_url: Some(
                "https://storage.local/motocredito/demo/fiador-dni-f.jpg".to_string(),
            ),
            ..IntakePerson::default()
        }),
        referencias: vec![
            IntakeReference {
                nombre: "Rosa Rojas".to_string(),
                telefono: "955222333".to_string(),
                parentesco: Some("madre".to_string()),
            },
            IntakeReference {
                nombre: "Pedro Gómez".to_string(),
                telefono: "955444555".to_string(),
                parentesco: Some("vecino".to_string()),
            },
        ],
        vehiculo: Some(IntakeVehicle {
            producto_id: Some("PRD-110".to_string()),
            marca: "Yamaha".to_string(),
            modelo: "XTZ 125".to_string(),
            anio: Some(2025),
            color: Some("azul".to_string()),
            precio: 11_490.0,
        }),
        financiamiento: Some(IntakeFinancing {
            precio: 11_490.0,
            cuota_inicial: 2_490.0,
            monto_cuota: 520.0,
            numero_cuotas: 24,
        }),
    }
}
