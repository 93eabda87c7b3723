use crate::infra::read_json_file;
use chrono::Utc;
use clap::Args;
use motocredito::config::AppConfig;
use motocredito::error::AppError;
use motocredito::workflows::credit::{
    BureauCheck, ClientEvaluation, CreditApplicationService, CreditServiceError,
    DocumentaryReview, EvaluationEngine, EvaluationOutcome, IncomeReview, IntakeSubmission,
    MemoryDocumentStore, RecordId,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct MigrateArgs {
    /// Intake JSON file as captured by the public web form
    #[arg(long)]
    pub(crate) intake: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file with the documentary, bureau, and income sub-evaluations
    #[arg(long)]
    pub(crate) evaluation: PathBuf,
}

/// Sub-evaluations accepted by the `score` command.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScoreRequest {
    #[serde(default)]
    pub(crate) documental: Option<DocumentaryReview>,
    #[serde(default)]
    pub(crate) centrales: Vec<BureauCheck>,
    #[serde(default)]
    pub(crate) ingresos: Option<IncomeReview>,
}

pub(crate) fn run_migrate(args: MigrateArgs) -> Result<(), AppError> {
    let intake: IntakeSubmission = read_json_file(&args.intake)?;
    let config = AppConfig::load()?;
    let service = CreditApplicationService::new(
        Arc::new(MemoryDocumentStore::new()),
        EvaluationEngine::new(config.evaluation),
    );

    match service.migrate(&intake) {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(CreditServiceError::Migration(failure)) => {
            println!("Migración fallida en el paso {:?}", failure.step);
            println!("  {}", failure.error.user_message());
            println!(
                "  Registros revertidos: {} | reversión fallida: {}",
                failure.rollback.deleted.len(),
                failure.rollback.failed.len()
            );
            Err(CreditServiceError::Migration(failure).into())
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let request: ScoreRequest = read_json_file(&args.evaluation)?;
    let config = AppConfig::load()?;
    let outcome = score_request(&EvaluationEngine::new(config.evaluation), request);

    println!("{}", outcome.summary());
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

pub(crate) fn score_request(engine: &EvaluationEngine, request: ScoreRequest) -> EvaluationOutcome {
    let mut evaluation = ClientEvaluation::new(RecordId::from("cli"), Utc::now());
    evaluation.documental = request.documental;
    evaluation.centrales = request.centrales;
    evaluation.ingresos = request.ingresos;
    engine.score(&evaluation)
}
