//! Client evaluation scoring: documentary review, credit bureau checks, and
//! income consistency folded into one weighted score and recommendation.

mod config;
mod policy;
mod rules;
mod service;

pub use config::EvaluationConfig;
pub use policy::{Recommendation, RiskLevel};
pub use service::{EvaluationError, EvaluationService};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::RecordId;
use policy::decide;

/// Stateless evaluator that applies the rubric configuration.
#[derive(Debug, Clone, Default)]
pub struct EvaluationEngine {
    config: EvaluationConfig,
}

impl EvaluationEngine {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn score(&self, evaluation: &ClientEvaluation) -> EvaluationOutcome {
        let (componentes, puntaje_total, signals) =
            rules::score_evaluation(evaluation, &self.config);
        let decision = decide(puntaje_total, &self.config, &signals);

        EvaluationOutcome {
            puntaje_total,
            nivel_riesgo: decision.risk,
            recomendacion: decision.recommendation,
            motivos_rechazo: decision.override_reasons,
            componentes,
        }
    }
}

/// Evaluation record kept per application in `evaluaciones`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEvaluation {
    pub solicitud_id: RecordId,
    #[serde(default)]
    pub documental: Option<DocumentaryReview>,
    #[serde(default)]
    pub centrales: Vec<BureauCheck>,
    #[serde(default)]
    pub ingresos: Option<IncomeReview>,
    #[serde(default)]
    pub resultado: Option<EvaluationOutcome>,
    pub actualizado_en: DateTime<Utc>,
}

impl ClientEvaluation {
    pub fn new(solicitud_id: RecordId, now: DateTime<Utc>) -> Self {
        Self {
            solicitud_id,
            documental: None,
            centrales: Vec::new(),
            ingresos: None,
            resultado: None,
            actualizado_en: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentaryReview {
    pub puntaje: f64,
    #[serde(default)]
    pub documentos_adulterados: bool,
    #[serde(default)]
    pub observaciones: Option<String>,
}

/// Result of one external credit bureau lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BureauCheck {
    pub central: String,
    pub resultado: BureauResult,
    #[serde(default)]
    pub detalle: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BureauResult {
    Aprobado,
    Observado,
    Rechazo,
}

impl BureauResult {
    pub const fn points(self) -> f64 {
        match self {
            BureauResult::Aprobado => 100.0,
            BureauResult::Observado => 50.0,
            BureauResult::Rechazo => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeReview {
    pub ingreso_declarado: f64,
    pub ingreso_verificado: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Documental,
    Centrales,
    Ingresos,
}

/// Weighted contribution of one sub-evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub puntaje: f64,
    pub peso: f64,
    pub aporte: f64,
    pub notas: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub puntaje_total: f64,
    pub nivel_riesgo: RiskLevel,
    pub recomendacion: Recommendation,
    #[serde(default)]
    pub motivos_rechazo: Vec<String>,
    pub componentes: Vec<ScoreComponent>,
}

impl EvaluationOutcome {
    pub fn summary(&self) -> String {
        if self.motivos_rechazo.is_empty() {
            format!(
                "{} (puntaje {:.2}, riesgo {:?})",
                self.recomendacion.label(),
                self.puntaje_total,
                self.nivel_riesgo
            )
        } else {
            format!(
                "{}: {}",
                self.recomendacion.label(),
                self.motivos_rechazo.join("; ")
            )
        }
    }
}
