use super::super::builders::round2;
use super::config::EvaluationConfig;
use super::{BureauResult, ClientEvaluation, ScoreComponent, ScoreFactor};

pub(crate) struct ScoreSignals {
    pub bureau_rejections: Vec<String>,
    pub tampered_documents: bool,
}

pub(crate) fn score_evaluation(
    evaluation: &ClientEvaluation,
    config: &EvaluationConfig,
) -> (Vec<ScoreComponent>, f64, ScoreSignals) {
    let mut components = Vec::with_capacity(3);

    let (documentary, notes) = match &evaluation.documental {
        Some(review) => {
            let score = review.puntaje.clamp(0.0, 100.0);
            let notes = if review.documentos_adulterados {
                format!("documentary review {score:.0}/100, tampering reported")
            } else {
                format!("documentary review {score:.0}/100")
            };
            (score, notes)
        }
        None => (0.0, "documentary review pending".to_string()),
    };
    components.push(component(
        ScoreFactor::Documental,
        documentary,
        config.documentary_weight,
        notes,
    ));

    let bureau = if evaluation.centrales.is_empty() {
        0.0
    } else {
        let points: f64 = evaluation
            .centrales
            .iter()
            .map(|check| check.resultado.points())
            .sum();
        points / evaluation.centrales.len() as f64
    };
    let bureau_notes = if evaluation.centrales.is_empty() {
        "no bureau checks recorded".to_string()
    } else {
        format!(
            "{} bureau check(s), mean {:.1}",
            evaluation.centrales.len(),
            bureau
        )
    };
    components.push(component(
        ScoreFactor::Centrales,
        bureau,
        config.bureau_weight,
        bureau_notes,
    ));

    let (income, income_notes) = match &evaluation.ingresos {
        Some(review) if review.ingreso_declarado > 0.0 => {
            let ratio = (review.ingreso_verificado.max(0.0) / review.ingreso_declarado).min(1.0);
            (
                ratio * 100.0,
                format!(
                    "verified {:.2} of declared {:.2}",
                    review.ingreso_verificado, review.ingreso_declarado
                ),
            )
        }
        Some(_) => (0.0, "declared income missing".to_string()),
        None => (0.0, "income review pending".to_string()),
    };
    components.push(component(
        ScoreFactor::Ingresos,
        income,
        config.income_weight,
        income_notes,
    ));

    let total = round2(components.iter().map(|component| component.aporte).sum());

    let signals = ScoreSignals {
        bureau_rejections: evaluation
            .centrales
            .iter()
            .filter(|check| check.resultado == BureauResult::Rechazo)
            .map(|check| check.central.clone())
            .collect(),
        tampered_documents: evaluation
            .documental
            .as_ref()
            .map_or(false, |review| review.documentos_adulterados),
    };

    (components, total, signals)
}

fn component(factor: ScoreFactor, puntaje: f64, peso: f64, notas: String) -> ScoreComponent {
    ScoreComponent {
        factor,
        puntaje: round2(puntaje),
        peso,
        aporte: puntaje * peso,
        notas,
    }
}
