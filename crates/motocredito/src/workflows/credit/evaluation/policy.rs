use serde::{Deserialize, Serialize};

use super::config::EvaluationConfig;
use super::rules::ScoreSignals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Bajo,
    Medio,
    Alto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Aprobar,
    AprobarCondicionado,
    Rechazar,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::Aprobar => "aprobar",
            Recommendation::AprobarCondicionado => "aprobar_condicionado",
            Recommendation::Rechazar => "rechazar",
        }
    }
}

pub(crate) struct Decision {
    pub risk: RiskLevel,
    pub recommendation: Recommendation,
    pub override_reasons: Vec<String>,
}

/// Automatic-reject signals win over any score; otherwise fixed thresholds.
pub(crate) fn decide(total: f64, config: &EvaluationConfig, signals: &ScoreSignals) -> Decision {
    let mut override_reasons: Vec<String> = signals
        .bureau_rejections
        .iter()
        .map(|central| format!("rechazo en central {central}"))
        .collect();
    if signals.tampered_documents {
        override_reasons.push("documentos adulterados".to_string());
    }

    if !override_reasons.is_empty() {
        return Decision {
            risk: RiskLevel::Alto,
            recommendation: Recommendation::Rechazar,
            override_reasons,
        };
    }

    let (risk, recommendation) = if total >= config.approve_threshold {
        (RiskLevel::Bajo, Recommendation::Aprobar)
    } else if total >= config.conditional_threshold {
        (RiskLevel::Medio, Recommendation::AprobarCondicionado)
    } else {
        (RiskLevel::Alto, Recommendation::Rechazar)
    };

    Decision {
        risk,
        recommendation,
        override_reasons,
    }
}
