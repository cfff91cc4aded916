mod foi;
mod signals;

pub use foi::{
    compute_foi, sbom_signal_value, FoiContribution, ForeignOriginIndex, DOMESTIC_RISK_CAP,
    TOP_CONTRIBUTORS,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dossier::Dossier;

/// Relative weight of each origin signal. Canonical weights sum to 1.0; any
/// other weighting is accepted but OCS then leaves the [0, 1] range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub w_build: f64,
    pub w_sbom: f64,
    pub w_signing: f64,
    pub w_hosting: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            w_build: 0.35,
            w_sbom: 0.30,
            w_signing: 0.20,
            w_hosting: 0.15,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.w_build + self.w_sbom + self.w_signing + self.w_hosting
    }
}

/// Raw signal values exposed for audit, keyed by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OriginSignals {
    #[serde(rename = "O_b")]
    pub build: f64,
    #[serde(rename = "O_c")]
    pub sbom: f64,
    #[serde(rename = "O_s")]
    pub signing: f64,
    #[serde(rename = "O_h")]
    pub hosting: f64,
}

/// Scoring output: OCS and FOI rounded to four places plus the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginScore {
    pub ocs: f64,
    pub foi: f64,
    pub signals: OriginSignals,
    pub explanations: Vec<String>,
}

/// Stateless engine applying a fixed weighting to dossiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine {
    weights: ScoreWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, dossier: &Dossier, target: &str) -> OriginScore {
        score_origin(dossier, &self.weights, target)
    }
}

pub fn score_origin(dossier: &Dossier, weights: &ScoreWeights, target: &str) -> OriginScore {
    let build = signals::build_signal(dossier, target);
    let signing = signals::signing_signal(dossier, target);
    let hosting = signals::hosting_signal(dossier, target);
    let index = compute_foi(dossier, target);
    let sbom = foi::sbom_signal(index.value);

    let ocs = weights.w_build * build.value
        + weights.w_sbom * sbom.value
        + weights.w_signing * signing.value
        + weights.w_hosting * hosting.value;

    let mut explanations = Vec::with_capacity(4 + TOP_CONTRIBUTORS);
    explanations.push(build.explanation);
    explanations.push(signing.explanation);
    explanations.push(hosting.explanation);
    explanations.push(sbom.explanation);
    explanations.extend(index.explanations());

    let score = OriginScore {
        ocs: round_to(ocs, 4),
        foi: round_to(index.value, 4),
        signals: OriginSignals {
            build: build.value,
            sbom: sbom.value,
            signing: signing.value,
            hosting: hosting.value,
        },
        explanations,
    };

    debug!(
        product = %dossier.product.name,
        version = %dossier.product.version,
        target,
        ocs = score.ocs,
        foi = score.foi,
        "scored dossier"
    );

    score
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
