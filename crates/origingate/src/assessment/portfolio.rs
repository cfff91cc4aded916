//! Batch evaluation of a labelled dossier portfolio.
//!
//! A portfolio directory holds `labels.json` (`[{"file", "class"}]`) next to the
//! dossier JSON files it names. Every dossier is verified, scored and decided
//! under one policy, and the foreign-dominant predictions are compared with the
//! labels.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::dossier::Dossier;
use super::policy::{
    decide, DecisionContext, DecisionError, PolicyError, PolicySource, UsageField, Verdict,
};
use super::scoring::{round_to, ScoringEngine};
use super::verify::verify_dossier;

const LABELS_FILE: &str = "labels.json";
const DEFAULT_PORTFOLIO_USAGE_USD: f64 = 1_000_000.0;

/// Ground-truth class assigned to a portfolio entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DossierClass {
    Domestic,
    Foreign,
    /// Domestic build and signing key over a foreign-heavy dependency set.
    Laundered,
}

impl DossierClass {
    pub fn is_foreign_dominant(&self) -> bool {
        matches!(self, DossierClass::Foreign | DossierClass::Laundered)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioLabel {
    pub file: String,
    pub class: DossierClass,
}

/// Per-dossier outcome; `verdict` is empty for dossiers that failed verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRow {
    pub file: String,
    pub class: DossierClass,
    pub verdict: Option<Verdict>,
    pub ocs: Option<f64>,
    pub foi: Option<f64>,
    pub fee_usd: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tn: usize,
    pub precision: f64,
    pub recall: f64,
}

impl ConfusionMatrix {
    pub fn from_pairs(pairs: &[(bool, bool)]) -> Self {
        let mut matrix = Self::default();
        for &(predicted, truth) in pairs {
            match (predicted, truth) {
                (true, true) => matrix.tp += 1,
                (true, false) => matrix.fp += 1,
                (false, true) => matrix.fn_ += 1,
                (false, false) => matrix.tn += 1,
            }
        }
        matrix.precision = ratio(matrix.tp, matrix.tp + matrix.fp);
        matrix.recall = ratio(matrix.tp, matrix.tp + matrix.fn_);
        matrix
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round_to(numerator as f64 / denominator as f64, 3)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub policy: String,
    pub verdicts: BTreeMap<Verdict, usize>,
    pub invalid: usize,
    pub detection: ConfusionMatrix,
    pub rows: Vec<PortfolioRow>,
}

#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid portfolio labels in {}: {source}", .path.display())]
    Labels {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write portfolio csv: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

/// Runs a whole portfolio through verification, scoring and one policy.
pub struct PortfolioEvaluator<'a, P> {
    policies: &'a P,
    engine: ScoringEngine,
    target: String,
    context: DecisionContext,
}

impl<'a, P: PolicySource> PortfolioEvaluator<'a, P> {
    pub fn new(policies: &'a P) -> Self {
        Self {
            policies,
            engine: ScoringEngine::default(),
            target: "US".to_string(),
            context: DecisionContext::new()
                .with_usage(&UsageField::AnnualUsageUsd, DEFAULT_PORTFOLIO_USAGE_USD),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_context(mut self, context: DecisionContext) -> Self {
        self.context = context;
        self
    }

    pub fn evaluate(
        &self,
        dir: impl AsRef<Path>,
        policy_name: &str,
    ) -> Result<PortfolioSummary, PortfolioError> {
        let dir = dir.as_ref();
        let policy = self.policies.load(policy_name)?;
        let tau = policy.thresholds.tau_min_ocs;
        let gamma = policy.thresholds.gamma_max_foi;

        let mut verdicts = BTreeMap::new();
        let mut invalid = 0;
        let mut pairs = Vec::new();
        let mut rows = Vec::new();

        for label in read_labels(dir)? {
            let mut row = PortfolioRow {
                file: label.file.clone(),
                class: label.class,
                verdict: None,
                ocs: None,
                foi: None,
                fee_usd: None,
            };

            let Some(dossier) = read_dossier(&dir.join(&label.file))? else {
                invalid += 1;
                rows.push(row);
                continue;
            };
            if !verify_dossier(&dossier).ok {
                invalid += 1;
                rows.push(row);
                continue;
            }

            let score = self.engine.score(&dossier, &self.target);
            let decision = decide(score.ocs, score.foi, &policy, &self.context)?;
            let predicted = matches!(decision.verdict, Verdict::AllowWithFee | Verdict::Deny)
                && score.ocs < tau
                && score.foi > gamma;

            pairs.push((predicted, label.class.is_foreign_dominant()));
            *verdicts.entry(decision.verdict).or_insert(0) += 1;

            row.verdict = Some(decision.verdict);
            row.ocs = Some(score.ocs);
            row.foi = Some(score.foi);
            row.fee_usd = Some(decision.fee_usd);
            rows.push(row);
        }

        let detection = ConfusionMatrix::from_pairs(&pairs);
        info!(
            policy = policy_name,
            evaluated = pairs.len(),
            invalid,
            precision = detection.precision,
            recall = detection.recall,
            "portfolio evaluated"
        );

        Ok(PortfolioSummary {
            policy: policy_name.to_string(),
            verdicts,
            invalid,
            detection,
            rows,
        })
    }
}

fn read_labels(dir: &Path) -> Result<Vec<PortfolioLabel>, PortfolioError> {
    let path = dir.join(LABELS_FILE);
    let raw = fs::read(&path).map_err(|source| PortfolioError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| PortfolioError::Labels { path, source })
}

/// `Ok(None)` when the file exists but does not parse as a dossier.
fn read_dossier(path: &Path) -> Result<Option<Dossier>, PortfolioError> {
    let raw = fs::read(path).map_err(|source| PortfolioError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match serde_json::from_slice::<Dossier>(&raw) {
        Ok(dossier) => Ok(Some(dossier)),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping malformed dossier");
            Ok(None)
        }
    }
}

/// Write one CSV record per portfolio row.
pub fn write_csv<W: io::Write>(rows: &[PortfolioRow], writer: W) -> Result<(), PortfolioError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(|source| PortfolioError::Io {
        path: PathBuf::from("<csv>"),
        source,
    })?;
    Ok(())
}
