use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::baseline::{
    measure_drift, Baseline, BaselineId, BaselineStore, DriftEvaluation, StoreError,
    DEFAULT_DRIFT_THRESHOLD,
};
use super::dossier::Dossier;
use super::policy::{decide, Decision, DecisionContext, DecisionError, PolicyError, PolicySource};
use super::scoring::{score_origin, OriginScore, ScoreWeights, ScoringEngine};
use super::verify::{verify_dossier, verify_raw, VerificationReport};

const DEFAULT_TARGET: &str = "US";

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub dossier: Dossier,
    #[serde(default)]
    pub weights: Option<ScoreWeights>,
    #[serde(default)]
    pub target_jurisdiction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecideRequest {
    pub ocs: f64,
    pub foi: f64,
    pub policy_name: String,
    #[serde(default)]
    pub context: DecisionContext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssessRequest {
    pub dossier: Dossier,
    pub policy_name: String,
    #[serde(default)]
    pub context: DecisionContext,
    #[serde(default)]
    pub target_jurisdiction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaselineCreateRequest {
    pub baseline_id: BaselineId,
    pub dossier: Dossier,
    pub policy_name: String,
    #[serde(default)]
    pub target_jurisdiction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEvaluateRequest {
    pub baseline_id: BaselineId,
    pub dossier: Dossier,
    pub policy_name: String,
    #[serde(default)]
    pub context: DecisionContext,
    #[serde(default)]
    pub drift_threshold: Option<f64>,
    #[serde(default)]
    pub target_jurisdiction: Option<String>,
}

/// Decision for a dossier together with the scores behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(flatten)]
    pub decision: Decision,
    pub ocs: f64,
    pub foi: f64,
    pub explanations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineCreated {
    pub baseline_id: BaselineId,
    pub ocs0: f64,
    pub foi0: f64,
}

/// Facade composing verification, scoring, policy decisions and baselines.
pub struct AssessmentService<P, S> {
    policies: Arc<P>,
    baselines: Arc<S>,
    engine: ScoringEngine,
    default_target: String,
    drift_threshold: f64,
}

impl<P, S> AssessmentService<P, S>
where
    P: PolicySource + 'static,
    S: BaselineStore + 'static,
{
    pub fn new(policies: Arc<P>, baselines: Arc<S>) -> Self {
        Self {
            policies,
            baselines,
            engine: ScoringEngine::default(),
            default_target: DEFAULT_TARGET.to_string(),
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
        }
    }

    pub fn with_default_target(mut self, target: impl Into<String>) -> Self {
        self.default_target = target.into();
        self
    }

    pub fn with_drift_threshold(mut self, threshold: f64) -> Self {
        self.drift_threshold = threshold;
        self
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.engine = ScoringEngine::new(weights);
        self
    }

    pub fn default_target(&self) -> &str {
        &self.default_target
    }

    /// Structural validation plus advisory checks for a raw payload.
    pub fn verify(&self, raw: Value) -> VerificationReport {
        let report = verify_raw(raw);
        if !report.ok {
            warn!(errors = ?report.errors, "dossier verification failed");
        }
        report
    }

    pub fn score(&self, request: ScoreRequest) -> Result<OriginScore, AssessmentError> {
        ensure_verified(&request.dossier)?;
        let weights = match request.weights {
            Some(weights) => validate_weights(weights)?,
            None => *self.engine.weights(),
        };
        let target = self.target(request.target_jurisdiction.as_deref());
        Ok(score_origin(&request.dossier, &weights, target))
    }

    pub fn decide(&self, request: DecideRequest) -> Result<Decision, AssessmentError> {
        let policy = self.policies.load(&request.policy_name)?;
        Ok(decide(request.ocs, request.foi, &policy, &request.context)?)
    }

    pub fn assess(&self, request: AssessRequest) -> Result<Assessment, AssessmentError> {
        ensure_verified(&request.dossier)?;
        let target = self.target(request.target_jurisdiction.as_deref());
        let score = self.engine.score(&request.dossier, target);
        let policy = self.policies.load(&request.policy_name)?;
        let decision = decide(score.ocs, score.foi, &policy, &request.context)?;

        Ok(Assessment {
            decision,
            ocs: score.ocs,
            foi: score.foi,
            explanations: score.explanations,
        })
    }

    /// Score a dossier and store it as the baseline for `baseline_id`,
    /// replacing any earlier registration.
    pub fn create_baseline(
        &self,
        request: BaselineCreateRequest,
    ) -> Result<BaselineCreated, AssessmentError> {
        ensure_verified(&request.dossier)?;
        self.policies.load(&request.policy_name)?;
        let target = self.target(request.target_jurisdiction.as_deref());
        let score = self.engine.score(&request.dossier, target);

        let baseline = Baseline {
            baseline_id: request.baseline_id.clone(),
            ocs0: score.ocs,
            foi0: score.foi,
            artifact_digest: request.dossier.artifact.digest.clone(),
            target_jurisdiction: target.to_string(),
            recorded_at: Utc::now(),
        };
        self.baselines.put(baseline)?;

        info!(
            baseline_id = %request.baseline_id,
            ocs0 = score.ocs,
            foi0 = score.foi,
            "baseline registered"
        );

        Ok(BaselineCreated {
            baseline_id: request.baseline_id,
            ocs0: score.ocs,
            foi0: score.foi,
        })
    }

    pub fn baseline(&self, id: &BaselineId) -> Result<Baseline, AssessmentError> {
        self.baselines
            .get(id)?
            .ok_or_else(|| AssessmentError::BaselineNotFound(id.clone()))
    }

    /// Compare an updated dossier against its baseline and decide it afresh.
    ///
    /// Without an explicit target the update is scored against the
    /// baseline's recorded jurisdiction.
    pub fn evaluate_update(
        &self,
        request: UpdateEvaluateRequest,
    ) -> Result<DriftEvaluation, AssessmentError> {
        let baseline = self.baseline(&request.baseline_id)?;
        ensure_verified(&request.dossier)?;

        let target = request
            .target_jurisdiction
            .as_deref()
            .filter(|target| !target.trim().is_empty())
            .unwrap_or(baseline.target_jurisdiction.as_str());
        let score = self.engine.score(&request.dossier, target);
        let threshold = request.drift_threshold.unwrap_or(self.drift_threshold);
        let drift = measure_drift(baseline.ocs0, score.ocs, threshold);

        let policy = self.policies.load(&request.policy_name)?;
        let decision = decide(score.ocs, score.foi, &policy, &request.context)?;

        if drift.reclassify {
            warn!(
                baseline_id = %request.baseline_id,
                drift = drift.drift,
                threshold,
                "origin confidence drifted past threshold"
            );
        }

        Ok(DriftEvaluation {
            baseline_id: request.baseline_id,
            drift: drift.drift,
            reclassify: drift.reclassify,
            decision,
        })
    }

    fn target<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|target| !target.trim().is_empty())
            .unwrap_or(&self.default_target)
    }
}

fn ensure_verified(dossier: &Dossier) -> Result<(), AssessmentError> {
    let report = verify_dossier(dossier);
    if report.ok {
        Ok(())
    } else {
        warn!(
            product = %dossier.product.name,
            errors = ?report.errors,
            "dossier verification failed"
        );
        Err(AssessmentError::Verification(report))
    }
}

fn validate_weights(weights: ScoreWeights) -> Result<ScoreWeights, AssessmentError> {
    let values = [
        weights.w_build,
        weights.w_sbom,
        weights.w_signing,
        weights.w_hosting,
    ];
    if values.iter().all(|weight| weight.is_finite() && *weight >= 0.0) {
        Ok(weights)
    } else {
        Err(AssessmentError::InvalidWeights(weights))
    }
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("{}", .0.summary())]
    Verification(VerificationReport),
    #[error("score weights must be finite and non-negative: {0:?}")]
    InvalidWeights(ScoreWeights),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error("baseline not found: {0}")]
    BaselineNotFound(BaselineId),
    #[error(transparent)]
    Store(#[from] StoreError),
}
