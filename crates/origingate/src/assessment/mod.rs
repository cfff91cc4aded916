//! Origin assessment: dossier verification, origin scoring, policy decisions
//! and baseline drift tracking.

pub mod baseline;
pub mod dossier;
pub mod policy;
pub mod portfolio;
pub mod router;
pub mod scoring;
pub mod service;
pub mod verify;

#[cfg(test)]
mod tests;

pub use baseline::{
    measure_drift, Baseline, BaselineId, BaselineStore, Drift, DriftEvaluation,
    InMemoryBaselineStore, StoreError, DEFAULT_DRIFT_THRESHOLD,
};
pub use dossier::{
    Artifact, Criticality, Dossier, Hosting, Product, Provenance, Sbom, SbomComponent, Signing,
};
pub use policy::{
    decide, CachedPolicySource, Decision, DecisionContext, DecisionError,
    DirectoryPolicySource, FeeRule, Policy, PolicyActions, PolicyError, PolicySource, ReviewBand,
    Thresholds, UsageField, Verdict,
};
pub use portfolio::{
    write_csv, ConfusionMatrix, DossierClass, PortfolioError, PortfolioEvaluator, PortfolioRow,
    PortfolioSummary,
};
pub use router::assessment_router;
pub use scoring::{
    compute_foi, score_origin, ForeignOriginIndex, OriginScore, OriginSignals, ScoreWeights,
    ScoringEngine,
};
pub use service::{
    AssessRequest, Assessment, AssessmentError, AssessmentService, BaselineCreateRequest,
    BaselineCreated, DecideRequest, ScoreRequest, UpdateEvaluateRequest,
};
pub use verify::{parse_dossier, verify_dossier, verify_raw, VerificationReport};
