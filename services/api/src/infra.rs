use metrics_exporter_prometheus::PrometheusHandle;
use origingate::assessment::{
    AssessmentService, CachedPolicySource, DecisionContext, DirectoryPolicySource,
    InMemoryBaselineStore, PolicySource,
};
use origingate::config::AssessmentConfig;
use origingate::error::AppError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type PolicyStore = CachedPolicySource<DirectoryPolicySource>;
pub(crate) type OriginService = AssessmentService<PolicyStore, InMemoryBaselineStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) policies: Arc<PolicyStore>,
}

pub(crate) fn policy_store(dir: impl Into<PathBuf>) -> Arc<PolicyStore> {
    Arc::new(CachedPolicySource::new(DirectoryPolicySource::new(dir)))
}

/// Service wired with the process-local baseline store and configured defaults.
pub(crate) fn build_service(
    policies: Arc<PolicyStore>,
    config: &AssessmentConfig,
) -> OriginService {
    AssessmentService::new(policies, Arc::new(InMemoryBaselineStore::default()))
        .with_default_target(config.default_target.clone())
        .with_drift_threshold(config.drift_threshold)
}

/// Context carrying `usage` under whichever field the policy charges on.
pub(crate) fn usage_context(
    policies: &PolicyStore,
    policy_name: &str,
    usage: Option<f64>,
) -> Result<DecisionContext, AppError> {
    let Some(amount) = usage else {
        return Ok(DecisionContext::new());
    };
    let policy = policies.load(policy_name)?;
    Ok(DecisionContext::new().with_usage(&policy.fee.usage_field, amount))
}

pub(crate) fn read_json(path: &Path) -> Result<Value, AppError> {
    let raw = std::fs::read(path)?;
    serde_json::from_slice(&raw)
        .map_err(|err| AppError::Input(format!("{} is not valid JSON: {err}", path.display())))
}
