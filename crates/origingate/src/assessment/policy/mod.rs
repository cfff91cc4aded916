mod decision;

pub use decision::{decide, Decision, DecisionContext, DecisionError, UsageField, Verdict};

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

const DEFAULT_TAU_MIN_OCS: f64 = 0.6;
const DEFAULT_GAMMA_MAX_FOI: f64 = 25.0;
const DEFAULT_FEE_RATE: f64 = 0.10;
const DEFAULT_REVIEW_LOW: f64 = 0.45;

/// Named decision policy as stored in `<policy_dir>/<name>.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub actions: PolicyActions,
    #[serde(default)]
    pub fee: FeeRule,
    /// An empty mapping counts as no band.
    #[serde(
        default,
        deserialize_with = "deserialize_review_band",
        skip_serializing_if = "Option::is_none"
    )]
    pub review_band: Option<ReviewBand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum OCS required to allow (`tau`).
    #[serde(default = "default_tau")]
    pub tau_min_ocs: f64,
    /// Maximum FOI tolerated on the allow path (`gamma`).
    #[serde(default = "default_gamma")]
    pub gamma_max_foi: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            tau_min_ocs: DEFAULT_TAU_MIN_OCS,
            gamma_max_foi: DEFAULT_GAMMA_MAX_FOI,
        }
    }
}

/// Action lists per outcome. An absent list falls back to the built-in
/// default; an explicitly empty list stays empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyActions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_allow: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_deny: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_review: Option<Vec<String>>,
}

impl PolicyActions {
    pub fn allow_actions(&self) -> Vec<String> {
        actions_or(&self.on_allow, &["log_audit", "approve"])
    }

    pub fn deny_actions(&self) -> Vec<String> {
        actions_or(&self.on_deny, &["log_audit", "deny"])
    }

    pub fn review_actions(&self) -> Vec<String> {
        actions_or(&self.on_review, &["log_audit", "manual_review"])
    }
}

fn actions_or(configured: &Option<Vec<String>>, fallback: &[&str]) -> Vec<String> {
    match configured {
        Some(actions) => actions.clone(),
        None => fallback.iter().map(|action| action.to_string()).collect(),
    }
}

/// Usage-based fee charged when a foreign-dominant artifact is allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_fee_rate")]
    pub rate: f64,
    #[serde(default)]
    pub usage_field: UsageField,
}

impl Default for FeeRule {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: DEFAULT_FEE_RATE,
            usage_field: UsageField::default(),
        }
    }
}

/// OCS sub-range `[ocs_low, ocs_high)` that forces manual review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewBand {
    #[serde(default = "default_review_low")]
    pub ocs_low: f64,
    /// Upper bound; the policy's `tau_min_ocs` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocs_high: Option<f64>,
}

impl ReviewBand {
    pub fn bounds(&self, tau: f64) -> (f64, f64) {
        (self.ocs_low, self.ocs_high.unwrap_or(tau))
    }

    pub fn contains(&self, ocs: f64, tau: f64) -> bool {
        let (low, high) = self.bounds(tau);
        low <= ocs && ocs < high
    }
}

fn deserialize_review_band<'de, D>(deserializer: D) -> Result<Option<ReviewBand>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, f64>>::deserialize(deserializer)?;
    Ok(raw.filter(|band| !band.is_empty()).map(|band| ReviewBand {
        ocs_low: band.get("ocs_low").copied().unwrap_or(DEFAULT_REVIEW_LOW),
        ocs_high: band.get("ocs_high").copied(),
    }))
}

fn default_tau() -> f64 {
    DEFAULT_TAU_MIN_OCS
}

fn default_gamma() -> f64 {
    DEFAULT_GAMMA_MAX_FOI
}

fn default_fee_rate() -> f64 {
    DEFAULT_FEE_RATE
}

fn default_review_low() -> f64 {
    DEFAULT_REVIEW_LOW
}

/// Errors raised while resolving a policy by name.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("policy not found: {name} ({})", .path.display())]
    NotFound { name: String, path: PathBuf },
    #[error("failed to read policy {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid policy file for {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl PolicyError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PolicyError::NotFound { .. })
    }
}

/// Read-only lookup of named policies.
pub trait PolicySource: Send + Sync {
    fn load(&self, name: &str) -> Result<Arc<Policy>, PolicyError>;
}

/// Loads `<root>/<name>.yaml` on every call.
#[derive(Debug, Clone)]
pub struct DirectoryPolicySource {
    root: PathBuf,
}

impl DirectoryPolicySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.yaml"))
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

impl PolicySource for DirectoryPolicySource {
    fn load(&self, name: &str) -> Result<Arc<Policy>, PolicyError> {
        let path = self.path_for(name);
        if !is_plain_name(name) || !path.is_file() {
            warn!(policy = name, path = %path.display(), "policy lookup failed");
            return Err(PolicyError::NotFound {
                name: name.to_string(),
                path,
            });
        }

        let file = File::open(&path).map_err(|source| PolicyError::Io {
            name: name.to_string(),
            source,
        })?;
        let policy: Policy = serde_yaml::from_reader(file).map_err(|source| PolicyError::Parse {
            name: name.to_string(),
            source,
        })?;

        Ok(Arc::new(policy))
    }
}

/// Memoizes successful loads from an inner source. Failures are not cached.
pub struct CachedPolicySource<S> {
    inner: S,
    cache: RwLock<HashMap<String, Arc<Policy>>>,
}

impl<S: PolicySource> CachedPolicySource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.read().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl<S: PolicySource> PolicySource for CachedPolicySource<S> {
    fn load(&self, name: &str) -> Result<Arc<Policy>, PolicyError> {
        if let Ok(guard) = self.cache.read() {
            if let Some(policy) = guard.get(name) {
                return Ok(policy.clone());
            }
        }

        let policy = self.inner.load(name)?;
        if let Ok(mut guard) = self.cache.write() {
            guard.insert(name.to_string(), policy.clone());
        }
        Ok(policy)
    }
}
