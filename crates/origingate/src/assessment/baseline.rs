use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::Decision;
use super::scoring::round_to;

/// Drift above which an update is flagged for re-classification.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.10;

/// Caller-chosen identifier for a baseline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaselineId(pub String);

impl fmt::Display for BaselineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BaselineId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Scores recorded when a baseline was registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub baseline_id: BaselineId,
    pub ocs0: f64,
    pub foi0: f64,
    pub artifact_digest: String,
    pub target_jurisdiction: String,
    pub recorded_at: DateTime<Utc>,
}

/// Keyed baseline storage. Writes to an existing id overwrite it.
pub trait BaselineStore: Send + Sync {
    fn put(&self, baseline: Baseline) -> Result<(), StoreError>;
    fn get(&self, id: &BaselineId) -> Result<Option<Baseline>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("baseline store unavailable: {0}")]
    Unavailable(String),
}

/// Process-local store backed by a lock-protected map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBaselineStore {
    records: Arc<RwLock<HashMap<BaselineId, Baseline>>>,
}

impl InMemoryBaselineStore {
    pub fn len(&self) -> usize {
        self.records.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BaselineStore for InMemoryBaselineStore {
    fn put(&self, baseline: Baseline) -> Result<(), StoreError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::Unavailable("baseline lock poisoned".to_string()))?;
        guard.insert(baseline.baseline_id.clone(), baseline);
        Ok(())
    }

    fn get(&self, id: &BaselineId) -> Result<Option<Baseline>, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::Unavailable("baseline lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

/// OCS movement since the baseline. Positive drift means confidence fell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drift {
    pub drift: f64,
    pub reclassify: bool,
}

pub fn measure_drift(ocs0: f64, current_ocs: f64, threshold: f64) -> Drift {
    let drift = round_to(ocs0 - current_ocs, 4);
    Drift {
        drift,
        reclassify: drift > threshold,
    }
}

/// Drift flag and the independent decision for the updated dossier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEvaluation {
    pub baseline_id: BaselineId,
    pub drift: f64,
    pub reclassify: bool,
    pub decision: Decision,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn baseline(id: &str, ocs0: f64) -> Baseline {
        Baseline {
            baseline_id: BaselineId::from(id),
            ocs0,
            foi0: 4.2,
            artifact_digest: "sha256:abc".to_string(),
            target_jurisdiction: "US".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn falling_confidence_triggers_reclassification() {
        let drift = measure_drift(0.80, 0.65, DEFAULT_DRIFT_THRESHOLD);
        assert_eq!(drift.drift, 0.15);
        assert!(drift.reclassify);
    }

    #[test]
    fn improving_confidence_yields_negative_drift() {
        let drift = measure_drift(0.60, 0.70, DEFAULT_DRIFT_THRESHOLD);
        assert_eq!(drift.drift, -0.10);
        assert!(!drift.reclassify);
    }

    #[test]
    fn drift_equal_to_threshold_does_not_reclassify() {
        let drift = measure_drift(0.70, 0.60, DEFAULT_DRIFT_THRESHOLD);
        assert_eq!(drift.drift, 0.10);
        assert!(!drift.reclassify);
    }

    #[test]
    fn store_overwrites_on_repeat_registration() {
        let store = InMemoryBaselineStore::default();
        store.put(baseline("svc", 0.8)).expect("put");
        store.put(baseline("svc", 0.5)).expect("put");

        let stored = store
            .get(&BaselineId::from("svc"))
            .expect("get")
            .expect("present");

        assert_eq!(stored.ocs0, 0.5);
        assert_eq!(store.len(), 1);
        assert!(store.get(&BaselineId::from("other")).expect("get").is_none());
    }

    #[test]
    fn store_is_shareable_across_threads() {
        let store = InMemoryBaselineStore::default();
        let handles: Vec<_> = (0..8)
            .map(|idx| {
                let store = store.clone();
                thread::spawn(move || {
                    store
                        .put(baseline(&format!("b{idx}"), 0.5))
                        .expect("put succeeds");
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread joins");
        }
        assert_eq!(store.len(), 8);
    }
}
