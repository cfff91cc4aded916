use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::assessment::baseline::InMemoryBaselineStore;
use crate::assessment::dossier::{
    Artifact, Criticality, Dossier, Hosting, Product, Provenance, Sbom, SbomComponent, Signing,
};
use crate::assessment::policy::{
    FeeRule, Policy, PolicyActions, PolicyError, PolicySource, ReviewBand, Thresholds,
};
use crate::assessment::{assessment_router, AssessmentService};

pub(crate) fn component(
    name: &str,
    supplier: &str,
    criticality: Criticality,
    risk: f64,
) -> SbomComponent {
    SbomComponent::new(name, "1.0.0", supplier, criticality, risk)
}

fn dossier(
    build_region: &str,
    key_jurisdiction: &str,
    hosting_jurisdiction: &str,
    components: Vec<SbomComponent>,
) -> Dossier {
    Dossier {
        product: Product {
            name: "ledger-gateway".to_string(),
            version: "2.4.1".to_string(),
        },
        artifact: Artifact {
            digest: "sha256:9f2c4e1b7a".to_string(),
            uri: Some("oci://registry.example/ledger-gateway:2.4.1".to_string()),
        },
        provenance: Provenance {
            builder_id: "github-actions://ledger".to_string(),
            build_region: build_region.to_string(),
            timestamp: "2025-06-01T12:00:00Z".to_string(),
            source_repo: "https://git.example/ledger/gateway".to_string(),
            commit: "4be1c0de".to_string(),
        },
        sbom: Sbom {
            format: "cyclonedx-lite".to_string(),
            components,
        },
        signing: Signing {
            key_jurisdiction: key_jurisdiction.to_string(),
            signature: "MEUCIQDdemo".to_string(),
        },
        hosting: Some(Hosting {
            kind: Some("saas".to_string()),
            control_plane_region: Some("us-east-1".to_string()),
            jurisdiction: Some(hosting_jurisdiction.to_string()),
        }),
        attestation: None,
    }
}

fn foreign_components() -> Vec<SbomComponent> {
    vec![
        component("libsodium", "CN", Criticality::Crypto, 0.95),
        component("grpc", "CN", Criticality::Network, 0.7),
        component("authlib", "IN", Criticality::Auth, 0.8),
        component("pandas", "EU", Criticality::Data, 0.6),
    ]
}

/// US build, key and host; FOI 9.25, OCS 0.9532 against `US`.
pub(crate) fn domestic_dossier() -> Dossier {
    dossier(
        "us-east-1",
        "US",
        "US",
        vec![
            component("openssl", "US", Criticality::Crypto, 0.9),
            component("tokio", "US", Criticality::Network, 0.1),
            component("react", "EU", Criticality::Ui, 0.4),
        ],
    )
}

/// EU build and key over foreign dependencies; FOI 74.45, OCS 0.2705 against `US`.
pub(crate) fn foreign_dossier() -> Dossier {
    dossier("eu-central-1", "EU", "US", foreign_components())
}

/// US build and key over the foreign dependency set; OCS 0.8205 against `US`.
pub(crate) fn laundered_dossier() -> Dossier {
    dossier("us-west-2", "US", "US", foreign_components())
}

pub(crate) fn dossier_json() -> Value {
    serde_json::to_value(domestic_dossier()).expect("dossier serializes")
}

pub(crate) fn policy_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../policies")
}

pub(crate) fn moderate_policy() -> Policy {
    Policy {
        name: "moderate".to_string(),
        thresholds: Thresholds {
            tau_min_ocs: 0.6,
            gamma_max_foi: 25.0,
        },
        actions: PolicyActions::default(),
        fee: FeeRule {
            enabled: true,
            ..FeeRule::default()
        },
        review_band: Some(ReviewBand {
            ocs_low: 0.45,
            ocs_high: None,
        }),
    }
}

pub(crate) fn no_fee_policy() -> Policy {
    Policy {
        name: "no_fee".to_string(),
        fee: FeeRule::default(),
        review_band: None,
        ..moderate_policy()
    }
}

/// Fixed set of policies keyed by name.
pub(crate) struct StaticPolicySource {
    policies: HashMap<String, Arc<Policy>>,
}

impl StaticPolicySource {
    pub(crate) fn standard() -> Self {
        let policies = [moderate_policy(), no_fee_policy()]
            .into_iter()
            .map(|policy| (policy.name.clone(), Arc::new(policy)))
            .collect();
        Self { policies }
    }
}

impl PolicySource for StaticPolicySource {
    fn load(&self, name: &str) -> Result<Arc<Policy>, PolicyError> {
        self.policies
            .get(name)
            .cloned()
            .ok_or_else(|| PolicyError::NotFound {
                name: name.to_string(),
                path: PathBuf::from(format!("memory://{name}")),
            })
    }
}

pub(crate) type TestService = AssessmentService<StaticPolicySource, InMemoryBaselineStore>;

pub(crate) fn build_service() -> (TestService, Arc<InMemoryBaselineStore>) {
    let store = Arc::new(InMemoryBaselineStore::default());
    let service = AssessmentService::new(Arc::new(StaticPolicySource::standard()), store.clone());
    (service, store)
}

pub(crate) fn test_router() -> axum::Router {
    let (service, _) = build_service();
    assessment_router(Arc::new(service))
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
