use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use origingate::assessment::{
    assessment_router, AssessRequest, AssessmentService, BaselineCreateRequest, BaselineId,
    CachedPolicySource, DecisionContext, DirectoryPolicySource, Dossier, InMemoryBaselineStore,
    PolicySource, UpdateEvaluateRequest, UsageField, Verdict,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn policy_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../policies")
}

fn fixture(name: &str) -> Dossier {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/portfolio")
        .join(name);
    let raw = std::fs::read(&path).expect("fixture readable");
    serde_json::from_slice(&raw).expect("fixture parses")
}

fn shipped_service(
) -> AssessmentService<CachedPolicySource<DirectoryPolicySource>, InMemoryBaselineStore> {
    AssessmentService::new(
        Arc::new(CachedPolicySource::new(DirectoryPolicySource::new(
            policy_dir(),
        ))),
        Arc::new(InMemoryBaselineStore::default()),
    )
}

fn million_usd() -> DecisionContext {
    DecisionContext::new().with_usage(&UsageField::AnnualUsageUsd, 1_000_000.0)
}

#[test]
fn shipped_policies_all_load() {
    let source = DirectoryPolicySource::new(policy_dir());

    for name in ["enterprise_moderate", "strict_federal", "usage_fee"] {
        let policy = source.load(name).expect("policy loads");
        assert_eq!(policy.name, name);
    }
}

#[test]
fn enterprise_policy_splits_the_three_fixture_classes() {
    let service = shipped_service();
    let verdict_for = |file: &str| {
        service
            .assess(AssessRequest {
                dossier: fixture(file),
                policy_name: "enterprise_moderate".to_string(),
                context: million_usd(),
                target_jurisdiction: None,
            })
            .expect("assessment succeeds")
    };

    let domestic = verdict_for("domestic.json");
    assert_eq!(domestic.decision.verdict, Verdict::Allow);
    assert_eq!(domestic.decision.fee_usd, 4_680.0);

    let foreign = verdict_for("foreign.json");
    assert_eq!(foreign.decision.verdict, Verdict::AllowWithFee);
    assert_eq!(foreign.decision.fee_usd, 72_950.0);
    assert_eq!(foreign.decision.actions, vec!["log_audit", "approve"]);

    let laundered = verdict_for("laundered.json");
    assert_eq!(laundered.decision.verdict, Verdict::Deny);
    assert_eq!(
        laundered.decision.actions,
        vec!["log_audit", "deny", "notify_security"]
    );
}

#[test]
fn strict_federal_escalates_laundered_build() {
    let service = shipped_service();

    let assessment = service
        .assess(AssessRequest {
            dossier: fixture("laundered.json"),
            policy_name: "strict_federal".to_string(),
            context: DecisionContext::new(),
            target_jurisdiction: None,
        })
        .expect("assessment succeeds");

    assert_eq!(assessment.decision.verdict, Verdict::Deny);
    assert_eq!(
        assessment.decision.actions,
        vec!["log_audit", "deny", "notify_security", "open_ticket"]
    );
}

#[test]
fn usage_fee_policy_reads_its_named_usage_field() {
    let service = shipped_service();
    let mut context = DecisionContext::new();
    context.insert("monthly_seats_usd", json!(20_000));

    let assessment = service
        .assess(AssessRequest {
            dossier: fixture("foreign.json"),
            policy_name: "usage_fee".to_string(),
            context,
            target_jurisdiction: None,
        })
        .expect("assessment succeeds");

    assert_eq!(assessment.decision.verdict, Verdict::AllowWithFee);
    assert_eq!(assessment.decision.fee_usd, 2_188.5);
}

#[test]
fn baseline_drift_flags_foreign_rebuild() {
    let service = shipped_service();
    service
        .create_baseline(BaselineCreateRequest {
            baseline_id: BaselineId::from("ledger"),
            dossier: fixture("domestic.json"),
            policy_name: "enterprise_moderate".to_string(),
            target_jurisdiction: None,
        })
        .expect("baseline stored");

    let evaluation = service
        .evaluate_update(UpdateEvaluateRequest {
            baseline_id: BaselineId::from("ledger"),
            dossier: fixture("laundered.json"),
            policy_name: "enterprise_moderate".to_string(),
            context: million_usd(),
            drift_threshold: None,
            target_jurisdiction: None,
        })
        .expect("update evaluated");

    assert_eq!(evaluation.drift, 0.1327);
    assert!(evaluation.reclassify);
    assert_eq!(evaluation.decision.verdict, Verdict::Deny);
}

#[tokio::test]
async fn router_serves_assessments_from_shipped_policies() {
    let router = assessment_router(Arc::new(shipped_service()));
    let payload = json!({
        "dossier": fixture("foreign.json"),
        "policy_name": "enterprise_moderate",
        "context": { "annual_usage_usd": 1_000_000 }
    });

    let response = router
        .oneshot(
            Request::post("/v1/assess")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["verdict"], json!("ALLOW_WITH_FEE"));
    assert_eq!(body["ocs"], json!(0.2705));
    assert_eq!(body["foi"], json!(74.45));
    assert_eq!(body["fee_usd"], json!(72_950.0));
}
