use crate::infra::{AppState, OriginService};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json};
use origingate::assessment::{assessment_router, Policy, PolicySource};
use origingate::error::AppError;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes(service: Arc<OriginService>) -> axum::Router {
    assessment_router(service)
        .route("/v1/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/v1/policies/:name", get(policy_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "service": "origingate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Effective policy after defaults are applied.
pub(crate) async fn policy_endpoint(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Policy>, AppError> {
    let policy = state.policies.load(&name)?;
    Ok(Json(policy.as_ref().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::policy_store;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
            policies: policy_store(
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../policies"),
            ),
        }
    }

    #[tokio::test]
    async fn healthcheck_reports_service_identity() {
        let Json(body) = healthcheck().await;

        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["service"], json!("origingate"));
        assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
    }

    #[tokio::test]
    async fn readiness_is_unavailable_until_flagged() {
        let response = readiness_endpoint(Extension(app_state(false)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = readiness_endpoint(Extension(app_state(true)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn policy_endpoint_returns_effective_policy() {
        let Json(policy) = policy_endpoint(
            Extension(app_state(true)),
            Path("strict_federal".to_string()),
        )
        .await
        .expect("policy loads");

        assert_eq!(policy.name, "strict_federal");
        assert_eq!(policy.thresholds.tau_min_ocs, 0.8);
        assert!(!policy.fee.enabled);
        assert_eq!(policy.fee.rate, 0.10);
    }

    #[tokio::test]
    async fn unknown_policy_maps_to_not_found() {
        let err = policy_endpoint(Extension(app_state(true)), Path("absent".to_string()))
            .await
            .expect_err("policy missing");

        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn service_routes_share_the_application_state() {
        let state = app_state(true);
        let service = Arc::new(crate::infra::build_service(
            state.policies.clone(),
            &origingate::config::AssessmentConfig {
                policy_dir: PathBuf::from("policies"),
                default_target: "US".to_string(),
                drift_threshold: 0.10,
            },
        ));
        let router = with_service_routes(service).layer(Extension(state));

        let response = router
            .clone()
            .oneshot(
                Request::get("/v1/policies/enterprise_moderate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::post("/v1/policy/decide")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "ocs": 0.5, "foi": 3.0, "policy_name": "enterprise_moderate" })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["verdict"], json!("REVIEW"));
        assert_eq!(body["actions"], json!(["log_audit", "manual_review"]));
    }
}
