use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::baseline::{BaselineId, BaselineStore};
use super::policy::PolicySource;
use super::service::{
    AssessRequest, AssessmentError, AssessmentService, BaselineCreateRequest, DecideRequest,
    ScoreRequest, UpdateEvaluateRequest,
};

/// Router builder exposing the verification, scoring, decision and baseline endpoints.
pub fn assessment_router<P, S>(service: Arc<AssessmentService<P, S>>) -> Router
where
    P: PolicySource + 'static,
    S: BaselineStore + 'static,
{
    Router::new()
        .route("/v1/dossiers/verify", post(verify_handler::<P, S>))
        .route("/v1/origin/score", post(score_handler::<P, S>))
        .route("/v1/policy/decide", post(decide_handler::<P, S>))
        .route("/v1/assess", post(assess_handler::<P, S>))
        .route("/v1/baselines", post(create_baseline_handler::<P, S>))
        .route(
            "/v1/baselines/:baseline_id",
            get(baseline_handler::<P, S>),
        )
        .route("/v1/updates/evaluate", post(evaluate_update_handler::<P, S>))
        .with_state(service)
}

impl IntoResponse for AssessmentError {
    fn into_response(self) -> Response {
        let (status, payload) = match &self {
            AssessmentError::Verification(report) => {
                (StatusCode::BAD_REQUEST, json!({ "errors": report.errors }))
            }
            AssessmentError::InvalidWeights(_) | AssessmentError::Decision(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": self.to_string() }),
            ),
            AssessmentError::Policy(err) if err.is_not_found() => {
                (StatusCode::NOT_FOUND, json!({ "error": self.to_string() }))
            }
            AssessmentError::BaselineNotFound(id) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "baseline not found", "baseline_id": id }),
            ),
            AssessmentError::Policy(_) | AssessmentError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
        };

        (status, Json(payload)).into_response()
    }
}

fn respond<T: Serialize>(result: Result<T, AssessmentError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn verify_handler<P, S>(
    State(service): State<Arc<AssessmentService<P, S>>>,
    Json(raw): Json<Value>,
) -> Response
where
    P: PolicySource + 'static,
    S: BaselineStore + 'static,
{
    (StatusCode::OK, Json(service.verify(raw))).into_response()
}

pub(crate) async fn score_handler<P, S>(
    State(service): State<Arc<AssessmentService<P, S>>>,
    Json(request): Json<ScoreRequest>,
) -> Response
where
    P: PolicySource + 'static,
    S: BaselineStore + 'static,
{
    respond(service.score(request))
}

pub(crate) async fn decide_handler<P, S>(
    State(service): State<Arc<AssessmentService<P, S>>>,
    Json(request): Json<DecideRequest>,
) -> Response
where
    P: PolicySource + 'static,
    S: BaselineStore + 'static,
{
    respond(service.decide(request))
}

pub(crate) async fn assess_handler<P, S>(
    State(service): State<Arc<AssessmentService<P, S>>>,
    Json(request): Json<AssessRequest>,
) -> Response
where
    P: PolicySource + 'static,
    S: BaselineStore + 'static,
{
    respond(service.assess(request))
}

pub(crate) async fn create_baseline_handler<P, S>(
    State(service): State<Arc<AssessmentService<P, S>>>,
    Json(request): Json<BaselineCreateRequest>,
) -> Response
where
    P: PolicySource + 'static,
    S: BaselineStore + 'static,
{
    respond(service.create_baseline(request))
}

pub(crate) async fn baseline_handler<P, S>(
    State(service): State<Arc<AssessmentService<P, S>>>,
    Path(baseline_id): Path<String>,
) -> Response
where
    P: PolicySource + 'static,
    S: BaselineStore + 'static,
{
    respond(service.baseline(&BaselineId(baseline_id)))
}

pub(crate) async fn evaluate_update_handler<P, S>(
    State(service): State<Arc<AssessmentService<P, S>>>,
    Json(request): Json<UpdateEvaluateRequest>,
) -> Response
where
    P: PolicySource + 'static,
    S: BaselineStore + 'static,
{
    respond(service.evaluate_update(request))
}
