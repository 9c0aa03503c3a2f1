use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::engine::EvaluationError;
use super::outcome::BatchEvaluation;
use super::rules::RuleLookupError;
use super::service::{ApplicantSource, LoanEvaluationService, LoanServiceError};
use super::validation::ApplicantSubmission;

/// Identifier given to submissions that arrive without one.
pub const CUSTOM_APPLICANT_ID: &str = "CUSTOM";

/// Router builder exposing the evaluation API.
pub fn evaluation_router<S>(service: Arc<LoanEvaluationService<S>>) -> Router
where
    S: ApplicantSource + 'static,
{
    Router::new()
        .route("/api/evaluate", axum::routing::post(evaluate_handler::<S>))
        .route(
            "/api/evaluate-all",
            get(evaluate_dataset_handler::<S>).post(evaluate_batch_handler::<S>),
        )
        .route("/api/applicants", get(applicants_handler::<S>))
        .route("/api/rules", get(rules_handler::<S>))
        .route("/api/rule/:rule_id", get(rule_handler::<S>))
        .route("/api/statistics", get(statistics_handler::<S>))
        .route("/api/health", get(api_health_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchRequest {
    #[serde(default)]
    applicants: Vec<ApplicantSubmission>,
}

pub(crate) async fn evaluate_handler<S>(
    State(service): State<Arc<LoanEvaluationService<S>>>,
    axum::Json(mut submission): axum::Json<ApplicantSubmission>,
) -> Response
where
    S: ApplicantSource + 'static,
{
    if submission.applicant_id.is_none() {
        submission.applicant_id = Some(CUSTOM_APPLICANT_ID.to_string());
    }

    match service.evaluate(&submission) {
        Ok(result) => {
            let payload = json!({
                "success": true,
                "data": result,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evaluate_dataset_handler<S>(
    State(service): State<Arc<LoanEvaluationService<S>>>,
) -> Response
where
    S: ApplicantSource + 'static,
{
    let outcome = run_blocking(service, |service| {
        let submissions = service.applicants()?;
        let batch = service.evaluate_batch(&submissions);
        Ok((submissions, batch))
    })
    .await;

    match outcome {
        Ok((submissions, batch)) => batch_response(&submissions, batch),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evaluate_batch_handler<S>(
    State(service): State<Arc<LoanEvaluationService<S>>>,
    axum::Json(request): axum::Json<BatchRequest>,
) -> Response
where
    S: ApplicantSource + 'static,
{
    let submissions = request.applicants;
    let outcome = run_blocking(service, move |service| {
        let batch = service.evaluate_batch(&submissions);
        Ok((submissions, batch))
    })
    .await;

    match outcome {
        Ok((submissions, batch)) => batch_response(&submissions, batch),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn applicants_handler<S>(
    State(service): State<Arc<LoanEvaluationService<S>>>,
) -> Response
where
    S: ApplicantSource + 'static,
{
    match run_blocking(service, |service| service.applicants()).await {
        Ok(applicants) => {
            let payload = json!({
                "success": true,
                "total": applicants.len(),
                "data": applicants,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rules_handler<S>(
    State(service): State<Arc<LoanEvaluationService<S>>>,
) -> Response
where
    S: ApplicantSource + 'static,
{
    let rules = service.rules();
    let payload = json!({
        "success": true,
        "total": rules.len(),
        "data": rules,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn rule_handler<S>(
    State(service): State<Arc<LoanEvaluationService<S>>>,
    Path(rule_id): Path<String>,
) -> Response
where
    S: ApplicantSource + 'static,
{
    match service.rule(&rule_id) {
        Ok(rule) => {
            let payload = json!({
                "success": true,
                "data": rule,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn statistics_handler<S>(
    State(service): State<Arc<LoanEvaluationService<S>>>,
) -> Response
where
    S: ApplicantSource + 'static,
{
    let payload = json!({
        "success": true,
        "data": service.rule_statistics(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn api_health_handler() -> Response {
    let payload = json!({
        "success": true,
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn batch_response(submissions: &[ApplicantSubmission], batch: BatchEvaluation) -> Response {
    let errors: Vec<_> = batch
        .failures()
        .map(|(index, error)| {
            json!({
                "index": index,
                "applicant_id": submissions
                    .get(index)
                    .and_then(|submission| submission.applicant_id.clone()),
                "error": error.to_string(),
            })
        })
        .collect();
    let data: Vec<_> = batch.successes().collect();

    let payload = json!({
        "success": true,
        "data": data,
        "errors": errors,
        "statistics": batch.statistics,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

/// Dataset reads and rayon batches block, so they run on the blocking pool.
pub(crate) async fn run_blocking<S, T, F>(
    service: Arc<LoanEvaluationService<S>>,
    work: F,
) -> Result<T, LoanServiceError>
where
    S: ApplicantSource + 'static,
    T: Send + 'static,
    F: FnOnce(&LoanEvaluationService<S>) -> Result<T, LoanServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(service.as_ref())).await?
}

pub(crate) fn error_response(error: LoanServiceError) -> Response {
    let status = match &error {
        LoanServiceError::Evaluation(EvaluationError::Validation(_)) => StatusCode::BAD_REQUEST,
        LoanServiceError::Evaluation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LoanServiceError::Lookup(RuleLookupError::NotFound { .. }) => StatusCode::NOT_FOUND,
        LoanServiceError::Source(_) => StatusCode::SERVICE_UNAVAILABLE,
        LoanServiceError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "success": false,
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
