use super::common::*;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::inference::router::{
    error_response, evaluate_dataset_handler, evaluate_handler, evaluation_router, rule_handler,
    run_blocking,
};
use crate::inference::service::{LoanEvaluationService, LoanServiceError};
use crate::inference::validation::ApplicantSubmission;

fn json_request(method: &str, uri: &str, body: Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&body).expect("serialize body"),
        ))
        .expect("request builds")
}

fn get_request(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::get(uri)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn evaluate_handler_defaults_missing_identifier() {
    let mut submission = submission(&a2());
    submission.applicant_id = None;

    let response = evaluate_handler::<MemorySource>(State(build_service()), axum::Json(submission))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(true));
    assert_eq!(payload["data"]["applicant_id"], json!("CUSTOM"));
    assert_eq!(payload["data"]["final_decision"], json!("Approve with Conditions"));
}

#[tokio::test]
async fn evaluate_handler_returns_bad_request_for_invalid_input() {
    let submission = ApplicantSubmission {
        applicant_id: Some("X".to_string()),
        ..ApplicantSubmission::default()
    };

    let response = evaluate_handler::<MemorySource>(State(build_service()), axum::Json(submission))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(false));
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("income"));
}

#[tokio::test]
async fn rule_handler_returns_not_found_for_unknown_rule() {
    let response = rule_handler::<MemorySource>(
        State(build_service()),
        axum::extract::Path("R42".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], json!("Rule R42 not found"));
}

#[tokio::test]
async fn evaluate_route_accepts_payloads() {
    let router = evaluation_router(build_service());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/evaluate",
            json!({
                "applicant_id": "WEB1",
                "income": 55000,
                "credit_score": 680,
                "employment_status": "Unemployed",
                "employment_duration": 0,
                "age": 28,
                "dependents": 2,
                "existing_debt": "Low"
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"]["final_decision"], json!("Reject Loan"));
    assert_eq!(
        payload["data"]["forward_chaining"]["decided_by"],
        json!("R4")
    );
}

#[tokio::test]
async fn evaluate_all_route_uses_the_configured_dataset() {
    let router = evaluation_router(build_service());

    let response = router
        .oneshot(get_request("/api/evaluate-all"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"].as_array().map(Vec::len), Some(5));
    assert_eq!(payload["errors"], json!([]));
    assert_eq!(payload["statistics"]["total_applicants"], json!(5));
    assert_eq!(payload["statistics"]["decisions"]["Reject Loan"], json!(2));
}

#[tokio::test]
async fn evaluate_all_route_reports_item_errors() {
    let router = evaluation_router(build_service());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/evaluate-all",
            json!({
                "applicants": [
                    serde_json::to_value(submission(&a1())).expect("serialize"),
                    { "applicant_id": "NOPE", "income": 10 }
                ]
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(payload["errors"][0]["index"], json!(1));
    assert_eq!(payload["errors"][0]["applicant_id"], json!("NOPE"));
    assert_eq!(payload["statistics"]["total_applicants"], json!(1));
}

#[tokio::test]
async fn unavailable_dataset_is_reported() {
    let service = Arc::new(LoanEvaluationService::new(
        engine(),
        Arc::new(UnavailableSource),
    ));
    let router = evaluation_router(service);

    let response = router
        .oneshot(get_request("/api/applicants"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("dataset offline"));
}

#[tokio::test]
async fn catalogue_routes_describe_the_rule_base() {
    let service = build_service();

    let rules = evaluation_router(service.clone())
        .oneshot(get_request("/api/rules"))
        .await
        .expect("route executes");
    let payload = read_json_body(rules).await;
    assert_eq!(payload["total"], json!(8));
    assert_eq!(payload["data"][1]["rule_id"], json!("R2"));

    let rule = evaluation_router(service.clone())
        .oneshot(get_request("/api/rule/R3"))
        .await
        .expect("route executes");
    assert_eq!(rule.status(), StatusCode::OK);
    let payload = read_json_body(rule).await;
    assert_eq!(payload["data"]["consequent"], json!("Reject Loan"));

    let statistics = evaluation_router(service.clone())
        .oneshot(get_request("/api/statistics"))
        .await
        .expect("route executes");
    let payload = read_json_body(statistics).await;
    assert_eq!(payload["data"]["high_priority_rules"], json!(4));

    let health = evaluation_router(service)
        .oneshot(get_request("/api/health"))
        .await
        .expect("route executes");
    let payload = read_json_body(health).await;
    assert_eq!(payload["status"], json!("running"));
}

#[tokio::test(flavor = "current_thread")]
async fn dataset_batch_runs_off_the_async_worker() {
    let response = evaluate_dataset_handler::<MemorySource>(State(build_service())).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["statistics"]["total_applicants"], json!(5));
    assert_eq!(payload["data"][0]["applicant_id"], json!("A1"));
}

#[tokio::test]
async fn failed_blocking_worker_is_a_server_error() {
    let error = run_blocking(build_service(), |_| -> Result<(), LoanServiceError> {
        panic!("worker lost")
    })
    .await
    .expect_err("worker panicked");

    assert!(matches!(error, LoanServiceError::Worker(_)));
    let response = error_response(error);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(false));
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.starts_with("evaluation worker failed")));
}
