//! Integration tests for the HTTP API, driven through the router in-process.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use tower::ServiceExt;

use diabetes_predict::server::api::{ErrorResponse, WELCOME_MESSAGE};
use diabetes_predict::server::build_app;
use diabetes_predict::service::Prediction;

use common::{bundled_model_path, config_for, write_artifact, HIGH_RISK, LOW_RISK, SCENARIO_FOREST};

fn bundled_app() -> Router {
    build_app(&config_for(bundled_model_path())).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

fn post_predict(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn predict_ok(app: &Router, body: &str) -> Prediction {
    let (status, _, bytes) = send(app, post_predict(body)).await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&bytes));
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_home_returns_welcome() {
    let app = bundled_app();
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, WELCOME_MESSAGE.as_bytes());
}

#[tokio::test]
async fn test_concrete_scenario() {
    let artifact = write_artifact(SCENARIO_FOREST);
    let app = build_app(&config_for(artifact.path().to_path_buf())).unwrap();

    let (status, headers, body) =
        send(&app, post_predict(r#"{"feature_a": 5, "feature_b": 120}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["Diabetes"], 1);
    assert!((json["Probability"].as_f64().unwrap() - 0.73).abs() < 1e-12);
}

#[tokio::test]
async fn test_bundled_model_scores_both_classes() {
    let app = bundled_app();

    let high = predict_ok(&app, HIGH_RISK).await;
    assert_eq!(high.diabetes, 1);
    assert!(high.probability > 0.5 && high.probability <= 1.0);

    let low = predict_ok(&app, LOW_RISK).await;
    assert_eq!(low.diabetes, 0);
    assert!(low.probability >= 0.0 && low.probability < 0.5);
}

#[tokio::test]
async fn test_label_consistent_with_probability() {
    let app = bundled_app();

    for glucose in [60, 90, 110, 130, 150, 180, 199] {
        let body = format!(
            r#"{{"Pregnancies": 2, "Glucose": {glucose}, "BloodPressure": 70, "SkinThickness": 20,
                "Insulin": 80, "BMI": 32.0, "DiabetesPedigreeFunction": 0.45, "Age": 33}}"#
        );
        let p = predict_ok(&app, &body).await;
        assert!((0.0..=1.0).contains(&p.probability));
        assert_eq!(p.diabetes == 1, p.probability > 0.5, "glucose={glucose}");
    }
}

#[tokio::test]
async fn test_form_strings_accepted() {
    let app = bundled_app();

    let as_numbers = predict_ok(&app, HIGH_RISK).await;
    let as_strings = predict_ok(
        &app,
        r#"{
            "Pregnancies": "6", "Glucose": "148", "BloodPressure": "72", "SkinThickness": "35",
            "Insulin": "0", "BMI": "33.6", "DiabetesPedigreeFunction": "0.627", "Age": "50"
        }"#,
    )
    .await;
    assert_eq!(as_numbers, as_strings);
}

#[tokio::test]
async fn test_same_request_twice_is_identical() {
    let app = bundled_app();
    let first = predict_ok(&app, HIGH_RISK).await;
    let second = predict_ok(&app, HIGH_RISK).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_malformed_input_returns_500_and_stays_ready() {
    let app = bundled_app();

    let bad_bodies = [
        "",
        "not json",
        "[6, 148, 72]",
        "42",
        "null",
        r#"{"Glucose": 148}"#,
        r#"{"Pregnancies": 6, "Glucose": "high", "BloodPressure": 72, "SkinThickness": 35,
            "Insulin": 0, "BMI": 33.6, "DiabetesPedigreeFunction": 0.627, "Age": 50}"#,
        r#"{"Pregnancies": 6, "Glucose": null, "BloodPressure": 72, "SkinThickness": 35,
            "Insulin": 0, "BMI": 33.6, "DiabetesPedigreeFunction": 0.627, "Age": 50}"#,
        r#"{"Pregnancies": 6, "Glucose": [148], "BloodPressure": 72, "SkinThickness": 35,
            "Insulin": 0, "BMI": 33.6, "DiabetesPedigreeFunction": 0.627, "Age": 50}"#,
        r#"{"Pregnancies": 6, "Glucose": 148, "BloodPressure": 72, "SkinThickness": 35,
            "Insulin": 0, "BMI": 33.6, "DiabetesPedigreeFunction": 0.627, "Age": 50,
            "Outcome": 1}"#,
    ];

    for body in bad_bodies {
        let (status, headers, bytes) = send(&app, post_predict(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {body}");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");

        let err: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(!err.error.is_empty(), "body: {body}");
    }

    let p = predict_ok(&app, HIGH_RISK).await;
    assert_eq!(p.diabetes, 1);
}

#[tokio::test]
async fn test_oversized_body_returns_500_json() {
    let app = bundled_app();
    let body = format!(r#"{{"pad": "{}"}}"#, "x".repeat(3 * 1024 * 1024));

    let (status, headers, bytes) = send(&app, post_predict(&body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");

    let err: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(err.error.starts_with("Failed to read request body"), "{}", err.error);

    let p = predict_ok(&app, HIGH_RISK).await;
    assert_eq!(p.diabetes, 1);
}

#[tokio::test]
async fn test_overflowing_model_score_returns_500() {
    let artifact = write_artifact(
        r#"{
            "kind": "logistic_regression",
            "classes": [0, 1],
            "features": ["a", "b"],
            "coefficients": [2.0, 2.0],
            "intercept": 0.0
        }"#,
    );
    let app = build_app(&config_for(artifact.path().to_path_buf())).unwrap();

    let (status, headers, bytes) = send(&app, post_predict(r#"{"a": 1e308, "b": -1e308}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let err: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(err.error.contains("not a number"), "{}", err.error);

    let p = predict_ok(&app, r#"{"a": 1.0, "b": 0.5}"#).await;
    assert!((0.0..=1.0).contains(&p.probability));
    assert_eq!(p.diabetes, 1);
}

#[tokio::test]
async fn test_extreme_inputs_never_leak_invalid_probability() {
    let app = bundled_app();

    for (glucose, bmi) in [("1e300", "33.6"), ("-1e300", "33.6"), ("1e308", "-1e308"), ("1e-300", "0")] {
        let body = format!(
            r#"{{"Pregnancies": 6, "Glucose": {glucose}, "BloodPressure": 72, "SkinThickness": 35,
                "Insulin": 0, "BMI": {bmi}, "DiabetesPedigreeFunction": 0.627, "Age": 50}}"#
        );
        let (status, headers, bytes) = send(&app, post_predict(&body)).await;
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");

        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        match status {
            StatusCode::OK => {
                let p = json["Probability"].as_f64().expect("probability must be a number");
                assert!((0.0..=1.0).contains(&p), "glucose={glucose} p={p}");
                assert_eq!(json["Diabetes"] == 1, p > 0.5);
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()));
            }
            other => panic!("unexpected status {other} for glucose={glucose}"),
        }
    }
}

#[tokio::test]
async fn test_error_message_names_the_problem() {
    let app = bundled_app();

    let (_, _, bytes) = send(&app, post_predict(r#"{"Glucose": 148}"#)).await;
    let err: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(err.error.starts_with("Missing features:"), "{}", err.error);
    assert!(err.error.contains("BMI"));
}

#[tokio::test]
async fn test_content_type_not_required() {
    let app = bundled_app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .body(Body::from(HIGH_RISK))
        .unwrap();

    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_get_predict_not_allowed() {
    let app = bundled_app();
    let req = Request::builder().uri("/predict").body(Body::empty()).unwrap();

    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_any_origin() {
    let app = bundled_app();

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict")
        .header(header::ORIGIN, "http://localhost:8080")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, preflight).await;
    assert!(status.is_success());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let failing = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::ORIGIN, "https://example.org")
        .body(Body::from("not json"))
        .unwrap();
    let (status, headers, _) = send(&app, failing).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
