use actix_web::{http::StatusCode, test::TestRequest};
use apisign_engine::{canonical::SignParams, test_utils::fixtures::*, SignConfig};
use serde_json::{json, Value};

use super::{
    helpers::{backed_app, call, now, signed, static_app},
    mocks::{mock_backend, unavailable},
};
use crate::{
    data_objects::{JsonResponse, PermittedPathsResponse},
    helpers::PATH_HEADER,
};

const SUBMIT_TEST_URI: &str = "/api/sign/submit-test";
const SUBMIT_WITH_PARAMS_URI: &str = "/api/sign/submit-with-params";

fn submit_test(app_code: &str, secret: &str, time: i64) -> TestRequest {
    signed(TestRequest::post().uri(SUBMIT_TEST_URI), app_code, secret, SUBMIT_TEST_PATH, time, None)
}

fn submit_with_params(time: i64, params: Option<&SignParams>) -> TestRequest {
    let req = TestRequest::post().uri(SUBMIT_WITH_PARAMS_URI);
    signed(req, IOS_APP, IOS_SECRET, SUBMIT_WITH_PARAMS_PATH, time, params)
}

fn order_lookup(uri: &str, signed_path: &str, time: i64, params: &SignParams) -> TestRequest {
    signed(TestRequest::get().uri(uri), IOS_APP, IOS_SECRET, signed_path, time, Some(params))
}

#[actix_web::test]
async fn health() {
    let app = static_app(SignConfig::default()).await;
    let (status, body) = call(&app, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn signed_submission() {
    let app = static_app(SignConfig::default()).await;
    let (status, body) = call(&app, submit_test(IOS_APP, IOS_SECRET, now())).await;
    assert_eq!(status, StatusCode::OK);
    let res: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(res.success);
    assert!(res.message.contains(IOS_APP));
}

#[actix_web::test]
async fn unsigned_submission() {
    let app = static_app(SignConfig::default()).await;
    let (status, body) = call(&app, TestRequest::post().uri(SUBMIT_TEST_URI)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Sign-appCode"), "{body}");
}

#[actix_web::test]
async fn wrong_secret() {
    let app = static_app(SignConfig::default()).await;
    let (status, body) = call(&app, submit_test(IOS_APP, "not-the-secret", now())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Signature could not be verified"), "{body}");
}

#[actix_web::test]
async fn unknown_callers_look_like_bad_signatures() {
    let app = static_app(SignConfig::default()).await;
    let (status, body) = call(&app, submit_test("ghost", "ghost-secret", now())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Signature could not be verified"), "{body}");

    let (status, _) = call(&app, submit_test(RETIRED_APP, "retired-secret", now())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn callers_without_permission_are_forbidden() {
    let app = static_app(SignConfig::default()).await;
    let (status, _) = call(&app, submit_test(EMPTY_APP, "no-perms-secret", now())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn timestamps_must_be_fresh() {
    let app = static_app(SignConfig::default()).await;
    let (status, body) = call(&app, submit_test(IOS_APP, IOS_SECRET, now() + 60_000)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("future"), "{body}");

    let (status, body) = call(&app, submit_test(IOS_APP, IOS_SECRET, now() - 11 * 60_000)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("expired"), "{body}");

    let (status, body) = call(&app, submit_test(IOS_APP, IOS_SECRET, i64::MIN)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("expired"), "{body}");

    let req = TestRequest::post()
        .uri(SUBMIT_TEST_URI)
        .insert_header(("Sign-appCode", IOS_APP))
        .insert_header(("Sign-sign", "00"))
        .insert_header(("Sign-time", "noon"));
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn declared_path_is_informational() {
    let app = static_app(SignConfig::default()).await;
    let req = submit_test(IOS_APP, IOS_SECRET, now()).insert_header((PATH_HEADER, "/api/sign/somewhere-else"));
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn submission_with_parameters() {
    let app = static_app(SignConfig::default()).await;
    let body = json!({"amount": 100, "currency": "XTR", "tags": ["a", "b"]});
    let params = SignParams::from_json(&body);
    let time = now();

    let (status, res) = call(&app, submit_with_params(time, Some(&params)).set_json(&body)).await;
    assert_eq!(status, StatusCode::OK);
    let res: JsonResponse = serde_json::from_str(&res).unwrap();
    assert!(res.message.contains("Received 3 signed parameters"), "{}", res.message);

    // Tampering with the body invalidates the signature
    let tampered = json!({"amount": 1000, "currency": "XTR", "tags": ["a", "b"]});
    let (status, _) = call(&app, submit_with_params(time, Some(&params)).set_json(&tampered)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A signature without parameters doesn't cover this endpoint
    let (status, _) = call(&app, submit_with_params(time, None).set_json(&body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn malformed_body_is_rejected() {
    let app = static_app(SignConfig::default()).await;
    let params = SignParams::new();
    let req = submit_with_params(now(), Some(&params))
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json");
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("not valid JSON"), "{body}");
}

#[actix_web::test]
async fn permitted_paths_for_the_caller() {
    let app = static_app(SignConfig::default()).await;
    let path = "/api/sign/user-auth-list";
    let req = signed(TestRequest::get().uri(path), IOS_APP, IOS_SECRET, path, now(), None);
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let res: PermittedPathsResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(res.app_code, IOS_APP);
    assert_eq!(res.paths.len(), 6);
    assert!(res.paths.contains(&"/api/orders/**".to_string()));
}

#[actix_web::test]
async fn templated_path_with_query() {
    let app = static_app(SignConfig::default()).await;
    let params = SignParams::from_query("status=paid&page=2");
    let time = now();
    let (status, body) = call(&app, order_lookup("/api/orders/42?status=paid&page=2", ORDER_PATH, time, &params)).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["orderId"], "42");
    assert_eq!(res["signedPath"], ORDER_PATH);
    assert_eq!(res["filters"], 2);

    // The raw URI path is not what gets signed
    let req = order_lookup("/api/orders/42?status=paid&page=2", "/api/orders/42", time, &params);
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The orders scope includes query parameters
    let req = order_lookup("/api/orders/42?status=unpaid&page=2", ORDER_PATH, time, &params);
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn backend_outage_is_not_an_auth_failure() {
    let app = backed_app(mock_backend(unavailable), SignConfig::default()).await;
    let (status, body) = call(&app, submit_test(IOS_APP, IOS_SECRET, now())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("unavailable"), "{body}");
}
