use actix_web::{http::StatusCode, test::TestRequest};
use apisign_engine::{
    canonical::SignParams,
    compute_signature,
    db_types::{ApiDescriptor, AppIdentity},
    derive_salt,
    test_utils::fixtures::*,
    SaltMode,
    SignConfig,
    StaticSecretStore,
};
use serde_json::json;

use super::{
    helpers::{backed_app, call, now, static_app},
    mocks::{healthy, mock_backend, unavailable},
};
use crate::{
    data_objects::{SaltResponse, SignResponse, ValidationResponse},
    helpers::*,
};

const SALT_URI: &str = "/api/sign/dynamic-salt-generate";
const SALT_VALIDATE_URI: &str = "/api/sign/dynamic-salt-validate";
const SIGN_URI: &str = "/api/sign/generate";
const SIGN_VALIDATE_URI: &str = "/api/sign/sign-validate";

fn salt_request(app_code: &str, path: &str) -> TestRequest {
    TestRequest::post().uri(SALT_URI).insert_header((APP_CODE_HEADER, app_code)).insert_header((PATH_HEADER, path))
}

fn stateful() -> SignConfig {
    SignConfig::default().with_salt_mode(SaltMode::Stateful)
}

fn validate_request(salt: &SaltResponse) -> TestRequest {
    TestRequest::post().uri(SALT_VALIDATE_URI).set_json(json!({
        "appCode": salt.app_code,
        "path": salt.path,
        "dynamicSalt": salt.dynamic_salt,
        "dynamicSaltTime": salt.dynamic_salt_time,
    }))
}

fn sign_request(salt: &SaltResponse) -> TestRequest {
    TestRequest::post().uri(SIGN_URI).set_json(json!({
        "appCode": salt.app_code,
        "path": salt.path,
        "dynamicSalt": salt.dynamic_salt,
        "dynamicSaltTime": salt.dynamic_salt_time,
    }))
}

#[actix_web::test]
async fn salt_from_headers() {
    let app = static_app(SignConfig::default()).await;
    let (status, body) = call(&app, salt_request(IOS_APP, SUBMIT_TEST_PATH)).await;
    assert_eq!(status, StatusCode::OK);
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(salt.app_code, IOS_APP);
    assert_eq!(salt.path, SUBMIT_TEST_PATH);
    let expected = derive_salt(IOS_APP, SUBMIT_TEST_PATH, SUBMIT_TEST_SALT, salt.dynamic_salt_time);
    assert_eq!(salt.dynamic_salt, expected);
}

#[actix_web::test]
async fn salt_from_body() {
    let app = static_app(SignConfig::default()).await;
    let req = TestRequest::post().uri(SALT_URI).set_json(json!({"appCode": IOS_APP, "path": SUBMIT_TEST_PATH}));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(salt.app_code, IOS_APP);
}

#[actix_web::test]
async fn salt_headers_take_priority_over_body() {
    let app = static_app(SignConfig::default()).await;
    let req = TestRequest::post()
        .uri(SALT_URI)
        .insert_header((APP_CODE_HEADER, IOS_APP))
        .set_json(json!({"appCode": EMPTY_APP, "path": SUBMIT_TEST_PATH}));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(salt.app_code, IOS_APP);
    assert_eq!(salt.path, SUBMIT_TEST_PATH);
}

#[actix_web::test]
async fn salt_requests_are_checked() {
    let app = static_app(SignConfig::default()).await;
    let req = TestRequest::post().uri(SALT_URI).insert_header((PATH_HEADER, SUBMIT_TEST_PATH));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("appCode"), "{body}");

    let (status, _) = call(&app, salt_request(IOS_APP, "/api/sign/not-registered")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, salt_request(EMPTY_APP, SUBMIT_TEST_PATH)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, salt_request(RETIRED_APP, SUBMIT_TEST_PATH)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, salt_request("ghost", SUBMIT_TEST_PATH)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn stateful_salts_validate_once() {
    let app = static_app(stateful()).await;
    let (_, body) = call(&app, salt_request(IOS_APP, SUBMIT_TEST_PATH)).await;
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();

    let (status, body) = call(&app, validate_request(&salt)).await;
    assert_eq!(status, StatusCode::OK);
    let result: ValidationResponse = serde_json::from_str(&body).unwrap();
    assert!(result.valid);

    let (_, body) = call(&app, validate_request(&salt)).await;
    let result: ValidationResponse = serde_json::from_str(&body).unwrap();
    assert!(!result.valid);
}

#[actix_web::test]
async fn stateless_salts_validate_repeatedly() {
    let app = static_app(SignConfig::default()).await;
    let (_, body) = call(&app, salt_request(IOS_APP, SUBMIT_TEST_PATH)).await;
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();
    for _ in 0..2 {
        let (_, body) = call(&app, validate_request(&salt)).await;
        let result: ValidationResponse = serde_json::from_str(&body).unwrap();
        assert!(result.valid);
    }
    let forged = SaltResponse { dynamic_salt: "00".repeat(32), ..salt };
    let (_, body) = call(&app, validate_request(&forged)).await;
    let result: ValidationResponse = serde_json::from_str(&body).unwrap();
    assert!(!result.valid);
}

#[actix_web::test]
async fn salt_validation_needs_a_time() {
    let app = static_app(SignConfig::default()).await;
    let req = TestRequest::post()
        .uri(SALT_VALIDATE_URI)
        .set_json(json!({"appCode": IOS_APP, "path": SUBMIT_TEST_PATH, "dynamicSalt": "abc"}));
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri(SALT_VALIDATE_URI)
        .insert_header((DYNAMIC_SALT_TIME_HEADER, "yesterday"))
        .set_json(json!({"appCode": IOS_APP, "path": SUBMIT_TEST_PATH, "dynamicSalt": "abc", "dynamicSaltTime": 1}));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("yesterday"), "{body}");
}

#[actix_web::test]
async fn earliest_salt_time_is_not_valid() {
    let app = static_app(SignConfig::default()).await;
    let req = TestRequest::post()
        .uri(SALT_VALIDATE_URI)
        .insert_header((DYNAMIC_SALT_TIME_HEADER, i64::MIN.to_string()))
        .set_json(json!({"appCode": IOS_APP, "path": SUBMIT_TEST_PATH, "dynamicSalt": "abc"}));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""valid":false"#), "{body}");
}

#[actix_web::test]
async fn sign_then_validate() {
    let app = static_app(SignConfig::default()).await;
    let (_, body) = call(&app, salt_request(IOS_APP, SUBMIT_TEST_PATH)).await;
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();

    let (status, body) = call(&app, sign_request(&salt)).await;
    assert_eq!(status, StatusCode::OK);
    let sig: SignResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(sig.sign, compute_signature(IOS_APP, IOS_SECRET, SUBMIT_TEST_PATH, sig.time, None));
    assert_eq!(sig.expire_time, Some(sig.time + 600_000));

    let validate = |sign: &str| {
        TestRequest::post()
            .uri(SIGN_VALIDATE_URI)
            .insert_header((APP_CODE_HEADER, IOS_APP))
            .insert_header((PATH_HEADER, SUBMIT_TEST_PATH))
            .insert_header((SIGN_HEADER, sign.to_string()))
            .insert_header((TIME_HEADER, sig.time.to_string()))
    };
    let (status, body) = call(&app, validate(&sig.sign)).await;
    assert_eq!(status, StatusCode::OK);
    let result: ValidationResponse = serde_json::from_str(&body).unwrap();
    assert!(result.valid);

    let (_, body) = call(&app, validate(&"0".repeat(64))).await;
    let result: ValidationResponse = serde_json::from_str(&body).unwrap();
    assert!(!result.valid);
}

#[actix_web::test]
async fn sign_with_parameters() {
    let app = static_app(SignConfig::default()).await;
    let (_, body) = call(&app, salt_request(IOS_APP, SUBMIT_WITH_PARAMS_PATH)).await;
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();
    let req = TestRequest::post().uri(SIGN_URI).set_json(json!({
        "appCode": IOS_APP,
        "path": SUBMIT_WITH_PARAMS_PATH,
        "dynamicSalt": salt.dynamic_salt,
        "dynamicSaltTime": salt.dynamic_salt_time,
        "parameters": {"orderId": 42, "currency": "XTR"},
    }));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let sig: SignResponse = serde_json::from_str(&body).unwrap();
    let params = SignParams::new().with("currency", "XTR").with("orderId", "42");
    assert_eq!(sig.sign, compute_signature(IOS_APP, IOS_SECRET, SUBMIT_WITH_PARAMS_PATH, sig.time, Some(&params)));

    // Key order in the body doesn't matter
    let req = TestRequest::post()
        .uri(SIGN_VALIDATE_URI)
        .insert_header((APP_CODE_HEADER, IOS_APP))
        .insert_header((PATH_HEADER, SUBMIT_WITH_PARAMS_PATH))
        .insert_header((SIGN_HEADER, sig.sign.clone()))
        .insert_header((TIME_HEADER, sig.time.to_string()))
        .insert_header((WITH_PARAMS_HEADER, "true"))
        .set_json(json!({"currency": "XTR", "orderId": 42}));
    let (_, body) = call(&app, req).await;
    let result: ValidationResponse = serde_json::from_str(&body).unwrap();
    assert!(result.valid);

    // Validating without the parameters uses the other canonical form
    let req = TestRequest::post()
        .uri(SIGN_VALIDATE_URI)
        .insert_header((APP_CODE_HEADER, IOS_APP))
        .insert_header((PATH_HEADER, SUBMIT_WITH_PARAMS_PATH))
        .insert_header((SIGN_HEADER, sig.sign))
        .insert_header((TIME_HEADER, sig.time.to_string()))
        .insert_header((WITH_PARAMS_HEADER, "false"));
    let (_, body) = call(&app, req).await;
    let result: ValidationResponse = serde_json::from_str(&body).unwrap();
    assert!(!result.valid);
}

#[actix_web::test]
async fn stateful_salt_cannot_sign_twice() {
    let app = static_app(stateful()).await;
    let (_, body) = call(&app, salt_request(IOS_APP, SUBMIT_TEST_PATH)).await;
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();
    let (status, _) = call(&app, sign_request(&salt)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, sign_request(&salt)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("dynamic salt validation failed"), "{body}");
}

#[actix_web::test]
async fn stateless_salt_can_sign_twice() {
    let app = static_app(SignConfig::default()).await;
    let (_, body) = call(&app, salt_request(IOS_APP, SUBMIT_TEST_PATH)).await;
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();
    for _ in 0..2 {
        let (status, _) = call(&app, sign_request(&salt)).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[actix_web::test]
async fn signing_needs_the_sign_permission() {
    let app = static_app(SignConfig::default()).await;
    let (status, body) = call(&app, salt_request(SALT_ONLY_APP, SUBMIT_TEST_PATH)).await;
    assert_eq!(status, StatusCode::OK);
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();
    let (status, _) = call(&app, sign_request(&salt)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn sign_validate_needs_app_and_path() {
    let app = static_app(SignConfig::default()).await;
    let req = TestRequest::post().uri(SIGN_VALIDATE_URI).insert_header((APP_CODE_HEADER, IOS_APP));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Sign-path"), "{body}");
}

#[actix_web::test]
async fn stateful_issue_records_the_salt() {
    let mut backend = mock_backend(healthy);
    backend.expect_record_salt().times(1).returning(|_| Ok(()));
    let app = backed_app(backend, stateful()).await;
    let (status, _) = call(&app, salt_request(IOS_APP, SUBMIT_TEST_PATH)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn stateful_validation_consumes_from_the_ledger() {
    let mut backend = mock_backend(healthy);
    backend.expect_consume_salt().times(2).returning({
        let mut used = false;
        move |_, _, _, _, _| Ok(!std::mem::replace(&mut used, true))
    });
    let app = backed_app(backend, stateful()).await;
    let salt = SaltResponse {
        app_code: IOS_APP.into(),
        path: SUBMIT_TEST_PATH.into(),
        dynamic_salt: "ab".repeat(32),
        dynamic_salt_time: now() - 1_000,
    };
    let (_, body) = call(&app, validate_request(&salt)).await;
    let result: ValidationResponse = serde_json::from_str(&body).unwrap();
    assert!(result.valid);
    let (_, body) = call(&app, validate_request(&salt)).await;
    let result: ValidationResponse = serde_json::from_str(&body).unwrap();
    assert!(!result.valid);
}

#[actix_web::test]
async fn backend_outage_is_503() {
    let app = backed_app(mock_backend(unavailable), SignConfig::default()).await;
    let (status, body) = call(&app, salt_request(IOS_APP, SUBMIT_TEST_PATH)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("pool timed out"), "{body}");
}

#[actix_web::test]
async fn issuance_is_served_at_configured_paths() {
    const MOVED_SALT_PATH: &str = "/api/v2/salt";
    const MOVED_SIGN_PATH: &str = "/api/v2/sign";
    let identity = AppIdentity::new(IOS_APP, IOS_SECRET).with_permissions(&[
        MOVED_SALT_PATH,
        MOVED_SIGN_PATH,
        SUBMIT_TEST_PATH,
    ]);
    let store = StaticSecretStore::new(vec![identity], vec![ApiDescriptor::new(SUBMIT_TEST_PATH, SUBMIT_TEST_SALT)]);
    let app = backed_app(store, SignConfig::default().with_issuance_paths(MOVED_SALT_PATH, MOVED_SIGN_PATH)).await;

    let req = TestRequest::post()
        .uri(MOVED_SALT_PATH)
        .insert_header((APP_CODE_HEADER, IOS_APP))
        .insert_header((PATH_HEADER, SUBMIT_TEST_PATH));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let salt: SaltResponse = serde_json::from_str(&body).unwrap();

    let req = TestRequest::post().uri(MOVED_SIGN_PATH).set_json(json!({
        "appCode": salt.app_code,
        "path": salt.path,
        "dynamicSalt": salt.dynamic_salt,
        "dynamicSaltTime": salt.dynamic_salt_time,
    }));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let _: SignResponse = serde_json::from_str(&body).unwrap();

    let (status, _) = call(&app, salt_request(IOS_APP, SUBMIT_TEST_PATH)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
