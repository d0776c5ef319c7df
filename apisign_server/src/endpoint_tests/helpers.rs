use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    App,
};
use apisign_engine::{
    canonical::SignParams,
    compute_signature,
    test_utils::fixtures::static_store,
    SaltLedger,
    SecretResolver,
    SignConfig,
};
use chrono::Utc;
use log::debug;

use crate::{
    helpers::{APP_CODE_HEADER, SIGN_HEADER, TIME_HEADER},
    server::{configure_apis, configure_routes},
};

pub fn now() -> i64 {
    Utc::now().timestamp_millis()
}

/// An app serving every route, backed by the fixture population in a fresh static store.
pub async fn static_app(
    sign: SignConfig,
) -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
    backed_app(static_store(), sign).await
}

pub async fn backed_app<A>(
    backend: A,
    sign: SignConfig,
) -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error>
where
    A: SecretResolver + SaltLedger + Clone + 'static,
{
    let _ = env_logger::try_init();
    let routes = configure_routes::<A>(&sign);
    test::init_service(App::new().configure(configure_apis(backend, sign)).configure(routes)).await
}

/// Makes the request, and returns the status and body. Errors raised by middleware are rendered the way the server
/// would render them.
pub async fn call<S>(app: &S, req: TestRequest) -> (StatusCode, String)
where S: Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
    let (status, body) = match test::try_call_service(app, req.to_request()).await {
        Ok(res) => (res.status(), res.into_body().try_into_bytes().unwrap()),
        Err(e) => {
            let res = e.error_response();
            (res.status(), res.into_body().try_into_bytes().unwrap())
        },
    };
    let body = String::from_utf8_lossy(&body).into_owned();
    debug!("Response: {status} {body}");
    (status, body)
}

/// Adds the `Sign-*` headers for a signature computed over `path` at `time`.
pub fn signed(
    req: TestRequest,
    app_code: &str,
    secret: &str,
    path: &str,
    time: i64,
    params: Option<&SignParams>,
) -> TestRequest {
    let sign = compute_signature(app_code, secret, path, time, params);
    req.insert_header((APP_CODE_HEADER, app_code))
        .insert_header((SIGN_HEADER, sign))
        .insert_header((TIME_HEADER, time.to_string()))
}
