//! Request handler definitions
//!
//! Two groups of routes live here:
//! * The issuance endpoints (dynamic salts and server-side signatures, plus their validators). These are not signed
//!   themselves; the engine checks the caller's permissions instead. The two issuing endpoints are mounted at the
//!   paths named in `SignConfig`, the validators under `/api/sign`.
//! * Signed endpoints, wrapped in the signature middleware. Their handlers only run once a request has been verified,
//!   and can read the outcome with `web::ReqData<Authorized>`.
//!
//! Handlers are generic over the secret backend, so the same routes run against the configured [`SecretBackend`] in
//! production, and against the static store or mocks in tests.
//!
//! [`SecretBackend`]: apisign_engine::SecretBackend
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use apisign_engine::{
    canonical::SignParams,
    db_types::SignatureProof,
    Authorized,
    DynamicSaltApi,
    SaltLedger,
    SecretResolver,
    SignPolicy,
    SignRequest,
    SignatureApi,
    VerificationPipeline,
};
use log::*;
use serde_json::json;

use crate::{
    data_objects::{
        JsonResponse,
        PermittedPathsResponse,
        SaltRequest,
        SaltResponse,
        SaltValidateRequest,
        SignGenerateRequest,
        SignResponse,
        ValidationResponse,
    },
    errors::ServerError,
    helpers::*,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where signed) => {
        $crate::route!(@signed $name => $method $path impl $($bounds),+; None);
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where signed with $policy:expr) => {
        $crate::route!(@signed $name => $method $path impl $($bounds),+; Some($policy));
    };

    (@signed $name:ident => $method:ident $path:literal impl $($bounds:ty),+; $policy:expr) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::SignatureMiddlewareFactory::<A>::new($policy));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    "👍️\n"
}

//----------------------------------------------   Dynamic salts  ----------------------------------------------------
/// Issues a dynamic salt. Served at the configured salt-issuing path (see `server::configure_routes`).
pub async fn dynamic_salt_generate<A>(
    req: HttpRequest,
    body: Option<web::Json<SaltRequest>>,
    api: web::Data<DynamicSaltApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: SecretResolver + SaltLedger,
{
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    let headers = req.headers();
    let app_code = header_or_body(header_string(headers, APP_CODE_HEADER), body.app_code.as_ref()).unwrap_or_default();
    let path = header_or_body(header_string(headers, PATH_HEADER), body.path.as_ref()).unwrap_or_default();
    debug!("💻️ Dynamic salt requested by {app_code} for {path}");
    let salt = api.issue(&app_code, &path).await?;
    Ok(HttpResponse::Ok().json(SaltResponse::from(salt)))
}

route!(dynamic_salt_validate => Post "/dynamic-salt-validate" impl SecretResolver, SaltLedger);
/// Checks a dynamic salt. In stateful mode a salt that checks out is consumed.
pub async fn dynamic_salt_validate<A>(
    req: HttpRequest,
    body: Option<web::Json<SaltValidateRequest>>,
    api: web::Data<DynamicSaltApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: SecretResolver + SaltLedger,
{
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    let headers = req.headers();
    let app_code = header_or_body(header_string(headers, APP_CODE_HEADER), body.app_code.as_ref());
    let app_code = required(app_code, "appCode")?;
    let path = required(header_or_body(header_string(headers, PATH_HEADER), body.path.as_ref()), "path")?;
    let salt = header_or_body(header_string(headers, DYNAMIC_SALT_HEADER), body.dynamic_salt.as_ref());
    let salt = required(salt, "dynamicSalt")?;
    let issued_at = header_millis(headers, DYNAMIC_SALT_TIME_HEADER)?
        .or(body.dynamic_salt_time)
        .ok_or_else(|| ServerError::InvalidArgument("dynamicSaltTime is required".into()))?;
    let valid = api.validate(&app_code, &path, &salt, issued_at).await?;
    Ok(HttpResponse::Ok().json(ValidationResponse { app_code, path, valid }))
}

//----------------------------------------------   Signatures  -------------------------------------------------------
/// Signs a request on the caller's behalf. Served at the configured sign-issuing path.
///
/// Parameters are included when the `Sign-withParams` header says so. Without the header, they are included whenever
/// the body carries a `parameters` field.
pub async fn sign_generate<A>(
    req: HttpRequest,
    body: Option<web::Json<SignGenerateRequest>>,
    api: web::Data<SignatureApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: SecretResolver + SaltLedger + Clone,
{
    let body = body.map(|b| b.into_inner()).unwrap_or_default();
    let headers = req.headers();
    let with_params = header_flag(headers, WITH_PARAMS_HEADER).unwrap_or(body.parameters.is_some());
    let dynamic_salt_time = header_millis(headers, DYNAMIC_SALT_TIME_HEADER)?
        .or(body.dynamic_salt_time)
        .ok_or_else(|| ServerError::InvalidArgument("dynamicSaltTime is required".into()))?;
    let request = SignRequest {
        app_code: header_or_body(header_string(headers, APP_CODE_HEADER), body.app_code.as_ref()).unwrap_or_default(),
        api_path: header_or_body(header_string(headers, PATH_HEADER), body.path.as_ref()).unwrap_or_default(),
        dynamic_salt: header_or_body(header_string(headers, DYNAMIC_SALT_HEADER), body.dynamic_salt.as_ref())
            .unwrap_or_default(),
        dynamic_salt_time,
        parameters: with_params.then(|| body.parameters.as_ref().map(SignParams::from_json).unwrap_or_default()),
    };
    let signature = api.generate(&request).await?;
    Ok(HttpResponse::Ok().json(SignResponse::from(signature)))
}

route!(sign_validate => Post "/sign-validate" impl SecretResolver, SaltLedger, Clone);
/// Checks a signature made over the given path, parameters and time. Authentication failures are reported as
/// `valid: false`; only backend failures are errors.
pub async fn sign_validate<A>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<SignatureApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: SecretResolver + SaltLedger + Clone,
{
    let headers = req.headers();
    let app_code = required(header_string(headers, APP_CODE_HEADER), "Sign-appCode")?;
    let path = required(header_string(headers, PATH_HEADER), "Sign-path")?;
    let with_params = header_flag(headers, WITH_PARAMS_HEADER).unwrap_or(api.config().default_with_params);
    let parameters = if with_params {
        let params = SignParams::from_json_bytes(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
        Some(params)
    } else {
        None
    };
    let proof = SignatureProof {
        app_code: app_code.clone(),
        api_path: path.clone(),
        timestamp: header_string(headers, TIME_HEADER).and_then(|t| t.parse().ok()),
        signature_value: header_string(headers, SIGN_HEADER).unwrap_or_default(),
        parameters,
    };
    let valid = api.verify_bool(&proof).await?;
    Ok(HttpResponse::Ok().json(ValidationResponse { app_code, path, valid }))
}

//----------------------------------------------   Signed endpoints  -------------------------------------------------
route!(submit_test => Post "/submit-test"
    impl SecretResolver, SaltLedger, Clone where signed with SignPolicy::without_params());
pub async fn submit_test<A>(auth: web::ReqData<Authorized>) -> HttpResponse {
    info!("💻️ Signed test submission from {}", auth.app_code);
    HttpResponse::Ok().json(JsonResponse::success(format!("Hello {}, your signature checks out.", auth.app_code)))
}

route!(submit_with_params => Post "/submit-with-params"
    impl SecretResolver, SaltLedger, Clone where signed with SignPolicy::with_params());
pub async fn submit_with_params<A>(
    auth: web::ReqData<Authorized>,
    body: web::Bytes,
) -> Result<HttpResponse, ServerError> {
    let params = SignParams::from_json_bytes(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    info!("💻️ Signed submission with {} parameters from {}", params.len(), auth.app_code);
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!(
        "Received {} signed parameters from {}",
        params.len(),
        auth.app_code
    ))))
}

route!(user_auth_list => Get "/user-auth-list" impl SecretResolver, SaltLedger, Clone where signed);
/// The path patterns the signed caller may access.
pub async fn user_auth_list<A>(
    auth: web::ReqData<Authorized>,
    pipeline: web::Data<VerificationPipeline<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: SecretResolver + SaltLedger + Clone,
{
    let app_code = auth.into_inner().app_code;
    let paths = pipeline.permitted_paths(&app_code).await?;
    Ok(HttpResponse::Ok().json(PermittedPathsResponse { app_code, paths }))
}

route!(order_by_id => Get "/{id}" impl SecretResolver, SaltLedger, Clone where signed with SignPolicy::require());
/// A templated, signed GET. The signature covers `/api/orders/{id}`, and the query string when the scope includes
/// parameters.
pub async fn order_by_id<A>(
    req: HttpRequest,
    path: web::Path<String>,
    auth: web::ReqData<Authorized>,
) -> HttpResponse {
    let order_id = path.into_inner();
    let filters = SignParams::from_query(req.query_string());
    debug!("💻️ {} fetched order {order_id} with {} filters", auth.app_code, filters.len());
    HttpResponse::Ok().json(json!({
        "orderId": order_id,
        "appCode": auth.app_code,
        "signedPath": auth.api_path,
        "filters": filters.len(),
    }))
}

fn required(value: Option<String>, name: &str) -> Result<String, ServerError> {
    value.ok_or_else(|| ServerError::InvalidArgument(format!("{name} is required")))
}

/// An epoch-millisecond header. Present but malformed is an error rather than absent.
fn header_millis(headers: &actix_web::http::header::HeaderMap, name: &str) -> Result<Option<i64>, ServerError> {
    header_string(headers, name)
        .map(|v| v.parse::<i64>().map_err(|_| ServerError::InvalidArgument(format!("{name} '{v}' is not a timestamp"))))
        .transpose()
}
