//! Signature verification middleware for Actix Web.
//!
//! Wrap a resource with [`SignatureMiddlewareFactory`] to require a valid `Sign-*` header set before its handler runs.
//! The middleware hands the request to the [`VerificationPipeline`] registered as app data, using the route template
//! actix matched (e.g. `/api/orders/{id}`) as the signed path.
//!
//! When a signature covers the parameters of a POST, PUT or PATCH request, the body is buffered, verified, and then
//! put back so that the handler can still read it.
//!
//! On success, the [`Authorized`] outcome is stored in the request extensions, where handlers can pick it up with
//! `web::ReqData<Authorized>`.
use std::{
    future::{ready, Ready},
    marker::PhantomData,
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use apisign_engine::{
    resolve_policy,
    EffectivePolicy,
    SaltLedger,
    SecretResolver,
    SignPolicy,
    SignedRequest,
    VerificationPipeline,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    errors::ServerError,
    helpers::{header_string, APP_CODE_HEADER, PATH_HEADER, SIGN_HEADER, TIME_HEADER},
};

/// Scope-level signing policy. Register it with `web::scope(..).app_data(ScopeSignPolicy(..))` and it applies to
/// every signed resource in the scope that doesn't say otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ScopeSignPolicy(pub SignPolicy);

pub struct SignatureMiddlewareFactory<A> {
    policy: Option<SignPolicy>,
    _backend: PhantomData<fn() -> A>,
}

impl<A> SignatureMiddlewareFactory<A> {
    /// `policy` is the method-level policy. `None` defers to the scope, then to the global default.
    pub fn new(policy: Option<SignPolicy>) -> Self {
        Self { policy, _backend: PhantomData }
    }
}

impl<S, B, A> Transform<S, ServiceRequest> for SignatureMiddlewareFactory<A>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    A: SecretResolver + SaltLedger + Clone + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S, A>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            policy: self.policy,
            service: Rc::new(service),
            _backend: PhantomData,
        }))
    }
}

pub struct SignatureMiddlewareService<S, A> {
    policy: Option<SignPolicy>,
    service: Rc<S>,
    _backend: PhantomData<fn() -> A>,
}

impl<S, B, A> Service<ServiceRequest> for SignatureMiddlewareService<S, A>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    A: SecretResolver + SaltLedger + Clone + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let method_policy = self.policy;
        Box::pin(async move {
            let pipeline = req.app_data::<web::Data<VerificationPipeline<A>>>().cloned().ok_or_else(|| {
                error!("🔐️ No verification pipeline is registered for {}. Denying access.", req.path());
                ServerError::ConfigurationError("Signature verification is not configured".into())
            })?;
            let scope_policy = req.app_data::<ScopeSignPolicy>().map(|p| p.0);
            let default_with_params = pipeline.signatures().config().default_with_params;
            let with_params = match resolve_policy(method_policy, scope_policy, default_with_params) {
                EffectivePolicy::Skip => {
                    trace!("🔐️ {} does not require a signature", req.path());
                    return service.call(req).await;
                },
                EffectivePolicy::Verify { with_params } => with_params,
            };

            let mut signed = signed_request(&req);
            if with_params && has_body(&signed.method) {
                let data = req.extract::<web::Bytes>().await.map_err(|e| {
                    warn!("🔐️ Failed to extract request data: {e:?}");
                    ServerError::InvalidRequestBody("Failed to extract request data.".into())
                })?;
                signed.body = data.to_vec();
                req.set_payload(bytes_to_payload(data));
            }

            match pipeline.authorize(&signed, with_params).await {
                Ok(authorized) => {
                    trace!("🔐️ Signature check for {} ✅️", signed.canonical_path);
                    req.extensions_mut().insert(authorized);
                    service.call(req).await
                },
                Err(rejection) => Err(ServerError::from(rejection).into()),
            }
        })
    }
}

fn signed_request(req: &ServiceRequest) -> SignedRequest {
    let headers = req.headers();
    SignedRequest {
        method: req.method().as_str().to_string(),
        canonical_path: req.match_pattern().unwrap_or_else(|| req.path().to_string()),
        app_code: header_string(headers, APP_CODE_HEADER),
        signature: header_string(headers, SIGN_HEADER),
        timestamp: header_string(headers, TIME_HEADER),
        declared_path: header_string(headers, PATH_HEADER),
        query: req.query_string().to_string(),
        body: Vec::new(),
    }
}

fn has_body(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH")
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
