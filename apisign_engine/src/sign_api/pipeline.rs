//! # Request verification
//!
//! [`VerificationPipeline::authorize`] takes one inbound request from "nothing known" to allowed or denied:
//!
//! ```text
//! Unauthenticated -> HeadersExtracted -> TimestampChecked -> PermissionChecked -> SignatureVerified
//!        \                 \                    \                    \
//!         +-----------------+--------------------+--------------------+--> Rejected
//! ```
//!
//! The pipeline is transport-agnostic. The host supplies the raw proof headers, the route template it matched, and
//! the (already buffered) body and query string.
use std::fmt::Display;

use log::*;

use super::signature_api::SignatureApi;
use crate::{
    canonical::SignParams,
    clock::{older_than, Clock, SystemClock},
    db_types::SignatureProof,
    SaltLedger,
    SecretResolver,
    SignApiError,
};

/// The stage a request had reached when it was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStage {
    Unauthenticated,
    HeadersExtracted,
    TimestampChecked,
    PermissionChecked,
}

impl Display for VerificationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerificationStage::Unauthenticated => "unauthenticated",
            VerificationStage::HeadersExtracted => "headers extracted",
            VerificationStage::TimestampChecked => "timestamp checked",
            VerificationStage::PermissionChecked => "permission checked",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct Rejection {
    pub stage: VerificationStage,
    pub error: SignApiError,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rejected after '{}': {}", self.stage, self.error)
    }
}

/// Added to the request by the host once a request has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub app_code: String,
    pub api_path: String,
    pub with_params: bool,
}

/// What the host knows about a request.
#[derive(Debug, Clone, Default)]
pub struct SignedRequest {
    pub method: String,
    /// The route template the host matched, e.g. `/api/orders/{id}`. This, not the raw URI, is what gets signed.
    pub canonical_path: String,
    pub app_code: Option<String>,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    /// The path the caller claims to have signed. Informational only.
    pub declared_path: Option<String>,
    pub query: String,
    pub body: Vec<u8>,
}

impl SignedRequest {
    fn has_body(&self) -> bool {
        matches!(self.method.to_ascii_uppercase().as_str(), "POST" | "PUT" | "PATCH")
    }

    /// Parameters come from the JSON body for body-bearing methods and from the query string otherwise.
    pub fn parameters(&self) -> Result<SignParams, SignApiError> {
        if self.has_body() {
            SignParams::from_json_bytes(&self.body)
                .map_err(|e| SignApiError::InvalidArgument(format!("Request body is not valid JSON. {e}")))
        } else {
            Ok(SignParams::from_query(&self.query))
        }
    }
}

pub struct VerificationPipeline<B, C = SystemClock> {
    backend: B,
    signatures: SignatureApi<B, C>,
}

impl<B: Clone, C: Clone> Clone for VerificationPipeline<B, C> {
    fn clone(&self) -> Self {
        Self { backend: self.backend.clone(), signatures: self.signatures.clone() }
    }
}

impl<B, C> VerificationPipeline<B, C>
where
    B: SecretResolver + SaltLedger + Clone,
    C: Clock,
{
    pub fn new(signatures: SignatureApi<B, C>, backend: B) -> Self {
        Self { backend, signatures }
    }

    pub fn signatures(&self) -> &SignatureApi<B, C> {
        &self.signatures
    }

    /// The path patterns `app_code` may currently call. Unusable identities have none.
    pub async fn permitted_paths(&self, app_code: &str) -> Result<Vec<String>, SignApiError> {
        let now = self.signatures.now();
        Ok(self.backend.list_permitted_paths(app_code, now).await?)
    }

    /// Runs every check for one request. Only infrastructure failures should be treated as faults by the host; every
    /// other rejection is an ordinary denial.
    pub async fn authorize(&self, request: &SignedRequest, with_params: bool) -> Result<Authorized, Rejection> {
        use VerificationStage::*;
        let reject = |stage: VerificationStage, error: SignApiError| {
            match &error {
                SignApiError::Infrastructure(e) => {
                    error!("🔐️ Verification of {} failed. {e}", request.canonical_path)
                },
                SignApiError::Expired(m) => debug!("🔐️ {} rejected: {m}", request.canonical_path),
                e => info!("🔐️ {} rejected after '{stage}': {e}", request.canonical_path),
            }
            Rejection { stage, error }
        };

        let app_code = header_value(&request.app_code, "Sign-appCode").map_err(|e| reject(Unauthenticated, e))?;
        let signature = header_value(&request.signature, "Sign-sign").map_err(|e| reject(Unauthenticated, e))?;
        let timestamp = header_value(&request.timestamp, "Sign-time")
            .and_then(|t| {
                t.parse::<i64>()
                    .map_err(|_| SignApiError::InvalidArgument(format!("Sign-time '{t}' is not a timestamp")))
            })
            .map_err(|e| reject(Unauthenticated, e))?;

        let path = request.canonical_path.as_str();
        if let Some(declared) = request.declared_path.as_deref().filter(|d| !d.is_empty() && *d != path) {
            warn!("🔐️ {app_code} declared path {declared}, but the request matched {path}. Using {path}.");
        }

        let now = self.signatures.now();
        if timestamp > now {
            return Err(reject(HeadersExtracted, SignApiError::Expired("timestamp is in the future".into())));
        }
        if older_than(now, timestamp, self.signatures.config().signature_ttl_ms()) {
            return Err(reject(HeadersExtracted, SignApiError::Expired("signature has expired".into())));
        }

        let permitted =
            self.backend.has_permission(app_code, path, now).await.map_err(|e| reject(TimestampChecked, e.into()))?;
        if !permitted {
            let known = self
                .backend
                .resolve_secret(app_code, path, now)
                .await
                .map_err(|e| reject(TimestampChecked, e.into()))?
                .is_some();
            let error = if known { SignApiError::forbidden(app_code, path) } else { SignApiError::Unknown };
            return Err(reject(TimestampChecked, error));
        }

        let parameters =
            if with_params { Some(request.parameters().map_err(|e| reject(PermissionChecked, e))?) } else { None };
        let proof = SignatureProof {
            app_code: app_code.to_string(),
            api_path: path.to_string(),
            timestamp: Some(timestamp),
            signature_value: signature.to_string(),
            parameters,
        };
        self.signatures.verify(&proof).await.map_err(|e| reject(PermissionChecked, e))?;
        debug!("🔐️ {app_code} authorized for {path}");
        Ok(Authorized { app_code: proof.app_code, api_path: proof.api_path, with_params })
    }
}

fn header_value<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, SignApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SignApiError::InvalidArgument(format!("{name} header is required"))),
    }
}
