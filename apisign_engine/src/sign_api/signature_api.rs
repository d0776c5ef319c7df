//! Issues and verifies request signatures.
use std::fmt::Debug;

use apisign_common::EpochMillis;
use log::*;

use super::salt_api::{require, DynamicSaltApi};
use crate::{
    canonical::{build_canonical_string, SignParams},
    clock::{older_than, Clock, SystemClock},
    config::SignConfig,
    db_types::{ApiType, IssuedSignature, SignatureProof},
    digest::{digests_match, SignAlgorithm},
    ResolverError,
    SaltLedger,
    SecretResolver,
    SignApiError,
};

/// Everything a caller supplies to have the server sign a request for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignRequest {
    pub app_code: String,
    pub api_path: String,
    pub dynamic_salt: String,
    pub dynamic_salt_time: EpochMillis,
    /// `Some` selects the parameter-inclusive canonical form, even if the set is empty.
    pub parameters: Option<SignParams>,
}

/// Computes a signature. The digest is SM3 when `params` is given, and SHA-256 otherwise.
pub fn compute_signature(
    app_code: &str,
    secret: &str,
    api_path: &str,
    timestamp: EpochMillis,
    params: Option<&SignParams>,
) -> String {
    let algorithm = SignAlgorithm::for_signature(params.is_some());
    algorithm.hex_digest(&build_canonical_string(app_code, secret, api_path, timestamp, params))
}

pub struct SignatureApi<B, C = SystemClock> {
    backend: B,
    config: SignConfig,
    clock: C,
    salts: DynamicSaltApi<B, C>,
}

impl<B: Debug, C> Debug for SignatureApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignatureApi ({:?})", self.backend)
    }
}

impl<B: Clone, C: Clone> Clone for SignatureApi<B, C> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
            salts: self.salts.clone(),
        }
    }
}

impl<B> SignatureApi<B, SystemClock>
where B: SecretResolver + SaltLedger + Clone
{
    pub fn new(backend: B, config: SignConfig) -> Self {
        Self::new_with_clock(backend, config, SystemClock)
    }
}

impl<B, C> SignatureApi<B, C>
where
    B: SecretResolver + SaltLedger + Clone,
    C: Clock,
{
    pub fn new_with_clock(backend: B, config: SignConfig, clock: C) -> Self {
        let salts = DynamicSaltApi::new_with_clock(backend.clone(), config.clone(), clock.clone());
        Self { backend, config, clock, salts }
    }

    pub fn salts(&self) -> &DynamicSaltApi<B, C> {
        &self.salts
    }

    pub fn config(&self) -> &SignConfig {
        &self.config
    }

    pub fn now(&self) -> EpochMillis {
        self.clock.now_millis()
    }

    /// Signs a request on the caller's behalf, after checking the dynamic salt they obtained for the same path.
    ///
    /// Permissions for the sign-issuing path and the target path are checked before the salt, so a denied request
    /// does not use up a stateful salt.
    pub async fn generate(&self, request: &SignRequest) -> Result<IssuedSignature, SignApiError> {
        let SignRequest { app_code, api_path, dynamic_salt, dynamic_salt_time, parameters } = request;
        require("appCode", app_code)?;
        require("path", api_path)?;
        require("dynamicSalt", dynamic_salt)?;
        if let Some(descriptor) = self.backend.fetch_api_descriptor(api_path).await? {
            if descriptor.api_type == ApiType::NoSign {
                return Err(SignApiError::InvalidArgument(format!("{api_path} does not require a signature")));
            }
        }
        let now = self.clock.now_millis();
        for path in [self.config.sign_generate_path.as_str(), api_path.as_str()] {
            if !self.backend.has_permission(app_code, path, now).await? {
                info!("🔐️ Signature request denied. {app_code} may not access {path}");
                return Err(SignApiError::forbidden(app_code.as_str(), path));
            }
        }
        if !self.salts.validate(app_code, api_path, dynamic_salt, *dynamic_salt_time).await? {
            return Err(SignApiError::InvalidArgument("dynamic salt validation failed".into()));
        }
        let secret = self.backend.resolve_secret(app_code, api_path, now).await?.ok_or(SignApiError::Unknown)?;
        let timestamp = self.clock.now_millis();
        let signature_value = compute_signature(app_code, secret.reveal(), api_path, timestamp, parameters.as_ref());
        debug!(
            "🔐️ Issued {} signature to {app_code} for {api_path}",
            SignAlgorithm::for_signature(parameters.is_some())
        );
        Ok(IssuedSignature {
            app_code: app_code.clone(),
            api_path: api_path.clone(),
            signature_value,
            timestamp,
            expires_at: Some(timestamp + self.config.signature_ttl_ms()),
        })
    }

    /// Verifies a signature proof.
    ///
    /// Fails with
    /// * `InvalidArgument` when the timestamp, app code or signature is missing,
    /// * `Expired` when the timestamp is in the future or older than the signature TTL,
    /// * `Unknown` when the caller cannot be resolved or the signature does not match.
    pub async fn verify(&self, proof: &SignatureProof) -> Result<(), SignApiError> {
        let SignatureProof { app_code, api_path, timestamp, signature_value, parameters } = proof;
        require("appCode", app_code)?;
        require("sign", signature_value)?;
        let timestamp = timestamp.ok_or_else(|| SignApiError::InvalidArgument("timestamp is required".into()))?;
        let now = self.clock.now_millis();
        if timestamp > now {
            debug!("🔐️ Signature from {app_code} is dated {}ms in the future", timestamp - now);
            return Err(SignApiError::Expired("timestamp is in the future".into()));
        }
        if older_than(now, timestamp, self.config.signature_ttl_ms()) {
            debug!("🔐️ Signature from {app_code} is dated {timestamp}, outside the TTL window");
            return Err(SignApiError::Expired("signature has expired".into()));
        }
        let secret = self.backend.resolve_secret(app_code, api_path, now).await?.ok_or_else(|| {
            debug!("🔐️ No usable secret for {app_code}");
            SignApiError::Unknown
        })?;
        let expected = compute_signature(app_code, secret.reveal(), api_path, timestamp, parameters.as_ref());
        if digests_match(&expected, signature_value) {
            trace!("🔐️ Signature from {app_code} for {api_path} verified");
            Ok(())
        } else {
            debug!("🔐️ Signature mismatch for {app_code} on {api_path}");
            Err(SignApiError::Unknown)
        }
    }

    /// Like [`verify`](Self::verify), but every authentication failure is `Ok(false)`. Only store failures are errors.
    pub async fn verify_bool(&self, proof: &SignatureProof) -> Result<bool, ResolverError> {
        match self.verify(proof).await {
            Ok(()) => Ok(true),
            Err(SignApiError::Infrastructure(e)) => Err(e),
            Err(_) => Ok(false),
        }
    }
}
