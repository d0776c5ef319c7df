//! Issues and validates dynamic salts.
//!
//! A dynamic salt binds a caller to one endpoint for a limited time. It is derived from the endpoint's fixed salt, so
//! in stateless mode the server can check a salt by deriving it again. In stateful mode every issued salt is also
//! written to the [`SaltLedger`] and can be consumed exactly once.
use std::fmt::Debug;

use apisign_common::EpochMillis;
use log::*;

use crate::{
    canonical::build_salt_string,
    clock::{older_than, Clock, SystemClock},
    config::{SaltMode, SignConfig},
    db_types::DynamicSalt,
    digest::{digests_match, SignAlgorithm},
    ResolverError,
    SaltLedger,
    SecretResolver,
    SignApiError,
};

/// Salts are always SHA-256, independent of how the eventual signature is computed.
const SALT_ALGORITHM: SignAlgorithm = SignAlgorithm::Sha256;

pub struct DynamicSaltApi<B, C = SystemClock> {
    backend: B,
    config: SignConfig,
    clock: C,
}

impl<B: Debug, C> Debug for DynamicSaltApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DynamicSaltApi ({:?}, {} salts)", self.backend, self.config.salt_mode)
    }
}

impl<B: Clone, C: Clone> Clone for DynamicSaltApi<B, C> {
    fn clone(&self) -> Self {
        Self { backend: self.backend.clone(), config: self.config.clone(), clock: self.clock.clone() }
    }
}

impl<B> DynamicSaltApi<B, SystemClock>
where B: SecretResolver + SaltLedger
{
    pub fn new(backend: B, config: SignConfig) -> Self {
        Self::new_with_clock(backend, config, SystemClock)
    }
}

impl<B, C> DynamicSaltApi<B, C>
where
    B: SecretResolver + SaltLedger,
    C: Clock,
{
    pub fn new_with_clock(backend: B, config: SignConfig, clock: C) -> Self {
        Self { backend, config, clock }
    }

    pub fn config(&self) -> &SignConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Issues a dynamic salt for `app_code` to call `api_path`.
    ///
    /// Fails with
    /// * `InvalidArgument` if either argument is blank, or `api_path` has no descriptor that can derive salts (missing,
    ///   inactive, `NO_SIGN` or without a fixed salt),
    /// * `Forbidden` unless the caller may call both the salt-issuing path and `api_path`. Unknown and inactive callers
    ///   have no permissions, so they land here too.
    pub async fn issue(&self, app_code: &str, api_path: &str) -> Result<DynamicSalt, SignApiError> {
        require("appCode", app_code)?;
        require("path", api_path)?;
        let descriptor = self.backend.fetch_api_descriptor(api_path).await?.ok_or_else(|| {
            debug!("🧂️ No API descriptor registered for {api_path}");
            SignApiError::InvalidArgument(format!("No signing configuration exists for {api_path}"))
        })?;
        let fixed_salt = descriptor.usable_fixed_salt().ok_or_else(|| {
            SignApiError::InvalidArgument(format!("{api_path} does not accept dynamic salts"))
        })?;
        let now = self.clock.now_millis();
        for path in [self.config.salt_generate_path.as_str(), api_path] {
            if !self.backend.has_permission(app_code, path, now).await? {
                info!("🧂️ Salt request denied. {app_code} may not access {path}");
                return Err(SignApiError::forbidden(app_code, path));
            }
        }
        let salt_value = derive_salt(app_code, api_path, fixed_salt, now);
        let salt = DynamicSalt {
            app_code: app_code.to_string(),
            api_path: api_path.to_string(),
            salt_value,
            issued_at: now,
            expires_at: now + self.config.dynamic_salt_ttl_ms(),
            consumed: false,
        };
        if self.config.salt_mode == SaltMode::Stateful {
            self.backend.record_salt(&salt).await?;
        }
        debug!("🧂️ Issued {} dynamic salt to {app_code} for {api_path}", self.config.salt_mode);
        Ok(salt)
    }

    /// Checks a dynamic salt previously issued to `app_code` for `api_path` at `issued_at`.
    ///
    /// In stateful mode a successful check consumes the salt, so it succeeds at most once. Salts dated in the future
    /// are never valid. Only store failures are errors.
    pub async fn validate(
        &self,
        app_code: &str,
        api_path: &str,
        salt_value: &str,
        issued_at: EpochMillis,
    ) -> Result<bool, ResolverError> {
        let now = self.clock.now_millis();
        if issued_at > now {
            debug!("🧂️ Salt for {app_code} on {api_path} is dated {}ms in the future", issued_at - now);
            return Ok(false);
        }
        let valid = match self.config.salt_mode {
            SaltMode::Stateful => {
                self.backend.consume_salt(app_code, api_path, salt_value, issued_at, now).await?
            },
            SaltMode::Stateless => {
                if older_than(now, issued_at, self.config.dynamic_salt_ttl_ms()) {
                    debug!("🧂️ Salt for {app_code} on {api_path} has expired");
                    return Ok(false);
                }
                match self.backend.fetch_api_descriptor(api_path).await? {
                    Some(descriptor) => descriptor
                        .usable_fixed_salt()
                        .map(|fixed| digests_match(&derive_salt(app_code, api_path, fixed, issued_at), salt_value))
                        .unwrap_or(false),
                    None => false,
                }
            },
        };
        if !valid {
            debug!("🧂️ Salt for {app_code} on {api_path} did not validate");
        }
        Ok(valid)
    }

    /// Removes expired salts from the ledger. Nothing is stored in stateless mode, so this is then a no-op.
    pub async fn purge_expired(&self) -> Result<u64, ResolverError> {
        if self.config.salt_mode == SaltMode::Stateless {
            return Ok(0);
        }
        self.backend.purge_expired_salts(self.clock.now_millis()).await
    }
}

/// `sha256(appCode ++ apiPath ++ fixedSalt ++ issuedAt)` as lowercase hex.
pub fn derive_salt(app_code: &str, api_path: &str, fixed_salt: &str, issued_at: EpochMillis) -> String {
    SALT_ALGORITHM.hex_digest(&build_salt_string(app_code, api_path, fixed_salt, issued_at))
}

pub(crate) fn require(name: &str, value: &str) -> Result<(), SignApiError> {
    if value.trim().is_empty() {
        Err(SignApiError::InvalidArgument(format!("{name} is required")))
    } else {
        Ok(())
    }
}
