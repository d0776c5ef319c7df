use apisign_common::{EpochMillis, Secret};
use log::trace;

use crate::{
    db_types::{ApiDescriptor, AppIdentity},
    ResolverError,
};

/// The `SecretResolver` trait is the seam between the signing engine and wherever caller secrets and permissions are
/// kept.
///
/// Backends only have to load records ([`fetch_identity`] and [`fetch_api_descriptor`]). The provided methods layer
/// the protocol semantics on top, so every backend treats inactive, expired and unknown callers the same way:
/// * an unusable identity resolves to no secret and no permissions,
/// * absence is `Ok(None)` / `Ok(false)`, never an error,
/// * only store failures are returned as [`ResolverError`].
///
/// [`fetch_identity`]: SecretResolver::fetch_identity
/// [`fetch_api_descriptor`]: SecretResolver::fetch_api_descriptor
#[allow(async_fn_in_trait)]
pub trait SecretResolver {
    /// Loads the identity for `app_code`, including its permitted and forbidden paths, regardless of its status.
    async fn fetch_identity(&self, app_code: &str) -> Result<Option<AppIdentity>, ResolverError>;

    /// Loads the descriptor registered for the route template `api_path`.
    async fn fetch_api_descriptor(&self, api_path: &str) -> Result<Option<ApiDescriptor>, ResolverError>;

    /// The shared secret for `app_code`, provided the identity is usable at `now`.
    async fn resolve_secret(
        &self,
        app_code: &str,
        api_path: &str,
        now: EpochMillis,
    ) -> Result<Option<Secret<String>>, ResolverError> {
        let identity = self.fetch_identity(app_code).await?;
        let secret = identity.filter(|id| id.is_usable(now)).map(|id| id.secret_key);
        trace!("🔐️ Secret lookup for {app_code} on {api_path}: found = {}", secret.is_some());
        Ok(secret)
    }

    /// Whether `app_code` may call `api_path` at `now`.
    async fn has_permission(&self, app_code: &str, api_path: &str, now: EpochMillis) -> Result<bool, ResolverError> {
        let permitted = self
            .fetch_identity(app_code)
            .await?
            .map(|id| id.is_usable(now) && id.permits(api_path))
            .unwrap_or(false);
        trace!("🔐️ Permission check for {app_code} on {api_path}: {permitted}");
        Ok(permitted)
    }

    /// The permission entries granted to `app_code`. Unusable identities have none.
    async fn list_permitted_paths(&self, app_code: &str, now: EpochMillis) -> Result<Vec<String>, ResolverError> {
        let paths = self
            .fetch_identity(app_code)
            .await?
            .filter(|id| id.is_usable(now))
            .map(|id| id.permitted_paths)
            .unwrap_or_default();
        Ok(paths)
    }
}
