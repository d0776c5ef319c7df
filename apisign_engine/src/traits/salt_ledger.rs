use apisign_common::EpochMillis;

use crate::{db_types::DynamicSalt, ResolverError};

/// Storage for dynamic salts issued in stateful mode.
#[allow(async_fn_in_trait)]
pub trait SaltLedger {
    /// Stores a freshly issued salt as unused.
    async fn record_salt(&self, salt: &DynamicSalt) -> Result<(), ResolverError>;

    /// Marks the salt matching all four fields as used, provided it is currently unused and has not expired
    /// (`now <= expires_at`).
    ///
    /// Implementations MUST do the check and the update as one atomic step. Of any number of concurrent calls for the
    /// same salt, exactly one may return `Ok(true)`.
    async fn consume_salt(
        &self,
        app_code: &str,
        api_path: &str,
        salt_value: &str,
        issued_at: EpochMillis,
        now: EpochMillis,
    ) -> Result<bool, ResolverError>;

    /// Deletes salts that had expired by `now` (`expires_at < now`), returning the number removed.
    async fn purge_expired_salts(&self, now: EpochMillis) -> Result<u64, ResolverError>;
}
