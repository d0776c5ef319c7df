mod records;
mod repositories;

use std::fmt::Debug;

use apisign_common::EpochMillis;
use log::trace;
pub use records::{ApiAuthRecord, ApiInfoRecord, ApiUserRecord, DynamicSaltRecord};
pub use repositories::{ApiAuthRepository, ApiInfoRepository, ApiUserRepository, DynamicSaltRepository};

use super::SqliteDatabase;
use crate::{
    db_types::{ApiDescriptor, AppIdentity, DynamicSalt},
    ResolverError,
    SaltLedger,
    SecretResolver,
};

/// Resolves secrets through record-mapping repositories over the signing tables.
#[derive(Clone)]
pub struct MappedSecretStore {
    url: String,
    users: ApiUserRepository,
    grants: ApiAuthRepository,
    apis: ApiInfoRepository,
    salts: DynamicSaltRepository,
}

impl Debug for MappedSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MappedSecretStore ({})", self.url)
    }
}

impl MappedSecretStore {
    pub fn new(db: &SqliteDatabase) -> Self {
        let pool = db.pool().clone();
        Self {
            url: db.url().to_string(),
            users: ApiUserRepository::new(pool.clone()),
            grants: ApiAuthRepository::new(pool.clone()),
            apis: ApiInfoRepository::new(pool.clone()),
            salts: DynamicSaltRepository::new(pool),
        }
    }

    pub fn salts(&self) -> &DynamicSaltRepository {
        &self.salts
    }
}

impl SecretResolver for MappedSecretStore {
    async fn fetch_identity(&self, app_code: &str) -> Result<Option<AppIdentity>, ResolverError> {
        let Some(user) = self.users.find_by_app_code(app_code).await? else {
            return Ok(None);
        };
        let grants = self.grants.find_by_app_code(app_code).await?;
        trace!("🗃️ Loaded user record #{} with {} grants", user.id, grants.len());
        Ok(Some(user.into_identity(grants)))
    }

    async fn fetch_api_descriptor(&self, api_path: &str) -> Result<Option<ApiDescriptor>, ResolverError> {
        Ok(self.apis.find_by_path(api_path).await?.map(ApiDescriptor::from))
    }
}

impl SaltLedger for MappedSecretStore {
    async fn record_salt(&self, salt: &DynamicSalt) -> Result<(), ResolverError> {
        let record =
            self.salts.save(&salt.app_code, &salt.api_path, &salt.salt_value, salt.issued_at, salt.expires_at).await?;
        trace!("🧂️ Salt record #{} saved", record.id);
        Ok(())
    }

    async fn consume_salt(
        &self,
        app_code: &str,
        api_path: &str,
        salt_value: &str,
        issued_at: EpochMillis,
        now: EpochMillis,
    ) -> Result<bool, ResolverError> {
        // The lookup only finds the row id. Whether this call wins is decided by the conditional update alone.
        match self.salts.find(app_code, api_path, salt_value, issued_at).await? {
            Some(record) => self.salts.mark_used(record.id, now).await,
            None => Ok(false),
        }
    }

    async fn purge_expired_salts(&self, now: EpochMillis) -> Result<u64, ResolverError> {
        self.salts.delete_expired(now).await
    }
}
