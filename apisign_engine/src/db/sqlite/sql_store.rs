use std::fmt::Debug;

use apisign_common::EpochMillis;

use super::{api_info, identities, salts, SqliteDatabase};
use crate::{
    db_types::{ApiDescriptor, AppIdentity, DynamicSalt},
    ResolverError,
    SaltLedger,
    SecretResolver,
};

/// Resolves secrets with hand-written parameterised queries against the signing tables.
#[derive(Clone)]
pub struct SqlSecretStore {
    db: SqliteDatabase,
}

impl Debug for SqlSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqlSecretStore ({:?})", self.db)
    }
}

impl SqlSecretStore {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.db
    }
}

impl SecretResolver for SqlSecretStore {
    async fn fetch_identity(&self, app_code: &str) -> Result<Option<AppIdentity>, ResolverError> {
        let mut conn = self.db.pool().acquire().await?;
        identities::fetch_identity(app_code, &mut conn).await
    }

    async fn fetch_api_descriptor(&self, api_path: &str) -> Result<Option<ApiDescriptor>, ResolverError> {
        let mut conn = self.db.pool().acquire().await?;
        api_info::fetch_api_descriptor(api_path, &mut conn).await
    }
}

impl SaltLedger for SqlSecretStore {
    async fn record_salt(&self, salt: &DynamicSalt) -> Result<(), ResolverError> {
        let mut conn = self.db.pool().acquire().await?;
        salts::insert_salt(salt, &mut conn).await
    }

    async fn consume_salt(
        &self,
        app_code: &str,
        api_path: &str,
        salt_value: &str,
        issued_at: EpochMillis,
        now: EpochMillis,
    ) -> Result<bool, ResolverError> {
        let mut conn = self.db.pool().acquire().await?;
        salts::consume_salt(app_code, api_path, salt_value, issued_at, now, &mut conn).await
    }

    async fn purge_expired_salts(&self, now: EpochMillis) -> Result<u64, ResolverError> {
        let mut conn = self.db.pool().acquire().await?;
        salts::purge_expired(now, &mut conn).await
    }
}
