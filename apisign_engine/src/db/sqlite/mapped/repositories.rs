//! Repository objects over the signing tables. Each owns a handle to the pool and speaks in records.
use apisign_common::EpochMillis;
use sqlx::SqlitePool;

use super::records::{ApiAuthRecord, ApiInfoRecord, ApiUserRecord, DynamicSaltRecord};
use crate::ResolverError;

#[derive(Debug, Clone)]
pub struct ApiUserRepository {
    pool: SqlitePool,
}

impl ApiUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_app_code(&self, app_code: &str) -> Result<Option<ApiUserRecord>, ResolverError> {
        let record = sqlx::query_as::<_, ApiUserRecord>("SELECT * FROM api_users WHERE app_code = ?")
            .bind(app_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}

#[derive(Debug, Clone)]
pub struct ApiAuthRepository {
    pool: SqlitePool,
}

impl ApiAuthRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_app_code(&self, app_code: &str) -> Result<Vec<ApiAuthRecord>, ResolverError> {
        let records = sqlx::query_as::<_, ApiAuthRecord>(
            "SELECT id, app_code, api_path, status FROM api_auth WHERE app_code = ? ORDER BY id",
        )
        .bind(app_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

#[derive(Debug, Clone)]
pub struct ApiInfoRepository {
    pool: SqlitePool,
}

impl ApiInfoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_path(&self, api_path: &str) -> Result<Option<ApiInfoRecord>, ResolverError> {
        let record = sqlx::query_as::<_, ApiInfoRecord>(
            "SELECT id, api_path, api_name, api_type, fixed_salt, status FROM api_info WHERE api_path = ?",
        )
        .bind(api_path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

#[derive(Debug, Clone)]
pub struct DynamicSaltRepository {
    pool: SqlitePool,
}

impl DynamicSaltRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(
        &self,
        app_code: &str,
        api_path: &str,
        salt_value: &str,
        salt_timestamp: EpochMillis,
        expire_time: EpochMillis,
    ) -> Result<DynamicSaltRecord, ResolverError> {
        let record = sqlx::query_as::<_, DynamicSaltRecord>(
            "INSERT INTO api_dynamic_salt_log (app_code, api_path, salt_value, salt_timestamp, expire_time, used) \
             VALUES (?, ?, ?, ?, ?, 0) ON CONFLICT (app_code, api_path, salt_value, salt_timestamp) DO UPDATE SET \
             expire_time = api_dynamic_salt_log.expire_time RETURNING id, app_code, api_path, salt_value, \
             salt_timestamp, expire_time, used",
        )
        .bind(app_code)
        .bind(api_path)
        .bind(salt_value)
        .bind(salt_timestamp)
        .bind(expire_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn find(
        &self,
        app_code: &str,
        api_path: &str,
        salt_value: &str,
        salt_timestamp: EpochMillis,
    ) -> Result<Option<DynamicSaltRecord>, ResolverError> {
        let record = sqlx::query_as::<_, DynamicSaltRecord>(
            "SELECT id, app_code, api_path, salt_value, salt_timestamp, expire_time, used FROM api_dynamic_salt_log \
             WHERE app_code = ? AND api_path = ? AND salt_value = ? AND salt_timestamp = ?",
        )
        .bind(app_code)
        .bind(api_path)
        .bind(salt_value)
        .bind(salt_timestamp)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Flips `used` on the record with the given id, but only if it is still unused and unexpired at `now`.
    pub async fn mark_used(&self, id: i64, now: EpochMillis) -> Result<bool, ResolverError> {
        let result =
            sqlx::query("UPDATE api_dynamic_salt_log SET used = 1 WHERE id = ? AND used = 0 AND expire_time >= ?")
                .bind(id)
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_expired(&self, now: EpochMillis) -> Result<u64, ResolverError> {
        let result =
            sqlx::query("DELETE FROM api_dynamic_salt_log WHERE expire_time < ?").bind(now).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
