use apisign_common::EpochMillis;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{db_types::DynamicSalt, ResolverError};

pub async fn insert_salt(salt: &DynamicSalt, conn: &mut SqliteConnection) -> Result<(), ResolverError> {
    sqlx::query(
        "INSERT INTO api_dynamic_salt_log (app_code, api_path, salt_value, salt_timestamp, expire_time, used) VALUES \
         (?, ?, ?, ?, ?, 0) ON CONFLICT DO NOTHING",
    )
    .bind(&salt.app_code)
    .bind(&salt.api_path)
    .bind(&salt.salt_value)
    .bind(salt.issued_at)
    .bind(salt.expires_at)
    .execute(conn)
    .await?;
    trace!("🧂️ Salt for {} on {} recorded", salt.app_code, salt.api_path);
    Ok(())
}

/// Marks a matching unused, unexpired salt as used in a single conditional update. Returns true iff this call
/// flipped the flag.
pub async fn consume_salt(
    app_code: &str,
    api_path: &str,
    salt_value: &str,
    issued_at: EpochMillis,
    now: EpochMillis,
    conn: &mut SqliteConnection,
) -> Result<bool, ResolverError> {
    let result = sqlx::query(
        "UPDATE api_dynamic_salt_log SET used = 1 WHERE app_code = ? AND api_path = ? AND salt_value = ? AND \
         salt_timestamp = ? AND used = 0 AND expire_time >= ?",
    )
    .bind(app_code)
    .bind(api_path)
    .bind(salt_value)
    .bind(issued_at)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn purge_expired(now: EpochMillis, conn: &mut SqliteConnection) -> Result<u64, ResolverError> {
    let result = sqlx::query("DELETE FROM api_dynamic_salt_log WHERE expire_time < ?").bind(now).execute(conn).await?;
    let n = result.rows_affected();
    if n > 0 {
        debug!("🧂️ Purged {n} expired salts");
    }
    Ok(n)
}
