use apisign_common::Secret;
use log::{debug, warn};
use sqlx::{Row, SqliteConnection};

use crate::{
    db_types::{ApiDescriptor, ApiType, RecordStatus},
    ResolverError,
};

pub async fn fetch_api_descriptor(
    api_path: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ApiDescriptor>, ResolverError> {
    let row = sqlx::query("SELECT api_path, api_type, fixed_salt, status FROM api_info WHERE api_path = ? LIMIT 1")
        .bind(api_path)
        .fetch_optional(conn)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let api_type: String = row.try_get("api_type")?;
    let api_type = api_type.parse::<ApiType>().unwrap_or_else(|e| {
        warn!("🗃️ {e} for {api_path}. Treating it as NEED_SIGN.");
        ApiType::NeedSign
    });
    let descriptor = ApiDescriptor {
        api_path: row.try_get("api_path")?,
        api_type,
        fixed_salt: row.try_get::<Option<String>, _>("fixed_salt")?.map(Secret::new),
        status: RecordStatus::from_flag(row.try_get("status")?),
    };
    Ok(Some(descriptor))
}

/// Registers (or replaces) the descriptor for a route template.
pub async fn upsert_api_descriptor(
    descriptor: &ApiDescriptor,
    conn: &mut SqliteConnection,
) -> Result<(), ResolverError> {
    sqlx::query(
        "INSERT INTO api_info (api_path, api_type, fixed_salt, status) VALUES (?, ?, ?, ?) ON CONFLICT (api_path) DO \
         UPDATE SET api_type = excluded.api_type, fixed_salt = excluded.fixed_salt, status = excluded.status, \
         updated_at = CURRENT_TIMESTAMP",
    )
    .bind(&descriptor.api_path)
    .bind(descriptor.api_type.to_string())
    .bind(descriptor.fixed_salt.as_ref().map(|s| s.reveal().clone()))
    .bind(descriptor.status.as_flag())
    .execute(conn)
    .await?;
    debug!("🗃️ Saved API descriptor for {}", descriptor.api_path);
    Ok(())
}
