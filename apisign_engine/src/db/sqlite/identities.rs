use apisign_common::Secret;
use log::debug;
use sqlx::{Row, SqliteConnection};

use crate::{
    db_types::{AppIdentity, RecordStatus},
    ResolverError,
};

/// Loads the identity for `app_code` together with its path grants.
pub async fn fetch_identity(app_code: &str, conn: &mut SqliteConnection) -> Result<Option<AppIdentity>, ResolverError> {
    let row = sqlx::query(
        "SELECT app_code, app_secret, description, status, expire_time FROM api_users WHERE app_code = ? LIMIT 1",
    )
    .bind(app_code)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let mut identity = AppIdentity {
        app_code: row.try_get("app_code")?,
        secret_key: Secret::new(row.try_get::<String, _>("app_secret")?),
        description: row.try_get("description")?,
        status: RecordStatus::from_flag(row.try_get("status")?),
        expire_time: row.try_get("expire_time")?,
        permitted_paths: vec![],
        forbidden_paths: vec![],
    };
    let grants = sqlx::query("SELECT api_path, status FROM api_auth WHERE app_code = ? ORDER BY id")
        .bind(app_code)
        .fetch_all(&mut *conn)
        .await?;
    for grant in grants {
        let path: String = grant.try_get("api_path")?;
        match RecordStatus::from_flag(grant.try_get("status")?) {
            RecordStatus::Active => identity.permitted_paths.push(path),
            RecordStatus::Inactive => identity.forbidden_paths.push(path),
        }
    }
    Ok(Some(identity))
}

/// Inserts a caller and its grants. Identities are administered outside the signing protocol; this exists for
/// provisioning tools and tests.
pub async fn insert_identity(identity: &AppIdentity, conn: &mut SqliteConnection) -> Result<i64, ResolverError> {
    let id = sqlx::query(
        "INSERT INTO api_users (app_code, app_secret, description, status, expire_time) VALUES (?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(&identity.app_code)
    .bind(identity.secret_key.reveal())
    .bind(&identity.description)
    .bind(identity.status.as_flag())
    .bind(identity.expire_time)
    .fetch_one(&mut *conn)
    .await?
    .try_get::<i64, _>("id")?;
    for path in &identity.permitted_paths {
        set_grant(&identity.app_code, path, true, conn).await?;
    }
    for path in &identity.forbidden_paths {
        set_grant(&identity.app_code, path, false, conn).await?;
    }
    debug!("🗃️ Inserted identity {} with id {id}", identity.app_code);
    Ok(id)
}

/// Permits (or explicitly forbids) `api_path` for `app_code`, replacing any existing grant for the same path.
pub async fn set_grant(
    app_code: &str,
    api_path: &str,
    permitted: bool,
    conn: &mut SqliteConnection,
) -> Result<(), ResolverError> {
    sqlx::query(
        "INSERT INTO api_auth (app_code, api_path, status) VALUES (?, ?, ?) \
         ON CONFLICT (app_code, api_path) DO UPDATE SET status = excluded.status",
    )
    .bind(app_code)
    .bind(api_path)
    .bind(i64::from(permitted))
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_identity_status(
    app_code: &str,
    status: RecordStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, ResolverError> {
    let result = sqlx::query("UPDATE api_users SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE app_code = ?")
        .bind(status.as_flag())
        .bind(app_code)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
