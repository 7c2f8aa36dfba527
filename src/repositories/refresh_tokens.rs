use time::PrimitiveDateTime;

use crate::db::models::RefreshToken;

const COLUMNS: &str = "id, user_id, token_hash, expires_at, revoked_at, created_at";

pub(crate) struct CreateRefreshToken<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) token_hash: &'a str,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateRefreshToken<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, revoked_at, created_at)
         VALUES ($1,$2,$3,$4,NULL,$5)",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.token_hash)
    .bind(params.expires_at)
    .bind(params.now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Locks the row so two concurrent refreshes cannot both rotate the same token.
pub(crate) async fn find_active_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    token_hash: &str,
    now: PrimitiveDateTime,
) -> Result<Option<RefreshToken>, sqlx::Error> {
    sqlx::query_as::<_, RefreshToken>(&format!(
        "SELECT {COLUMNS} FROM refresh_tokens
         WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > $2
         FOR UPDATE"
    ))
    .bind(token_hash)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn revoke(
    executor: impl sqlx::PgExecutor<'_>,
    token_hash: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = $2
         WHERE token_hash = $1 AND revoked_at IS NULL",
    )
    .bind(token_hash)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn revoke_all_for_user(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = $2
         WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
