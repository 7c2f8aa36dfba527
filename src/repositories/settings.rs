use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::services::scoring::ScoringWeights;

/// Stored weights override the defaults key by key; unparseable values are skipped.
pub(crate) async fn load_weights(pool: &PgPool) -> Result<ScoringWeights, sqlx::Error> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT key, value FROM system_settings WHERE key LIKE 'w\\_%'")
            .fetch_all(pool)
            .await?;

    let mut weights = ScoringWeights::default();
    for (key, value) in rows {
        match value.trim().parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => weights.apply(&key, parsed),
            _ => tracing::warn!(key = %key, value = %value, "Ignoring malformed scoring weight"),
        }
    }
    Ok(weights)
}

pub(crate) async fn save_weights(
    executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    weights: &ScoringWeights,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    for (key, value) in weights.entries() {
        sqlx::query(
            "INSERT INTO system_settings (key, value, updated_at)
             VALUES ($1,$2,$3)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at",
        )
        .bind(key)
        .bind(value.to_string())
        .bind(now)
        .execute(&mut **executor)
        .await?;
    }

    Ok(())
}
