use axum::{
    extract::State,
    routing::get,
    Router,
};

use crate::api::errors::ApiError;
use crate::api::extract::AppJson;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::response::{data, Data};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::settings::WeightsUpdate;
use crate::services::scoring::ScoringWeights;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/weights", get(get_weights).put(update_weights))
        .route("/weights/defaults", get(default_weights))
}

async fn get_weights(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Data<ScoringWeights>, ApiError> {
    let weights = repositories::settings::load_weights(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load scoring weights"))?;
    Ok(data(weights))
}

async fn default_weights(CurrentUser(_user): CurrentUser) -> Data<ScoringWeights> {
    data(ScoringWeights::default())
}

async fn update_weights(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    AppJson(payload): AppJson<WeightsUpdate>,
) -> Result<Data<ScoringWeights>, ApiError> {
    let current = repositories::settings::load_weights(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load scoring weights"))?;
    let weights = payload.merge_into(current);
    weights.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start weights update"))?;
    repositories::settings::save_weights(&mut tx, &weights, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save scoring weights"))?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit weights update"))?;

    tracing::info!(
        admin_id = %admin.id,
        w_conf = weights.w_conf,
        w_days = weights.w_days,
        w_attempts = weights.w_attempts,
        w_time = weights.w_time,
        w_difficulty = weights.w_difficulty,
        w_failed = weights.w_failed,
        w_pattern = weights.w_pattern,
        action = "weights_update",
        "Updated scoring weights"
    );

    Ok(data(weights))
}
