use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post, put},
    Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::{AppJson, AppPath, AppQuery};
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::api::response::{data, Data};
use crate::api::validation::validate_payload;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::user::{
    normalize_email, AccountDelete, AdminUserUpdate, PasswordChange, UserCreate, UserResponse,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register).get(list_users))
        .route("/me", get(me).delete(delete_me))
        .route("/me/password", put(change_password))
        .route("/:user_id", patch(update_user).delete(delete_user))
}

async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserCreate>,
) -> Result<(StatusCode, Data<UserResponse>), ApiError> {
    let payload = UserCreate { email: normalize_email(&payload.email), ..payload };
    validate_payload(&payload)?;

    let existing = repositories::users::exists_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &payload.email,
            name: payload.name.as_deref(),
            hashed_password,
            role: UserRole::User,
            is_active: true,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if repositories::users::is_unique_violation(&e) {
            ApiError::Conflict("User with this email already exists".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    tracing::info!(user_id = %user.id, action = "register", "Registered user");
    Ok((StatusCode::CREATED, data(UserResponse::from_db(user))))
}

async fn me(CurrentUser(user): CurrentUser) -> Data<UserResponse> {
    data(UserResponse::from_db(user))
}

async fn change_password(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PasswordChange>,
) -> Result<StatusCode, ApiError> {
    validate_payload(&payload)?;

    let verified = security::verify_password(&payload.current_password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Current password is incorrect"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Current password is incorrect"));
    }

    let hashed_password = security::hash_password(&payload.new_password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;
    let now = primitive_now_utc();

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start password change"))?;

    repositories::users::update(
        &mut *tx,
        &user.id,
        repositories::users::UpdateUser {
            name: None,
            role: None,
            is_active: None,
            hashed_password: Some(hashed_password),
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update password"))?;

    let revoked = repositories::refresh_tokens::revoke_all_for_user(&mut *tx, &user.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to revoke refresh tokens"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit password change"))?;

    tracing::info!(user_id = %user.id, revoked, action = "password_change", "Changed password");
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_me(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AccountDelete>,
) -> Result<StatusCode, ApiError> {
    validate_payload(&payload)?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Password is incorrect"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Password is incorrect"));
    }

    if is_last_active_admin(&user, count_active_admins(&state).await?) {
        return Err(ApiError::Conflict("The last active admin cannot be deleted".to_string()));
    }

    repositories::users::delete(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete account"))?;

    tracing::info!(user_id = %user.id, action = "account_delete", "Deleted account");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Data<PaginatedResponse<UserResponse>>, ApiError> {
    let params = query.params();

    let users = repositories::users::list(state.db(), params.offset(), params.page_size)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;
    let total = repositories::users::count(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count users"))?;

    let items = users.into_iter().map(UserResponse::from_db).collect();
    Ok(data(PaginatedResponse::new(items, total, params)))
}

async fn update_user(
    AppPath(user_id): AppPath<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AdminUserUpdate>,
) -> Result<Data<UserResponse>, ApiError> {
    validate_payload(&payload)?;

    if user_id == admin.id && (payload.role == Some(UserRole::User) || payload.is_active == Some(false))
    {
        return Err(ApiError::BadRequest("Admins cannot demote or deactivate themselves".to_string()));
    }

    let user = repositories::users::update(
        state.db(),
        &user_id,
        repositories::users::UpdateUser {
            name: payload.name,
            role: payload.role,
            is_active: payload.is_active,
            hashed_password: None,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        user_id = %user.id,
        action = "user_update",
        "Admin updated user"
    );

    Ok(data(UserResponse::from_db(user)))
}

async fn delete_user(
    AppPath(user_id): AppPath<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if user_id == admin.id {
        return Err(ApiError::BadRequest(
            "Admins cannot delete themselves here; use DELETE /users/me".to_string(),
        ));
    }

    let target = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if is_last_active_admin(&target, count_active_admins(&state).await?) {
        return Err(ApiError::Conflict("The last active admin cannot be deleted".to_string()));
    }

    let deleted = repositories::users::delete(state.db(), &target.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete user"))?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        user_id = %target.id,
        action = "user_delete",
        "Admin deleted user"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn count_active_admins(state: &AppState) -> Result<i64, ApiError> {
    repositories::users::count_active_admins(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count admins"))
}

fn is_last_active_admin(user: &User, active_admins: i64) -> bool {
    user.role == UserRole::Admin && user.is_active && active_admins <= 1
}
