use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Creates the configured admin account, or repairs its role, status and password.
pub(crate) async fn ensure_seed_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.seed_email.is_empty() {
        return Ok(());
    }
    if admin.seed_password.is_empty() {
        tracing::warn!("SEED_ADMIN_PASSWORD not configured; skipping admin seeding");
        return Ok(());
    }

    let email = &admin.seed_email;
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_email(state.db(), email).await? {
        let verified =
            security::verify_password(&admin.seed_password, &user.hashed_password).unwrap_or(false);
        let hashed_password =
            if verified { None } else { Some(security::hash_password(&admin.seed_password)?) };

        let needs_update = hashed_password.is_some() || !user.is_admin() || !user.is_active;
        if !needs_update {
            tracing::info!(email = %email, "Seed admin already up to date");
            return Ok(());
        }

        repositories::users::update(
            state.db(),
            &user.id,
            repositories::users::UpdateUser {
                name: None,
                role: Some(UserRole::Admin),
                is_active: Some(true),
                hashed_password,
                updated_at: now,
            },
        )
        .await?;

        tracing::info!(email = %email, user_id = %user.id, "Repaired seed admin");
        return Ok(());
    }

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email,
            name: Some(admin.seed_name.as_str()),
            hashed_password: security::hash_password(&admin.seed_password)?,
            role: UserRole::Admin,
            is_active: true,
            now,
        },
    )
    .await?;

    tracing::info!(email = %email, user_id = %user.id, "Created seed admin");
    Ok(())
}
