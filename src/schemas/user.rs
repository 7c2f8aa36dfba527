use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserCreate {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8..128 characters"))]
    pub(crate) password: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must be 1..255 characters"))]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AdminUserUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must be 1..255 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PasswordChange {
    pub(crate) current_password: String,
    #[validate(length(min = 8, max = 128, message = "new_password must be 8..128 characters"))]
    pub(crate) new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AccountDelete {
    #[validate(length(min = 1, message = "password is required"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_payload_validation() {
        let valid = UserCreate {
            email: "ana@example.com".to_string(),
            password: "long-enough".to_string(),
            name: None,
        };
        assert!(valid.validate().is_ok());

        let short = UserCreate { password: "short".to_string(), ..valid };
        assert!(short.validate().is_err());

        let bad_email = UserCreate {
            email: "not-an-email".to_string(),
            password: "long-enough".to_string(),
            name: Some("Ana".to_string()),
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
