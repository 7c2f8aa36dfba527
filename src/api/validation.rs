use validator::Validate;

use crate::api::errors::ApiError;

pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Rejects blank ids and repeated ids in a client supplied list.
pub(crate) fn validate_unique_ids(ids: &[String], field: &str) -> Result<(), ApiError> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    for id in ids {
        if id.trim().is_empty() {
            return Err(ApiError::BadRequest(format!("{field} must not contain empty ids")));
        }
        if !seen.insert(id.as_str()) {
            return Err(ApiError::BadRequest(format!("{field} contains duplicate id {id}")));
        }
    }
    Ok(())
}
