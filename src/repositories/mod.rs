pub(crate) mod attempts;
pub(crate) mod patterns;
pub(crate) mod problems;
pub(crate) mod refresh_tokens;
pub(crate) mod sessions;
pub(crate) mod settings;
pub(crate) mod stats;
pub(crate) mod users;
