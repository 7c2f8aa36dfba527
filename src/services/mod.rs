pub(crate) mod candidates;
pub(crate) mod scoring;
pub(crate) mod session_generator;
pub(crate) mod session_order;
pub(crate) mod streak;
pub(crate) mod templates;
