use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `{"data": ...}` envelope shared by every successful JSON response.
#[derive(Debug, Serialize)]
pub(crate) struct Data<T> {
    pub(crate) data: T,
}

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub(crate) fn data<T>(data: T) -> Data<T> {
    Data { data }
}
