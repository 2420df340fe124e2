use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// Body shared by every JSON response: `{success, message, data?, error?}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

pub fn success<T: Serialize>(
    status: StatusCode,
    message: impl Into<String>,
    data: T,
) -> impl IntoResponse {
    (
        status,
        Json(Envelope {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }),
    )
}

pub fn success_empty(status: StatusCode, message: impl Into<String>) -> impl IntoResponse {
    (
        status,
        Json(Envelope::<()> {
            success: true,
            message: message.into(),
            data: None,
            error: None,
        }),
    )
}

pub fn failure(
    status: StatusCode,
    message: impl Into<String>,
    error: Option<serde_json::Value>,
) -> axum::response::Response {
    (
        status,
        Json(Envelope::<()> {
            success: false,
            message: message.into(),
            data: None,
            error,
        }),
    )
        .into_response()
}
