//! Response envelope.
//!
//! Every JSON body, success or failure, has the shape
//! `{"status": bool, "message": string, "data"?: any}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// JSON envelope plus the HTTP status it is sent with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    code: StatusCode,
    status: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with data.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::OK,
            status: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// 201 with data.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }
}

impl ApiResponse<()> {
    /// Error envelope without data.
    pub fn failure(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status: false,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let body = serde_json::to_value(ApiResponse::ok("Fetched!", vec![1, 2])).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": true, "message": "Fetched!", "data": [1, 2]})
        );
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created("Created!", "x").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
