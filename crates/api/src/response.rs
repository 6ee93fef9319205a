//! API response types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard API response wrapper.
///
/// Errors use the same shape; see `AppError`'s `IntoResponse`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub errors: Vec<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: String::new(),
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            errors: Vec::new(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `201 Created` with a `Location` header.
#[derive(Debug)]
pub struct Created<T: Serialize> {
    location: String,
    body: ApiResponse<T>,
}

impl<T: Serialize> Created<T> {
    /// Created resource at `/api/{resource}/{id}`.
    pub fn at(resource: &str, id: i32, data: T) -> Self {
        Self {
            location: format!("/api/{resource}/{id}"),
            body: ApiResponse::ok(data).with_message("Created"),
        }
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::CREATED, Json(self.body)).into_response();
        if let Ok(location) = HeaderValue::from_str(&self.location) {
            response.headers_mut().insert(header::LOCATION, location);
        }
        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_created_sets_location() {
        let response = Created::at("appraisals", 7, serde_json::json!({"id": 7})).into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/api/appraisals/7"
        );
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = ApiResponse::ok(vec![1, 2]).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["data"][1], 2);
        assert!(body["errors"].as_array().unwrap().is_empty());
    }
}
