//! HTTP response types
//!
//! Every JSON answer has the `{ code, message, data }` shape.

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::{Deserialize, Serialize};
use storefront_common::error::SUCCESS;

/// Generic result wrapper for API responses
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResult<T> {
    pub fn new(code: i32, message: String, data: T) -> Self {
        ApiResult {
            code,
            message,
            data,
        }
    }

    pub fn success(data: T) -> Self {
        ApiResult {
            code: SUCCESS.code,
            message: SUCCESS.message.to_string(),
            data,
        }
    }

    pub fn http_success(data: T) -> HttpResponse {
        HttpResponse::Ok().json(ApiResult::success(data))
    }

    pub fn http_response(status: u16, code: i32, message: String, data: T) -> HttpResponse {
        HttpResponseBuilder::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        )
        .json(ApiResult::new(code, message, data))
    }
}

/// Body of authentication and authorization failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResult {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ErrorResult {
    pub fn new(status: StatusCode, message: &str, path: &str) -> Self {
        ErrorResult {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or_default().to_string(),
            message: message.to_string(),
            path: path.to_string(),
        }
    }

    pub fn http_response(status: StatusCode, message: &str, path: &str) -> HttpResponse {
        HttpResponseBuilder::new(status).json(ErrorResult::new(status, message, path))
    }

    pub fn unauthorized(message: &str, path: &str) -> HttpResponse {
        Self::http_response(StatusCode::UNAUTHORIZED, message, path)
    }

    pub fn forbidden(message: &str, path: &str) -> HttpResponse {
        Self::http_response(StatusCode::FORBIDDEN, message, path)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;

    use super::*;

    #[actix_web::test]
    async fn test_http_success_body() {
        let response = ApiResult::http_success(vec![1, 2]);
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["message"], "success");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_error_result_reason() {
        let result =
            ErrorResult::new(StatusCode::FORBIDDEN, "authorization failed!", "/api/admin/staff");
        assert_eq!(result.status, 403);
        assert_eq!(result.error, "Forbidden");
        assert_eq!(result.path, "/api/admin/staff");
    }
}
