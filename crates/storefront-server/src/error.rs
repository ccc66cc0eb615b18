// Mapping of service errors onto HTTP responses

use std::fmt::{Display, Formatter};

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use sea_orm::DbErr;
use storefront_common::StorefrontError;
use storefront_common::error::{
    ACCESS_DENIED, DATA_ACCESS_ERROR, NOT_ENOUGH_QUANTITY, PARAMETER_VALIDATE_ERROR, PAYMENT_ERROR,
    RESOURCE_CONFLICT, RESOURCE_NOT_FOUND, SERVER_ERROR,
};

use crate::model::response::ApiResult;

// Local wrapper so the actix-web error trait can be implemented
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl From<StorefrontError> for AppError {
    fn from(value: StorefrontError) -> Self {
        AppError {
            inner: value.into(),
        }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// HTTP status and API error code for this error
    fn status_and_code(&self) -> (u16, i32) {
        if let Some(e) = self.downcast_ref::<StorefrontError>() {
            return match e {
                StorefrontError::IllegalArgument(_) => (400, PARAMETER_VALIDATE_ERROR.code),
                StorefrontError::NotFound(_) => (404, RESOURCE_NOT_FOUND.code),
                StorefrontError::Conflict(_) => (409, RESOURCE_CONFLICT.code),
                StorefrontError::NotEnoughQuantity(_) => (409, NOT_ENOUGH_QUANTITY.code),
                StorefrontError::AccessDenied(_) => (403, ACCESS_DENIED.code),
                StorefrontError::AuthError(_) => (401, ACCESS_DENIED.code),
                StorefrontError::PaymentError(_) => (402, PAYMENT_ERROR.code),
                StorefrontError::ApiError(status, code, _) => (*status, *code),
                StorefrontError::DatabaseError(_) => (500, DATA_ACCESS_ERROR.code),
                StorefrontError::InternalError(_) => (500, SERVER_ERROR.code),
            };
        }
        if self.downcast_ref::<DbErr>().is_some() {
            return (500, DATA_ACCESS_ERROR.code);
        }
        (500, SERVER_ERROR.code)
    }
}

impl actix_web::error::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_and_code().0).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let (status, code) = self.status_and_code();

        if status >= 500 {
            tracing::error!(error = ?self.inner, "Request failed");
        }

        let message = match self.downcast_ref::<StorefrontError>() {
            Some(e) => e.to_string(),
            None => htmlescape::encode_minimal(&format!("caused: {}", self.inner)),
        };

        ApiResult::<Option<()>>::http_response(status, code, message, None)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::ResponseError;
    use actix_web::body::to_bytes;

    use super::*;

    async fn body_of(err: AppError) -> serde_json::Value {
        let response = err.error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (StorefrontError::illegal("bad"), 400),
            (StorefrontError::not_found("order 3"), 404),
            (StorefrontError::conflict("role 'admin'"), 409),
            (StorefrontError::NotEnoughQuantity("Lamp".to_string()), 409),
            (StorefrontError::AccessDenied("no".to_string()), 403),
            (StorefrontError::AuthError("token expired!".to_string()), 401),
            (StorefrontError::PaymentError("declined".to_string()), 402),
            (StorefrontError::ApiError(418, 7, "teapot".to_string()), 418),
            (StorefrontError::InternalError("boom".to_string()), 500),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code().as_u16(), status);
        }
    }

    #[actix_web::test]
    async fn test_error_body() {
        let json = body_of(StorefrontError::NotEnoughQuantity("Lamp".to_string()).into()).await;
        assert_eq!(json["code"], NOT_ENOUGH_QUANTITY.code);
        assert_eq!(json["message"], "not enough quantity of 'Lamp'");
        assert!(json["data"].is_null());
    }

    #[actix_web::test]
    async fn test_unknown_error_is_escaped() {
        let err = AppError::from(anyhow::anyhow!("<script>"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_of(err).await;
        assert_eq!(json["code"], SERVER_ERROR.code);
        assert_eq!(json["message"], "caused: &lt;script&gt;");
    }

    #[test]
    fn test_database_error() {
        let err = AppError::from(anyhow::Error::from(DbErr::Custom("gone".to_string())));
        assert_eq!(err.status_and_code(), (500, DATA_ACCESS_ERROR.code));
    }
}
