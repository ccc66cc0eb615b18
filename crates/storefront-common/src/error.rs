//! Error types and error codes for the storefront
//!
//! This module defines:
//! - `StorefrontError`: Application-specific error enum
//! - `ErrorCode`: Structured error codes for API responses

use serde::{Deserialize, Serialize};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum StorefrontError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("not enough quantity of '{0}'")]
    NotEnoughQuantity(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("authentication error: {0}")]
    AuthError(String),

    #[error("payment error: {0}")]
    PaymentError(String),

    #[error("{2}")]
    ApiError(u16, i32, String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl StorefrontError {
    pub fn illegal(message: impl Into<String>) -> Self {
        StorefrontError::IllegalArgument(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        StorefrontError::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        StorefrontError::Conflict(what.into())
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const PARAMETER_MISSING: ErrorCode<'static> = ErrorCode {
    code: 10000,
    message: "parameter missing",
};

pub const ACCESS_DENIED: ErrorCode<'static> = ErrorCode {
    code: 10001,
    message: "access denied",
};

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

pub const NOT_ENOUGH_QUANTITY: ErrorCode<'static> = ErrorCode {
    code: 20006,
    message: "not enough quantity",
};

pub const PAYMENT_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20007,
    message: "payment error",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};
