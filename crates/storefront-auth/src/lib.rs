//! Storefront Auth - Authentication and authorization
//!
//! This crate provides:
//! - JWT token handling for customers and staff
//! - Password hashing
//! - Customer accounts
//! - Staff, Role, Permission services (RBAC)

pub mod model;
pub mod service;

// Re-export commonly used types
pub use model::*;
