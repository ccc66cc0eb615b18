//! Storefront Persistence - Database entities and persistence models
//!
//! This crate provides:
//! - SeaORM entity definitions
//! - Shared model types such as `Page`
//! - Query helpers for filters and counts

pub mod entity;
pub mod model;
pub mod query;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export entity prelude
pub use entity::prelude::*;

pub use model::Page;
