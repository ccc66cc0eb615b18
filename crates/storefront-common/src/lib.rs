//! Storefront Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all storefront components:
//! - Error types and error codes
//! - Fixed-point money and rates
//! - Input validators and paginator helpers
//! - The permission catalogue and setting keys

pub mod error;
pub mod money;
pub mod permission;
pub mod settings;
pub mod utils;

// Re-exports for convenience
pub use error::{ErrorCode, StorefrontError};
pub use money::{MAX_PRICE, Money, Rate};
pub use utils::{PageLink, give_pages};

/// Audit events are emitted on this tracing target and persisted to the `logs` table.
pub const AUDIT_TARGET: &str = "storefront::audit";
