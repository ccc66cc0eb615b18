//! Storefront Core - Shop business logic
//!
//! This crate provides:
//! - Pricing of carts and orders, voucher redemption
//! - Catalog, CSV import and product images
//! - Guest and customer carts, checkout and PayPal capture
//! - Back-office orders, target groups and promotions
//! - Sales reports and the audit trail
//! - Runtime settings and order mail

pub mod model;
pub mod pricing;
pub mod service;

pub use model::*;
