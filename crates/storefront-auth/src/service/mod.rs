//! Account and authorization services

pub mod auth;
pub mod customer;
pub mod permission;
pub mod role;
pub mod staff;
