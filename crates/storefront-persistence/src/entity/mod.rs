//! SeaORM entity definitions

pub mod prelude;

pub mod categories;
pub mod logs;
pub mod order_items;
pub mod order_vouchers;
pub mod orders;
pub mod paypal_transactions;
pub mod permissions;
pub mod products;
pub mod promotions;
pub mod role_permissions;
pub mod roles;
pub mod settings;
pub mod staff;
pub mod staff_roles;
pub mod target_group_filters;
pub mod target_group_users;
pub mod target_groups;
pub mod transactions;
pub mod user_vouchers;
pub mod users;
pub mod vouchers;
