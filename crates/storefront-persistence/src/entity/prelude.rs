pub use super::categories::Entity as Categories;
pub use super::logs::Entity as Logs;
pub use super::order_items::Entity as OrderItems;
pub use super::order_vouchers::Entity as OrderVouchers;
pub use super::orders::Entity as Orders;
pub use super::paypal_transactions::Entity as PaypalTransactions;
pub use super::permissions::Entity as Permissions;
pub use super::products::Entity as Products;
pub use super::promotions::Entity as Promotions;
pub use super::role_permissions::Entity as RolePermissions;
pub use super::roles::Entity as Roles;
pub use super::settings::Entity as Settings;
pub use super::staff::Entity as Staff;
pub use super::staff_roles::Entity as StaffRoles;
pub use super::target_group_filters::Entity as TargetGroupFilters;
pub use super::target_group_users::Entity as TargetGroupUsers;
pub use super::target_groups::Entity as TargetGroups;
pub use super::transactions::Entity as Transactions;
pub use super::user_vouchers::Entity as UserVouchers;
pub use super::users::Entity as Users;
pub use super::vouchers::Entity as Vouchers;
