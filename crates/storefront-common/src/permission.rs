//! Back-office permission catalogue
//!
//! Every admin endpoint is guarded by exactly one of these names. The
//! migration seeds the `permissions` table from [`ALL`].

pub const PRODUCTS_READ: &str = "products.read";
pub const PRODUCTS_CREATE: &str = "products.create";
pub const PRODUCTS_UPDATE: &str = "products.update";
pub const PRODUCTS_DELETE: &str = "products.delete";
pub const PRODUCTS_IMPORT: &str = "products.import";
pub const ACCOUNTS_READ: &str = "accounts.read";
pub const ACCOUNTS_CREATE: &str = "accounts.create";
pub const ACCOUNTS_DELETE: &str = "accounts.delete";
pub const STAFF_READ: &str = "staff.read";
pub const STAFF_CREATE: &str = "staff.create";
pub const STAFF_UPDATE: &str = "staff.update";
pub const STAFF_DELETE: &str = "staff.delete";
pub const CATEGORIES_CREATE: &str = "categories.create";
pub const CATEGORIES_DELETE: &str = "categories.delete";
pub const ROLES_READ: &str = "roles.read";
pub const ROLES_CREATE: &str = "roles.create";
pub const ROLES_UPDATE: &str = "roles.update";
pub const ROLES_DELETE: &str = "roles.delete";
pub const ORDERS_READ: &str = "orders.read";
pub const ORDERS_CREATE: &str = "orders.create";
pub const ORDERS_UPDATE: &str = "orders.update";
pub const ORDERS_DELETE: &str = "orders.delete";
pub const REPORT_READ: &str = "report.read";
pub const REPORT_EXPORT: &str = "report.export";
pub const AUDIT_READ: &str = "audit.read";
pub const SETTINGS_READ: &str = "settings.read";
pub const SETTINGS_UPDATE: &str = "settings.update";
pub const TARGET_GROUPS_READ: &str = "targetgroups.read";
pub const TARGET_GROUPS_CREATE: &str = "targetgroups.create";
pub const TARGET_GROUPS_DELETE: &str = "targetgroups.delete";
pub const PROMOTIONS_READ: &str = "promotions.read";
pub const PROMOTIONS_CREATE: &str = "promotions.create";
pub const PROMOTIONS_DELETE: &str = "promotions.delete";

/// Role that implicitly holds every permission
pub const ADMIN_ROLE: &str = "admin";

pub const ALL: &[&str] = &[
    PRODUCTS_READ,
    PRODUCTS_CREATE,
    PRODUCTS_UPDATE,
    PRODUCTS_DELETE,
    PRODUCTS_IMPORT,
    ACCOUNTS_READ,
    ACCOUNTS_CREATE,
    ACCOUNTS_DELETE,
    STAFF_READ,
    STAFF_CREATE,
    STAFF_UPDATE,
    STAFF_DELETE,
    CATEGORIES_CREATE,
    CATEGORIES_DELETE,
    ROLES_READ,
    ROLES_CREATE,
    ROLES_UPDATE,
    ROLES_DELETE,
    ORDERS_READ,
    ORDERS_CREATE,
    ORDERS_UPDATE,
    ORDERS_DELETE,
    REPORT_READ,
    REPORT_EXPORT,
    AUDIT_READ,
    SETTINGS_READ,
    SETTINGS_UPDATE,
    TARGET_GROUPS_READ,
    TARGET_GROUPS_CREATE,
    TARGET_GROUPS_DELETE,
    PROMOTIONS_READ,
    PROMOTIONS_CREATE,
    PROMOTIONS_DELETE,
];

pub fn is_known(name: &str) -> bool {
    ALL.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_has_no_duplicates() {
        let mut names = ALL.to_vec();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_is_known() {
        assert!(is_known("orders.update"));
        assert!(!is_known("orders.fly"));
    }
}
