//! Permission service

use std::collections::HashSet;

use storefront_common::permission::ADMIN_ROLE;
use storefront_persistence::entity::{permissions, role_permissions, roles, staff_roles};
use storefront_persistence::query::ilike;
use storefront_persistence::sea_orm::*;

pub async fn find_all(db: &DatabaseConnection) -> anyhow::Result<Vec<String>> {
    let names = permissions::Entity::find()
        .select_only()
        .column(permissions::Column::Name)
        .order_by_asc(permissions::Column::Name)
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(names)
}

/// Permission names matching `term`, for autocompletion
pub async fn search(
    db: &DatabaseConnection,
    term: &str,
    limit: u64,
) -> anyhow::Result<Vec<String>> {
    let names = permissions::Entity::find()
        .select_only()
        .column(permissions::Column::Name)
        .filter(ilike(permissions::Column::Name, term))
        .order_by_asc(permissions::Column::Name)
        .limit(limit)
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(names)
}

/// Resolve permission names to ids, rejecting unknown names.
pub async fn ids_by_names(
    db: &impl ConnectionTrait,
    names: &[String],
) -> anyhow::Result<Vec<i64>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let found = permissions::Entity::find()
        .filter(permissions::Column::Name.is_in(names.to_vec()))
        .all(db)
        .await?;

    if let Some(missing) = names
        .iter()
        .find(|n| !found.iter().any(|p| &p.name == *n))
    {
        return Err(storefront_common::StorefrontError::not_found(format!(
            "permission '{}'",
            missing
        ))
        .into());
    }

    Ok(found.into_iter().map(|p| p.id).collect())
}

/// Permission names granted to a role
pub async fn find_by_role(db: &impl ConnectionTrait, role_id: i64) -> anyhow::Result<Vec<String>> {
    let names = permissions::Entity::find()
        .select_only()
        .column(permissions::Column::Name)
        .inner_join(role_permissions::Entity)
        .filter(role_permissions::Column::RoleId.eq(role_id))
        .order_by_asc(permissions::Column::Name)
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(names)
}

/// Effective permissions of a staff member, the union over their live roles.
///
/// The admin role grants the whole catalogue.
pub async fn find_by_staff(
    db: &DatabaseConnection,
    staff_id: i64,
) -> anyhow::Result<StaffPermissions> {
    let role_list = roles::Entity::find()
        .inner_join(staff_roles::Entity)
        .filter(staff_roles::Column::StaffId.eq(staff_id))
        .filter(roles::Column::DeletedAt.is_null())
        .all(db)
        .await?;

    if role_list.iter().any(|r| r.name == ADMIN_ROLE) {
        return Ok(StaffPermissions::Admin);
    }

    let role_ids: Vec<i64> = role_list.iter().map(|r| r.id).collect();
    if role_ids.is_empty() {
        return Ok(StaffPermissions::Granted(HashSet::new()));
    }

    let names = permissions::Entity::find()
        .select_only()
        .column(permissions::Column::Name)
        .inner_join(role_permissions::Entity)
        .filter(role_permissions::Column::RoleId.is_in(role_ids))
        .distinct()
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(StaffPermissions::Granted(names.into_iter().collect()))
}

/// What a staff member is allowed to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffPermissions {
    Admin,
    Granted(HashSet<String>),
}

impl StaffPermissions {
    pub fn allows(&self, permission: &str) -> bool {
        match self {
            StaffPermissions::Admin => true,
            StaffPermissions::Granted(set) => set.contains(permission),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_permissions_allows() {
        assert!(StaffPermissions::Admin.allows("anything.at.all"));

        let granted = StaffPermissions::Granted(
            ["orders.read".to_string(), "orders.update".to_string()]
                .into_iter()
                .collect(),
        );
        assert!(granted.allows("orders.read"));
        assert!(!granted.allows("orders.delete"));
        assert!(!StaffPermissions::Granted(HashSet::new()).allows("orders.read"));
    }

    #[tokio::test]
    async fn test_find_by_staff_admin_role() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![roles::Model {
                id: 1,
                name: ADMIN_ROLE.to_string(),
                created_at: chrono::Utc::now(),
                deleted_at: None,
            }]])
            .into_connection();

        let perms = find_by_staff(&db, 7).await.unwrap();
        assert_eq!(perms, StaffPermissions::Admin);
    }

    #[tokio::test]
    async fn test_find_by_staff_without_roles() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<roles::Model>::new()])
            .into_connection();

        let perms = find_by_staff(&db, 7).await.unwrap();
        assert!(!perms.allows("orders.read"));
    }
}
