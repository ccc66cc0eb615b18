//! Role service

use chrono::Utc;
use storefront_common::StorefrontError;
use storefront_persistence::Page;
use storefront_persistence::entity::{role_permissions, roles};
use storefront_persistence::query::count;
use storefront_persistence::sea_orm::*;

use crate::model::RoleInfo;
use crate::service::permission;

pub async fn find_by_id(db: &impl ConnectionTrait, id: i64) -> anyhow::Result<roles::Model> {
    roles::Entity::find_by_id(id)
        .filter(roles::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("role {}", id)).into())
}

/// Resolve role names to live role ids, rejecting unknown names.
pub async fn ids_by_names(db: &impl ConnectionTrait, names: &[String]) -> anyhow::Result<Vec<i64>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let found = roles::Entity::find()
        .filter(roles::Column::Name.is_in(names.to_vec()))
        .filter(roles::Column::DeletedAt.is_null())
        .all(db)
        .await?;

    if let Some(missing) = names.iter().find(|n| !found.iter().any(|r| &r.name == *n)) {
        return Err(StorefrontError::not_found(format!("role '{}'", missing)).into());
    }

    Ok(found.into_iter().map(|r| r.id).collect())
}

pub async fn search_page(
    db: &DatabaseConnection,
    page_no: u64,
    page_size: u64,
) -> anyhow::Result<Page<RoleInfo>> {
    let select = roles::Entity::find().filter(roles::Column::DeletedAt.is_null());
    let total_count = count(select.clone(), db).await?;

    if total_count > 0 {
        let page_no = page_no.max(1);
        let models = select
            .order_by_asc(roles::Column::Name)
            .offset((page_no - 1) * page_size)
            .limit(page_size)
            .all(db)
            .await?;

        let mut page_items = Vec::with_capacity(models.len());
        for model in models {
            let permissions = permission::find_by_role(db, model.id).await?;
            page_items.push(RoleInfo::from_model(model, permissions));
        }

        return Ok(Page::<RoleInfo>::new(
            total_count,
            page_no,
            page_size,
            page_items,
        ));
    }

    Ok(Page::<RoleInfo>::default())
}

pub async fn find_all_names(db: &DatabaseConnection) -> anyhow::Result<Vec<String>> {
    let names = roles::Entity::find()
        .select_only()
        .column(roles::Column::Name)
        .filter(roles::Column::DeletedAt.is_null())
        .order_by_asc(roles::Column::Name)
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(names)
}

async fn replace_permissions(
    txn: &DatabaseTransaction,
    role_id: i64,
    permission_ids: Vec<i64>,
) -> anyhow::Result<()> {
    role_permissions::Entity::delete_many()
        .filter(role_permissions::Column::RoleId.eq(role_id))
        .exec(txn)
        .await?;

    if !permission_ids.is_empty() {
        let rows = permission_ids
            .into_iter()
            .map(|permission_id| role_permissions::ActiveModel {
                role_id: Set(role_id),
                permission_id: Set(permission_id),
            });
        role_permissions::Entity::insert_many(rows)
            .exec_without_returning(txn)
            .await?;
    }

    Ok(())
}

/// Create a role with the given permissions. A soft-deleted role with the
/// same name is restored and its permissions replaced.
pub async fn create(
    db: &DatabaseConnection,
    name: &str,
    permission_names: &[String],
) -> anyhow::Result<RoleInfo> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorefrontError::illegal("role name must not be empty").into());
    }

    let txn = db.begin().await?;

    let permission_ids = permission::ids_by_names(&txn, permission_names).await?;

    let existing = roles::Entity::find()
        .filter(roles::Column::Name.eq(name))
        .one(&txn)
        .await?;

    let model = match existing {
        Some(role) if role.deleted_at.is_none() => {
            return Err(StorefrontError::conflict(format!("role '{}'", name)).into());
        }
        Some(role) => {
            let mut active: roles::ActiveModel = role.into();
            active.deleted_at = Set(None);
            active.update(&txn).await?
        }
        None => {
            roles::ActiveModel {
                name: Set(name.to_string()),
                created_at: Set(Utc::now()),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    replace_permissions(&txn, model.id, permission_ids).await?;

    let permissions = permission::find_by_role(&txn, model.id).await?;

    txn.commit().await?;

    Ok(RoleInfo::from_model(model, permissions))
}

/// Replace the permission set of a role.
pub async fn update_permissions(
    db: &DatabaseConnection,
    role_id: i64,
    permission_names: &[String],
) -> anyhow::Result<RoleInfo> {
    let txn = db.begin().await?;

    let model = find_by_id(&txn, role_id).await?;
    let permission_ids = permission::ids_by_names(&txn, permission_names).await?;

    replace_permissions(&txn, role_id, permission_ids).await?;

    let permissions = permission::find_by_role(&txn, role_id).await?;

    txn.commit().await?;

    Ok(RoleInfo::from_model(model, permissions))
}

pub async fn delete(db: &DatabaseConnection, role_id: i64) -> anyhow::Result<()> {
    let model = find_by_id(db, role_id).await?;

    let mut active: roles::ActiveModel = model.into();
    active.deleted_at = Set(Some(Utc::now()));
    active.update(db).await?;

    Ok(())
}
