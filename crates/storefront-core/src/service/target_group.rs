//! Target groups: named snapshots of the customers matching a set of
//! filters, used to hand out promotion vouchers

use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_auth::Customer;
use storefront_common::utils::is_valid_name;
use storefront_common::{AUDIT_TARGET, StorefrontError};
use storefront_persistence::Page;
use storefront_persistence::entity::{
    target_group_filters, target_group_users, target_groups, users,
};
use storefront_persistence::query::{count, ilike};
use storefront_persistence::sea_orm::sea_query::Expr;
use storefront_persistence::sea_orm::*;

/// Customer filters of a target group. Text filters match case-insensitive
/// substrings, `birthday` is `MM/DD`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetGroupFilters {
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub user_id: Option<i64>,
    pub gender: String,
    pub birthday: String,
}

impl TargetGroupFilters {
    /// Parse `MM/DD` into `(month, day)`.
    pub fn birthday_month_day(&self) -> anyhow::Result<Option<(u32, u32)>> {
        if self.birthday.is_empty() {
            return Ok(None);
        }

        let invalid = || StorefrontError::illegal(format!("invalid birthday '{}'", self.birthday));
        let (month, day) = self.birthday.split_once('/').ok_or_else(invalid)?;
        let month: u32 = month.trim().parse().map_err(|_| invalid())?;
        let day: u32 = day.trim().parse().map_err(|_| invalid())?;

        // 2000 is a leap year, so 02/29 is accepted
        NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(invalid)?;

        Ok(Some((month, day)))
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::new();
        let text = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("country", &self.country),
            ("gender", &self.gender),
            ("birthday", &self.birthday),
        ];
        for (field, value) in text {
            if !value.is_empty() {
                rows.push((field, value.clone()));
            }
        }
        if let Some(id) = self.user_id {
            rows.push(("user_id", id.to_string()));
        }
        rows
    }

    fn from_rows(rows: &[target_group_filters::Model]) -> Self {
        let mut filters = Self::default();
        for row in rows {
            match row.field.as_str() {
                "first_name" => filters.first_name = row.value.clone(),
                "last_name" => filters.last_name = row.value.clone(),
                "country" => filters.country = row.value.clone(),
                "gender" => filters.gender = row.value.clone(),
                "birthday" => filters.birthday = row.value.clone(),
                "user_id" => filters.user_id = row.value.parse().ok(),
                other => tracing::warn!(field = other, "Unknown target group filter"),
            }
        }
        filters
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGroupInfo {
    pub id: i64,
    pub name: String,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<target_groups::Model> for TargetGroupInfo {
    fn from(value: target_groups::Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            created_at: value.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGroupDetail {
    #[serde(flatten)]
    pub info: TargetGroupInfo,
    pub filters: TargetGroupFilters,
    pub users: Vec<Customer>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetGroupSearch {
    pub name: String,
    pub id: Option<i64>,
    pub created_after: Option<NaiveDate>,
    pub created_before: Option<NaiveDate>,
}

/// Customers matching the filters
pub async fn preview(
    db: &impl ConnectionTrait,
    filters: &TargetGroupFilters,
) -> anyhow::Result<Vec<users::Model>> {
    let birthday = filters.birthday_month_day()?;

    let mut select = users::Entity::find().filter(users::Column::DeletedAt.is_null());

    if !filters.first_name.is_empty() {
        select = select.filter(ilike(users::Column::FirstName, &filters.first_name));
    }
    if !filters.last_name.is_empty() {
        select = select.filter(ilike(users::Column::LastName, &filters.last_name));
    }
    if !filters.country.is_empty() {
        select = select.filter(ilike(users::Column::Country, &filters.country));
    }
    if !filters.gender.is_empty() {
        select = select.filter(ilike(users::Column::Gender, &filters.gender));
    }
    if let Some(id) = filters.user_id {
        select = select.filter(users::Column::Id.eq(id));
    }
    if birthday.is_some() {
        select = select.filter(users::Column::Birthday.is_not_null());
    }

    let candidates = select.order_by_asc(users::Column::Id).all(db).await?;

    Ok(match birthday {
        Some((month, day)) => candidates
            .into_iter()
            .filter(|u| {
                u.birthday
                    .is_some_and(|b| b.month() == month && b.day() == day)
            })
            .collect(),
        None => candidates,
    })
}

pub async fn create(
    db: &DatabaseConnection,
    name: &str,
    filters: &TargetGroupFilters,
    staff_username: &str,
) -> anyhow::Result<TargetGroupDetail> {
    if !is_valid_name(name) {
        return Err(
            StorefrontError::illegal(format!("invalid target group name '{}'", name)).into(),
        );
    }
    filters.birthday_month_day()?;

    let txn = db.begin().await?;

    let existing = target_groups::Entity::find()
        .filter(target_groups::Column::Name.eq(name))
        .one(&txn)
        .await?;

    let group = match existing {
        Some(group) if group.deleted_at.is_none() => {
            return Err(StorefrontError::conflict(format!("target group '{}'", name)).into());
        }
        Some(group) => {
            target_group_filters::Entity::delete_many()
                .filter(target_group_filters::Column::TargetGroupId.eq(group.id))
                .exec(&txn)
                .await?;
            target_group_users::Entity::delete_many()
                .filter(target_group_users::Column::TargetGroupId.eq(group.id))
                .exec(&txn)
                .await?;

            let mut active: target_groups::ActiveModel = group.into();
            active.deleted_at = Set(None);
            active.created_at = Set(Utc::now());
            active.update(&txn).await?
        }
        None => {
            target_groups::ActiveModel {
                name: Set(name.to_string()),
                created_at: Set(Utc::now()),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    let filter_rows = filters.rows();
    if !filter_rows.is_empty() {
        let models = filter_rows
            .into_iter()
            .map(|(field, value)| target_group_filters::ActiveModel {
                target_group_id: Set(group.id),
                field: Set(field.to_string()),
                value: Set(value),
                ..Default::default()
            });
        target_group_filters::Entity::insert_many(models)
            .exec_without_returning(&txn)
            .await?;
    }

    let members = preview(&txn, filters).await?;
    if !members.is_empty() {
        let models = members.iter().map(|u| target_group_users::ActiveModel {
            target_group_id: Set(group.id),
            user_id: Set(u.id),
        });
        target_group_users::Entity::insert_many(models)
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %staff_username,
        is_staff = true,
        "Staff {} created target group '{}' with {} users",
        staff_username,
        group.name,
        members.len()
    );

    Ok(TargetGroupDetail {
        info: group.into(),
        filters: filters.clone(),
        users: members.into_iter().map(Customer::from).collect(),
    })
}

pub async fn find_live(
    db: &impl ConnectionTrait,
    id: i64,
) -> anyhow::Result<target_groups::Model> {
    target_groups::Entity::find_by_id(id)
        .filter(target_groups::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("target group {}", id)).into())
}

/// Ids of the customers snapshotted into a group
pub async fn member_ids(db: &impl ConnectionTrait, group_id: i64) -> anyhow::Result<Vec<i64>> {
    let ids = target_group_users::Entity::find()
        .select_only()
        .column(target_group_users::Column::UserId)
        .filter(target_group_users::Column::TargetGroupId.eq(group_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids)
}

pub async fn search_page(
    db: &DatabaseConnection,
    search: &TargetGroupSearch,
    page_no: u64,
    page_size: u64,
) -> anyhow::Result<Page<TargetGroupInfo>> {
    let mut select =
        target_groups::Entity::find().filter(target_groups::Column::DeletedAt.is_null());

    if !search.name.is_empty() {
        select = select.filter(ilike(target_groups::Column::Name, &search.name));
    }
    if let Some(id) = search.id {
        select = select.filter(target_groups::Column::Id.eq(id));
    }
    if let Some(after) = search.created_after {
        let from = after.and_time(NaiveTime::MIN).and_utc();
        select = select.filter(target_groups::Column::CreatedAt.gte(from));
    }
    if let Some(before) = search.created_before
        && let Some(next) = before.succ_opt()
    {
        let until = next.and_time(NaiveTime::MIN).and_utc();
        select = select.filter(target_groups::Column::CreatedAt.lt(until));
    }

    let total_count = count(select.clone(), db).await?;
    if total_count == 0 {
        return Ok(Page::empty());
    }

    let page_no = page_no.max(1);
    let groups = select
        .order_by_desc(target_groups::Column::CreatedAt)
        .offset((page_no - 1) * page_size)
        .limit(page_size)
        .all(db)
        .await?;

    Ok(Page::new(
        total_count,
        page_no,
        page_size,
        groups.into_iter().map(TargetGroupInfo::from).collect(),
    ))
}

pub async fn view(db: &DatabaseConnection, id: i64) -> anyhow::Result<TargetGroupDetail> {
    let group = find_live(db, id).await?;

    let filter_rows = target_group_filters::Entity::find()
        .filter(target_group_filters::Column::TargetGroupId.eq(group.id))
        .all(db)
        .await?;

    let members = users::Entity::find()
        .join_rev(JoinType::InnerJoin, target_group_users::Relation::Users.def())
        .filter(target_group_users::Column::TargetGroupId.eq(group.id))
        .order_by_asc(users::Column::Id)
        .all(db)
        .await?;

    Ok(TargetGroupDetail {
        info: group.into(),
        filters: TargetGroupFilters::from_rows(&filter_rows),
        users: members.into_iter().map(Customer::from).collect(),
    })
}

pub async fn delete(
    db: &DatabaseConnection,
    ids: &[i64],
    staff_username: &str,
) -> anyhow::Result<u64> {
    let result = target_groups::Entity::update_many()
        .col_expr(target_groups::Column::DeletedAt, Expr::value(Some(Utc::now())))
        .filter(target_groups::Column::Id.is_in(ids.iter().copied()))
        .filter(target_groups::Column::DeletedAt.is_null())
        .exec(db)
        .await?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %staff_username,
        is_staff = true,
        "Staff {} deleted target groups {:?}",
        staff_username,
        ids
    );

    Ok(result.rows_affected)
}
