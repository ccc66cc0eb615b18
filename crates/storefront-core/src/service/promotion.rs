//! Promotions hand a voucher to every customer of a target group

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::utils::{is_valid_name, parse_iso_date};
use storefront_common::{AUDIT_TARGET, MAX_PRICE, Money, StorefrontError};
use storefront_persistence::Page;
use storefront_persistence::entity::{promotions, target_groups, user_vouchers, vouchers};
use storefront_persistence::query::{count, ilike};
use storefront_persistence::sea_orm::sea_query::Expr;
use storefront_persistence::sea_orm::*;

use crate::service::target_group;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    Pending,
    Active,
    Finished,
}

impl PromotionStatus {
    pub fn on(start_date: NaiveDate, end_date: NaiveDate, today: NaiveDate) -> Self {
        if today < start_date {
            PromotionStatus::Pending
        } else if today > end_date {
            PromotionStatus::Finished
        } else {
            PromotionStatus::Active
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionForm {
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub target_group_id: i64,
    pub voucher_value: Money,
    pub voucher_end_date: String,
}

/// Checked dates of a promotion form
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromotionDates {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub voucher_end_date: NaiveDate,
}

impl PromotionForm {
    pub fn validate(&self) -> anyhow::Result<PromotionDates> {
        if !is_valid_name(&self.name) {
            return Err(
                StorefrontError::illegal(format!("invalid promotion name '{}'", self.name)).into(),
            );
        }

        let date = |field: &str, value: &str| {
            parse_iso_date(value).ok_or_else(|| {
                StorefrontError::illegal(format!("{} must be a YYYY-MM-DD date", field))
            })
        };
        let start_date = date("start date", &self.start_date)?;
        let end_date = date("end date", &self.end_date)?;
        let voucher_end_date = date("voucher end date", &self.voucher_end_date)?;

        if end_date < start_date {
            return Err(StorefrontError::illegal("promotion ends before it starts").into());
        }
        if voucher_end_date < end_date {
            return Err(
                StorefrontError::illegal("voucher expires before the promotion ends").into(),
            );
        }
        if !self.voucher_value.is_positive() || self.voucher_value > MAX_PRICE {
            return Err(StorefrontError::illegal(format!(
                "voucher value must be between 0.01 and {}",
                MAX_PRICE
            ))
            .into());
        }

        Ok(PromotionDates {
            start_date,
            end_date,
            voucher_end_date,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromotionSearch {
    pub name: String,
    pub target_group: String,
    pub status: Option<PromotionStatus>,
}

#[derive(Debug, FromQueryResult)]
struct PromotionRow {
    id: i64,
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    target_group_id: i64,
    target_group: String,
    voucher_value_cents: i64,
    voucher_end_date: NaiveDate,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionInfo {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PromotionStatus,
    pub target_group_id: i64,
    pub target_group: String,
    pub voucher_value: Money,
    pub voucher_end_date: NaiveDate,
}

impl PromotionInfo {
    fn from_row(row: PromotionRow, today: NaiveDate) -> Self {
        Self {
            id: row.id,
            status: PromotionStatus::on(row.start_date, row.end_date, today),
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
            target_group_id: row.target_group_id,
            target_group: row.target_group,
            voucher_value: Money::from_cents(row.voucher_value_cents),
            voucher_end_date: row.voucher_end_date,
        }
    }
}

/// Create the promotion and its voucher, and give the voucher to every
/// customer of the target group.
pub async fn create(
    db: &DatabaseConnection,
    form: &PromotionForm,
    staff_username: &str,
) -> anyhow::Result<PromotionInfo> {
    let dates = form.validate()?;

    let txn = db.begin().await?;
    let group = target_group::find_live(&txn, form.target_group_id).await?;

    let existing = promotions::Entity::find()
        .filter(promotions::Column::Name.eq(form.name.as_str()))
        .one(&txn)
        .await?;
    if existing.as_ref().is_some_and(|p| p.deleted_at.is_none()) {
        return Err(StorefrontError::conflict(format!("promotion '{}'", form.name)).into());
    }

    let voucher = vouchers::ActiveModel {
        value_cents: Set(form.voucher_value.cents()),
        end_date: Set(dates.voucher_end_date),
        created_at: Set(Utc::now()),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let promotion = match existing {
        Some(promotion) => {
            let mut active: promotions::ActiveModel = promotion.into();
            active.start_date = Set(dates.start_date);
            active.end_date = Set(dates.end_date);
            active.target_group_id = Set(group.id);
            active.voucher_id = Set(voucher.id);
            active.created_at = Set(Utc::now());
            active.deleted_at = Set(None);
            active.update(&txn).await?
        }
        None => {
            promotions::ActiveModel {
                name: Set(form.name.clone()),
                start_date: Set(dates.start_date),
                end_date: Set(dates.end_date),
                target_group_id: Set(group.id),
                voucher_id: Set(voucher.id),
                created_at: Set(Utc::now()),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    let members = target_group::member_ids(&txn, group.id).await?;
    if !members.is_empty() {
        let rows = members.iter().map(|user_id| user_vouchers::ActiveModel {
            user_id: Set(*user_id),
            voucher_id: Set(voucher.id),
            ..Default::default()
        });
        user_vouchers::Entity::insert_many(rows)
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %staff_username,
        is_staff = true,
        "Staff {} created promotion '{}' for {} users",
        staff_username,
        promotion.name,
        members.len()
    );

    let today = Utc::now().date_naive();
    Ok(PromotionInfo {
        id: promotion.id,
        name: promotion.name,
        start_date: promotion.start_date,
        end_date: promotion.end_date,
        status: PromotionStatus::on(promotion.start_date, promotion.end_date, today),
        target_group_id: group.id,
        target_group: group.name,
        voucher_value: Money::from_cents(voucher.value_cents),
        voucher_end_date: voucher.end_date,
    })
}

pub async fn search_page(
    db: &DatabaseConnection,
    search: &PromotionSearch,
    page_no: u64,
    page_size: u64,
    today: NaiveDate,
) -> anyhow::Result<Page<PromotionInfo>> {
    let mut select = promotions::Entity::find()
        .join(JoinType::InnerJoin, promotions::Relation::TargetGroups.def())
        .join(JoinType::InnerJoin, promotions::Relation::Vouchers.def())
        .filter(promotions::Column::DeletedAt.is_null());

    if !search.name.is_empty() {
        select = select.filter(ilike(promotions::Column::Name, &search.name));
    }
    if !search.target_group.is_empty() {
        select = select.filter(ilike(target_groups::Column::Name, &search.target_group));
    }
    select = match search.status {
        Some(PromotionStatus::Pending) => select.filter(promotions::Column::StartDate.gt(today)),
        Some(PromotionStatus::Active) => select
            .filter(promotions::Column::StartDate.lte(today))
            .filter(promotions::Column::EndDate.gte(today)),
        Some(PromotionStatus::Finished) => select.filter(promotions::Column::EndDate.lt(today)),
        None => select,
    };

    let total_count = count(select.clone(), db).await?;
    if total_count == 0 {
        return Ok(Page::empty());
    }

    let page_no = page_no.max(1);
    let rows = select
        .select_only()
        .column(promotions::Column::Id)
        .column(promotions::Column::Name)
        .column(promotions::Column::StartDate)
        .column(promotions::Column::EndDate)
        .column(promotions::Column::TargetGroupId)
        .column_as(target_groups::Column::Name, "target_group")
        .column_as(vouchers::Column::ValueCents, "voucher_value_cents")
        .column_as(vouchers::Column::EndDate, "voucher_end_date")
        .order_by_desc(promotions::Column::StartDate)
        .order_by_desc(promotions::Column::Id)
        .offset((page_no - 1) * page_size)
        .limit(page_size)
        .into_model::<PromotionRow>()
        .all(db)
        .await?;

    Ok(Page::new(
        total_count,
        page_no,
        page_size,
        rows.into_iter().map(|r| PromotionInfo::from_row(r, today)).collect(),
    ))
}

/// Soft-delete promotions. Their vouchers stop being redeemable.
pub async fn delete(
    db: &DatabaseConnection,
    ids: &[i64],
    staff_username: &str,
) -> anyhow::Result<u64> {
    let result = promotions::Entity::update_many()
        .col_expr(promotions::Column::DeletedAt, Expr::value(Some(Utc::now())))
        .filter(promotions::Column::Id.is_in(ids.iter().copied()))
        .filter(promotions::Column::DeletedAt.is_null())
        .exec(db)
        .await?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %staff_username,
        is_staff = true,
        "Staff {} deleted promotions {:?}",
        staff_username,
        ids
    );

    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form() -> PromotionForm {
        PromotionForm {
            name: "Spring sale".to_string(),
            start_date: "2026-03-01".to_string(),
            end_date: "2026-03-31".to_string(),
            target_group_id: 1,
            voucher_value: Money::from_cents(500),
            voucher_end_date: "2026-04-30".to_string(),
        }
    }

    #[test]
    fn test_promotion_status() {
        let (start, end) = (day(2026, 3, 1), day(2026, 3, 31));
        assert_eq!(PromotionStatus::on(start, end, day(2026, 2, 28)), PromotionStatus::Pending);
        assert_eq!(PromotionStatus::on(start, end, start), PromotionStatus::Active);
        assert_eq!(PromotionStatus::on(start, end, end), PromotionStatus::Active);
        assert_eq!(PromotionStatus::on(start, end, day(2026, 4, 1)), PromotionStatus::Finished);
    }

    #[test]
    fn test_promotion_form_validate() {
        let dates = form().validate().unwrap();
        assert_eq!(dates.start_date, day(2026, 3, 1));
        assert_eq!(dates.voucher_end_date, day(2026, 4, 30));

        let mut bad = form();
        bad.end_date = "2026-02-01".to_string();
        assert!(bad.validate().is_err());

        let mut bad = form();
        bad.voucher_end_date = "2026-03-30".to_string();
        assert!(bad.validate().is_err());

        let mut bad = form();
        bad.start_date = "03/01/2026".to_string();
        assert!(bad.validate().is_err());

        let mut bad = form();
        bad.voucher_value = Money::ZERO;
        assert!(bad.validate().is_err());

        let mut bad = form();
        bad.voucher_value = Money::from_cents(1_000_000);
        assert!(bad.validate().is_err());

        let mut ok = form();
        ok.voucher_value = MAX_PRICE;
        ok.voucher_end_date = ok.end_date.clone();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_promotion_form_accepts_string_value() {
        let form: PromotionForm = serde_json::from_str(
            r#"{
                "name": "Spring sale",
                "startDate": "2026-03-01",
                "endDate": "2026-03-31",
                "targetGroupId": 2,
                "voucherValue": "12.50",
                "voucherEndDate": "2026-04-30"
            }"#,
        )
        .unwrap();
        assert_eq!(form.voucher_value, Money::from_cents(1250));
    }
}
