//! Customer vouchers

use chrono::NaiveDate;
use storefront_common::{Money, StorefrontError};
use storefront_persistence::entity::{order_vouchers, promotions, user_vouchers, vouchers};
use storefront_persistence::sea_orm::*;

use crate::model::AvailableVoucher;
use crate::pricing::VoucherAmount;

#[derive(Debug, FromQueryResult)]
struct VoucherRow {
    user_voucher_id: i64,
    voucher_id: i64,
    value_cents: i64,
    end_date: NaiveDate,
    promotion: String,
}

impl From<VoucherRow> for AvailableVoucher {
    fn from(row: VoucherRow) -> Self {
        Self {
            voucher_id: row.voucher_id,
            user_voucher_id: row.user_voucher_id,
            value: Money::from_cents(row.value_cents),
            end_date: row.end_date,
            promotion: row.promotion,
        }
    }
}

/// Vouchers `user_id` holds that are not spent on an order yet, whose
/// promotion has started and that have not expired on `today`.
pub async fn available_vouchers(
    db: &impl ConnectionTrait,
    user_id: i64,
    today: NaiveDate,
) -> anyhow::Result<Vec<AvailableVoucher>> {
    let rows = user_vouchers::Entity::find()
        .select_only()
        .column_as(user_vouchers::Column::Id, "user_voucher_id")
        .column_as(user_vouchers::Column::VoucherId, "voucher_id")
        .column_as(vouchers::Column::ValueCents, "value_cents")
        .column_as(vouchers::Column::EndDate, "end_date")
        .column_as(promotions::Column::Name, "promotion")
        .join(JoinType::InnerJoin, user_vouchers::Relation::Vouchers.def())
        .join(JoinType::InnerJoin, vouchers::Relation::Promotions.def())
        .join(JoinType::LeftJoin, user_vouchers::Relation::OrderVouchers.def())
        .filter(user_vouchers::Column::UserId.eq(user_id))
        .filter(order_vouchers::Column::UserVoucherId.is_null())
        .filter(vouchers::Column::DeletedAt.is_null())
        .filter(promotions::Column::DeletedAt.is_null())
        .filter(promotions::Column::StartDate.lte(today))
        .filter(vouchers::Column::EndDate.gte(today))
        .order_by_asc(vouchers::Column::EndDate)
        .into_model::<VoucherRow>()
        .all(db)
        .await?;

    Ok(rows.into_iter().map(AvailableVoucher::from).collect())
}

/// Pick the requested vouchers out of the available ones.
///
/// Every id must name a voucher the customer can still redeem.
pub fn select_vouchers(
    available: &[AvailableVoucher],
    voucher_ids: &[i64],
) -> Result<Vec<AvailableVoucher>, StorefrontError> {
    let mut selected: Vec<AvailableVoucher> = Vec::with_capacity(voucher_ids.len());

    for id in voucher_ids {
        if selected.iter().any(|v| v.voucher_id == *id) {
            return Err(StorefrontError::illegal(format!("voucher {} is repeated", id)));
        }
        let voucher = available
            .iter()
            .find(|v| v.voucher_id == *id)
            .ok_or_else(|| StorefrontError::not_found(format!("voucher {}", id)))?;
        selected.push(voucher.clone());
    }

    Ok(selected)
}

pub fn amounts(selected: &[AvailableVoucher]) -> Vec<VoucherAmount> {
    selected.iter().map(AvailableVoucher::amount).collect()
}

/// Vouchers spent on an order
pub async fn order_vouchers(
    db: &impl ConnectionTrait,
    order_id: i64,
) -> anyhow::Result<Vec<VoucherAmount>> {
    let rows: Vec<(i64, i64)> = vouchers::Entity::find()
        .select_only()
        .column(vouchers::Column::Id)
        .column(vouchers::Column::ValueCents)
        .join(JoinType::InnerJoin, vouchers::Relation::UserVouchers.def())
        .join(JoinType::InnerJoin, user_vouchers::Relation::OrderVouchers.def())
        .filter(order_vouchers::Column::OrderId.eq(order_id))
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(voucher_id, cents)| VoucherAmount {
            voucher_id,
            value: Money::from_cents(cents),
        })
        .collect())
}

/// Link spent vouchers to an order.
pub async fn link_to_order(
    db: &impl ConnectionTrait,
    order_id: i64,
    selected: &[AvailableVoucher],
) -> anyhow::Result<()> {
    if selected.is_empty() {
        return Ok(());
    }

    let rows = selected.iter().map(|v| order_vouchers::ActiveModel {
        order_id: Set(order_id),
        user_voucher_id: Set(v.user_voucher_id),
    });
    order_vouchers::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;

    Ok(())
}
