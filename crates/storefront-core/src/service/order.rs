//! Back-office order management

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use storefront_common::utils::{is_positive_safe_integer, is_valid_quantity};
use storefront_common::{AUDIT_TARGET, Money, Rate, StorefrontError};
use storefront_persistence::Page;
use storefront_persistence::entity::{order_items, orders, products, users};
use storefront_persistence::query::{count, ilike};
use storefront_persistence::sea_orm::*;

use crate::model::{CartLine, OrderStatus, OrderSummary};
use crate::pricing::{CartTotals, LineItem};
use crate::service::checkout::{return_stock, take_stock};
use crate::service::voucher;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderFilter {
    pub user: String,
    pub status: Option<i32>,
    pub ord_after: Option<NaiveDate>,
    pub ord_before: Option<NaiveDate>,
}

/// Order as entered by staff
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderForm {
    pub user_id: i64,
    pub status: i32,
    /// Product id to quantity
    pub items: BTreeMap<i64, i64>,
    #[serde(default)]
    pub ordered_at: Option<DateTime<Utc>>,
}

impl OrderForm {
    fn validate(&self) -> anyhow::Result<OrderStatus> {
        let status = OrderStatus::try_from(self.status)?;
        if status == OrderStatus::Cart {
            return Err(StorefrontError::illegal("an order cannot be put back into a cart").into());
        }
        if self.items.is_empty() {
            return Err(StorefrontError::illegal("order has no items").into());
        }
        for (product_id, quantity) in &self.items {
            if !is_positive_safe_integer(*product_id) || !is_valid_quantity(*quantity) {
                return Err(StorefrontError::illegal(format!(
                    "invalid item {}: {}",
                    product_id, quantity
                ))
                .into());
            }
        }
        Ok(status)
    }
}

/// Lines of a placed order at the prices frozen on capture.
pub async fn placed_lines(
    db: &impl ConnectionTrait,
    order_id: i64,
    vat: Rate,
) -> anyhow::Result<Vec<CartLine>> {
    let rows = order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .find_also_related(products::Entity)
        .order_by_asc(order_items::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(item, product)| {
            let (name, image) = product
                .map(|p| (p.name, p.image))
                .unwrap_or_else(|| (format!("product {}", item.product_id), None));
            CartLine::new(
                LineItem::new(
                    item.product_id,
                    name,
                    Money::from_cents(item.price_cents),
                    vat,
                    item.quantity,
                ),
                image,
            )
        })
        .collect())
}

/// Build the summary of a placed order.
pub async fn summarize(
    db: &impl ConnectionTrait,
    order: orders::Model,
    username: String,
    vat: Rate,
) -> anyhow::Result<OrderSummary> {
    let lines = placed_lines(db, order.id, vat).await?;
    let items: Vec<LineItem> = lines.iter().map(|l| l.item.clone()).collect();

    Ok(OrderSummary {
        id: order.id,
        user_id: order.user_id,
        username,
        status: OrderStatus::try_from(order.status)?,
        ordered_at: order.ordered_at,
        totals: CartTotals::of(&items),
        lines,
        vouchers: voucher::order_vouchers(db, order.id).await?,
    })
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub async fn search_page(
    db: &DatabaseConnection,
    filter: &OrderFilter,
    page_no: u64,
    page_size: u64,
    vat: Rate,
) -> anyhow::Result<Page<OrderSummary>> {
    let mut select = orders::Entity::find()
        .join(JoinType::InnerJoin, orders::Relation::Users.def())
        .filter(orders::Column::Status.gte(OrderStatus::Paid.code()))
        .filter(orders::Column::DeletedAt.is_null());

    if !filter.user.is_empty() {
        select = select.filter(ilike(users::Column::Username, &filter.user));
    }
    if let Some(status) = filter.status {
        select = select.filter(orders::Column::Status.eq(status));
    }
    if let Some(after) = filter.ord_after {
        select = select.filter(orders::Column::OrderedAt.gte(day_start(after)));
    }
    if let Some(before) = filter.ord_before
        && let Some(next) = before.succ_opt()
    {
        select = select.filter(orders::Column::OrderedAt.lt(day_start(next)));
    }

    let total_count = count(select.clone(), db).await?;
    if total_count == 0 {
        return Ok(Page::empty());
    }

    let page_no = page_no.max(1);
    let rows = select
        .select_also(users::Entity)
        .order_by_desc(orders::Column::OrderedAt)
        .order_by_desc(orders::Column::Id)
        .offset((page_no - 1) * page_size)
        .limit(page_size)
        .all(db)
        .await?;

    let mut page_items = Vec::with_capacity(rows.len());
    for (order, user) in rows {
        let username = user.map(|u| u.username).unwrap_or_default();
        page_items.push(summarize(db, order, username, vat).await?);
    }

    Ok(Page::new(total_count, page_no, page_size, page_items))
}

async fn order_user(db: &impl ConnectionTrait, user_id: i64) -> anyhow::Result<users::Model> {
    users::Entity::find_by_id(user_id)
        .filter(users::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("user {}", user_id)).into())
}

/// Insert the form's items at the current discount prices and take them
/// from stock.
async fn place_items(
    txn: &DatabaseTransaction,
    order_id: i64,
    items: &BTreeMap<i64, i64>,
) -> anyhow::Result<()> {
    for (product_id, quantity) in items {
        let product = products::Entity::find_by_id(*product_id)
            .filter(products::Column::DeletedAt.is_null())
            .one(txn)
            .await?
            .ok_or_else(|| StorefrontError::not_found(format!("product {}", product_id)))?;

        take_stock(txn, product.id, &product.name, *quantity).await?;

        order_items::ActiveModel {
            order_id: Set(order_id),
            product_id: Set(product.id),
            quantity: Set(*quantity),
            price_cents: Set(product.discount_price_cents),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(())
}

/// Put the items of an order back on the shelf and remove them.
async fn release_items(txn: &DatabaseTransaction, order_id: i64) -> anyhow::Result<()> {
    let items = order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .all(txn)
        .await?;

    for item in &items {
        return_stock(txn, item.product_id, item.quantity).await?;
    }

    order_items::Entity::delete_many()
        .filter(order_items::Column::OrderId.eq(order_id))
        .exec(txn)
        .await?;

    Ok(())
}

async fn find_placed(db: &impl ConnectionTrait, order_id: i64) -> anyhow::Result<orders::Model> {
    orders::Entity::find_by_id(order_id)
        .filter(orders::Column::Status.gte(OrderStatus::Paid.code()))
        .filter(orders::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("order {}", order_id)).into())
}

pub async fn create(
    db: &DatabaseConnection,
    form: &OrderForm,
    staff_username: &str,
    vat: Rate,
) -> anyhow::Result<OrderSummary> {
    let status = form.validate()?;

    let txn = db.begin().await?;
    let user = order_user(&txn, form.user_id).await?;

    let order = orders::ActiveModel {
        user_id: Set(user.id),
        status: Set(status.code()),
        ordered_at: Set(Some(form.ordered_at.unwrap_or_else(Utc::now))),
        created_at: Set(Utc::now()),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    place_items(&txn, order.id, &form.items).await?;

    let summary = summarize(&txn, order, user.username, vat).await?;
    txn.commit().await?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %staff_username,
        is_staff = true,
        "Staff {} added order #{} for {}",
        staff_username,
        summary.id,
        summary.username
    );

    Ok(summary)
}

pub async fn update(
    db: &DatabaseConnection,
    order_id: i64,
    form: &OrderForm,
    staff_username: &str,
    vat: Rate,
) -> anyhow::Result<OrderSummary> {
    let status = form.validate()?;

    let txn = db.begin().await?;
    let order = find_placed(&txn, order_id).await?;
    let user = order_user(&txn, form.user_id).await?;
    let old_status = OrderStatus::try_from(order.status)?;

    release_items(&txn, order.id).await?;
    place_items(&txn, order.id, &form.items).await?;

    // An edit without a date keeps the order where it was in the reports
    let ordered_at = form.ordered_at.or(order.ordered_at).unwrap_or_else(Utc::now);

    let mut active: orders::ActiveModel = order.into();
    active.user_id = Set(user.id);
    active.status = Set(status.code());
    active.ordered_at = Set(Some(ordered_at));
    let order = active.update(&txn).await?;

    let summary = summarize(&txn, order, user.username, vat).await?;
    txn.commit().await?;

    if old_status != status {
        tracing::info!(
            target: AUDIT_TARGET,
            user = %staff_username,
            is_staff = true,
            long_message = %format!("from: {}, to: {}", old_status, status),
            "Staff {} changed the status of order #{}",
            staff_username,
            order_id
        );
    }

    Ok(summary)
}

/// Soft-delete orders, returning their items to stock.
pub async fn delete(
    db: &DatabaseConnection,
    ids: &[i64],
    staff_username: &str,
) -> anyhow::Result<u64> {
    let txn = db.begin().await?;
    let mut deleted = 0;

    for id in ids {
        let order = find_placed(&txn, *id).await?;
        release_items(&txn, order.id).await?;

        let mut active: orders::ActiveModel = order.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(&txn).await?;
        deleted += 1;
    }

    txn.commit().await?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %staff_username,
        is_staff = true,
        "Staff {} deleted orders {:?}",
        staff_username,
        ids
    );

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const VAT_20: Rate = Rate::from_basis_points(2000);

    fn lamp() -> products::Model {
        products::Model {
            id: 3,
            name: "Lamp".to_string(),
            price_cents: 2500,
            discount_price_cents: 2000,
            description: String::new(),
            image: None,
            quantity: 5,
            hide: false,
            category_id: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn customer() -> users::Model {
        users::Model {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: String::new(),
            first_name: "Alice".to_string(),
            last_name: String::new(),
            address: String::new(),
            country: String::new(),
            gender: String::new(),
            birthday: None,
            verify_token: None,
            email_confirmed: true,
            last_login: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn form(status: i32, items: &[(i64, i64)]) -> OrderForm {
        OrderForm {
            user_id: 1,
            status,
            items: items.iter().copied().collect(),
            ordered_at: None,
        }
    }

    #[test]
    fn test_order_form_validate() {
        assert_eq!(form(2, &[(1, 3)]).validate().unwrap(), OrderStatus::Shipped);
        assert!(form(0, &[(1, 3)]).validate().is_err());
        assert!(form(9, &[(1, 3)]).validate().is_err());
        assert!(form(1, &[]).validate().is_err());
        assert!(form(1, &[(1, 0)]).validate().is_err());
        assert!(form(1, &[(-2, 1)]).validate().is_err());
        assert!(form(1, &[(1, 10_000_000_000_000)]).validate().is_err());
    }

    #[test]
    fn test_order_form_deserialize_item_map() {
        let form: OrderForm =
            serde_json::from_str(r#"{"userId": 4, "status": 1, "items": {"7": 2, "9": 1}}"#)
                .unwrap();
        assert_eq!(form.items.get(&7), Some(&2));
        assert_eq!(form.items.len(), 2);
        assert!(form.ordered_at.is_none());
    }

    #[tokio::test]
    async fn test_placed_lines_use_frozen_price() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![(
                order_items::Model {
                    id: 1,
                    order_id: 10,
                    product_id: 3,
                    quantity: 2,
                    price_cents: 1000,
                },
                Some(lamp()),
            )]])
            .into_connection();

        let lines = placed_lines(&db, 10, VAT_20).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item.unit_price, Money::from_cents(1000));
        assert_eq!(lines[0].total_with_vat, Money::from_cents(2400));
    }

    #[tokio::test]
    async fn test_update_keeps_ordered_at_when_omitted() {
        let march = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        let order = orders::Model {
            id: 10,
            user_id: 1,
            status: OrderStatus::Paid.code(),
            ordered_at: Some(march),
            created_at: march,
            deleted_at: None,
        };
        let shipped = orders::Model {
            status: OrderStatus::Shipped.code(),
            ..order.clone()
        };
        let item = order_items::Model {
            id: 1,
            order_id: 10,
            product_id: 3,
            quantity: 2,
            price_cents: 2000,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![order]])
            .append_query_results([vec![customer()]])
            .append_query_results([Vec::<order_items::Model>::new()])
            .append_query_results([vec![lamp()]])
            .append_query_results([vec![item.clone()]])
            .append_query_results([vec![shipped]])
            .append_query_results([vec![(item, Some(lamp()))]])
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .append_exec_results([exec(0), exec(1)])
            .into_connection();

        let summary = update(&db, 10, &form(2, &[(3, 2)]), "admin", VAT_20)
            .await
            .unwrap();
        assert_eq!(summary.status, OrderStatus::Shipped);

        let log = db.into_transaction_log();
        let order_update = log
            .iter()
            .flat_map(|t| t.statements())
            .find(|s| s.sql.starts_with(r#"UPDATE "orders""#))
            .expect("order update statement");
        let values = order_update.values.as_ref().expect("bound values");
        assert!(values.0.contains(&Value::from(march)));
    }

    #[tokio::test]
    async fn test_search_page_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(0)]])
            .into_connection();

        let page = search_page(&db, &OrderFilter::default(), 1, 20, VAT_20)
            .await
            .unwrap();
        assert_eq!(page.total_count, 0);
        assert!(page.page_items.is_empty());
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        std::collections::BTreeMap::from([("count", Value::BigInt(Some(n)))])
    }
}
