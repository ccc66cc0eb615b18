//! Sales report

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::{AUDIT_TARGET, Money, Rate, StorefrontError};
use storefront_persistence::Page;
use storefront_persistence::entity::{
    order_items, order_vouchers, orders, user_vouchers, vouchers,
};
use storefront_persistence::sea_orm::*;

use crate::model::OrderStatus;
use crate::pricing::{CartTotals, LineItem};

pub const CSV_HEADER: [&str; 6] = ["period", "orders", "items", "sub_total", "vat", "grand_total"];

/// Width of a report or audit period: `0` day, `1` ISO week, `2` month,
/// `3` year
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGroup {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl TimeGroup {
    /// First day of the period holding `date`. Weeks start on Monday.
    pub fn truncate(self, date: NaiveDate) -> NaiveDate {
        match self {
            TimeGroup::Day => date,
            TimeGroup::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            TimeGroup::Month => date.with_day(1).unwrap_or(date),
            TimeGroup::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeGroup::Day => "day",
            TimeGroup::Week => "week",
            TimeGroup::Month => "month",
            TimeGroup::Year => "year",
        }
    }
}

impl TryFrom<i32> for TimeGroup {
    type Error = StorefrontError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TimeGroup::Day),
            1 => Ok(TimeGroup::Week),
            2 => Ok(TimeGroup::Month),
            3 => Ok(TimeGroup::Year),
            _ => Err(StorefrontError::illegal(format!("unknown time group {}", value))),
        }
    }
}

impl<'de> Deserialize<'de> for TimeGroup {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i32::deserialize(deserializer)?;
        TimeGroup::try_from(code).map_err(serde::de::Error::custom)
    }
}

/// Inclusive day range; open ends default to everything
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateRange {
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
}

impl DateRange {
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.after.map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    /// Exclusive upper bound: midnight after `before`
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.before
            .and_then(|d| d.succ_opt())
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub period: NaiveDate,
    pub orders: u64,
    pub items: i64,
    pub sub_total: Money,
    pub vat: Money,
    /// After vouchers
    pub grand_total: Money,
}

/// What one order contributes to its period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderFigures {
    pub ordered_at: DateTime<Utc>,
    pub items: i64,
    pub totals: CartTotals,
    pub vouchers_sum: Money,
}

/// Fold orders into report rows, newest period first.
pub fn group_orders(orders: &[OrderFigures], group: TimeGroup) -> Vec<ReportRow> {
    let mut periods: BTreeMap<NaiveDate, ReportRow> = BTreeMap::new();

    for o in orders {
        let period = group.truncate(o.ordered_at.date_naive());
        let row = periods.entry(period).or_insert_with(|| ReportRow {
            period,
            orders: 0,
            items: 0,
            sub_total: Money::ZERO,
            vat: Money::ZERO,
            grand_total: Money::ZERO,
        });

        row.orders += 1;
        row.items += o.items;
        row.sub_total += o.totals.sub_total;
        row.vat += o.totals.vat_sum;
        row.grand_total += (o.totals.grand_total - o.vouchers_sum).max(Money::ZERO);
    }

    periods.into_values().rev().collect()
}

async fn order_figures(
    db: &DatabaseConnection,
    range: &DateRange,
    vat: Rate,
) -> anyhow::Result<Vec<OrderFigures>> {
    let mut select = orders::Entity::find()
        .filter(orders::Column::Status.gte(OrderStatus::Paid.code()))
        .filter(orders::Column::DeletedAt.is_null())
        .filter(orders::Column::OrderedAt.is_not_null());

    if let Some(start) = range.start() {
        select = select.filter(orders::Column::OrderedAt.gte(start));
    }
    if let Some(end) = range.end() {
        select = select.filter(orders::Column::OrderedAt.lt(end));
    }

    let placed = select.all(db).await?;
    if placed.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = placed.iter().map(|o| o.id).collect();

    let items = order_items::Entity::find()
        .filter(order_items::Column::OrderId.is_in(ids.clone()))
        .all(db)
        .await?;

    let spent: Vec<(i64, i64)> = order_vouchers::Entity::find()
        .select_only()
        .column(order_vouchers::Column::OrderId)
        .column(vouchers::Column::ValueCents)
        .join(JoinType::InnerJoin, order_vouchers::Relation::UserVouchers.def())
        .join(JoinType::InnerJoin, user_vouchers::Relation::Vouchers.def())
        .filter(order_vouchers::Column::OrderId.is_in(ids))
        .into_tuple()
        .all(db)
        .await?;

    let mut lines: HashMap<i64, Vec<LineItem>> = HashMap::new();
    for item in items {
        lines.entry(item.order_id).or_default().push(LineItem::new(
            item.product_id,
            String::new(),
            Money::from_cents(item.price_cents),
            vat,
            item.quantity,
        ));
    }

    let mut discounts: HashMap<i64, Money> = HashMap::new();
    for (order_id, cents) in spent {
        *discounts.entry(order_id).or_default() += Money::from_cents(cents);
    }

    Ok(placed
        .into_iter()
        .filter_map(|o| {
            let ordered_at = o.ordered_at?;
            let order_lines = lines.remove(&o.id).unwrap_or_default();
            Some(OrderFigures {
                ordered_at,
                items: order_lines.iter().map(|l| l.quantity).sum(),
                totals: CartTotals::of(&order_lines),
                vouchers_sum: discounts.get(&o.id).copied().unwrap_or_default(),
            })
        })
        .collect())
}

/// Every report row of the range, newest period first.
pub async fn report_rows(
    db: &DatabaseConnection,
    group: TimeGroup,
    range: &DateRange,
    vat: Rate,
) -> anyhow::Result<Vec<ReportRow>> {
    let figures = order_figures(db, range, vat).await?;
    Ok(group_orders(&figures, group))
}

fn describe(group: TimeGroup, range: &DateRange) -> String {
    let day = |d: Option<NaiveDate>, open: &str| {
        d.map(|d| d.to_string()).unwrap_or_else(|| open.to_string())
    };
    format!(
        "from {} to {} grouped by {}",
        day(range.after, "the beginning"),
        day(range.before, "today"),
        group.as_str()
    )
}

pub async fn orders_report(
    db: &DatabaseConnection,
    group: TimeGroup,
    range: &DateRange,
    page_no: u64,
    page_size: u64,
    vat: Rate,
    staff_username: &str,
) -> anyhow::Result<Page<ReportRow>> {
    let rows = report_rows(db, group, range, vat).await?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %staff_username,
        is_staff = true,
        long_message = %describe(group, range),
        "Staff {} generated orders report",
        staff_username
    );

    Ok(Page::from_vec(rows, page_no, page_size))
}

/// Write report rows as CSV.
pub fn export_csv(rows: &[ReportRow]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for row in rows {
        writer.write_record([
            row.period.to_string(),
            row.orders.to_string(),
            row.items.to_string(),
            row.sub_total.to_string(),
            row.vat.to_string(),
            row.grand_total.to_string(),
        ])?;
    }

    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

/// The whole report of the range as a CSV file.
pub async fn export_report(
    db: &DatabaseConnection,
    group: TimeGroup,
    range: &DateRange,
    vat: Rate,
    staff_username: &str,
) -> anyhow::Result<Vec<u8>> {
    let rows = report_rows(db, group, range, vat).await?;
    let csv = export_csv(&rows)?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %staff_username,
        is_staff = true,
        long_message = %format!("{} in .csv format", describe(group, range)),
        "Staff {} downloaded orders report",
        staff_username
    );

    Ok(csv)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn figures(y: i32, m: u32, d: u32, cents: i64, voucher: i64) -> OrderFigures {
        let vat = Rate::from_basis_points(2000);
        let line = LineItem::new(1, "x", Money::from_cents(cents), vat, 1);
        OrderFigures {
            ordered_at: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
            items: 1,
            totals: CartTotals::of(&[line]),
            vouchers_sum: Money::from_cents(voucher),
        }
    }

    #[test]
    fn test_truncate() {
        // 2026-10-15 is a Thursday
        let date = day(2026, 10, 15);
        assert_eq!(TimeGroup::Day.truncate(date), date);
        assert_eq!(TimeGroup::Week.truncate(date), day(2026, 10, 12));
        assert_eq!(TimeGroup::Week.truncate(day(2026, 10, 12)), day(2026, 10, 12));
        assert_eq!(TimeGroup::Month.truncate(date), day(2026, 10, 1));
        assert_eq!(TimeGroup::Year.truncate(date), day(2026, 1, 1));
    }

    #[test]
    fn test_time_group_codes() {
        assert_eq!(TimeGroup::try_from(1).unwrap(), TimeGroup::Week);
        assert!(TimeGroup::try_from(4).is_err());
        assert_eq!(TimeGroup::default(), TimeGroup::Month);

        let group: TimeGroup = serde_json::from_str("3").unwrap();
        assert_eq!(group, TimeGroup::Year);
    }

    #[test]
    fn test_group_orders_newest_first() {
        let orders = vec![
            figures(2026, 9, 3, 1000, 0),
            figures(2026, 10, 1, 1000, 0),
            figures(2026, 10, 20, 500, 1000),
        ];

        let rows = group_orders(&orders, TimeGroup::Month);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].period, day(2026, 10, 1));
        assert_eq!(rows[0].orders, 2);
        assert_eq!(rows[0].sub_total, Money::from_cents(1500));
        assert_eq!(rows[0].vat, Money::from_cents(300));
        // the voucher covers the whole second order
        assert_eq!(rows[0].grand_total, Money::from_cents(1200));

        assert_eq!(rows[1].period, day(2026, 9, 1));
        assert_eq!(rows[1].items, 1);
    }

    #[test]
    fn test_export_csv() {
        let rows = group_orders(&[figures(2026, 10, 1, 1000, 200)], TimeGroup::Day);
        let csv = String::from_utf8(export_csv(&rows).unwrap()).unwrap();
        assert_eq!(
            csv,
            "period,orders,items,sub_total,vat,grand_total\n2026-10-01,1,1,10.00,2.00,10.00\n"
        );

        let empty = String::from_utf8(export_csv(&[]).unwrap()).unwrap();
        assert_eq!(empty, "period,orders,items,sub_total,vat,grand_total\n");
    }

    #[test]
    fn test_date_range_bounds() {
        let range = DateRange {
            after: Some(day(2026, 1, 1)),
            before: Some(day(2026, 1, 31)),
        };
        assert_eq!(range.start(), Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(range.end(), Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()));
        assert!(DateRange::default().start().is_none());
    }
}
