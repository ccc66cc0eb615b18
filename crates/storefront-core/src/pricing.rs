//! Order and cart totals
//!
//! Every amount is held in cents. A line's VAT-inclusive unit price is
//! rounded to the cent before it is multiplied by the quantity, so the
//! grand total always equals the sum of the displayed line totals.

use serde::Serialize;
use storefront_common::{Money, Rate, StorefrontError};

/// One priced cart or order line
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Money,
    #[serde(skip)]
    pub vat: Rate,
    pub quantity: i64,
}

impl LineItem {
    pub fn new(
        product_id: i64,
        name: impl Into<String>,
        unit_price: Money,
        vat: Rate,
        quantity: i64,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            unit_price,
            vat,
            quantity,
        }
    }

    pub fn unit_price_with_vat(&self) -> Money {
        self.unit_price.with_rate(self.vat)
    }

    pub fn total(&self) -> Money {
        self.unit_price * self.quantity
    }

    pub fn total_with_vat(&self) -> Money {
        self.unit_price_with_vat() * self.quantity
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub sub_total: Money,
    pub vat_sum: Money,
    pub grand_total: Money,
}

impl CartTotals {
    pub fn of(lines: &[LineItem]) -> Self {
        let sub_total: Money = lines.iter().map(LineItem::total).sum();
        let grand_total: Money = lines.iter().map(LineItem::total_with_vat).sum();

        Self {
            sub_total,
            vat_sum: grand_total - sub_total,
            grand_total,
        }
    }
}

/// A voucher offered for redemption
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherAmount {
    pub voucher_id: i64,
    pub value: Money,
}

/// Grand total once vouchers are redeemed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherOutcome {
    pub vouchers: Vec<VoucherAmount>,
    pub vouchers_sum: Money,
    pub grand_total: Money,
}

/// Redeem `vouchers` against `grand_total`.
///
/// Vouchers are consumed largest first. Every voucher but the last one must
/// still fit under the grand total, so a customer cannot burn several
/// vouchers on an order the first ones already cover. The result never goes
/// below zero.
pub fn apply_vouchers(
    grand_total: Money,
    mut vouchers: Vec<VoucherAmount>,
    max_vouchers: usize,
) -> Result<VoucherOutcome, StorefrontError> {
    if vouchers.len() > max_vouchers {
        return Err(StorefrontError::illegal(format!(
            "at most {} voucher(s) can be used on one order",
            max_vouchers
        )));
    }

    vouchers.sort_by(|a, b| b.value.cmp(&a.value));

    let mut running = Money::ZERO;
    for (i, voucher) in vouchers.iter().enumerate() {
        running += voucher.value;
        if running > grand_total && i != vouchers.len() - 1 {
            return Err(StorefrontError::illegal("too many vouchers for this order"));
        }
    }

    let remaining = grand_total - running;

    Ok(VoucherOutcome {
        vouchers,
        vouchers_sum: running,
        grand_total: remaining.max(Money::ZERO),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use storefront_common::MAX_PRICE;
    use storefront_common::utils::MAX_QUANTITY;

    use super::*;

    const VAT_20: Rate = Rate::from_basis_points(2000);

    fn line(id: i64, cents: i64, qty: i64) -> LineItem {
        LineItem::new(id, format!("product {}", id), Money::from_cents(cents), VAT_20, qty)
    }

    fn voucher(id: i64, cents: i64) -> VoucherAmount {
        VoucherAmount {
            voucher_id: id,
            value: Money::from_cents(cents),
        }
    }

    #[test]
    fn test_line_totals() {
        // 10.99 * 1.2 = 13.188 -> 13.19 per unit
        let item = line(1, 1099, 3);
        assert_eq!(item.unit_price_with_vat(), Money::from_cents(1319));
        assert_eq!(item.total(), Money::from_cents(3297));
        assert_eq!(item.total_with_vat(), Money::from_cents(3957));
    }

    #[test]
    fn test_cart_totals() {
        let totals = CartTotals::of(&[line(1, 1099, 3), line(2, 250, 2)]);
        assert_eq!(totals.sub_total, Money::from_cents(3797));
        assert_eq!(totals.grand_total, Money::from_cents(3957 + 600));
        assert_eq!(totals.vat_sum, totals.grand_total - totals.sub_total);
    }

    #[test]
    fn test_cart_totals_at_quantity_limit() {
        // 9999.99 * 1.99 = 19899.98 per unit
        let item = LineItem::new(1, "p", MAX_PRICE, Rate::from_basis_points(9900), MAX_QUANTITY);
        let totals = CartTotals::of(&[item.clone(), item]);
        assert_eq!(totals.sub_total, Money::from_cents(999_999 * MAX_QUANTITY * 2));
        assert_eq!(totals.grand_total, Money::from_cents(1_989_998 * MAX_QUANTITY * 2));
        assert!(totals.vat_sum.is_positive());
    }

    #[test]
    fn test_cart_totals_never_wrap_past_limit() {
        let item = LineItem::new(1, "p", MAX_PRICE, VAT_20, 10_000_000_000_000);
        let totals = CartTotals::of(&[item]);
        assert!(totals.grand_total.is_positive());
        assert!(totals.sub_total.is_positive());
    }

    #[test]
    fn test_empty_cart_totals() {
        assert_eq!(CartTotals::of(&[]), CartTotals::default());
    }

    #[test]
    fn test_apply_vouchers_without_vouchers() {
        let outcome = apply_vouchers(Money::from_cents(1000), vec![], 1).unwrap();
        assert_eq!(outcome.grand_total, Money::from_cents(1000));
        assert!(outcome.vouchers_sum.is_zero());
    }

    #[test]
    fn test_apply_vouchers_floors_at_zero() {
        let outcome = apply_vouchers(Money::from_cents(1000), vec![voucher(1, 2500)], 1).unwrap();
        assert_eq!(outcome.grand_total, Money::ZERO);
        assert_eq!(outcome.vouchers_sum, Money::from_cents(2500));
    }

    #[test]
    fn test_apply_vouchers_rejects_too_many() {
        let err = apply_vouchers(
            Money::from_cents(10_000),
            vec![voucher(1, 100), voucher(2, 100)],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, StorefrontError::IllegalArgument(_)));
    }

    #[test]
    fn test_apply_vouchers_rejects_wasted_voucher() {
        // 15.00 alone covers the 10.00 order, the 5.00 one would be wasted
        let err = apply_vouchers(
            Money::from_cents(1000),
            vec![voucher(1, 500), voucher(2, 1500)],
            3,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "caused: too many vouchers for this order");
    }

    #[test]
    fn test_apply_vouchers_largest_first() {
        let outcome = apply_vouchers(
            Money::from_cents(1000),
            vec![voucher(1, 300), voucher(2, 600)],
            3,
        )
        .unwrap();
        assert_eq!(outcome.vouchers[0].voucher_id, 2);
        assert_eq!(outcome.grand_total, Money::from_cents(100));
    }

    proptest! {
        #[test]
        fn prop_totals_ignore_line_order(
            lines in prop::collection::vec((1i64..1000, 1i64..999_999, 1i64..50), 0..8)
        ) {
            let items: Vec<LineItem> = lines.iter().map(|&(id, c, q)| line(id, c, q)).collect();
            let mut reversed = items.clone();
            reversed.reverse();
            prop_assert_eq!(CartTotals::of(&items), CartTotals::of(&reversed));
        }

        #[test]
        fn prop_vat_sum_non_negative(
            lines in prop::collection::vec((1i64..1000, 0i64..999_999, 0i64..50), 0..8),
            bp in 0u32..5000
        ) {
            let items: Vec<LineItem> = lines
                .iter()
                .map(|&(id, c, q)| {
                    LineItem::new(id, "p", Money::from_cents(c), Rate::from_basis_points(bp), q)
                })
                .collect();
            let totals = CartTotals::of(&items);
            prop_assert!(totals.vat_sum >= Money::ZERO);
            prop_assert_eq!(totals.sub_total + totals.vat_sum, totals.grand_total);
        }

        #[test]
        fn prop_voucher_total_never_negative(
            total in 0i64..1_000_000,
            value in 1i64..999_999
        ) {
            let outcome =
                apply_vouchers(Money::from_cents(total), vec![voucher(1, value)], 1).unwrap();
            prop_assert!(outcome.grand_total >= Money::ZERO);
            prop_assert!(outcome.grand_total <= Money::from_cents(total));
        }
    }
}
