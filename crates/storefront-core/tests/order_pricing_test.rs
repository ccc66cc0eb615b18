//! Pricing a cart, redeeming vouchers and mailing the confirmation

use storefront_common::{Money, Rate};
use storefront_core::pricing::{CartTotals, LineItem, VoucherAmount, apply_vouchers};
use storefront_core::service::mail::{Recipient, render_order_email};
use storefront_core::service::settings::EmailTemplate;

const VAT: Rate = Rate::from_basis_points(2000);

fn template() -> EmailTemplate {
    EmailTemplate {
        sender: "shop@example.com".to_string(),
        subject: "Order #{order_id}".to_string(),
        upper: "Hello {first_name},".to_string(),
        lower: "Thank you!".to_string(),
        table: vec!["name".to_string(), "quantity".to_string(), "subtotal".to_string()],
        table_border_weight: 1,
        table_border_color: "#000".to_string(),
    }
}

#[test]
fn test_cart_to_confirmation_mail() {
    let lines = vec![
        LineItem::new(1, "Lamp", Money::from_cents(1499), VAT, 2),
        LineItem::new(2, "Bulb", Money::from_cents(250), VAT, 4),
    ];
    let totals = CartTotals::of(&lines);

    // 14.99 * 1.2 = 17.988 -> 17.99; 2.50 * 1.2 = 3.00
    assert_eq!(totals.sub_total, Money::from_cents(3998));
    assert_eq!(totals.grand_total, Money::from_cents(2 * 1799 + 4 * 300));
    assert_eq!(totals.vat_sum, totals.grand_total - totals.sub_total);

    let outcome = apply_vouchers(
        totals.grand_total,
        vec![VoucherAmount {
            voucher_id: 9,
            value: Money::from_cents(1000),
        }],
        1,
    )
    .unwrap();
    assert_eq!(outcome.grand_total, Money::from_cents(3798));

    let recipient = Recipient {
        email: "jane@example.com",
        first_name: "Jane",
        order_id: 42,
    };
    let mail = render_order_email(&template(), &recipient, &lines, &totals, outcome.vouchers_sum);

    assert_eq!(mail.subject, "Order #42");
    assert_eq!(mail.to, "jane@example.com");
    assert!(mail.body.starts_with("Hello Jane,"));
    assert!(mail.body.contains("Vouchers: -10.00"));
    assert!(mail.body.contains("Total: 37.98"));
    assert!(mail.body.ends_with("Thank you!"));
}

#[test]
fn test_voucher_larger_than_order_is_free() {
    let lines = vec![LineItem::new(1, "Bulb", Money::from_cents(250), VAT, 1)];
    let totals = CartTotals::of(&lines);

    let outcome = apply_vouchers(
        totals.grand_total,
        vec![VoucherAmount {
            voucher_id: 1,
            value: Money::from_cents(5000),
        }],
        1,
    )
    .unwrap();

    assert_eq!(outcome.grand_total, Money::ZERO);
}
