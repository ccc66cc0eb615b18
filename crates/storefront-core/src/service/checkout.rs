//! Checkout and order capture

use chrono::Utc;
use serde::Deserialize;
use storefront_common::{AUDIT_TARGET, Money, Rate, StorefrontError};
use storefront_persistence::entity::{
    order_items, orders, paypal_transactions, products, transactions, users,
};
use storefront_persistence::sea_orm::sea_query::Expr;
use storefront_persistence::sea_orm::*;

use crate::model::{
    AvailableVoucher, CaptureReceipt, CartLine, CheckoutSummary, OrderStatus, PaymentMethod,
};
use crate::pricing::{CartTotals, LineItem, VoucherOutcome, apply_vouchers};
use crate::service::mail::{Mailer, Recipient, render_order_email};
use crate::service::payment::{CaptureResult, PaymentGateway};
use crate::service::settings::{self, EmailKind};
use crate::service::{cart, voucher};

/// Pricing inputs that come from settings and configuration
#[derive(Clone, Copy, Debug)]
pub struct PricingPolicy {
    pub vat: Rate,
    pub max_vouchers: usize,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    #[serde(rename = "type")]
    pub method: PaymentMethod,
    #[serde(default)]
    pub vouchers: Vec<i64>,
    /// PayPal order approved by the customer
    #[serde(default, rename = "orderID")]
    pub gateway_order_id: Option<String>,
}

struct PricedCart {
    order: orders::Model,
    items: Vec<(order_items::Model, products::Model)>,
    lines: Vec<CartLine>,
    totals: CartTotals,
    selected: Vec<AvailableVoucher>,
    outcome: VoucherOutcome,
}

/// Load the customer's cart, check stock and redeem the chosen vouchers.
async fn price_cart(
    db: &impl ConnectionTrait,
    user_id: i64,
    voucher_ids: &[i64],
    policy: PricingPolicy,
) -> anyhow::Result<PricedCart> {
    let order = cart::find_cart(db, user_id)
        .await?
        .ok_or_else(|| StorefrontError::illegal("you don't have any products in cart"))?;

    let rows = order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(order.id))
        .find_also_related(products::Entity)
        .order_by_asc(order_items::Column::Id)
        .all(db)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for (item, product) in rows {
        let product = product
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| StorefrontError::not_found(format!("product {}", item.product_id)))?;
        if product.quantity < item.quantity {
            return Err(StorefrontError::NotEnoughQuantity(product.name).into());
        }
        items.push((item, product));
    }

    if items.is_empty() {
        return Err(StorefrontError::illegal("you don't have any products in cart").into());
    }

    let lines: Vec<CartLine> = items
        .iter()
        .map(|(item, product)| {
            CartLine::new(
                LineItem::new(
                    product.id,
                    product.name.clone(),
                    Money::from_cents(product.discount_price_cents),
                    policy.vat,
                    item.quantity,
                ),
                product.image.clone(),
            )
        })
        .collect();

    let line_items: Vec<LineItem> = lines.iter().map(|l| l.item.clone()).collect();
    let totals = CartTotals::of(&line_items);

    let available = voucher::available_vouchers(db, user_id, Utc::now().date_naive()).await?;
    let selected = voucher::select_vouchers(&available, voucher_ids)?;
    let outcome = apply_vouchers(
        totals.grand_total,
        voucher::amounts(&selected),
        policy.max_vouchers,
    )?;

    Ok(PricedCart {
        order,
        items,
        lines,
        totals,
        selected,
        outcome,
    })
}

/// Price the cart for the checkout page.
pub async fn checkout(
    db: &DatabaseConnection,
    user_id: i64,
    voucher_ids: &[i64],
    policy: PricingPolicy,
) -> anyhow::Result<CheckoutSummary> {
    let priced = price_cart(db, user_id, voucher_ids, policy).await?;

    Ok(CheckoutSummary {
        lines: priced.lines,
        sub_total: priced.totals.sub_total,
        vat_sum: priced.totals.vat_sum,
        sub_total_vat: priced.totals.grand_total,
        vouchers: priced.outcome.vouchers,
        vouchers_sum: priced.outcome.vouchers_sum,
        grand_total: priced.outcome.grand_total,
    })
}

/// Decrement stock of every ordered product; fails if any fell short.
pub(crate) async fn take_stock(
    txn: &DatabaseTransaction,
    product_id: i64,
    product_name: &str,
    quantity: i64,
) -> anyhow::Result<()> {
    let result = products::Entity::update_many()
        .col_expr(
            products::Column::Quantity,
            Expr::col(products::Column::Quantity).sub(quantity),
        )
        .filter(products::Column::Id.eq(product_id))
        .filter(products::Column::Quantity.gte(quantity))
        .exec(txn)
        .await?;

    if result.rows_affected != 1 {
        return Err(StorefrontError::NotEnoughQuantity(product_name.to_string()).into());
    }
    Ok(())
}

pub(crate) async fn return_stock(
    txn: &DatabaseTransaction,
    product_id: i64,
    quantity: i64,
) -> anyhow::Result<()> {
    products::Entity::update_many()
        .col_expr(
            products::Column::Quantity,
            Expr::col(products::Column::Quantity).add(quantity),
        )
        .filter(products::Column::Id.eq(product_id))
        .exec(txn)
        .await?;
    Ok(())
}

fn paypal_record(transaction_id: i64, capture: &CaptureResult) -> paypal_transactions::ActiveModel {
    paypal_transactions::ActiveModel {
        transaction_id: Set(transaction_id),
        paypal_id: Set(capture.capture_id.clone()),
        status: Set(capture.status.clone()),
        payer_email: Set(capture.payer_email.clone()),
        payer_name: Set(capture.payer_name.clone()),
        gross_cents: Set(capture.gross.cents()),
        fee_cents: Set(capture.fee.cents()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
}

/// Store a PayPal capture whose order was rolled back, so staff can find
/// and refund it. Failures are logged only.
async fn record_unmatched_capture(
    db: &DatabaseConnection,
    order_id: i64,
    capture: &CaptureResult,
    expected: Money,
) {
    tracing::error!(
        order_id,
        capture_id = %capture.capture_id,
        gross = %capture.gross,
        expected = %expected,
        "PayPal capture is below the order total and has to be refunded"
    );

    let recorded = async {
        let transaction = transactions::ActiveModel {
            order_id: Set(order_id),
            kind: Set(PaymentMethod::Paypal.as_str().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        paypal_record(transaction.id, capture).insert(db).await?;
        anyhow::Ok(())
    }
    .await;

    if let Err(e) = recorded {
        tracing::error!(
            order_id,
            capture_id = %capture.capture_id,
            error = %e,
            "Failed to record PayPal capture"
        );
    }
}

/// Turn the customer's cart into a placed order.
///
/// Runs in one database transaction: stock is checked and taken, item prices
/// are frozen, vouchers are spent and the payment is recorded. A PayPal
/// capture that does not complete rolls everything back. A completed
/// capture below the order total also rolls back, but the capture itself
/// is kept on record.
pub async fn capture_order(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    mailer: &dyn Mailer,
    user: &users::Model,
    request: &CaptureRequest,
    policy: PricingPolicy,
) -> anyhow::Result<CaptureReceipt> {
    let txn = db.begin().await?;

    let priced = price_cart(&txn, user.id, &request.vouchers, policy).await?;
    let order_id = priced.order.id;

    for (item, product) in &priced.items {
        let mut active: order_items::ActiveModel = item.clone().into();
        active.price_cents = Set(product.discount_price_cents);
        active.update(&txn).await?;

        take_stock(&txn, product.id, &product.name, item.quantity).await?;
    }

    voucher::link_to_order(&txn, order_id, &priced.selected).await?;

    let transaction = transactions::ActiveModel {
        order_id: Set(order_id),
        kind: Set(request.method.as_str().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let grand_total = priced.outcome.grand_total;

    let status = match request.method {
        PaymentMethod::Cod => {
            if grand_total.is_zero() {
                OrderStatus::Paid
            } else {
                OrderStatus::AwaitingPayment
            }
        }
        PaymentMethod::Paypal => {
            let gateway_order_id = request
                .gateway_order_id
                .as_deref()
                .ok_or_else(|| StorefrontError::illegal("PayPal order id is required"))?;

            let capture = gateway.capture(gateway_order_id).await?;

            if !capture.is_completed() {
                return Err(StorefrontError::PaymentError(format!(
                    "PayPal order {} is {}",
                    gateway_order_id, capture.status
                ))
                .into());
            }
            if capture.gross < grand_total {
                txn.rollback().await?;
                record_unmatched_capture(db, order_id, &capture, grand_total).await;
                return Err(StorefrontError::PaymentError(format!(
                    "captured {} but the order total is {}",
                    capture.gross, grand_total
                ))
                .into());
            }

            paypal_record(transaction.id, &capture).insert(&txn).await?;

            OrderStatus::Paid
        }
    };

    let mut active: orders::ActiveModel = priced.order.into();
    active.status = Set(status.code());
    active.ordered_at = Set(Some(Utc::now()));
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        target: AUDIT_TARGET,
        user = %user.username,
        is_staff = false,
        "Customer {} placed order #{} ({}, {})",
        user.username,
        order_id,
        request.method.as_str(),
        grand_total
    );

    let line_items: Vec<LineItem> = priced.lines.iter().map(|l| l.item.clone()).collect();
    let recipient = Recipient {
        email: &user.email,
        first_name: &user.first_name,
        order_id,
    };

    let mut kinds = vec![EmailKind::Order];
    if status == OrderStatus::Paid && request.method == PaymentMethod::Paypal {
        kinds.push(EmailKind::Payment);
    }
    for kind in kinds {
        let sent = async {
            let template = settings::get_email_template(db, kind).await?;
            let message = render_order_email(
                &template,
                &recipient,
                &line_items,
                &priced.totals,
                priced.outcome.vouchers_sum,
            );
            mailer.send(message).await
        }
        .await;

        if let Err(e) = sent {
            tracing::error!(order_id, error = %e, "Failed to send order mail");
        }
    }

    Ok(CaptureReceipt {
        order_id,
        status,
        grand_total,
        message: "Your order is completed!".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use storefront_persistence::entity::settings;

    use super::*;
    use crate::service::mail::MailMessage;
    use crate::service::payment::STATUS_COMPLETED;

    const POLICY: PricingPolicy = PricingPolicy {
        vat: Rate::from_basis_points(2000),
        max_vouchers: 1,
    };

    struct FixedGateway(CaptureResult);

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn capture(&self, _gateway_order_id: &str) -> anyhow::Result<CaptureResult> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<MailMessage>>,
    }

    impl RecordingMailer {
        fn recipients(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: MailMessage) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
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

    fn cart_order() -> orders::Model {
        orders::Model {
            id: 10,
            user_id: 1,
            status: OrderStatus::Cart.code(),
            ordered_at: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn placed(status: OrderStatus) -> orders::Model {
        orders::Model {
            status: status.code(),
            ordered_at: Some(Utc::now()),
            ..cart_order()
        }
    }

    // Two lamps at 10.00 each, 24.00 with VAT; the cart still holds an old price
    fn cart_item() -> order_items::Model {
        order_items::Model {
            id: 1,
            order_id: 10,
            product_id: 3,
            quantity: 2,
            price_cents: 750,
        }
    }

    fn lamp() -> products::Model {
        products::Model {
            id: 3,
            name: "Lamp".to_string(),
            price_cents: 1200,
            discount_price_cents: 1000,
            description: String::new(),
            image: None,
            quantity: 5,
            hide: false,
            category_id: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn frozen_item() -> order_items::Model {
        order_items::Model {
            price_cents: 1000,
            ..cart_item()
        }
    }

    fn payment_row(kind: PaymentMethod) -> transactions::Model {
        transactions::Model {
            id: 7,
            order_id: 10,
            kind: kind.as_str().to_string(),
            created_at: Utc::now(),
        }
    }

    fn voucher_row(user_voucher_id: i64, cents: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("user_voucher_id", Value::from(user_voucher_id)),
            ("voucher_id", Value::from(user_voucher_id / 10)),
            ("value_cents", Value::from(cents)),
            ("end_date", Value::from(NaiveDate::from_ymd_opt(2099, 12, 31).unwrap())),
            ("promotion", Value::from("Spring sale")),
        ])
    }

    fn capture(status: &str, gross_cents: i64) -> CaptureResult {
        CaptureResult {
            capture_id: "3C679366HH908993F".to_string(),
            status: status.to_string(),
            payer_email: "alice@example.com".to_string(),
            payer_name: "Alice Doe".to_string(),
            gross: Money::from_cents(gross_cents),
            fee: Money::from_cents(100),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    /// A mock primed up to the point where stock is taken: the cart, its
    /// priced lines, the customer's vouchers and the frozen item.
    fn primed(vouchers: Vec<BTreeMap<&'static str, Value>>) -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![cart_order()]])
            .append_query_results([vec![(cart_item(), Some(lamp()))]])
            .append_query_results([vouchers])
            .append_query_results([vec![frozen_item()]])
    }

    fn request(method: PaymentMethod, vouchers: Vec<i64>) -> CaptureRequest {
        CaptureRequest {
            method,
            vouchers,
            gateway_order_id: Some("5O190127TN364715T".to_string()),
        }
    }

    fn sql_of(log: &[Transaction]) -> Vec<Vec<String>> {
        log.iter()
            .map(|t| t.statements().iter().map(|s| s.sql.clone()).collect())
            .collect()
    }

    fn find_statement<'a>(log: &'a [Transaction], prefix: &str) -> &'a Statement {
        log.iter()
            .flat_map(|t| t.statements())
            .find(|s| s.sql.starts_with(prefix))
            .unwrap_or_else(|| panic!("no statement starting with {}", prefix))
    }

    fn bound(statement: &Statement, value: Value) -> bool {
        statement.values.as_ref().is_some_and(|v| v.0.contains(&value))
    }

    #[test]
    fn test_capture_request_deserialize() {
        let request: CaptureRequest =
            serde_json::from_str(r#"{"type": "paypal", "vouchers": [3], "orderID": "5O19"}"#)
                .unwrap();
        assert_eq!(request.method, PaymentMethod::Paypal);
        assert_eq!(request.vouchers, vec![3]);
        assert_eq!(request.gateway_order_id.as_deref(), Some("5O19"));

        let request: CaptureRequest = serde_json::from_str(r#"{"type": "cod"}"#).unwrap();
        assert_eq!(request.method, PaymentMethod::Cod);
        assert!(request.vouchers.is_empty());
        assert!(request.gateway_order_id.is_none());
    }

    #[tokio::test]
    async fn test_checkout_without_cart() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<orders::Model>::new()])
            .into_connection();

        let policy = PricingPolicy {
            vat: Rate::from_basis_points(2000),
            max_vouchers: 1,
        };
        let err = checkout(&db, 1, &[], policy).await.unwrap_err();
        assert_eq!(err.to_string(), "caused: you don't have any products in cart");
    }

    #[tokio::test]
    async fn test_capture_cod_awaits_payment() {
        let db = primed(Vec::new())
            .append_query_results([vec![payment_row(PaymentMethod::Cod)]])
            .append_query_results([vec![placed(OrderStatus::AwaitingPayment)]])
            .append_query_results([Vec::<settings::Model>::new()])
            .append_exec_results([exec(1)])
            .into_connection();
        let gateway = FixedGateway(capture(STATUS_COMPLETED, 0));
        let mailer = RecordingMailer::default();

        let receipt = capture_order(
            &db,
            &gateway,
            &mailer,
            &customer(),
            &request(PaymentMethod::Cod, Vec::new()),
            POLICY,
        )
        .await
        .unwrap();

        assert_eq!(receipt.order_id, 10);
        assert_eq!(receipt.status, OrderStatus::AwaitingPayment);
        assert_eq!(receipt.grand_total, Money::from_cents(2400));
        assert_eq!(mailer.recipients(), vec!["alice@example.com"]);

        let log = db.into_transaction_log();
        let sql = sql_of(&log);
        let checkout_txn = &sql[0];
        assert_eq!(checkout_txn.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(checkout_txn.last().map(String::as_str), Some("COMMIT"));

        let freeze = find_statement(&log, r#"UPDATE "order_items""#);
        assert!(bound(freeze, Value::from(1000i64)));

        let stock = find_statement(&log, r#"UPDATE "products""#);
        assert!(bound(stock, Value::from(2i64)));

        let order = find_statement(&log, r#"UPDATE "orders""#);
        assert!(bound(order, Value::from(OrderStatus::AwaitingPayment.code())));
    }

    #[tokio::test]
    async fn test_capture_cod_fully_covered_by_voucher_is_paid() {
        let db = primed(vec![voucher_row(20, 3000)])
            .append_query_results([vec![payment_row(PaymentMethod::Cod)]])
            .append_query_results([vec![placed(OrderStatus::Paid)]])
            .append_query_results([Vec::<settings::Model>::new()])
            .append_exec_results([exec(1), exec(1)])
            .into_connection();
        let gateway = FixedGateway(capture(STATUS_COMPLETED, 0));
        let mailer = RecordingMailer::default();

        let receipt = capture_order(
            &db,
            &gateway,
            &mailer,
            &customer(),
            &request(PaymentMethod::Cod, vec![2]),
            POLICY,
        )
        .await
        .unwrap();

        assert_eq!(receipt.status, OrderStatus::Paid);
        assert_eq!(receipt.grand_total, Money::ZERO);

        let log = db.into_transaction_log();
        let link = find_statement(&log, r#"INSERT INTO "order_vouchers""#);
        assert!(bound(link, Value::from(10i64)));
        assert!(bound(link, Value::from(20i64)));

        let order = find_statement(&log, r#"UPDATE "orders""#);
        assert!(bound(order, Value::from(OrderStatus::Paid.code())));
    }

    #[tokio::test]
    async fn test_capture_paypal_completed_is_paid() {
        let paypal_row = paypal_transactions::Model {
            id: 1,
            transaction_id: 7,
            paypal_id: "3C679366HH908993F".to_string(),
            status: STATUS_COMPLETED.to_string(),
            payer_email: "alice@example.com".to_string(),
            payer_name: "Alice Doe".to_string(),
            gross_cents: 2400,
            fee_cents: 100,
            created_at: Utc::now(),
        };
        let db = primed(Vec::new())
            .append_query_results([vec![payment_row(PaymentMethod::Paypal)]])
            .append_query_results([vec![paypal_row]])
            .append_query_results([vec![placed(OrderStatus::Paid)]])
            .append_query_results([Vec::<settings::Model>::new()])
            .append_query_results([Vec::<settings::Model>::new()])
            .append_exec_results([exec(1)])
            .into_connection();
        let gateway = FixedGateway(capture(STATUS_COMPLETED, 2400));
        let mailer = RecordingMailer::default();

        let receipt = capture_order(
            &db,
            &gateway,
            &mailer,
            &customer(),
            &request(PaymentMethod::Paypal, Vec::new()),
            POLICY,
        )
        .await
        .unwrap();

        assert_eq!(receipt.status, OrderStatus::Paid);
        // Order confirmation and payment receipt
        assert_eq!(mailer.recipients().len(), 2);

        let log = db.into_transaction_log();
        let record = find_statement(&log, r#"INSERT INTO "paypal_transactions""#);
        assert!(bound(record, Value::from("3C679366HH908993F")));
        assert_eq!(sql_of(&log)[0].last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_capture_paypal_not_completed_rolls_back() {
        let db = primed(Vec::new())
            .append_query_results([vec![payment_row(PaymentMethod::Paypal)]])
            .append_exec_results([exec(1)])
            .into_connection();
        let gateway = FixedGateway(capture("PAYER_ACTION_REQUIRED", 2400));
        let mailer = RecordingMailer::default();

        let err = capture_order(
            &db,
            &gateway,
            &mailer,
            &customer(),
            &request(PaymentMethod::Paypal, Vec::new()),
            POLICY,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StorefrontError>(),
            Some(StorefrontError::PaymentError(_))
        ));
        assert!(mailer.recipients().is_empty());

        let sql = sql_of(&db.into_transaction_log());
        assert_eq!(sql.len(), 1);
        assert_eq!(sql[0].last().map(String::as_str), Some("ROLLBACK"));
        assert!(!sql[0].iter().any(|s| s == "COMMIT"));
    }

    #[tokio::test]
    async fn test_capture_paypal_short_payment_keeps_capture_record() {
        let paypal_row = paypal_transactions::Model {
            id: 1,
            transaction_id: 8,
            paypal_id: "3C679366HH908993F".to_string(),
            status: STATUS_COMPLETED.to_string(),
            payer_email: "alice@example.com".to_string(),
            payer_name: "Alice Doe".to_string(),
            gross_cents: 1000,
            fee_cents: 100,
            created_at: Utc::now(),
        };
        let db = primed(Vec::new())
            .append_query_results([vec![payment_row(PaymentMethod::Paypal)]])
            .append_query_results([vec![transactions::Model {
                id: 8,
                ..payment_row(PaymentMethod::Paypal)
            }]])
            .append_query_results([vec![paypal_row]])
            .append_exec_results([exec(1)])
            .into_connection();
        let gateway = FixedGateway(capture(STATUS_COMPLETED, 1000));
        let mailer = RecordingMailer::default();

        let err = capture_order(
            &db,
            &gateway,
            &mailer,
            &customer(),
            &request(PaymentMethod::Paypal, Vec::new()),
            POLICY,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "payment error: captured 10.00 but the order total is 24.00");

        let sql = sql_of(&db.into_transaction_log());
        assert_eq!(sql[0].last().map(String::as_str), Some("ROLLBACK"));
        // The capture is written after the rollback, outside the order transaction
        let after: Vec<&str> = sql[1..].iter().flatten().map(String::as_str).collect();
        assert!(after.iter().any(|s| s.starts_with(r#"INSERT INTO "transactions""#)));
        assert!(after.iter().any(|s| s.starts_with(r#"INSERT INTO "paypal_transactions""#)));
    }

    #[tokio::test]
    async fn test_capture_fails_when_stock_is_gone() {
        let db = primed(Vec::new()).append_exec_results([exec(0)]).into_connection();
        let gateway = FixedGateway(capture(STATUS_COMPLETED, 2400));
        let mailer = RecordingMailer::default();

        let err = capture_order(
            &db,
            &gateway,
            &mailer,
            &customer(),
            &request(PaymentMethod::Cod, Vec::new()),
            POLICY,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "not enough quantity of 'Lamp'");
        let sql = sql_of(&db.into_transaction_log());
        assert_eq!(sql[0].last().map(String::as_str), Some("ROLLBACK"));
    }
}
