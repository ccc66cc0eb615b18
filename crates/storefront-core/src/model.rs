//! Storefront domain models
//!
//! Types returned by the services and serialized straight into API responses.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use storefront_common::{Money, PageLink, StorefrontError};
use storefront_persistence::entity::{categories, products};

use crate::pricing::{CartTotals, LineItem, VoucherAmount};

/// Lifecycle of an order; the numeric values are what the `orders.status`
/// column stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Cart,
    Paid,
    Shipped,
    Refused,
    Declined,
    AwaitingPayment,
    Completed,
}

impl OrderStatus {
    pub const fn code(self) -> i32 {
        match self {
            OrderStatus::Cart => 0,
            OrderStatus::Paid => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Refused => 3,
            OrderStatus::Declined => 4,
            OrderStatus::AwaitingPayment => 5,
            OrderStatus::Completed => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Cart => "Cart",
            OrderStatus::Paid => "Paid",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Refused => "Refused",
            OrderStatus::Declined => "Declined",
            OrderStatus::AwaitingPayment => "Awaiting payment",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl TryFrom<i32> for OrderStatus {
    type Error = StorefrontError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OrderStatus::Cart),
            1 => Ok(OrderStatus::Paid),
            2 => Ok(OrderStatus::Shipped),
            3 => Ok(OrderStatus::Refused),
            4 => Ok(OrderStatus::Declined),
            5 => Ok(OrderStatus::AwaitingPayment),
            6 => Ok(OrderStatus::Completed),
            _ => Err(StorefrontError::illegal(format!(
                "unknown order status {}",
                value
            ))),
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a customer pays for an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub image_css: String,
}

impl From<categories::Model> for Category {
    fn from(value: categories::Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            image_css: value.image_css,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Money,
    pub discount_price: Money,
    pub description: String,
    pub image: Option<String>,
    pub quantity: i64,
    pub hide: bool,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(value: products::Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            price: Money::from_cents(value.price_cents),
            discount_price: Money::from_cents(value.discount_price_cents),
            description: value.description,
            image: value.image,
            quantity: value.quantity,
            hide: value.hide,
            category_id: value.category_id,
            created_at: value.created_at,
        }
    }
}

/// A page of products together with its paginator links
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub total_count: u64,
    pub page_number: u64,
    pub pages_available: u64,
    pub page_items: Vec<Product>,
    pub pages: Vec<PageLink>,
}

/// Storefront landing data
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Storefront {
    pub categories: Vec<Category>,
    pub newest: Vec<Product>,
}

/// A voucher the customer holds and can still redeem
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableVoucher {
    pub voucher_id: i64,
    pub user_voucher_id: i64,
    pub value: Money,
    pub end_date: NaiveDate,
    pub promotion: String,
}

impl AvailableVoucher {
    pub fn amount(&self) -> VoucherAmount {
        VoucherAmount {
            voucher_id: self.voucher_id,
            value: self.value,
        }
    }
}

/// Line of a cart view: the line item plus its computed prices
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub item: LineItem,
    pub image: Option<String>,
    pub price_with_vat: Money,
    pub total_with_vat: Money,
}

impl CartLine {
    pub fn new(item: LineItem, image: Option<String>) -> Self {
        Self {
            price_with_vat: item.unit_price_with_vat(),
            total_with_vat: item.total_with_vat(),
            item,
            image,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    #[serde(flatten)]
    pub totals: CartTotals,
    pub quantity: i64,
    pub vouchers: Vec<AvailableVoucher>,
}

/// Answer to a cart add or remove
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdate {
    pub product_id: i64,
    pub prod_price: Money,
    pub total_prod_price: Money,
    #[serde(flatten)]
    pub totals: CartTotals,
    pub cart_quantity: i64,
}

/// Priced checkout summary
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub lines: Vec<CartLine>,
    pub sub_total: Money,
    pub vat_sum: Money,
    pub sub_total_vat: Money,
    pub vouchers: Vec<VoucherAmount>,
    pub vouchers_sum: Money,
    pub grand_total: Money,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureReceipt {
    pub order_id: i64,
    pub status: OrderStatus,
    pub grand_total: Money,
    pub message: String,
}

/// Order with its lines and totals, as listed in the back office and on the
/// customer account page
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub status: OrderStatus,
    pub ordered_at: Option<DateTime<Utc>>,
    pub lines: Vec<CartLine>,
    #[serde(flatten)]
    pub totals: CartTotals,
    pub vouchers: Vec<VoucherAmount>,
}
