//! Shopping cart service
//!
//! A guest keeps the cart in the `products` cookie as a JSON map of product
//! id to quantity. A signed-in customer's cart is their order in the `Cart`
//! status, created on first use.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use storefront_common::utils::{MAX_QUANTITY, is_positive_safe_integer, is_valid_quantity};
use storefront_common::{Money, Rate, StorefrontError};
use storefront_persistence::entity::{order_items, orders, products};
use storefront_persistence::sea_orm::*;

use crate::model::{CartLine, CartUpdate, CartView, OrderStatus};
use crate::pricing::{CartTotals, LineItem};
use crate::service::voucher;

/// Name of the guest cart cookie
pub const GUEST_CART_COOKIE: &str = "products";

/// Product id to quantity
pub type GuestCart = BTreeMap<i64, i64>;

fn json_integer(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode the guest cart cookie. `None` means the cookie is corrupt and
/// should be cleared. Ids must be positive safe integers and quantities
/// within `1..=MAX_QUANTITY`.
pub fn parse_guest_cart(cookie: &str) -> Option<GuestCart> {
    let raw: HashMap<String, serde_json::Value> = serde_json::from_str(cookie).ok()?;

    let mut cart = GuestCart::new();
    for (key, value) in raw {
        let id: i64 = key.trim().parse().ok()?;
        let qty = json_integer(&value)?;
        if !is_positive_safe_integer(id) || !is_valid_quantity(qty) {
            return None;
        }
        cart.insert(id, qty);
    }

    Some(cart)
}

pub fn encode_guest_cart(cart: &GuestCart) -> String {
    let map: BTreeMap<String, i64> = cart.iter().map(|(id, qty)| (id.to_string(), *qty)).collect();
    serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
}

fn check_positive(product_id: i64, quantity: i64) -> Result<(), StorefrontError> {
    if !is_positive_safe_integer(product_id) {
        return Err(StorefrontError::illegal("product id must be a positive integer"));
    }
    if !is_valid_quantity(quantity) {
        return Err(StorefrontError::illegal(format!(
            "quantity must be between 1 and {}",
            MAX_QUANTITY
        )));
    }
    Ok(())
}

async fn visible_product(db: &impl ConnectionTrait, id: i64) -> anyhow::Result<products::Model> {
    products::Entity::find_by_id(id)
        .filter(products::Column::DeletedAt.is_null())
        .filter(products::Column::Hide.eq(false))
        .one(db)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("product {}", id)).into())
}

fn line_of(product: &products::Model, quantity: i64, vat: Rate) -> LineItem {
    LineItem::new(
        product.id,
        product.name.clone(),
        Money::from_cents(product.discount_price_cents),
        vat,
        quantity,
    )
}

fn update_for(product_id: i64, lines: &[CartLine]) -> CartUpdate {
    let items: Vec<LineItem> = lines.iter().map(|l| l.item.clone()).collect();
    let current = lines.iter().find(|l| l.item.product_id == product_id);

    CartUpdate {
        product_id,
        prod_price: current.map(|l| l.price_with_vat).unwrap_or_default(),
        total_prod_price: current.map(|l| l.total_with_vat).unwrap_or_default(),
        totals: CartTotals::of(&items),
        cart_quantity: items.iter().map(|i| i.quantity).sum(),
    }
}

fn totals_of(lines: &[CartLine]) -> CartTotals {
    let items: Vec<LineItem> = lines.iter().map(|l| l.item.clone()).collect();
    CartTotals::of(&items)
}

// ============== Guest cart ==============

/// Price a guest cart. Products that disappeared or were hidden are left out.
pub async fn guest_lines(
    db: &impl ConnectionTrait,
    cart: &GuestCart,
    vat: Rate,
) -> anyhow::Result<Vec<CartLine>> {
    if cart.is_empty() {
        return Ok(Vec::new());
    }

    let products = products::Entity::find()
        .filter(products::Column::Id.is_in(cart.keys().copied().collect::<Vec<_>>()))
        .filter(products::Column::DeletedAt.is_null())
        .filter(products::Column::Hide.eq(false))
        .order_by_asc(products::Column::Id)
        .all(db)
        .await?;

    Ok(products
        .iter()
        .filter_map(|p| {
            cart.get(&p.id)
                .map(|qty| CartLine::new(line_of(p, *qty, vat), p.image.clone()))
        })
        .collect())
}

pub async fn guest_view(
    db: &impl ConnectionTrait,
    cart: &GuestCart,
    vat: Rate,
) -> anyhow::Result<CartView> {
    let lines = guest_lines(db, cart, vat).await?;
    let totals = totals_of(&lines);
    let quantity = lines.iter().map(|l| l.item.quantity).sum();

    Ok(CartView {
        lines,
        totals,
        quantity,
        vouchers: Vec::new(),
    })
}

pub async fn guest_add(
    db: &impl ConnectionTrait,
    cart: &mut GuestCart,
    product_id: i64,
    quantity: i64,
    vat: Rate,
) -> anyhow::Result<CartUpdate> {
    check_positive(product_id, quantity)?;
    let product = visible_product(db, product_id).await?;

    let wanted = cart.get(&product_id).copied().unwrap_or(0) + quantity;
    if wanted > product.quantity {
        return Err(StorefrontError::NotEnoughQuantity(product.name).into());
    }
    cart.insert(product_id, wanted);

    let lines = guest_lines(db, cart, vat).await?;
    Ok(update_for(product_id, &lines))
}

/// Take `quantity` units out of a guest cart; `None` or a quantity at least
/// as large as the line drops the line.
pub async fn guest_remove(
    db: &impl ConnectionTrait,
    cart: &mut GuestCart,
    product_id: i64,
    quantity: Option<i64>,
    vat: Rate,
) -> anyhow::Result<CartUpdate> {
    check_positive(product_id, quantity.unwrap_or(1))?;

    let current = cart
        .get(&product_id)
        .copied()
        .ok_or_else(|| StorefrontError::not_found(format!("product {} in cart", product_id)))?;

    match quantity {
        Some(qty) if qty < current => {
            cart.insert(product_id, current - qty);
        }
        _ => {
            cart.remove(&product_id);
        }
    }

    let lines = guest_lines(db, cart, vat).await?;
    Ok(update_for(product_id, &lines))
}

// ============== Customer cart ==============

pub async fn find_cart(
    db: &impl ConnectionTrait,
    user_id: i64,
) -> anyhow::Result<Option<orders::Model>> {
    let cart = orders::Entity::find()
        .filter(orders::Column::UserId.eq(user_id))
        .filter(orders::Column::Status.eq(OrderStatus::Cart.code()))
        .filter(orders::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    Ok(cart)
}

pub async fn get_or_create_cart(
    db: &impl ConnectionTrait,
    user_id: i64,
) -> anyhow::Result<orders::Model> {
    if let Some(cart) = find_cart(db, user_id).await? {
        return Ok(cart);
    }

    let cart = orders::ActiveModel {
        user_id: Set(user_id),
        status: Set(OrderStatus::Cart.code()),
        ordered_at: Set(None),
        created_at: Set(Utc::now()),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(cart)
}

/// Lines of an order priced at the products' current discount price.
pub async fn order_lines(
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
        .filter_map(|(item, product)| {
            product.map(|p| CartLine::new(line_of(&p, item.quantity, vat), p.image.clone()))
        })
        .collect())
}

pub async fn cart_quantity(db: &impl ConnectionTrait, user_id: i64) -> anyhow::Result<i64> {
    let Some(cart) = find_cart(db, user_id).await? else {
        return Ok(0);
    };

    let items = order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(cart.id))
        .all(db)
        .await?;

    Ok(items.iter().map(|i| i.quantity).sum())
}

pub async fn view_cart(
    db: &DatabaseConnection,
    user_id: i64,
    vat: Rate,
) -> anyhow::Result<CartView> {
    let lines = match find_cart(db, user_id).await? {
        Some(cart) => order_lines(db, cart.id, vat).await?,
        None => Vec::new(),
    };
    let totals = totals_of(&lines);
    let quantity = lines.iter().map(|l| l.item.quantity).sum();
    let vouchers = voucher::available_vouchers(db, user_id, Utc::now().date_naive()).await?;

    Ok(CartView {
        lines,
        totals,
        quantity,
        vouchers,
    })
}

async fn find_item(
    db: &impl ConnectionTrait,
    order_id: i64,
    product_id: i64,
) -> anyhow::Result<Option<order_items::Model>> {
    let item = order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .filter(order_items::Column::ProductId.eq(product_id))
        .one(db)
        .await?;

    Ok(item)
}

/// Put `quantity` more units of a product into the customer's cart,
/// never more than is in stock.
async fn add_clamped(
    txn: &DatabaseTransaction,
    order_id: i64,
    product: &products::Model,
    quantity: i64,
    clamp: bool,
) -> anyhow::Result<()> {
    let existing = find_item(txn, order_id, product.id).await?;
    let current = existing.as_ref().map(|i| i.quantity).unwrap_or(0);

    let mut wanted = current + quantity;
    if wanted > product.quantity {
        if !clamp {
            return Err(StorefrontError::NotEnoughQuantity(product.name.clone()).into());
        }
        wanted = product.quantity;
    }
    if wanted <= current {
        return Ok(());
    }

    match existing {
        Some(item) => {
            let mut active: order_items::ActiveModel = item.into();
            active.quantity = Set(wanted);
            active.update(txn).await?;
        }
        None => {
            order_items::ActiveModel {
                order_id: Set(order_id),
                product_id: Set(product.id),
                quantity: Set(wanted),
                price_cents: Set(product.discount_price_cents),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }
    }

    Ok(())
}

pub async fn add_to_cart(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    quantity: i64,
    vat: Rate,
) -> anyhow::Result<CartUpdate> {
    check_positive(product_id, quantity)?;

    let txn = db.begin().await?;
    let product = visible_product(&txn, product_id).await?;
    let cart = get_or_create_cart(&txn, user_id).await?;
    add_clamped(&txn, cart.id, &product, quantity, false).await?;
    let lines = order_lines(&txn, cart.id, vat).await?;
    txn.commit().await?;

    Ok(update_for(product_id, &lines))
}

pub async fn remove_from_cart(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    quantity: Option<i64>,
    vat: Rate,
) -> anyhow::Result<CartUpdate> {
    check_positive(product_id, quantity.unwrap_or(1))?;

    let txn = db.begin().await?;
    let cart = find_cart(&txn, user_id)
        .await?
        .ok_or_else(|| StorefrontError::not_found("cart"))?;
    let item = find_item(&txn, cart.id, product_id)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("product {} in cart", product_id)))?;

    match quantity {
        Some(qty) if qty < item.quantity => {
            let remaining = item.quantity - qty;
            let mut active: order_items::ActiveModel = item.into();
            active.quantity = Set(remaining);
            active.update(&txn).await?;
        }
        _ => {
            item.delete(&txn).await?;
        }
    }

    let lines = order_lines(&txn, cart.id, vat).await?;
    txn.commit().await?;

    Ok(update_for(product_id, &lines))
}

/// Move a guest cart into the customer's cart after sign-in. Quantities
/// are added up and capped at what is in stock; unknown products are
/// dropped.
pub async fn merge_guest_cart(
    db: &DatabaseConnection,
    user_id: i64,
    guest: &GuestCart,
) -> anyhow::Result<()> {
    if guest.is_empty() {
        return Ok(());
    }

    let txn = db.begin().await?;
    let cart = get_or_create_cart(&txn, user_id).await?;

    let products = products::Entity::find()
        .filter(products::Column::Id.is_in(guest.keys().copied().collect::<Vec<_>>()))
        .filter(products::Column::DeletedAt.is_null())
        .filter(products::Column::Hide.eq(false))
        .all(&txn)
        .await?;

    for product in &products {
        if let Some(qty) = guest.get(&product.id) {
            add_clamped(&txn, cart.id, product, *qty, true).await?;
        }
    }

    txn.commit().await?;

    tracing::debug!(user_id, lines = products.len(), "Guest cart merged");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_guest_cart() {
        let cart = parse_guest_cart(r#"{"3": 2, "10": "1"}"#).unwrap();
        assert_eq!(cart.get(&3), Some(&2));
        assert_eq!(cart.get(&10), Some(&1));
        assert_eq!(cart.len(), 2);

        assert_eq!(parse_guest_cart("{}").unwrap().len(), 0);
    }

    #[test]
    fn test_parse_guest_cart_rejects_corrupt_cookie() {
        assert!(parse_guest_cart("not json").is_none());
        assert!(parse_guest_cart(r#"{"abc": 1}"#).is_none());
        assert!(parse_guest_cart(r#"{"1": 0}"#).is_none());
        assert!(parse_guest_cart(r#"{"-4": 2}"#).is_none());
        assert!(parse_guest_cart(r#"{"1": 1.5}"#).is_none());
        assert!(parse_guest_cart(r#"{"1": 9007199254740992}"#).is_none());
        assert!(parse_guest_cart(r#"{"1": 10000000000000}"#).is_none());
        assert!(parse_guest_cart("[1, 2]").is_none());
    }

    #[test]
    fn test_encode_guest_cart() {
        let mut cart = GuestCart::new();
        cart.insert(5, 2);
        cart.insert(12, 1);
        let encoded = encode_guest_cart(&cart);
        assert_eq!(encoded, r#"{"12":1,"5":2}"#);
        assert_eq!(parse_guest_cart(&encoded), Some(cart));
    }

    #[test]
    fn test_update_for_removed_line() {
        let lines = vec![CartLine::new(
            LineItem::new(1, "Lamp", Money::from_cents(1000), Rate::from_basis_points(2000), 2),
            None,
        )];

        let update = update_for(1, &lines);
        assert_eq!(update.prod_price, Money::from_cents(1200));
        assert_eq!(update.total_prod_price, Money::from_cents(2400));
        assert_eq!(update.cart_quantity, 2);

        let update = update_for(7, &lines);
        assert_eq!(update.total_prod_price, Money::ZERO);
        assert_eq!(update.totals.grand_total, Money::from_cents(2400));
    }

    #[tokio::test]
    async fn test_guest_add_rejects_beyond_stock() {
        let product = products::Model {
            id: 1,
            name: "Lamp".to_string(),
            price_cents: 1000,
            discount_price_cents: 900,
            description: String::new(),
            image: None,
            quantity: 2,
            hide: false,
            category_id: None,
            created_at: Utc::now(),
            deleted_at: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![product]])
            .into_connection();

        let mut cart = GuestCart::new();
        cart.insert(1, 2);

        let err = guest_add(&db, &mut cart, 1, 1, Rate::from_basis_points(2000))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not enough quantity of 'Lamp'");
        assert_eq!(cart.get(&1), Some(&2));
    }

    #[tokio::test]
    async fn test_guest_add_rejects_quantity_over_limit() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let mut cart = GuestCart::new();

        let err = guest_add(&db, &mut cart, 1, MAX_QUANTITY + 1, Rate::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "caused: quantity must be between 1 and 1000000");
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_guest_lines_skip_hidden_products() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<products::Model>::new()])
            .into_connection();

        let mut cart = GuestCart::new();
        cart.insert(1, 2);

        let view = guest_view(&db, &cart, Rate::from_basis_points(2000)).await.unwrap();
        assert!(view.lines.is_empty());
        assert_eq!(view.quantity, 0);

        let log = db.into_transaction_log();
        let select = &log[0].statements()[0];
        assert!(select.sql.contains(r#""products"."hide" = "#));
        assert!(select.values.as_ref().is_some_and(|v| v.0.contains(&Value::from(false))));
    }

    #[tokio::test]
    async fn test_guest_remove_unknown_line() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let mut cart = GuestCart::new();

        let err = guest_remove(&db, &mut cart, 4, None, Rate::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StorefrontError>(),
            Some(StorefrontError::NotFound(_))
        ));
    }
}
