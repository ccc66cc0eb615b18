//! Bulk product import from CSV

use std::collections::{HashMap, HashSet};
use std::io::Read;

use chrono::Utc;
use serde::Serialize;
use storefront_common::utils::is_valid_stock;
use storefront_common::{MAX_PRICE, Money, StorefrontError};
use storefront_persistence::entity::{categories, products};
use storefront_persistence::sea_orm::*;

/// Columns every import file must carry, in any order
pub const REQUIRED_COLUMNS: &[&str] = &[
    "name",
    "price",
    "discount_price",
    "description",
    "category",
    "quantity",
];
pub const IMAGE_COLUMN: &str = "image";
/// Icon given to categories that only exist because an import named them
pub const IMPORTED_CATEGORY_CSS: &str = "fas fa-random";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub processed: u64,
    pub ignored: u64,
}

/// A valid row of an import file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRow {
    pub name: String,
    pub price: Money,
    pub discount_price: Money,
    pub description: String,
    pub category: String,
    pub quantity: i64,
    pub image: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedImport {
    pub rows: Vec<ImportRow>,
    pub ignored: u64,
}

fn parse_price(value: &str) -> Option<Money> {
    let price: Money = value.parse().ok()?;
    (price.is_positive() && price <= MAX_PRICE).then_some(price)
}

/// Read an import file. Empty lines are skipped, rows that fail validation
/// or repeat an earlier name are counted as ignored.
pub fn parse_csv<R: Read>(reader: R) -> anyhow::Result<ParsedImport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();

    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !index.contains_key(*c)) {
        return Err(StorefrontError::illegal(format!(
            "import file is missing the '{}' column",
            missing
        ))
        .into());
    }

    let column = |record: &csv::StringRecord, name: &str| -> String {
        index
            .get(name)
            .and_then(|i| record.get(*i))
            .unwrap_or_default()
            .to_string()
    };

    let mut parsed = ParsedImport::default();
    let mut seen = HashSet::new();

    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let name = column(&record, "name");
        let price = parse_price(&column(&record, "price"));
        let discount_raw = column(&record, "discount_price");
        let discount_price = if discount_raw.is_empty() {
            price
        } else {
            parse_price(&discount_raw)
        };
        let quantity = column(&record, "quantity")
            .parse::<i64>()
            .ok()
            .filter(|q| is_valid_stock(*q));
        let category = column(&record, "category");

        let (Some(price), Some(discount_price), Some(quantity)) = (price, discount_price, quantity)
        else {
            parsed.ignored += 1;
            continue;
        };

        if name.is_empty() || category.is_empty() || !seen.insert(name.clone()) {
            parsed.ignored += 1;
            continue;
        }

        let image = Some(column(&record, IMAGE_COLUMN)).filter(|i| !i.is_empty());

        parsed.rows.push(ImportRow {
            name,
            price,
            discount_price,
            description: column(&record, "description"),
            category,
            quantity,
            image,
        });
    }

    Ok(parsed)
}

async fn category_id(
    txn: &DatabaseTransaction,
    cache: &mut HashMap<String, i64>,
    name: &str,
) -> anyhow::Result<i64> {
    if let Some(id) = cache.get(name) {
        return Ok(*id);
    }

    let existing = categories::Entity::find()
        .filter(categories::Column::Name.eq(name))
        .one(txn)
        .await?;

    let id = match existing {
        Some(category) if category.deleted_at.is_none() => category.id,
        Some(category) => {
            let mut active: categories::ActiveModel = category.into();
            active.deleted_at = Set(None);
            active.update(txn).await?.id
        }
        None => {
            categories::ActiveModel {
                name: Set(name.to_string()),
                image_css: Set(IMPORTED_CATEGORY_CSS.to_string()),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(txn)
            .await?
            .id
        }
    };

    cache.insert(name.to_string(), id);
    Ok(id)
}

/// Upsert the products of an import file by name, in one transaction.
pub async fn import_products<R: Read>(
    db: &DatabaseConnection,
    reader: R,
) -> anyhow::Result<ImportReport> {
    let parsed = parse_csv(reader)?;

    let txn = db.begin().await?;
    let mut categories = HashMap::new();

    for row in &parsed.rows {
        let category = category_id(&txn, &mut categories, &row.category).await?;

        let existing = products::Entity::find()
            .filter(products::Column::Name.eq(row.name.as_str()))
            .one(&txn)
            .await?;

        match existing {
            Some(product) => {
                let mut active: products::ActiveModel = product.into();
                active.price_cents = Set(row.price.cents());
                active.discount_price_cents = Set(row.discount_price.cents());
                active.description = Set(row.description.clone());
                active.category_id = Set(Some(category));
                active.quantity = Set(row.quantity);
                if row.image.is_some() {
                    active.image = Set(row.image.clone());
                }
                active.deleted_at = Set(None);
                active.update(&txn).await?;
            }
            None => {
                products::ActiveModel {
                    name: Set(row.name.clone()),
                    price_cents: Set(row.price.cents()),
                    discount_price_cents: Set(row.discount_price.cents()),
                    description: Set(row.description.clone()),
                    image: Set(row.image.clone()),
                    quantity: Set(row.quantity),
                    hide: Set(false),
                    category_id: Set(Some(category)),
                    created_at: Set(Utc::now()),
                    deleted_at: Set(None),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    txn.commit().await?;

    let report = ImportReport {
        processed: parsed.rows.len() as u64,
        ignored: parsed.ignored,
    };

    tracing::info!(
        processed = report.processed,
        ignored = report.ignored,
        "Product import finished"
    );

    Ok(report)
}
