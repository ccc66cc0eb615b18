//! Product catalog service

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use storefront_common::utils::{MAX_QUANTITY, is_valid_stock};
use storefront_common::{MAX_PRICE, Money, StorefrontError, give_pages};
use storefront_persistence::Page;
use storefront_persistence::entity::{categories, products};
use storefront_persistence::query::{count, ilike};
use storefront_persistence::sea_orm::sea_query::Expr;
use storefront_persistence::sea_orm::*;

use crate::model::{Category, Product, ProductListing, Storefront};

/// Newest products shown on the landing page
pub const NEWEST_PRODUCTS: u64 = 10;
pub const AUTOCOMPLETE_LIMIT: u64 = 10;
/// Upper bound of the storefront price filter
pub const DEFAULT_MAX_FILTER_PRICE: Money = Money::from_cents(9_999_900);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
    Name,
}

impl FromStr for ProductSort {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_asc" => Ok(ProductSort::PriceAsc),
            "price_desc" => Ok(ProductSort::PriceDesc),
            "newest" | "" => Ok(ProductSort::Newest),
            "name" => Ok(ProductSort::Name),
            _ => Err(StorefrontError::illegal(format!("unknown sort '{}'", s))),
        }
    }
}

/// Storefront product list query
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductQuery {
    pub category: Option<i64>,
    pub minval: Option<Money>,
    pub maxval: Option<Money>,
    pub search: String,
    pub sort: ProductSort,
    pub page: Option<u64>,
}

fn visible() -> Condition {
    Condition::all()
        .add(products::Column::DeletedAt.is_null())
        .add(products::Column::Hide.eq(false))
}

pub async fn storefront(db: &DatabaseConnection) -> anyhow::Result<Storefront> {
    let categories = list_categories(db).await?;

    let newest = products::Entity::find()
        .filter(visible())
        .order_by_desc(products::Column::CreatedAt)
        .limit(NEWEST_PRODUCTS)
        .all(db)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(Storefront { categories, newest })
}

pub async fn list_products(
    db: &DatabaseConnection,
    query: &ProductQuery,
    per_page: u64,
) -> anyhow::Result<ProductListing> {
    let min = query.minval.unwrap_or(Money::ZERO);
    let max = query.maxval.unwrap_or(DEFAULT_MAX_FILTER_PRICE);

    let mut condition = visible()
        .add(products::Column::DiscountPriceCents.gte(min.cents()))
        .add(products::Column::DiscountPriceCents.lte(max.cents()));
    if let Some(category) = query.category {
        condition = condition.add(products::Column::CategoryId.eq(category));
    }
    if !query.search.is_empty() {
        condition = condition.add(ilike(products::Column::Name, &query.search));
    }

    let total_count = count(products::Entity::find().filter(condition.clone()), db).await?;
    let page_no = query.page.unwrap_or(1).max(1);

    let select = products::Entity::find().filter(condition);
    let select = match query.sort {
        ProductSort::PriceAsc => select.order_by_asc(products::Column::DiscountPriceCents),
        ProductSort::PriceDesc => select.order_by_desc(products::Column::DiscountPriceCents),
        ProductSort::Newest => select.order_by_desc(products::Column::CreatedAt),
        ProductSort::Name => select.order_by_asc(products::Column::Name),
    };

    let page_items = if total_count > 0 {
        select
            .order_by_asc(products::Column::Id)
            .offset((page_no - 1) * per_page)
            .limit(per_page)
            .all(db)
            .await?
            .into_iter()
            .map(Product::from)
            .collect()
    } else {
        Vec::new()
    };

    let page = Page::new(total_count, page_no, per_page, page_items);
    let pages = give_pages(page.page_number, page.pages_available);

    Ok(ProductListing {
        total_count: page.total_count,
        page_number: page.page_number,
        pages_available: page.pages_available,
        page_items: page.page_items,
        pages,
    })
}

pub async fn find_product(db: &impl ConnectionTrait, id: i64) -> anyhow::Result<products::Model> {
    products::Entity::find_by_id(id)
        .filter(products::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("product {}", id)).into())
}

/// Product detail page; hidden products are not found.
pub async fn get_product(db: &DatabaseConnection, id: i64) -> anyhow::Result<Product> {
    let product = products::Entity::find_by_id(id)
        .filter(visible())
        .one(db)
        .await?
        .ok_or_else(|| StorefrontError::not_found(format!("product {}", id)))?;

    Ok(product.into())
}

/// Back-office product list filters
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminProductFilter {
    pub name: String,
    pub category: Option<i64>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub hide: Option<bool>,
}

pub async fn admin_list_products(
    db: &DatabaseConnection,
    filter: &AdminProductFilter,
    page_no: u64,
    page_size: u64,
) -> anyhow::Result<Page<Product>> {
    let mut condition = Condition::all().add(products::Column::DeletedAt.is_null());
    if !filter.name.is_empty() {
        condition = condition.add(ilike(products::Column::Name, &filter.name));
    }
    if let Some(category) = filter.category {
        condition = condition.add(products::Column::CategoryId.eq(category));
    }
    if let Some(min) = filter.min_price {
        condition = condition.add(products::Column::PriceCents.gte(min.cents()));
    }
    if let Some(max) = filter.max_price {
        condition = condition.add(products::Column::PriceCents.lte(max.cents()));
    }
    if let Some(hide) = filter.hide {
        condition = condition.add(products::Column::Hide.eq(hide));
    }

    let total_count = count(products::Entity::find().filter(condition.clone()), db).await?;

    if total_count > 0 {
        let page_no = page_no.max(1);
        let page_items = products::Entity::find()
            .filter(condition)
            .order_by_desc(products::Column::CreatedAt)
            .offset((page_no - 1) * page_size)
            .limit(page_size)
            .all(db)
            .await?
            .into_iter()
            .map(Product::from)
            .collect();

        return Ok(Page::<Product>::new(
            total_count,
            page_no,
            page_size,
            page_items,
        ));
    }

    Ok(Page::<Product>::default())
}

/// Input of the product add and edit forms
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductForm {
    pub name: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub description: String,
    pub quantity: i64,
    pub category_id: Option<i64>,
    pub hide: bool,
}

impl ProductForm {
    /// Checks the form and returns the effective discount price.
    pub fn validate(&self) -> anyhow::Result<Money> {
        if self.name.trim().is_empty() {
            return Err(StorefrontError::illegal("product must have a name").into());
        }

        let discount_price = self.discount_price.unwrap_or(self.price);
        let in_range = |m: Money| m.is_positive() && m <= MAX_PRICE;
        if !in_range(self.price) || !in_range(discount_price) {
            return Err(StorefrontError::illegal(format!(
                "product price must be within range (0 - {}]",
                MAX_PRICE
            ))
            .into());
        }

        if !is_valid_stock(self.quantity) {
            return Err(StorefrontError::illegal(format!(
                "quantity must be within range [0 - {}]",
                MAX_QUANTITY
            ))
            .into());
        }

        if self.category_id.is_none() {
            return Err(StorefrontError::illegal("please select a category").into());
        }

        Ok(discount_price)
    }
}

async fn ensure_category(db: &impl ConnectionTrait, id: Option<i64>) -> anyhow::Result<()> {
    if let Some(id) = id {
        categories::Entity::find_by_id(id)
            .filter(categories::Column::DeletedAt.is_null())
            .one(db)
            .await?
            .ok_or_else(|| StorefrontError::not_found(format!("category {}", id)))?;
    }
    Ok(())
}

/// Add a product. A soft-deleted product with the same name comes back
/// with the new values.
pub async fn create_product(db: &DatabaseConnection, form: ProductForm) -> anyhow::Result<Product> {
    let discount_price = form.validate()?;
    ensure_category(db, form.category_id).await?;

    let existing = products::Entity::find()
        .filter(products::Column::Name.eq(form.name.as_str()))
        .one(db)
        .await?;

    let model = match existing {
        Some(product) if product.deleted_at.is_none() => {
            return Err(StorefrontError::conflict(format!("product '{}'", form.name)).into());
        }
        Some(product) => {
            let mut active: products::ActiveModel = product.into();
            active.price_cents = Set(form.price.cents());
            active.discount_price_cents = Set(discount_price.cents());
            active.description = Set(form.description);
            active.quantity = Set(form.quantity);
            active.category_id = Set(form.category_id);
            active.hide = Set(form.hide);
            active.deleted_at = Set(None);
            active.update(db).await?
        }
        None => {
            products::ActiveModel {
                name: Set(form.name),
                price_cents: Set(form.price.cents()),
                discount_price_cents: Set(discount_price.cents()),
                description: Set(form.description),
                image: Set(None),
                quantity: Set(form.quantity),
                hide: Set(form.hide),
                category_id: Set(form.category_id),
                created_at: Set(Utc::now()),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    Ok(model.into())
}

pub async fn update_product(
    db: &DatabaseConnection,
    id: i64,
    form: ProductForm,
) -> anyhow::Result<Product> {
    let discount_price = form.validate()?;
    ensure_category(db, form.category_id).await?;

    let product = find_product(db, id).await?;

    let clash = products::Entity::find()
        .filter(products::Column::Name.eq(form.name.as_str()))
        .filter(products::Column::Id.ne(id))
        .one(db)
        .await?;
    if clash.is_some() {
        return Err(StorefrontError::conflict(format!("product '{}'", form.name)).into());
    }

    let mut active: products::ActiveModel = product.into();
    active.name = Set(form.name);
    active.price_cents = Set(form.price.cents());
    active.discount_price_cents = Set(discount_price.cents());
    active.description = Set(form.description);
    active.quantity = Set(form.quantity);
    active.category_id = Set(form.category_id);
    active.hide = Set(form.hide);

    Ok(active.update(db).await?.into())
}

/// Soft-delete products by id; returns how many were deleted.
pub async fn delete_products(db: &DatabaseConnection, ids: &[i64]) -> anyhow::Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = products::Entity::update_many()
        .col_expr(products::Column::DeletedAt, Expr::value(Utc::now()))
        .filter(products::Column::Id.is_in(ids.to_vec()))
        .filter(products::Column::DeletedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Keeps only the last path component of an uploaded file name.
pub fn sanitize_file_name(file_name: &str) -> Option<String> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

/// Where a product image lives, relative to the media directory.
pub fn image_path(product_id: i64, file_name: &str) -> PathBuf {
    Path::new(&format!("id{}", product_id)).join(file_name)
}

/// Store an uploaded image under `{media_dir}/id{product_id}/` and point
/// the product at it.
pub async fn save_product_image(
    db: &DatabaseConnection,
    media_dir: &Path,
    product_id: i64,
    file_name: &str,
    content: &[u8],
) -> anyhow::Result<Product> {
    let file_name = sanitize_file_name(file_name)
        .ok_or_else(|| StorefrontError::illegal("image file name is empty"))?;

    let product = find_product(db, product_id).await?;

    let relative = image_path(product_id, &file_name);
    let target = media_dir.join(&relative);
    if let Some(dir) = target.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&target, content).await?;

    tracing::debug!(product_id, path = %target.display(), "Product image stored");

    let mut active: products::ActiveModel = product.into();
    active.image = Set(Some(relative.to_string_lossy().replace('\\', "/")));

    Ok(active.update(db).await?.into())
}

/// Product names matching `term`, for autocompletion
pub async fn autocomplete(db: &DatabaseConnection, term: &str) -> anyhow::Result<Vec<String>> {
    let names = products::Entity::find()
        .select_only()
        .column(products::Column::Name)
        .filter(visible())
        .filter(ilike(products::Column::Name, term))
        .order_by_asc(products::Column::Name)
        .limit(AUTOCOMPLETE_LIMIT)
        .into_tuple::<String>()
        .all(db)
        .await?;

    Ok(names)
}

pub async fn list_categories(db: &DatabaseConnection) -> anyhow::Result<Vec<Category>> {
    let categories = categories::Entity::find()
        .filter(categories::Column::DeletedAt.is_null())
        .order_by_asc(categories::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    Ok(categories)
}

pub async fn create_category(
    db: &DatabaseConnection,
    name: &str,
    image_css: &str,
) -> anyhow::Result<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorefrontError::illegal("category name must not be empty").into());
    }

    let existing = categories::Entity::find()
        .filter(categories::Column::Name.eq(name))
        .one(db)
        .await?;

    let model = match existing {
        Some(category) if category.deleted_at.is_none() => {
            return Err(StorefrontError::conflict(format!("category '{}'", name)).into());
        }
        Some(category) => {
            let mut active: categories::ActiveModel = category.into();
            active.image_css = Set(image_css.to_string());
            active.deleted_at = Set(None);
            active.update(db).await?
        }
        None => {
            categories::ActiveModel {
                name: Set(name.to_string()),
                image_css: Set(image_css.to_string()),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    Ok(model.into())
}

pub async fn delete_categories(db: &DatabaseConnection, ids: &[i64]) -> anyhow::Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let result = categories::Entity::update_many()
        .col_expr(categories::Column::DeletedAt, Expr::value(Utc::now()))
        .filter(categories::Column::Id.is_in(ids.to_vec()))
        .filter(categories::Column::DeletedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: "Lamp".to_string(),
            price: Money::from_cents(1999),
            discount_price: None,
            description: String::new(),
            quantity: 5,
            category_id: Some(1),
            hide: false,
        }
    }

    #[test]
    fn test_product_form_discount_defaults_to_price() {
        assert_eq!(form().validate().unwrap(), Money::from_cents(1999));

        let f = ProductForm {
            discount_price: Some(Money::from_cents(1499)),
            ..form()
        };
        assert_eq!(f.validate().unwrap(), Money::from_cents(1499));
    }

    #[test]
    fn test_product_form_price_range() {
        let f = ProductForm {
            price: Money::ZERO,
            ..form()
        };
        assert!(f.validate().is_err());

        let f = ProductForm {
            price: MAX_PRICE + Money::from_cents(1),
            ..form()
        };
        assert!(f.validate().is_err());

        let f = ProductForm {
            price: MAX_PRICE,
            ..form()
        };
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_product_form_requires_category_and_stock() {
        let f = ProductForm {
            category_id: None,
            ..form()
        };
        assert_eq!(
            f.validate().unwrap_err().to_string(),
            "caused: please select a category"
        );

        let f = ProductForm {
            quantity: -1,
            ..form()
        };
        assert!(f.validate().is_err());

        let f = ProductForm {
            quantity: MAX_QUANTITY + 1,
            ..form()
        };
        assert_eq!(
            f.validate().unwrap_err().to_string(),
            "caused: quantity must be within range [0 - 1000000]"
        );
    }

    #[test]
    fn test_product_sort_parse() {
        assert_eq!("price_asc".parse::<ProductSort>().unwrap(), ProductSort::PriceAsc);
        assert_eq!("".parse::<ProductSort>().unwrap(), ProductSort::Newest);
        assert!("random".parse::<ProductSort>().is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("lamp.png").as_deref(), Some("lamp.png"));
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("C:\\photos\\lamp.png").as_deref(), Some("lamp.png"));
        assert_eq!(sanitize_file_name("dir/"), None);
        assert_eq!(sanitize_file_name(".."), None);
    }

    #[test]
    fn test_image_path() {
        assert_eq!(image_path(12, "lamp.png"), PathBuf::from("id12").join("lamp.png"));
    }

    #[tokio::test]
    async fn test_get_product_hidden_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<products::Model>::new()])
            .into_connection();

        let err = get_product(&db, 9).await.unwrap_err();
        assert_eq!(err.to_string(), "product 9 not found");
    }
}
