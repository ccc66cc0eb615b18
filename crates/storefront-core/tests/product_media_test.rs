//! Product image upload and CSV import against files on disk

use std::io::Write;

use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase};
use storefront_common::Money;
use storefront_core::service::{catalog, import};
use storefront_persistence::entity::products;

fn lamp(image: Option<&str>) -> products::Model {
    products::Model {
        id: 12,
        name: "Lamp".to_string(),
        price_cents: 1999,
        discount_price_cents: 1499,
        description: "Desk lamp".to_string(),
        image: image.map(str::to_string),
        quantity: 4,
        hide: false,
        category_id: Some(1),
        created_at: Utc::now(),
        deleted_at: None,
    }
}

#[tokio::test]
async fn test_save_product_image_writes_under_product_dir() {
    let media = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![lamp(None)], vec![lamp(Some("id12/lamp.png"))]])
        .into_connection();

    let product = catalog::save_product_image(&db, media.path(), 12, "../../etc/lamp.png", b"png")
        .await
        .unwrap();

    assert_eq!(product.image.as_deref(), Some("id12/lamp.png"));
    let stored = std::fs::read(media.path().join("id12").join("lamp.png")).unwrap();
    assert_eq!(stored, b"png");
    assert!(!media.path().join("etc").exists());
}

#[tokio::test]
async fn test_save_product_image_rejects_empty_name() {
    let media = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let err = catalog::save_product_image(&db, media.path(), 12, "uploads/", b"png")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "caused: image file name is empty");
}

#[test]
fn test_parse_csv_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name,price,discount_price,description,category,quantity").unwrap();
    writeln!(file, "Lamp,19.99,14.99,Desk lamp,Lights,3").unwrap();
    writeln!(file, "Chair,abc,,Wooden,Furniture,2").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "Bulb,2.5,,LED,Lights,40").unwrap();

    let parsed = import::parse_csv(std::fs::File::open(file.path()).unwrap()).unwrap();

    assert_eq!(parsed.ignored, 1);
    assert_eq!(parsed.rows.len(), 2);
    assert_eq!(parsed.rows[1].name, "Bulb");
    assert_eq!(parsed.rows[1].discount_price, Money::from_cents(250));
}
