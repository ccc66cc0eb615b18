use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ActiveValue::Set, EntityTrait};

use storefront_common::{permission, settings as keys};
use storefront_persistence::entity::{permissions, settings};

#[derive(DeriveMigrationName)]
pub struct Migration;

fn setting(kind: &str, key: String, value: &str) -> settings::ActiveModel {
    settings::ActiveModel {
        key: Set(key),
        kind: Set(kind.to_string()),
        value: Set(value.to_string()),
    }
}

fn default_settings() -> Vec<settings::ActiveModel> {
    let mut rows = vec![
        setting(
            keys::KIND_SETTINGS,
            keys::ELEMENTS_PER_PAGE.to_string(),
            &keys::DEFAULT_ELEMENTS_PER_PAGE.to_string(),
        ),
        setting(
            keys::KIND_SETTINGS,
            keys::BACKOFFICE_EXPIRE.to_string(),
            &keys::DEFAULT_BACKOFFICE_EXPIRE.to_string(),
        ),
        setting(
            keys::KIND_SETTINGS,
            keys::VAT.to_string(),
            &keys::DEFAULT_VAT.to_string(),
        ),
    ];

    for (kind, subject) in [
        (keys::KIND_EMAIL_ORDER, "Your order #{order_id}"),
        (keys::KIND_EMAIL_PAYMENT, "Payment received for order #{order_id}"),
    ] {
        let defaults = [
            (keys::EMAIL_SENDER, "shop@localhost"),
            (keys::EMAIL_SUBJECT, subject),
            (keys::EMAIL_UPPER, "Hello {first_name},"),
            (keys::EMAIL_LOWER, "Thank you for shopping with us."),
            (keys::EMAIL_TABLE, "name,quantity,price,subtotal"),
            (keys::EMAIL_BORDER_WEIGHT, "1"),
            (keys::EMAIL_BORDER_COLOR, "#000000"),
        ];
        rows.extend(
            defaults
                .into_iter()
                .map(|(suffix, value)| setting(kind, keys::email_key(kind, suffix), value)),
        );
    }

    rows
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        let rows = permission::ALL.iter().map(|name| permissions::ActiveModel {
            name: Set(ToString::to_string(*name)),
            ..Default::default()
        });
        permissions::Entity::insert_many(rows)
            .exec_without_returning(db)
            .await?;

        settings::Entity::insert_many(default_settings())
            .exec_without_returning(db)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        settings::Entity::delete_many().exec(db).await?;
        permissions::Entity::delete_many().exec(db).await?;

        Ok(())
    }
}
