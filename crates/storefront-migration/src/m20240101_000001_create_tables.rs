use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityTrait, Schema};

use storefront_persistence::entity::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

impl Migration {
    async fn create<E: EntityTrait>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
            .await
    }

    async fn remove<E: EntityTrait + 'static>(
        manager: &SchemaManager<'_>,
        entity: E,
    ) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(entity).if_exists().to_owned())
            .await
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Parents before children so the foreign keys resolve.
        Self::create(manager, categories::Entity).await?;
        Self::create(manager, products::Entity).await?;
        Self::create(manager, users::Entity).await?;
        Self::create(manager, staff::Entity).await?;
        Self::create(manager, roles::Entity).await?;
        Self::create(manager, permissions::Entity).await?;
        Self::create(manager, staff_roles::Entity).await?;
        Self::create(manager, role_permissions::Entity).await?;
        Self::create(manager, orders::Entity).await?;
        Self::create(manager, order_items::Entity).await?;
        Self::create(manager, transactions::Entity).await?;
        Self::create(manager, paypal_transactions::Entity).await?;
        Self::create(manager, logs::Entity).await?;
        Self::create(manager, settings::Entity).await?;
        Self::create(manager, target_groups::Entity).await?;
        Self::create(manager, target_group_filters::Entity).await?;
        Self::create(manager, target_group_users::Entity).await?;
        Self::create(manager, vouchers::Entity).await?;
        Self::create(manager, promotions::Entity).await?;
        Self::create(manager, user_vouchers::Entity).await?;
        Self::create(manager, order_vouchers::Entity).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_logs_timestamp")
                    .table(logs::Entity)
                    .col(logs::Column::Timestamp)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user_status")
                    .table(orders::Entity)
                    .col(orders::Column::UserId)
                    .col(orders::Column::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        Self::remove(manager, order_vouchers::Entity).await?;
        Self::remove(manager, user_vouchers::Entity).await?;
        Self::remove(manager, promotions::Entity).await?;
        Self::remove(manager, vouchers::Entity).await?;
        Self::remove(manager, target_group_users::Entity).await?;
        Self::remove(manager, target_group_filters::Entity).await?;
        Self::remove(manager, target_groups::Entity).await?;
        Self::remove(manager, settings::Entity).await?;
        Self::remove(manager, logs::Entity).await?;
        Self::remove(manager, paypal_transactions::Entity).await?;
        Self::remove(manager, transactions::Entity).await?;
        Self::remove(manager, order_items::Entity).await?;
        Self::remove(manager, orders::Entity).await?;
        Self::remove(manager, role_permissions::Entity).await?;
        Self::remove(manager, staff_roles::Entity).await?;
        Self::remove(manager, permissions::Entity).await?;
        Self::remove(manager, roles::Entity).await?;
        Self::remove(manager, staff::Entity).await?;
        Self::remove(manager, users::Entity).await?;
        Self::remove(manager, products::Entity).await?;
        Self::remove(manager, categories::Entity).await
    }
}
