//! Target group: a named snapshot of customers selected by filters

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "target_groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::target_group_filters::Entity")]
    TargetGroupFilters,
    #[sea_orm(has_many = "super::target_group_users::Entity")]
    TargetGroupUsers,
    #[sea_orm(has_many = "super::promotions::Entity")]
    Promotions,
}

impl Related<super::target_group_filters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TargetGroupFilters.def()
    }
}

impl Related<super::target_group_users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TargetGroupUsers.def()
    }
}

impl Related<super::promotions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promotions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
