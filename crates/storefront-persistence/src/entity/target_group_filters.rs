use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "target_group_filters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub target_group_id: i64,
    /// first_name, last_name, country, user_id, gender or birthday
    pub field: String,
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::target_groups::Entity",
        from = "Column::TargetGroupId",
        to = "super::target_groups::Column::Id",
        on_delete = "Cascade"
    )]
    TargetGroups,
}

impl Related<super::target_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TargetGroups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
