use crate::db::enums::NodeStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(indexed)]
    pub hostname: String,
    pub username: String,
    pub port: i32,
    pub description: Option<String>,
    #[sea_orm(indexed)]
    pub status: NodeStatus,
    pub last_checked: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::node_group_member::Entity")]
    NodeGroupMember,
}

impl Related<super::node_group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NodeGroupMember.def()
    }
}

impl Related<super::node_group::Entity> for Entity {
    fn to() -> RelationDef {
        super::node_group_member::Relation::NodeGroup.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::node_group_member::Relation::Node.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
