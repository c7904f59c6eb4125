use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Junction table for the node <-> group many-to-many relationship.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "node_group_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub node_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::node::Entity",
        from = "Column::NodeId",
        to = "super::node::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    Node,
    #[sea_orm(
        belongs_to = "super::node_group::Entity",
        from = "Column::GroupId",
        to = "super::node_group::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    NodeGroup,
}

impl Related<super::node::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Node.def()
    }
}

impl Related<super::node_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NodeGroup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
