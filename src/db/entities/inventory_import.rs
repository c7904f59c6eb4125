use crate::db::enums::{ImportStatus, InventoryFormat};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_imports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub filename: String,
    pub file_path: String,
    pub format: InventoryFormat,
    pub total_nodes: i32,
    pub total_groups: i32,
    #[sea_orm(indexed)]
    pub status: ImportStatus,
    pub created_at: DateTimeUtc,
    pub imported_at: Option<DateTimeUtc>,
    pub rolled_back_at: Option<DateTimeUtc>,
    /// Node ids created by this import, recorded so rollback deletes exactly
    /// this set and nothing else.
    pub created_nodes: Option<Json>,
    pub created_groups: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
}

impl Model {
    pub fn created_node_ids(&self) -> Vec<i32> {
        self.created_nodes
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub fn created_group_ids(&self) -> Vec<i32> {
        self.created_groups
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
