use crate::db::enums::ExecutionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "playbook_executions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Ordered list of playbook names, stored as a JSON array.
    pub playbooks: Json,
    pub target_nodes: Option<Json>,
    pub target_groups: Option<Json>,
    #[sea_orm(indexed)]
    pub status: ExecutionStatus,
    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub output: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_output: Option<String>,
}

impl Model {
    pub fn playbook_names(&self) -> Vec<String> {
        serde_json::from_value(self.playbooks.clone()).unwrap_or_default()
    }

    pub fn target_node_ids(&self) -> Vec<i32> {
        self.target_nodes
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub fn target_group_ids(&self) -> Vec<i32> {
        self.target_groups
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
