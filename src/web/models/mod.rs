//! Request/response DTOs for the HTTP surface. Responses carry RFC 3339
//! timestamps rather than leaking entity models directly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::entities::{inventory_import, node, node_group, playbook_execution};
use crate::db::enums::{ExecutionStatus, ImportStatus, InventoryFormat, NodeStatus};
use crate::inventory::normalizer::{NormalizedGroup, NormalizedInventory, NormalizedNode};

#[derive(Deserialize, Debug)]
pub struct CreateNodeRequest {
    pub name: String,
    pub hostname: String,
    pub username: Option<String>,
    pub port: Option<i32>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateNodeRequest {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub port: Option<i32>,
    pub description: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct NodeResponse {
    pub id: i32,
    pub name: String,
    pub hostname: String,
    pub username: String,
    pub port: i32,
    pub description: Option<String>,
    pub status: NodeStatus,
    pub last_checked: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub groups: Vec<String>,
}

impl NodeResponse {
    pub fn from_model(model: node::Model, groups: Vec<String>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            hostname: model.hostname,
            username: model.username,
            port: model.port,
            description: model.description,
            status: model.status,
            last_checked: model.last_checked.map(|t| t.to_rfc3339()),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
            groups,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AddNodesRequest {
    pub node_ids: Vec<i32>,
}

#[derive(Serialize, Clone, Debug)]
pub struct GroupResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub node_count: usize,
    pub nodes: Vec<NodeResponse>,
}

impl GroupResponse {
    pub fn from_model(model: node_group::Model, members: Vec<node::Model>) -> Self {
        let nodes: Vec<NodeResponse> = members
            .into_iter()
            .map(|n| NodeResponse::from_model(n, Vec::new()))
            .collect();
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
            node_count: nodes.len(),
            nodes,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CreatePlaybookRequest {
    pub name: String,
    pub content: String,
}

#[derive(Deserialize, Debug)]
pub struct UpdatePlaybookRequest {
    pub content: String,
}

#[derive(Serialize, Debug)]
pub struct PlaybookContentResponse {
    pub name: String,
    pub content: String,
}

#[derive(Deserialize, Debug)]
pub struct CreateExecutionRequest {
    #[serde(default)]
    pub playbooks: Vec<String>,
    #[serde(default)]
    pub target_nodes: Vec<i32>,
    #[serde(default)]
    pub target_groups: Vec<i32>,
}

#[derive(Serialize, Clone, Debug)]
pub struct ExecutionResponse {
    pub id: Uuid,
    pub playbooks: Vec<String>,
    pub target_nodes: Vec<i32>,
    pub target_groups: Vec<i32>,
    pub status: ExecutionStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub output: Option<String>,
    pub error_output: Option<String>,
    pub duration: Option<String>,
}

impl From<playbook_execution::Model> for ExecutionResponse {
    fn from(model: playbook_execution::Model) -> Self {
        let duration = model.completed_at.map(|completed| {
            let elapsed = completed - model.started_at;
            let seconds = elapsed.num_seconds().max(0);
            format!(
                "{:02}:{:02}:{:02}",
                seconds / 3600,
                (seconds % 3600) / 60,
                seconds % 60
            )
        });
        Self {
            id: model.id,
            playbooks: model.playbook_names(),
            target_nodes: model.target_node_ids(),
            target_groups: model.target_group_ids(),
            status: model.status,
            started_at: model.started_at.to_rfc3339(),
            completed_at: model.completed_at.map(|t| t.to_rfc3339()),
            output: model.output,
            error_output: model.error_output,
            duration,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct PasteInventoryRequest {
    pub content: String,
    pub format: Option<InventoryFormat>,
}

#[derive(Serialize, Clone, Debug)]
pub struct ImportResponse {
    pub id: Uuid,
    pub filename: String,
    pub format: InventoryFormat,
    pub total_nodes: i32,
    pub total_groups: i32,
    pub status: ImportStatus,
    pub created_at: String,
    pub imported_at: Option<String>,
    pub rolled_back_at: Option<String>,
    pub created_nodes: Vec<i32>,
    pub created_groups: Vec<i32>,
    pub error_message: Option<String>,
}

impl From<inventory_import::Model> for ImportResponse {
    fn from(model: inventory_import::Model) -> Self {
        Self {
            id: model.id,
            created_nodes: model.created_node_ids(),
            created_groups: model.created_group_ids(),
            filename: model.filename,
            format: model.format,
            total_nodes: model.total_nodes,
            total_groups: model.total_groups,
            status: model.status,
            created_at: model.created_at.to_rfc3339(),
            imported_at: model.imported_at.map(|t| t.to_rfc3339()),
            rolled_back_at: model.rolled_back_at.map(|t| t.to_rfc3339()),
            error_message: model.error_message,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ImportPreview {
    pub nodes: Vec<NormalizedNode>,
    pub groups: Vec<NormalizedGroup>,
    pub total_nodes: usize,
    pub total_groups: usize,
}

impl From<NormalizedInventory> for ImportPreview {
    fn from(inventory: NormalizedInventory) -> Self {
        Self {
            total_nodes: inventory.nodes.len(),
            total_groups: inventory.groups.len(),
            nodes: inventory.nodes,
            groups: inventory.groups,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ImportPreviewResponse {
    pub import_id: Uuid,
    pub preview: ImportPreview,
}
