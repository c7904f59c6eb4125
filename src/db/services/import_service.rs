//! Inventory import pipeline: preview is a pure parse, execute commits the
//! parsed shape to the store in one transaction while recording exactly which
//! ids it created, and rollback deletes exactly that recorded set.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::entities::{inventory_import, node, node_group, node_group_member};
use crate::db::enums::{ImportStatus, InventoryFormat, NodeStatus};
use crate::inventory::normalizer::{self, FormatError};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Import {0} not found")]
    NotFound(Uuid),
    #[error("Import already processed")]
    AlreadyProcessed,
    #[error("Can only rollback completed imports")]
    NotRollbackable,
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Failed to read inventory file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

pub async fn create_import(
    db: &DatabaseConnection,
    filename: String,
    file_path: String,
    format: InventoryFormat,
) -> Result<inventory_import::Model, DbErr> {
    let active = inventory_import::ActiveModel {
        id: Set(Uuid::new_v4()),
        filename: Set(filename),
        file_path: Set(file_path),
        format: Set(format),
        total_nodes: Set(0),
        total_groups: Set(0),
        status: Set(ImportStatus::Pending),
        created_at: Set(Utc::now()),
        imported_at: Set(None),
        rolled_back_at: Set(None),
        created_nodes: Set(None),
        created_groups: Set(None),
        error_message: Set(None),
    };
    active.insert(db).await
}

pub async fn list_imports(
    db: &DatabaseConnection,
) -> Result<Vec<inventory_import::Model>, DbErr> {
    inventory_import::Entity::find()
        .order_by_desc(inventory_import::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn get_import(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<inventory_import::Model>, DbErr> {
    inventory_import::Entity::find_by_id(id).one(db).await
}

pub async fn mark_failed(
    db: &DatabaseConnection,
    id: Uuid,
    message: &str,
) -> Result<(), DbErr> {
    let Some(existing) = get_import(db, id).await? else {
        return Ok(());
    };
    let mut active: inventory_import::ActiveModel = existing.into();
    active.status = Set(ImportStatus::Failed);
    active.error_message = Set(Some(message.to_string()));
    active.update(db).await?;
    Ok(())
}

/// Commits a pending import. Any failure past the state check flips the
/// record to `failed` with the error message before propagating.
pub async fn execute_import(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<inventory_import::Model, ImportError> {
    let import = get_import(db, id).await?.ok_or(ImportError::NotFound(id))?;
    if import.status != ImportStatus::Pending {
        return Err(ImportError::AlreadyProcessed);
    }

    match apply_import(db, &import).await {
        Ok(updated) => {
            info!(
                import_id = %id,
                nodes = updated.total_nodes,
                groups = updated.total_groups,
                "Inventory import completed."
            );
            Ok(updated)
        }
        Err(e) => {
            if let Err(mark_err) = mark_failed(db, id, &e.to_string()).await {
                error!(import_id = %id, error = %mark_err, "Failed to record import failure.");
            }
            Err(e)
        }
    }
}

async fn apply_import(
    db: &DatabaseConnection,
    import: &inventory_import::Model,
) -> Result<inventory_import::Model, ImportError> {
    let content = tokio::fs::read_to_string(&import.file_path).await?;
    let normalized = normalizer::normalize(&content, import.format)?;
    let description = format!("Imported from {}", import.filename);
    let now = Utc::now();

    let txn = db.begin().await?;

    let mut created_groups: Vec<i32> = Vec::new();
    let mut group_ids: HashMap<String, i32> = HashMap::new();
    for group in &normalized.groups {
        if let Some(existing) = super::group_service::find_by_name(&txn, &group.name).await? {
            group_ids.insert(group.name.clone(), existing.id);
            continue;
        }
        let created = node_group::ActiveModel {
            name: Set(group.name.clone()),
            description: Set(Some(description.clone())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        group_ids.insert(group.name.clone(), created.id);
        created_groups.push(created.id);
    }

    let mut created_nodes: Vec<i32> = Vec::new();
    for entry in &normalized.nodes {
        if find_node_by_hostname(&txn, &entry.hostname).await?.is_some() {
            continue;
        }
        let created = node::ActiveModel {
            name: Set(entry.name.clone()),
            hostname: Set(entry.hostname.clone()),
            username: Set(entry.username.clone()),
            port: Set(entry.port),
            description: Set(Some(description.clone())),
            status: Set(NodeStatus::Unknown),
            last_checked: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        created_nodes.push(created.id);

        for group_name in &entry.groups {
            if let Some(&group_id) = group_ids.get(group_name) {
                node_group_member::ActiveModel {
                    node_id: Set(created.id),
                    group_id: Set(group_id),
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    let mut active: inventory_import::ActiveModel = import.clone().into();
    active.status = Set(ImportStatus::Completed);
    active.imported_at = Set(Some(now));
    active.total_nodes = Set(created_nodes.len() as i32);
    active.total_groups = Set(created_groups.len() as i32);
    active.created_nodes = Set(Some(serde_json::json!(created_nodes)));
    active.created_groups = Set(Some(serde_json::json!(created_groups)));
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Deletes exactly the nodes and groups recorded at import time. Only a
/// `completed` import can be rolled back, so a second attempt fails.
pub async fn rollback_import(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<inventory_import::Model, ImportError> {
    let import = get_import(db, id).await?.ok_or(ImportError::NotFound(id))?;
    if import.status != ImportStatus::Completed {
        return Err(ImportError::NotRollbackable);
    }

    let node_ids = import.created_node_ids();
    let group_ids = import.created_group_ids();
    let txn = db.begin().await?;

    if !node_ids.is_empty() {
        node_group_member::Entity::delete_many()
            .filter(node_group_member::Column::NodeId.is_in(node_ids.iter().copied()))
            .exec(&txn)
            .await?;
        node::Entity::delete_many()
            .filter(node::Column::Id.is_in(node_ids.iter().copied()))
            .exec(&txn)
            .await?;
    }
    if !group_ids.is_empty() {
        node_group_member::Entity::delete_many()
            .filter(node_group_member::Column::GroupId.is_in(group_ids.iter().copied()))
            .exec(&txn)
            .await?;
        node_group::Entity::delete_many()
            .filter(node_group::Column::Id.is_in(group_ids.iter().copied()))
            .exec(&txn)
            .await?;
    }

    let mut active: inventory_import::ActiveModel = import.into();
    active.status = Set(ImportStatus::RolledBack);
    active.rolled_back_at = Set(Some(Utc::now()));
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!(import_id = %id, "Inventory import rolled back.");
    Ok(updated)
}

async fn find_node_by_hostname<C: ConnectionTrait>(
    db: &C,
    hostname: &str,
) -> Result<Option<node::Model>, DbErr> {
    node::Entity::find()
        .filter(node::Column::Hostname.eq(hostname))
        .one(db)
        .await
}
