use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::{node, node_group, node_group_member};
use crate::db::enums::NodeStatus;
use crate::inventory::normalizer::{DEFAULT_PORT, DEFAULT_USERNAME};

pub struct CreateNodeParams {
    pub name: String,
    pub hostname: String,
    pub username: Option<String>,
    pub port: Option<i32>,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct UpdateNodeParams {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub port: Option<i32>,
    pub description: Option<String>,
}

pub async fn list_nodes(db: &DatabaseConnection) -> Result<Vec<node::Model>, DbErr> {
    node::Entity::find()
        .order_by_asc(node::Column::Id)
        .all(db)
        .await
}

pub async fn get_node(db: &DatabaseConnection, id: i32) -> Result<Option<node::Model>, DbErr> {
    node::Entity::find_by_id(id).one(db).await
}

pub async fn get_nodes_by_ids(
    db: &DatabaseConnection,
    ids: &[i32],
) -> Result<Vec<node::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    node::Entity::find()
        .filter(node::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await
}

pub async fn find_by_hostname(
    db: &DatabaseConnection,
    hostname: &str,
) -> Result<Option<node::Model>, DbErr> {
    node::Entity::find()
        .filter(node::Column::Hostname.eq(hostname))
        .one(db)
        .await
}

pub async fn create_node(
    db: &DatabaseConnection,
    params: CreateNodeParams,
) -> Result<node::Model, DbErr> {
    let now = Utc::now();
    let active = node::ActiveModel {
        name: Set(params.name),
        hostname: Set(params.hostname),
        username: Set(params.username.unwrap_or_else(|| DEFAULT_USERNAME.to_string())),
        port: Set(params.port.unwrap_or(DEFAULT_PORT)),
        description: Set(params.description),
        status: Set(NodeStatus::Unknown),
        last_checked: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    active.insert(db).await
}

pub async fn update_node(
    db: &DatabaseConnection,
    id: i32,
    params: UpdateNodeParams,
) -> Result<Option<node::Model>, DbErr> {
    let Some(existing) = node::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let mut active: node::ActiveModel = existing.into();
    if let Some(name) = params.name {
        active.name = Set(name);
    }
    if let Some(hostname) = params.hostname {
        active.hostname = Set(hostname);
    }
    if let Some(username) = params.username {
        active.username = Set(username);
    }
    if let Some(port) = params.port {
        active.port = Set(port);
    }
    if let Some(description) = params.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(Utc::now());
    Ok(Some(active.update(db).await?))
}

/// Deletes a node and its group memberships. Returns false if it never existed.
pub async fn delete_node(db: &DatabaseConnection, id: i32) -> Result<bool, DbErr> {
    let Some(existing) = node::Entity::find_by_id(id).one(db).await? else {
        return Ok(false);
    };
    node_group_member::Entity::delete_many()
        .filter(node_group_member::Column::NodeId.eq(id))
        .exec(db)
        .await?;
    existing.delete(db).await?;
    Ok(true)
}

/// The prober's single write path: status and check timestamp together.
pub async fn set_status(
    db: &DatabaseConnection,
    id: i32,
    status: NodeStatus,
    checked_at: DateTime<Utc>,
) -> Result<Option<node::Model>, DbErr> {
    let Some(existing) = node::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let mut active: node::ActiveModel = existing.into();
    active.status = Set(status);
    active.last_checked = Set(Some(checked_at));
    active.updated_at = Set(checked_at);
    Ok(Some(active.update(db).await?))
}

pub async fn groups_of(
    db: &DatabaseConnection,
    node: &node::Model,
) -> Result<Vec<node_group::Model>, DbErr> {
    node.find_related(node_group::Entity).all(db).await
}
