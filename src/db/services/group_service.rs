use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::entities::{node, node_group, node_group_member};

pub async fn list_groups(db: &DatabaseConnection) -> Result<Vec<node_group::Model>, DbErr> {
    node_group::Entity::find()
        .order_by_asc(node_group::Column::Id)
        .all(db)
        .await
}

pub async fn get_group(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<node_group::Model>, DbErr> {
    node_group::Entity::find_by_id(id).one(db).await
}

pub async fn find_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<node_group::Model>, DbErr> {
    node_group::Entity::find()
        .filter(node_group::Column::Name.eq(name))
        .one(db)
        .await
}

pub async fn members_of(
    db: &DatabaseConnection,
    group: &node_group::Model,
) -> Result<Vec<node::Model>, DbErr> {
    group.find_related(node::Entity).all(db).await
}

pub async fn create_group(
    db: &DatabaseConnection,
    name: String,
    description: Option<String>,
) -> Result<node_group::Model, DbErr> {
    let now = Utc::now();
    let active = node_group::ActiveModel {
        name: Set(name),
        description: Set(description),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    active.insert(db).await
}

pub async fn update_group(
    db: &DatabaseConnection,
    id: i32,
    name: Option<String>,
    description: Option<String>,
) -> Result<Option<node_group::Model>, DbErr> {
    let Some(existing) = node_group::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let mut active: node_group::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(description) = description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(Utc::now());
    Ok(Some(active.update(db).await?))
}

pub async fn delete_group(db: &DatabaseConnection, id: i32) -> Result<bool, DbErr> {
    let Some(existing) = node_group::Entity::find_by_id(id).one(db).await? else {
        return Ok(false);
    };
    node_group_member::Entity::delete_many()
        .filter(node_group_member::Column::GroupId.eq(id))
        .exec(db)
        .await?;
    existing.delete(db).await?;
    Ok(true)
}

/// Adds the given nodes to a group, skipping memberships that already exist
/// and node ids that resolve to nothing.
pub async fn add_nodes(
    db: &DatabaseConnection,
    group_id: i32,
    node_ids: &[i32],
) -> Result<usize, DbErr> {
    if node_ids.is_empty() {
        return Ok(0);
    }
    let existing_nodes = node::Entity::find()
        .filter(node::Column::Id.is_in(node_ids.iter().copied()))
        .all(db)
        .await?;
    let existing_memberships: Vec<i32> = node_group_member::Entity::find()
        .filter(node_group_member::Column::GroupId.eq(group_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.node_id)
        .collect();

    let mut added = 0;
    for node in existing_nodes {
        if existing_memberships.contains(&node.id) {
            continue;
        }
        let membership = node_group_member::ActiveModel {
            node_id: Set(node.id),
            group_id: Set(group_id),
        };
        membership.insert(db).await?;
        added += 1;
    }
    Ok(added)
}

pub async fn remove_node(
    db: &DatabaseConnection,
    group_id: i32,
    node_id: i32,
) -> Result<bool, DbErr> {
    let result = node_group_member::Entity::delete_many()
        .filter(node_group_member::Column::GroupId.eq(group_id))
        .filter(node_group_member::Column::NodeId.eq(node_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}
