use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::db::services::group_service;
use crate::web::models::{AddNodesRequest, CreateGroupRequest, GroupResponse, UpdateGroupRequest};
use crate::web::{error::AppError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/{id}", get(get_group).put(update_group).delete(delete_group))
        .route("/{id}/nodes", post(add_nodes))
        .route("/{id}/nodes/{node_id}", delete(remove_node))
}

async fn to_response(
    state: &AppState,
    group: crate::db::entities::node_group::Model,
) -> Result<GroupResponse, AppError> {
    let members = group_service::members_of(&state.db, &group).await?;
    Ok(GroupResponse::from_model(group, members))
}

async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GroupResponse>>, AppError> {
    let groups = group_service::list_groups(&state.db).await?;
    let mut responses = Vec::with_capacity(groups.len());
    for group in groups {
        responses.push(to_response(&state, group).await?);
    }
    Ok(Json(responses))
}

async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupResponse>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Group name is required".to_string()));
    }
    if group_service::find_by_name(&state.db, &payload.name)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Group name already exists".to_string()));
    }
    let group = group_service::create_group(&state.db, payload.name, payload.description).await?;
    Ok((
        StatusCode::CREATED,
        Json(GroupResponse::from_model(group, Vec::new())),
    ))
}

async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<GroupResponse>, AppError> {
    let group = group_service::get_group(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {id} not found")))?;
    Ok(Json(to_response(&state, group).await?))
}

async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateGroupRequest>,
) -> Result<Json<GroupResponse>, AppError> {
    if let Some(new_name) = payload.name.as_deref() {
        if let Some(existing) = group_service::find_by_name(&state.db, new_name).await? {
            if existing.id != id {
                return Err(AppError::Conflict("Group name already exists".to_string()));
            }
        }
    }
    let group = group_service::update_group(&state.db, id, payload.name, payload.description)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {id} not found")))?;
    Ok(Json(to_response(&state, group).await?))
}

async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !group_service::delete_group(&state.db, id).await? {
        return Err(AppError::NotFound(format!("Group {id} not found")));
    }
    Ok(Json(serde_json::json!({ "message": "Group deleted" })))
}

async fn add_nodes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<AddNodesRequest>,
) -> Result<Json<GroupResponse>, AppError> {
    let group = group_service::get_group(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {id} not found")))?;
    group_service::add_nodes(&state.db, id, &payload.node_ids).await?;
    Ok(Json(to_response(&state, group).await?))
}

async fn remove_node(
    State(state): State<Arc<AppState>>,
    Path((id, node_id)): Path<(i32, i32)>,
) -> Result<Json<GroupResponse>, AppError> {
    let group = group_service::get_group(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {id} not found")))?;
    if !group_service::remove_node(&state.db, id, node_id).await? {
        return Err(AppError::NotFound(format!(
            "Node {node_id} is not a member of group {id}"
        )));
    }
    Ok(Json(to_response(&state, group).await?))
}
