use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::db::services::node_service::{self, CreateNodeParams, UpdateNodeParams};
use crate::web::models::{CreateNodeRequest, NodeResponse, UpdateNodeRequest};
use crate::web::{error::AppError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_nodes).post(create_node))
        .route("/{id}", get(get_node).put(update_node).delete(delete_node))
        .route("/{id}/ping", post(ping_node))
}

async fn to_response(
    state: &AppState,
    node: crate::db::entities::node::Model,
) -> Result<NodeResponse, AppError> {
    let groups = node_service::groups_of(&state.db, &node)
        .await?
        .into_iter()
        .map(|g| g.name)
        .collect();
    Ok(NodeResponse::from_model(node, groups))
}

async fn list_nodes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NodeResponse>>, AppError> {
    let nodes = node_service::list_nodes(&state.db).await?;
    let mut responses = Vec::with_capacity(nodes.len());
    for node in nodes {
        responses.push(to_response(&state, node).await?);
    }
    Ok(Json(responses))
}

async fn create_node(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateNodeRequest>,
) -> Result<(StatusCode, Json<NodeResponse>), AppError> {
    if payload.name.trim().is_empty() || payload.hostname.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Name and hostname are required".to_string(),
        ));
    }
    let node = node_service::create_node(
        &state.db,
        CreateNodeParams {
            name: payload.name,
            hostname: payload.hostname,
            username: payload.username,
            port: payload.port,
            description: payload.description,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(NodeResponse::from_model(node, Vec::new()))))
}

async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<NodeResponse>, AppError> {
    let node = node_service::get_node(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Node {id} not found")))?;
    Ok(Json(to_response(&state, node).await?))
}

async fn update_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateNodeRequest>,
) -> Result<Json<NodeResponse>, AppError> {
    let node = node_service::update_node(
        &state.db,
        id,
        UpdateNodeParams {
            name: payload.name,
            hostname: payload.hostname,
            username: payload.username,
            port: payload.port,
            description: payload.description,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Node {id} not found")))?;
    Ok(Json(to_response(&state, node).await?))
}

async fn delete_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !node_service::delete_node(&state.db, id).await? {
        return Err(AppError::NotFound(format!("Node {id} not found")));
    }
    Ok(Json(serde_json::json!({ "message": "Node deleted" })))
}

/// Fire-and-forget: the probe runs on its own task and reports through the
/// event channel; this handler only acknowledges the dispatch.
async fn ping_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if node_service::get_node(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!("Node {id} not found")));
    }
    state.runner.spawn_probe(id);
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "message": "Ping initiated", "node_id": id })),
    ))
}
