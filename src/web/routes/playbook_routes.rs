use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::playbooks::PlaybookMeta;
use crate::web::models::{CreatePlaybookRequest, PlaybookContentResponse, UpdatePlaybookRequest};
use crate::web::{error::AppError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_playbooks).post(create_playbook))
        .route(
            "/{name}",
            get(get_playbook).put(update_playbook).delete(delete_playbook),
        )
}

async fn list_playbooks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PlaybookMeta>>, AppError> {
    Ok(Json(state.playbooks.list().await?))
}

async fn create_playbook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePlaybookRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if state.playbooks.resolve(&payload.name).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Playbook '{}' already exists",
            payload.name
        )));
    }
    state.playbooks.write(&payload.name, &payload.content).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Playbook created", "name": payload.name })),
    ))
}

async fn get_playbook(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<PlaybookContentResponse>, AppError> {
    let content = state.playbooks.read(&name).await?;
    Ok(Json(PlaybookContentResponse { name, content }))
}

async fn update_playbook(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(payload): Json<UpdatePlaybookRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if state.playbooks.resolve(&name).await?.is_none() {
        return Err(AppError::NotFound(format!("Playbook '{name}' not found")));
    }
    state.playbooks.write(&name, &payload.content).await?;
    Ok(Json(serde_json::json!({ "message": "Playbook updated", "name": name })))
}

async fn delete_playbook(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.playbooks.delete(&name).await?;
    Ok(Json(serde_json::json!({ "message": "Playbook deleted", "name": name })))
}
