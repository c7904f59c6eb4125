use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::services::execution_service;
use crate::web::models::{CreateExecutionRequest, ExecutionResponse};
use crate::web::{error::AppError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_executions).post(create_execution))
        .route("/{id}", get(get_execution))
        .route("/{id}/cancel", post(cancel_execution))
}

async fn list_executions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ExecutionResponse>>, AppError> {
    let executions = execution_service::list_executions(&state.db).await?;
    Ok(Json(executions.into_iter().map(Into::into).collect()))
}

/// Creates the record and dispatches the orchestrator; the response is an
/// acknowledgment of a pending execution, not a result.
async fn create_execution(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateExecutionRequest>,
) -> Result<(StatusCode, Json<ExecutionResponse>), AppError> {
    let execution = execution_service::create_execution(
        &state.db,
        payload.playbooks,
        payload.target_nodes,
        payload.target_groups,
    )
    .await?;

    state.runner.spawn_execution(execution.id);

    Ok((StatusCode::CREATED, Json(execution.into())))
}

async fn get_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExecutionResponse>, AppError> {
    let execution = execution_service::get_execution(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Execution {id} not found")))?;
    Ok(Json(execution.into()))
}

/// Marks a pending/running execution cancelled and flags the live task so it
/// stops before its next playbook. A terminal execution is returned as-is.
async fn cancel_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExecutionResponse>, AppError> {
    let (execution, changed) = execution_service::cancel_execution(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Execution {id} not found")))?;

    if changed {
        state.runner.request_cancel(id);
        state.events.publish_execution_cancelled(id);
    }

    Ok(Json(execution.into()))
}
