use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set,
};
use thiserror::Error;
use uuid::Uuid;

use crate::db::entities::playbook_execution;
use crate::db::enums::ExecutionStatus;

#[derive(Debug, Error)]
pub enum ExecutionServiceError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Execution {0} not found")]
    NotFound(Uuid),
}

pub async fn create_execution(
    db: &DatabaseConnection,
    playbooks: Vec<String>,
    target_nodes: Vec<i32>,
    target_groups: Vec<i32>,
) -> Result<playbook_execution::Model, ExecutionServiceError> {
    if playbooks.is_empty() {
        return Err(ExecutionServiceError::Validation(
            "At least one playbook is required".to_string(),
        ));
    }
    if target_nodes.is_empty() && target_groups.is_empty() {
        return Err(ExecutionServiceError::Validation(
            "At least one target node or group is required".to_string(),
        ));
    }

    let to_json_opt = |ids: Vec<i32>| {
        if ids.is_empty() {
            None
        } else {
            Some(serde_json::json!(ids))
        }
    };

    let active = playbook_execution::ActiveModel {
        id: Set(Uuid::new_v4()),
        playbooks: Set(serde_json::json!(playbooks)),
        target_nodes: Set(to_json_opt(target_nodes)),
        target_groups: Set(to_json_opt(target_groups)),
        status: Set(ExecutionStatus::Pending),
        started_at: Set(Utc::now()),
        completed_at: Set(None),
        output: Set(None),
        error_output: Set(None),
    };
    Ok(active.insert(db).await?)
}

pub async fn list_executions(
    db: &DatabaseConnection,
) -> Result<Vec<playbook_execution::Model>, DbErr> {
    playbook_execution::Entity::find()
        .order_by_desc(playbook_execution::Column::StartedAt)
        .all(db)
        .await
}

pub async fn get_execution(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<playbook_execution::Model>, DbErr> {
    playbook_execution::Entity::find_by_id(id).one(db).await
}

pub async fn mark_running(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<playbook_execution::Model, ExecutionServiceError> {
    let existing = get_execution(db, id)
        .await?
        .ok_or(ExecutionServiceError::NotFound(id))?;
    let mut active: playbook_execution::ActiveModel = existing.into();
    active.status = Set(ExecutionStatus::Running);
    Ok(active.update(db).await?)
}

/// Persists aggregated output without touching status or completion time.
/// Used when a cancelled execution still has partial output worth keeping.
pub async fn update_output(
    db: &DatabaseConnection,
    id: Uuid,
    output: Option<String>,
    error_output: Option<String>,
) -> Result<(), ExecutionServiceError> {
    let existing = get_execution(db, id)
        .await?
        .ok_or(ExecutionServiceError::NotFound(id))?;
    let mut active: playbook_execution::ActiveModel = existing.into();
    active.output = Set(output);
    active.error_output = Set(error_output);
    active.update(db).await?;
    Ok(())
}

/// Terminal commit for a finished run: status, output, errors, completion time.
pub async fn finish(
    db: &DatabaseConnection,
    id: Uuid,
    status: ExecutionStatus,
    output: Option<String>,
    error_output: Option<String>,
) -> Result<playbook_execution::Model, ExecutionServiceError> {
    let existing = get_execution(db, id)
        .await?
        .ok_or(ExecutionServiceError::NotFound(id))?;
    let mut active: playbook_execution::ActiveModel = existing.into();
    active.status = Set(status);
    active.output = Set(output);
    active.error_output = Set(error_output);
    active.completed_at = Set(Some(Utc::now()));
    Ok(active.update(db).await?)
}

/// Flips a pending or running execution to cancelled. Terminal executions
/// are returned untouched; the bool reports whether anything changed.
pub async fn cancel_execution(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<(playbook_execution::Model, bool)>, DbErr> {
    let Some(existing) = get_execution(db, id).await? else {
        return Ok(None);
    };
    if !existing.status.is_cancellable() {
        return Ok(Some((existing, false)));
    }
    let mut active: playbook_execution::ActiveModel = existing.into();
    active.status = Set(ExecutionStatus::Cancelled);
    active.completed_at = Set(Some(Utc::now()));
    let updated = active.update(db).await?;
    Ok(Some((updated, true)))
}
