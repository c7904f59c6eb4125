use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tokio::fs;
use tracing::error;
use uuid::Uuid;

use crate::db::enums::InventoryFormat;
use crate::db::services::import_service;
use crate::inventory::normalizer;
use crate::web::models::{
    ImportPreviewResponse, ImportResponse, PasteInventoryRequest,
};
use crate::web::{error::AppError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/imports", get(list_imports))
        .route("/upload", post(upload_inventory))
        .route("/paste", post(paste_inventory))
        .route("/imports/{id}/execute", post(execute_import))
        .route("/imports/{id}/rollback", post(rollback_import))
}

async fn list_imports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ImportResponse>>, AppError> {
    let imports = import_service::list_imports(&state.db).await?;
    Ok(Json(imports.into_iter().map(Into::into).collect()))
}

async fn upload_inventory(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ImportPreviewResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_owned)
                .ok_or_else(|| AppError::InvalidInput("No file selected".to_string()))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, data.to_vec()));
        }
    }
    let Some((filename, data)) = upload else {
        return Err(AppError::InvalidInput("No file provided".to_string()));
    };

    // Strip any client-supplied directory components.
    let filename = FsPath::new(&filename)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| AppError::InvalidInput("No file selected".to_string()))?;
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default();
    let format = InventoryFormat::from_extension(extension)
        .ok_or_else(|| AppError::InvalidInput("Unsupported file format".to_string()))?;

    let content = String::from_utf8(data)
        .map_err(|_| AppError::InvalidInput("Inventory file is not valid UTF-8".to_string()))?;

    stage_and_preview(&state, filename, content, format).await
}

async fn paste_inventory(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasteInventoryRequest>,
) -> Result<Json<ImportPreviewResponse>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::InvalidInput("Content is required".to_string()));
    }
    let format = payload.format.unwrap_or(InventoryFormat::Yaml);
    let filename = format!(
        "pasted_inventory_{}.{format}",
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    stage_and_preview(&state, filename, payload.content, format).await
}

/// Persists the source under the inventory directory, creates the pending
/// import record, and parses a preview. A parse failure marks the record
/// failed and surfaces the format error to the caller.
async fn stage_and_preview(
    state: &AppState,
    filename: String,
    content: String,
    format: InventoryFormat,
) -> Result<Json<ImportPreviewResponse>, AppError> {
    let inventory_dir = FsPath::new(&state.config.inventory_dir);
    fs::create_dir_all(inventory_dir).await?;
    let stored_name = format!("{}_{filename}", Utc::now().format("%Y%m%d_%H%M%S"));
    let file_path = inventory_dir.join(stored_name);
    fs::write(&file_path, &content).await?;

    let import = import_service::create_import(
        &state.db,
        filename,
        file_path.to_string_lossy().into_owned(),
        format,
    )
    .await?;

    match normalizer::normalize(&content, format) {
        Ok(normalized) => Ok(Json(ImportPreviewResponse {
            import_id: import.id,
            preview: normalized.into(),
        })),
        Err(e) => {
            if let Err(mark_err) =
                import_service::mark_failed(&state.db, import.id, &e.to_string()).await
            {
                error!(import_id = %import.id, error = %mark_err, "Failed to record preview failure.");
            }
            Err(AppError::InvalidInput(format!(
                "Failed to parse inventory: {e}"
            )))
        }
    }
}

async fn execute_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let import = import_service::execute_import(&state.db, id).await?;
    Ok(Json(serde_json::json!({
        "message": "Import completed successfully",
        "created_nodes": import.total_nodes,
        "created_groups": import.total_groups,
    })))
}

async fn rollback_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let import = import_service::rollback_import(&state.db, id).await?;
    Ok(Json(serde_json::json!({
        "message": "Import rolled back successfully",
        "import": ImportResponse::from(import),
    })))
}
