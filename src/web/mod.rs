use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::ansible::ExecutionRunner;
use crate::playbooks::PlaybookStore;
use crate::server::config::ServerConfig;
use crate::server::event_broadcaster::EventBroadcaster;

pub mod error;
pub mod models;
pub mod routes;
pub mod ws_handler;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<ServerConfig>,
    pub playbooks: Arc<PlaybookStore>,
    pub runner: ExecutionRunner,
    pub events: Arc<EventBroadcaster>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/nodes", routes::node_routes::router())
        .nest("/groups", routes::group_routes::router())
        .nest("/playbooks", routes::playbook_routes::router())
        .nest("/executions", routes::execution_routes::router())
        .nest("/inventory", routes::import_routes::router())
        .route("/ws", get(ws_handler::events_ws_handler));

    Router::new()
        .nest("/api", api)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
