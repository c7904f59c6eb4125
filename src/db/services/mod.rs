pub mod execution_service;
pub mod group_service;
pub mod import_service;
pub mod node_service;
