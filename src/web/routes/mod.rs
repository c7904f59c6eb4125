pub mod execution_routes;
pub mod group_routes;
pub mod import_routes;
pub mod node_routes;
pub mod playbook_routes;
