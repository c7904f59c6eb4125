pub mod inventory_import;
pub mod node;
pub mod node_group;
pub mod node_group_member;
pub mod playbook_execution;

// Prelude module for easy importing of all entities and their related types
pub mod prelude {
    pub use super::inventory_import::Model as InventoryImportModel;
    pub use super::node::Model as NodeModel;
    pub use super::node_group::Model as NodeGroupModel;
    pub use super::node_group_member::Model as NodeGroupMemberModel;
    pub use super::playbook_execution::Model as PlaybookExecutionModel;
}
