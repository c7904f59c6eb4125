use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "node_status_enum")]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[sea_orm(string_value = "unknown")]
    Unknown,
    #[sea_orm(string_value = "reachable")]
    Reachable,
    #[sea_orm(string_value = "unreachable")]
    Unreachable,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Unknown => write!(f, "unknown"),
            NodeStatus::Reachable => write!(f, "reachable"),
            NodeStatus::Unreachable => write!(f, "unreachable"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "execution_status_enum")]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ExecutionStatus {
    /// An execution can only be cancelled before it reaches a terminal state.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, ExecutionStatus::Pending | ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "import_status_enum")]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "rolled_back")]
    RolledBack,
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStatus::Pending => write!(f, "pending"),
            ImportStatus::Completed => write!(f, "completed"),
            ImportStatus::Failed => write!(f, "failed"),
            ImportStatus::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// Source format of an inventory import. Doubles as the dispatch key for the
/// normalizer, so it lives next to the other persisted enums.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "inventory_format_enum")]
#[serde(rename_all = "lowercase")]
pub enum InventoryFormat {
    #[sea_orm(string_value = "yaml")]
    Yaml,
    #[sea_orm(string_value = "ini")]
    Ini,
    #[sea_orm(string_value = "json")]
    Json,
}

impl InventoryFormat {
    /// Maps an uploaded file extension onto a format. `yml` and `yaml` are
    /// both accepted, matching what operators actually name their files.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "yml" | "yaml" => Some(InventoryFormat::Yaml),
            "ini" => Some(InventoryFormat::Ini),
            "json" => Some(InventoryFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for InventoryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryFormat::Yaml => write!(f, "yaml"),
            InventoryFormat::Ini => write!(f, "ini"),
            InventoryFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension_accepts_yaml_aliases() {
        assert_eq!(InventoryFormat::from_extension("yml"), Some(InventoryFormat::Yaml));
        assert_eq!(InventoryFormat::from_extension("YAML"), Some(InventoryFormat::Yaml));
        assert_eq!(InventoryFormat::from_extension("json"), Some(InventoryFormat::Json));
        assert_eq!(InventoryFormat::from_extension("toml"), None);
    }

    #[test]
    fn cancellable_states() {
        assert!(ExecutionStatus::Pending.is_cancellable());
        assert!(ExecutionStatus::Running.is_cancellable());
        assert!(!ExecutionStatus::Completed.is_cancellable());
        assert!(!ExecutionStatus::Cancelled.is_cancellable());
    }
}
