//! Builds the host/group tree handed to the automation engine for one
//! execution: a flat `all.hosts` map for individually targeted nodes plus an
//! `all.children` entry per targeted group. Ids that resolve to nothing are
//! skipped without error; stale targets are a data-quality concern for the
//! caller, not a build failure.

use std::collections::BTreeMap;

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait, QueryFilter};
use serde::Serialize;

use crate::db::entities::{node, node_group};

pub const SSH_COMMON_ARGS: &str = "-o StrictHostKeyChecking=no";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostVars {
    pub ansible_host: String,
    pub ansible_user: String,
    pub ansible_port: i32,
    pub ansible_ssh_common_args: String,
}

impl HostVars {
    pub fn for_node(node: &node::Model) -> Self {
        Self {
            ansible_host: node.hostname.clone(),
            ansible_user: node.username.clone(),
            ansible_port: node.port,
            ansible_ssh_common_args: SSH_COMMON_ARGS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupSection {
    pub hosts: BTreeMap<String, HostVars>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllSection {
    pub hosts: BTreeMap<String, HostVars>,
    pub children: BTreeMap<String, GroupSection>,
}

/// The inventory tree serialized to YAML and staged for the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionInventory {
    pub all: AllSection,
}

impl ExecutionInventory {
    /// Inventory for a single node, used by the connectivity probe.
    pub fn for_single_node(node: &node::Model) -> Self {
        let mut hosts = BTreeMap::new();
        hosts.insert(node.hostname.clone(), HostVars::for_node(node));
        Self {
            all: AllSection {
                hosts,
                children: BTreeMap::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all.hosts.is_empty() && self.all.children.values().all(|g| g.hosts.is_empty())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Resolves target ids against the store and assembles the inventory tree.
pub async fn build(
    db: &DatabaseConnection,
    node_ids: &[i32],
    group_ids: &[i32],
) -> Result<ExecutionInventory, DbErr> {
    let nodes = if node_ids.is_empty() {
        Vec::new()
    } else {
        node::Entity::find()
            .filter(node::Column::Id.is_in(node_ids.iter().copied()))
            .all(db)
            .await?
    };

    let mut groups = Vec::new();
    if !group_ids.is_empty() {
        let group_models = node_group::Entity::find()
            .filter(node_group::Column::Id.is_in(group_ids.iter().copied()))
            .all(db)
            .await?;
        for group in group_models {
            let members = group.find_related(node::Entity).all(db).await?;
            groups.push((group, members));
        }
    }

    Ok(assemble(&nodes, &groups))
}

/// Pure tree assembly over already-fetched records. Group member entries
/// carry full connection vars even when the same node is also listed as an
/// individual target.
pub fn assemble(
    nodes: &[node::Model],
    groups: &[(node_group::Model, Vec<node::Model>)],
) -> ExecutionInventory {
    let mut all = AllSection::default();

    for node in nodes {
        all.hosts
            .insert(node.hostname.clone(), HostVars::for_node(node));
    }

    for (group, members) in groups {
        let mut section = GroupSection::default();
        for member in members {
            section
                .hosts
                .insert(member.hostname.clone(), HostVars::for_node(member));
        }
        all.children.insert(group.name.clone(), section);
    }

    ExecutionInventory { all }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::NodeStatus;
    use chrono::Utc;

    fn test_node(id: i32, hostname: &str) -> node::Model {
        node::Model {
            id,
            name: hostname.to_string(),
            hostname: hostname.to_string(),
            username: "deploy".to_string(),
            port: 2222,
            description: None,
            status: NodeStatus::Unknown,
            last_checked: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_group(id: i32, name: &str) -> node_group::Model {
        node_group::Model {
            id,
            name: name.to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn individual_nodes_land_in_the_flat_host_map() {
        let nodes = vec![test_node(1, "web1"), test_node(2, "web2")];
        let inv = assemble(&nodes, &[]);

        assert_eq!(inv.all.hosts.len(), 2);
        assert!(inv.all.children.is_empty());
        let vars = &inv.all.hosts["web1"];
        assert_eq!(vars.ansible_host, "web1");
        assert_eq!(vars.ansible_user, "deploy");
        assert_eq!(vars.ansible_port, 2222);
        assert_eq!(vars.ansible_ssh_common_args, SSH_COMMON_ARGS);
    }

    #[test]
    fn groups_only_yields_empty_flat_map_and_populated_children() {
        let groups = vec![(
            test_group(1, "web"),
            vec![test_node(1, "web1"), test_node(2, "web2")],
        )];
        let inv = assemble(&[], &groups);

        assert!(inv.all.hosts.is_empty());
        assert_eq!(inv.all.children.len(), 1);
        assert_eq!(inv.all.children["web"].hosts.len(), 2);
        assert!(!inv.is_empty());
    }

    #[test]
    fn group_members_carry_full_vars_even_when_individually_targeted() {
        let node = test_node(1, "web1");
        let groups = vec![(test_group(1, "web"), vec![node.clone()])];
        let inv = assemble(std::slice::from_ref(&node), &groups);

        assert_eq!(inv.all.hosts["web1"], HostVars::for_node(&node));
        assert_eq!(inv.all.children["web"].hosts["web1"], HostVars::for_node(&node));
    }

    #[test]
    fn single_node_inventory_has_one_host_and_no_children() {
        let node = test_node(7, "db1");
        let inv = ExecutionInventory::for_single_node(&node);
        assert_eq!(inv.all.hosts.len(), 1);
        assert!(inv.all.children.is_empty());
    }

    #[test]
    fn yaml_serialization_nests_hosts_under_all() {
        let inv = assemble(&[test_node(1, "web1")], &[]);
        let yaml = inv.to_yaml().unwrap();
        assert!(yaml.contains("all:"), "{yaml}");
        assert!(yaml.contains("web1:"), "{yaml}");
        assert!(yaml.contains("ansible_ssh_common_args"), "{yaml}");
    }
}
