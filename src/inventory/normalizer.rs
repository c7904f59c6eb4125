//! Inventory source ingestion.
//!
//! Converts raw inventory text in any of the three supported formats into one
//! canonical node-list / group-map shape. The same normalized result backs
//! both the import preview and the committed import, so a preview always
//! shows exactly what an import would create.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::db::enums::InventoryFormat;

pub const DEFAULT_USERNAME: &str = "root";
pub const DEFAULT_PORT: i32 = 22;

/// Malformed or structurally incomplete inventory text. Covers both syntax
/// errors from the underlying parser and valid documents missing the
/// expected shape (e.g. a YAML inventory without a root `all` group).
#[derive(Debug, Error)]
#[error("failed to parse {format} inventory: {message}")]
pub struct FormatError {
    pub format: InventoryFormat,
    pub message: String,
}

impl FormatError {
    fn new(format: InventoryFormat, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedNode {
    pub name: String,
    pub hostname: String,
    pub username: String,
    pub port: i32,
    /// Names of every group containing this host, in first-seen order.
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedGroup {
    pub name: String,
    pub hosts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedInventory {
    pub nodes: Vec<NormalizedNode>,
    pub groups: Vec<NormalizedGroup>,
}

pub fn normalize(
    content: &str,
    format: InventoryFormat,
) -> Result<NormalizedInventory, FormatError> {
    match format {
        InventoryFormat::Yaml => parse_yaml(content),
        InventoryFormat::Ini => parse_ini(content),
        InventoryFormat::Json => parse_json(content),
    }
}

/// Connection fields as they appear in the source, before defaulting.
#[derive(Debug, Default)]
struct RawHost {
    hostname: Option<String>,
    username: Option<String>,
    port: Option<i32>,
}

/// Collects hosts and groups across a format-specific tree walk.
///
/// The first occurrence of a host establishes its connection fields; later
/// occurrences only append group membership. Defaults (name-as-hostname,
/// `root`, port 22) are resolved once in [`Accumulator::finish`] so no
/// format parser carries its own defaulting rules.
#[derive(Default)]
struct Accumulator {
    nodes: Vec<(String, RawHost, Vec<String>)>,
    index: HashMap<String, usize>,
    groups: Vec<NormalizedGroup>,
}

impl Accumulator {
    fn add_host(&mut self, name: &str, raw: RawHost, group: Option<&str>) {
        match self.index.get(name) {
            Some(&i) => {
                if let Some(group) = group {
                    let memberships = &mut self.nodes[i].2;
                    if !memberships.iter().any(|g| g == group) {
                        memberships.push(group.to_string());
                    }
                }
            }
            None => {
                let memberships = group.map(|g| vec![g.to_string()]).unwrap_or_default();
                self.index.insert(name.to_string(), self.nodes.len());
                self.nodes.push((name.to_string(), raw, memberships));
            }
        }
    }

    fn add_group(&mut self, name: &str, hosts: Vec<String>) {
        self.groups.push(NormalizedGroup {
            name: name.to_string(),
            hosts,
        });
    }

    fn finish(self) -> NormalizedInventory {
        let nodes = self
            .nodes
            .into_iter()
            .map(|(name, raw, groups)| NormalizedNode {
                hostname: raw.hostname.unwrap_or_else(|| name.clone()),
                username: raw.username.unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
                port: raw.port.unwrap_or(DEFAULT_PORT),
                name,
                groups,
            })
            .collect();
        NormalizedInventory {
            nodes,
            groups: self.groups,
        }
    }
}

fn parse_yaml(content: &str) -> Result<NormalizedInventory, FormatError> {
    let format = InventoryFormat::Yaml;
    let doc: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| FormatError::new(format, e.to_string()))?;

    if doc.as_mapping().is_none() {
        return Err(FormatError::new(format, "root must be a mapping"));
    }
    let all = doc
        .get("all")
        .ok_or_else(|| FormatError::new(format, "missing required root group 'all'"))?;

    let mut acc = Accumulator::default();

    if let Some(hosts) = all.get("hosts") {
        let hosts = hosts
            .as_mapping()
            .ok_or_else(|| FormatError::new(format, "'all.hosts' must be a mapping"))?;
        for (name, vars) in hosts {
            let name = name
                .as_str()
                .ok_or_else(|| FormatError::new(format, "host names must be strings"))?;
            acc.add_host(name, yaml_host_vars(vars), None);
        }
    }

    if let Some(children) = all.get("children") {
        let children = children
            .as_mapping()
            .ok_or_else(|| FormatError::new(format, "'all.children' must be a mapping"))?;
        for (group_name, group) in children {
            let group_name = group_name
                .as_str()
                .ok_or_else(|| FormatError::new(format, "group names must be strings"))?;
            let mut members = Vec::new();
            if let Some(hosts) = group.get("hosts") {
                let hosts = hosts.as_mapping().ok_or_else(|| {
                    FormatError::new(
                        format,
                        format!("'hosts' of group '{group_name}' must be a mapping"),
                    )
                })?;
                for (name, vars) in hosts {
                    let name = name.as_str().ok_or_else(|| {
                        FormatError::new(format, "host names must be strings")
                    })?;
                    members.push(name.to_string());
                    acc.add_host(name, yaml_host_vars(vars), Some(group_name));
                }
            }
            acc.add_group(group_name, members);
        }
    }

    Ok(acc.finish())
}

fn yaml_host_vars(vars: &serde_yaml::Value) -> RawHost {
    // A bare host entry maps to null; Value::get on a non-mapping yields None.
    RawHost {
        hostname: vars
            .get("ansible_host")
            .and_then(serde_yaml::Value::as_str)
            .map(str::to_owned),
        username: vars
            .get("ansible_user")
            .and_then(serde_yaml::Value::as_str)
            .map(str::to_owned),
        port: vars.get("ansible_port").and_then(yaml_port),
    }
}

fn yaml_port(value: &serde_yaml::Value) -> Option<i32> {
    value
        .as_i64()
        .map(|p| p as i32)
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Ansible's INI inventory dialect: a section per group, bare hostnames as
/// entries, `[all]` holding ungrouped hosts. General-purpose INI crates
/// reject bare keys or normalize their case, so this stays a line walker.
fn parse_ini(content: &str) -> Result<NormalizedInventory, FormatError> {
    let format = InventoryFormat::Ini;
    let mut acc = Accumulator::default();
    let mut section: Option<String> = None;
    let mut section_hosts: Vec<String> = Vec::new();

    let flush = |acc: &mut Accumulator, section: &Option<String>, hosts: &mut Vec<String>| {
        if let Some(name) = section {
            if name != "all" {
                acc.add_group(name, std::mem::take(hosts));
            }
        }
        hosts.clear();
    };

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('[') {
            let name = rest.strip_suffix(']').ok_or_else(|| {
                FormatError::new(format, format!("malformed section header on line {}", lineno + 1))
            })?;
            flush(&mut acc, &section, &mut section_hosts);
            section = Some(name.trim().to_string());
            continue;
        }

        let section_name = section.as_deref().ok_or_else(|| {
            FormatError::new(
                format,
                format!("host entry outside of a section on line {}", lineno + 1),
            )
        })?;
        // Host entries carry no per-host variables in this dialect; anything
        // after the hostname token (or an `=`) is ignored.
        let host = line
            .split('=')
            .next()
            .unwrap_or_default()
            .split_whitespace()
            .next();
        let Some(host) = host else { continue };

        if section_name == "all" {
            acc.add_host(host, RawHost::default(), None);
        } else {
            section_hosts.push(host.to_string());
            acc.add_host(host, RawHost::default(), Some(section_name));
        }
    }
    flush(&mut acc, &section, &mut section_hosts);

    Ok(acc.finish())
}

/// Ansible dynamic-inventory JSON: every top-level key except `_meta` is a
/// group, valued either as an object with a `hosts` array or as a bare array
/// of host names. Nodes exist only through group expansion here.
fn parse_json(content: &str) -> Result<NormalizedInventory, FormatError> {
    let format = InventoryFormat::Json;
    let doc: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| FormatError::new(format, e.to_string()))?;
    let root = doc
        .as_object()
        .ok_or_else(|| FormatError::new(format, "root must be an object"))?;

    let mut acc = Accumulator::default();
    for (key, value) in root {
        if key == "_meta" {
            continue;
        }
        let members: Vec<String> = if let Some(hosts) = value.get("hosts") {
            let hosts = hosts.as_array().ok_or_else(|| {
                FormatError::new(format, format!("'hosts' of group '{key}' must be an array"))
            })?;
            hosts
                .iter()
                .filter_map(|h| h.as_str().map(str::to_owned))
                .collect()
        } else if let Some(hosts) = value.as_array() {
            hosts
                .iter()
                .filter_map(|h| h.as_str().map(str::to_owned))
                .collect()
        } else {
            // Groups with only vars/children contribute no hosts.
            continue;
        };

        for host in &members {
            acc.add_host(host, RawHost::default(), Some(key));
        }
        acc.add_group(key, members);
    }

    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node<'a>(inv: &'a NormalizedInventory, name: &str) -> &'a NormalizedNode {
        inv.nodes
            .iter()
            .find(|n| n.name == name)
            .unwrap_or_else(|| panic!("node {name} not found"))
    }

    #[test]
    fn yaml_hosts_with_vars_and_defaults() {
        let content = r#"
all:
  hosts:
    web1:
      ansible_host: 10.0.0.1
      ansible_user: deploy
      ansible_port: 2222
    web2:
"#;
        let inv = normalize(content, InventoryFormat::Yaml).unwrap();
        assert_eq!(inv.nodes.len(), 2);

        let web1 = node(&inv, "web1");
        assert_eq!(web1.hostname, "10.0.0.1");
        assert_eq!(web1.username, "deploy");
        assert_eq!(web1.port, 2222);

        let web2 = node(&inv, "web2");
        assert_eq!(web2.hostname, "web2");
        assert_eq!(web2.username, DEFAULT_USERNAME);
        assert_eq!(web2.port, DEFAULT_PORT);
    }

    #[test]
    fn yaml_host_in_two_groups_is_one_node_with_both_memberships() {
        let content = r#"
all:
  hosts:
    db1:
      ansible_user: admin
  children:
    databases:
      hosts:
        db1:
    backups:
      hosts:
        db1:
          ansible_user: other
        db2:
"#;
        let inv = normalize(content, InventoryFormat::Yaml).unwrap();
        assert_eq!(inv.nodes.len(), 2);

        let db1 = node(&inv, "db1");
        // First occurrence (top-level hosts) wins the connection fields.
        assert_eq!(db1.username, "admin");
        assert_eq!(db1.groups, vec!["databases".to_string(), "backups".to_string()]);

        let db2 = node(&inv, "db2");
        assert_eq!(db2.groups, vec!["backups".to_string()]);

        assert_eq!(inv.groups.len(), 2);
        assert_eq!(inv.groups[0].name, "databases");
        assert_eq!(inv.groups[0].hosts, vec!["db1".to_string()]);
    }

    #[test]
    fn yaml_missing_all_is_a_format_error() {
        let err = normalize("webservers:\n  hosts:\n", InventoryFormat::Yaml).unwrap_err();
        assert_eq!(err.format, InventoryFormat::Yaml);
        assert!(err.message.contains("'all'"), "{}", err.message);
    }

    #[test]
    fn yaml_bad_syntax_is_a_format_error() {
        let err = normalize("all: [unclosed", InventoryFormat::Yaml).unwrap_err();
        assert_eq!(err.format, InventoryFormat::Yaml);
    }

    #[test]
    fn ini_sections_and_ungrouped_hosts() {
        let content = r#"
# ungrouped
[all]
standalone1
standalone2

[web]
web1
web2

[db]
; comment
db1 ansible_user=ignored
"#;
        let inv = normalize(content, InventoryFormat::Ini).unwrap();
        assert_eq!(inv.nodes.len(), 5);
        assert_eq!(inv.groups.len(), 2);

        let standalone = node(&inv, "standalone1");
        assert!(standalone.groups.is_empty());
        assert_eq!(standalone.username, DEFAULT_USERNAME);
        assert_eq!(standalone.port, DEFAULT_PORT);

        // Inline tokens after the hostname are not per-host variables.
        let db1 = node(&inv, "db1");
        assert_eq!(db1.name, "db1");
        assert_eq!(db1.groups, vec!["db".to_string()]);

        assert_eq!(inv.groups[0].name, "web");
        assert_eq!(inv.groups[0].hosts, vec!["web1".to_string(), "web2".to_string()]);
    }

    #[test]
    fn ini_host_before_any_section_is_a_format_error() {
        let err = normalize("lonely-host\n[web]\nweb1\n", InventoryFormat::Ini).unwrap_err();
        assert_eq!(err.format, InventoryFormat::Ini);
        assert!(err.message.contains("line 1"), "{}", err.message);
    }

    #[test]
    fn ini_host_in_two_sections_accumulates_groups() {
        let content = "[web]\nshared\n[db]\nshared\n";
        let inv = normalize(content, InventoryFormat::Ini).unwrap();
        assert_eq!(inv.nodes.len(), 1);
        assert_eq!(
            inv.nodes[0].groups,
            vec!["web".to_string(), "db".to_string()]
        );
    }

    #[test]
    fn json_groups_as_object_and_bare_list() {
        let content = r#"
{
  "_meta": {"hostvars": {}},
  "web": {"hosts": ["web1", "web2"]},
  "db": ["db1", "web1"]
}
"#;
        let inv = normalize(content, InventoryFormat::Json).unwrap();
        assert_eq!(inv.nodes.len(), 3);
        assert_eq!(inv.groups.len(), 2);

        let web1 = node(&inv, "web1");
        assert_eq!(web1.hostname, "web1");
        let mut memberships = web1.groups.clone();
        memberships.sort();
        assert_eq!(memberships, vec!["db".to_string(), "web".to_string()]);
    }

    #[test]
    fn json_non_object_root_is_a_format_error() {
        let err = normalize("[1, 2, 3]", InventoryFormat::Json).unwrap_err();
        assert_eq!(err.format, InventoryFormat::Json);
    }

    #[test]
    fn equivalent_topologies_normalize_equivalently_across_formats() {
        let yaml = r#"
all:
  children:
    web:
      hosts:
        web1:
        web2:
    db:
      hosts:
        web1:
"#;
        let ini = "[web]\nweb1\nweb2\n[db]\nweb1\n";
        let json = r#"{"web": ["web1", "web2"], "db": ["web1"]}"#;

        let mut results = vec![
            normalize(yaml, InventoryFormat::Yaml).unwrap(),
            normalize(ini, InventoryFormat::Ini).unwrap(),
            normalize(json, InventoryFormat::Json).unwrap(),
        ];
        for inv in results.iter_mut() {
            inv.nodes.sort_by(|a, b| a.name.cmp(&b.name));
            for n in inv.nodes.iter_mut() {
                n.groups.sort();
            }
            inv.groups.sort_by(|a, b| a.name.cmp(&b.name));
        }
        assert_eq!(results[0].nodes, results[1].nodes);
        assert_eq!(results[1].nodes, results[2].nodes);
        assert_eq!(results[0].groups, results[1].groups);
        assert_eq!(results[1].groups, results[2].groups);
    }
}
