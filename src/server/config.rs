use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_playbook_dir")]
    pub playbook_dir: String,

    #[serde(default = "default_inventory_dir")]
    pub inventory_dir: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_ansible_playbook_bin")]
    pub ansible_playbook_bin: String,

    #[serde(default = "default_ansible_bin")]
    pub ansible_bin: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    playbook_dir: Option<String>,
    inventory_dir: Option<String>,
    log_dir: Option<String>,
    ansible_playbook_bin: Option<String>,
    ansible_bin: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_playbook_dir() -> String {
    "playbooks".to_string()
}

fn default_inventory_dir() -> String {
    "data/inventory".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_ansible_playbook_bin() -> String {
    "ansible-playbook".to_string()
}

fn default_ansible_bin() -> String {
    "ansible".to_string()
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialServerConfig::default()
            }
        } else {
            PartialServerConfig::default()
        };

        // 2. Environment overrides file, file overrides defaults
        let env_var = |key: &str| env::var(key).ok();
        let final_config = ServerConfig {
            listen_addr: env_var("LISTEN_ADDR")
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            playbook_dir: env_var("PLAYBOOK_DIR")
                .or(file_config.playbook_dir)
                .unwrap_or_else(default_playbook_dir),
            inventory_dir: env_var("INVENTORY_DIR")
                .or(file_config.inventory_dir)
                .unwrap_or_else(default_inventory_dir),
            log_dir: env_var("LOG_DIR")
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            ansible_playbook_bin: env_var("ANSIBLE_PLAYBOOK_BIN")
                .or(file_config.ansible_playbook_bin)
                .unwrap_or_else(default_ansible_playbook_bin),
            ansible_bin: env_var("ANSIBLE_BIN")
                .or(file_config.ansible_bin)
                .unwrap_or_else(default_ansible_bin),
        };

        Ok(final_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "listen_addr = \"127.0.0.1:9999\"\nplaybook_dir = \"/srv/playbooks\""
        )
        .unwrap();

        let config = ServerConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.playbook_dir, "/srv/playbooks");
        // Unset keys fall through to defaults.
        assert_eq!(config.ansible_bin, "ansible");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load(Some("/definitely/not/a/real/config.toml")).unwrap();
        assert_eq!(config.inventory_dir, "data/inventory");
        assert_eq!(config.ansible_playbook_bin, "ansible-playbook");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen_addr = [not toml").unwrap();
        assert!(ServerConfig::load(file.path().to_str()).is_err());
    }
}
