//! Adapter over the external automation engine. The orchestrator and prober
//! only see the [`AutomationEngine`] trait; the production implementation
//! stages the inventory as a YAML file in a temp directory and shells out to
//! the Ansible CLI as a blocking subprocess call.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::inventory::ExecutionInventory;

pub const DEFAULT_PLAYBOOK_BIN: &str = "ansible-playbook";
pub const DEFAULT_ADHOC_BIN: &str = "ansible";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to stage inventory: {0}")]
    Staging(String),
    #[error("failed to invoke '{command}': {source}")]
    Invocation {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one engine invocation: the reported status plus captured output.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutcome {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn status_label(&self) -> String {
        if self.success {
            "successful".to_string()
        } else {
            match self.exit_code {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

#[async_trait]
pub trait AutomationEngine: Send + Sync {
    /// Runs the engine's lightweight reachability check (ping module)
    /// against one host pattern.
    async fn check_host(
        &self,
        inventory: &ExecutionInventory,
        host_pattern: &str,
    ) -> Result<bool, EngineError>;

    /// Runs one playbook file against the inventory, capturing stdout and
    /// stderr. A non-success status is reported in the outcome, not as an
    /// error; `Err` means the invocation itself failed.
    async fn run_playbook(
        &self,
        inventory: &ExecutionInventory,
        playbook: &Path,
    ) -> Result<EngineOutcome, EngineError>;
}

/// Shells out to `ansible` / `ansible-playbook`.
#[derive(Debug, Clone)]
pub struct AnsibleCli {
    playbook_bin: String,
    adhoc_bin: String,
}

impl AnsibleCli {
    pub fn new(playbook_bin: impl Into<String>, adhoc_bin: impl Into<String>) -> Self {
        Self {
            playbook_bin: playbook_bin.into(),
            adhoc_bin: adhoc_bin.into(),
        }
    }

    /// Writes the inventory into a fresh temp directory. The directory guard
    /// must outlive the engine invocation reading from it.
    async fn stage_inventory(
        inventory: &ExecutionInventory,
    ) -> Result<(tempfile::TempDir, PathBuf), EngineError> {
        let dir = tempfile::Builder::new()
            .prefix("fleetdeck-inventory-")
            .tempdir()
            .map_err(|e| EngineError::Staging(e.to_string()))?;
        let path = dir.path().join("inventory.yml");
        let yaml = inventory
            .to_yaml()
            .map_err(|e| EngineError::Staging(e.to_string()))?;
        tokio::fs::write(&path, yaml)
            .await
            .map_err(|e| EngineError::Staging(e.to_string()))?;
        Ok((dir, path))
    }
}

impl Default for AnsibleCli {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYBOOK_BIN, DEFAULT_ADHOC_BIN)
    }
}

#[async_trait]
impl AutomationEngine for AnsibleCli {
    async fn check_host(
        &self,
        inventory: &ExecutionInventory,
        host_pattern: &str,
    ) -> Result<bool, EngineError> {
        let (_guard, inventory_path) = Self::stage_inventory(inventory).await?;
        debug!(host_pattern, "running connectivity check");
        let output = Command::new(&self.adhoc_bin)
            .arg(host_pattern)
            .arg("-i")
            .arg(&inventory_path)
            .arg("-m")
            .arg("ping")
            .output()
            .await
            .map_err(|source| EngineError::Invocation {
                command: self.adhoc_bin.clone(),
                source,
            })?;
        Ok(output.status.success())
    }

    async fn run_playbook(
        &self,
        inventory: &ExecutionInventory,
        playbook: &Path,
    ) -> Result<EngineOutcome, EngineError> {
        let (_guard, inventory_path) = Self::stage_inventory(inventory).await?;
        debug!(playbook = %playbook.display(), "running playbook");
        let output = Command::new(&self.playbook_bin)
            .arg("-i")
            .arg(&inventory_path)
            .arg(playbook)
            .output()
            .await
            .map_err(|source| EngineError::Invocation {
                command: self.playbook_bin.clone(),
                source,
            })?;
        Ok(EngineOutcome::from_output(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_label_reports_exit_information() {
        let ok = EngineOutcome {
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(ok.status_label(), "successful");

        let failed = EngineOutcome {
            success: false,
            exit_code: Some(4),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(failed.status_label(), "exit code 4");

        let signalled = EngineOutcome {
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(signalled.status_label(), "terminated by signal");
    }
}
