//! Playbook file store: playbooks are plain YAML files under one configured
//! directory, addressed by file name. The store owns name validation so no
//! caller can reach outside that directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum PlaybookStoreError {
    #[error("invalid playbook name '{0}'")]
    InvalidName(String),
    #[error("playbook '{0}' not found")]
    NotFound(String),
    #[error("playbook io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybookMeta {
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct PlaybookStore {
    root: PathBuf,
}

impl PlaybookStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<(), PlaybookStoreError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Playbook names are bare file names with a YAML extension. Separators
    /// and parent references are rejected so a name can never address a file
    /// outside the store root.
    fn validate_name(name: &str) -> Result<(), PlaybookStoreError> {
        let valid = !name.is_empty()
            && !name.contains('/')
            && !name.contains('\\')
            && !name.contains("..")
            && (name.ends_with(".yml") || name.ends_with(".yaml"));
        if valid {
            Ok(())
        } else {
            Err(PlaybookStoreError::InvalidName(name.to_string()))
        }
    }

    /// Resolves a playbook name to its on-disk path, `None` if absent.
    pub async fn resolve(&self, name: &str) -> Result<Option<PathBuf>, PlaybookStoreError> {
        Self::validate_name(name)?;
        let path = self.root.join(name);
        match fs::try_exists(&path).await? {
            true => Ok(Some(path)),
            false => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<PlaybookMeta>, PlaybookStoreError> {
        self.ensure_root().await?;
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !(name.ends_with(".yml") || name.ends_with(".yaml")) {
                continue;
            }
            let metadata = entry.metadata().await?;
            entries.push(PlaybookMeta {
                name: name.to_string(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub async fn read(&self, name: &str) -> Result<String, PlaybookStoreError> {
        let path = self
            .resolve(name)
            .await?
            .ok_or_else(|| PlaybookStoreError::NotFound(name.to_string()))?;
        Ok(fs::read_to_string(path).await?)
    }

    pub async fn write(&self, name: &str, content: &str) -> Result<(), PlaybookStoreError> {
        Self::validate_name(name)?;
        self.ensure_root().await?;
        fs::write(self.root.join(name), content).await?;
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<(), PlaybookStoreError> {
        let path = self
            .resolve(name)
            .await?
            .ok_or_else(|| PlaybookStoreError::NotFound(name.to_string()))?;
        fs::remove_file(path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, PlaybookStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PlaybookStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn write_list_read_delete_roundtrip() {
        let (_dir, store) = store();
        store.write("deploy.yml", "- hosts: all\n").await.unwrap();
        store.write("setup.yaml", "- hosts: web\n").await.unwrap();

        let listed = store.list().await.unwrap();
        let names: Vec<_> = listed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["deploy.yml", "setup.yaml"]);

        assert_eq!(store.read("deploy.yml").await.unwrap(), "- hosts: all\n");

        store.delete("deploy.yml").await.unwrap();
        assert!(store.resolve("deploy.yml").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_yaml_files_are_not_listed() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        store.write("deploy.yml", "---\n").await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "deploy.yml");
    }

    #[tokio::test]
    async fn traversal_and_bad_extension_names_are_rejected() {
        let (_dir, store) = store();
        for name in ["../evil.yml", "a/b.yml", "nested\\x.yml", "plain", "run.sh", ""] {
            let err = store.write(name, "x").await.unwrap_err();
            assert!(matches!(err, PlaybookStoreError::InvalidName(_)), "{name}");
        }
    }

    #[tokio::test]
    async fn reading_a_missing_playbook_is_not_found() {
        let (_dir, store) = store();
        let err = store.read("ghost.yml").await.unwrap_err();
        assert!(matches!(err, PlaybookStoreError::NotFound(_)));
    }
}
