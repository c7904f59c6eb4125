//! Playbook execution orchestration and connectivity probing.
//!
//! Each execution runs on its own spawned task: build the inventory once,
//! invoke the engine per playbook in stored order, aggregate labeled output,
//! commit a terminal status, and push events along the way. Per-playbook
//! failures are recorded inline and never abort the remaining playbooks; an
//! error escaping those guards marks the whole execution failed rather than
//! killing the task.
//!
//! Cancellation is cooperative: the flag is checked between playbooks only,
//! so an in-flight engine invocation always runs to completion. There is no
//! per-node mutual exclusion across executions; two concurrent executions may
//! target the same node.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::ansible::engine::AutomationEngine;
use crate::db::enums::{ExecutionStatus, NodeStatus};
use crate::db::services::{execution_service, node_service};
use crate::db::services::execution_service::ExecutionServiceError;
use crate::inventory::builder;
use crate::inventory::ExecutionInventory;
use crate::playbooks::PlaybookStore;
use crate::server::event_broadcaster::EventBroadcaster;

#[derive(Debug, Error)]
enum RunError {
    #[error("{0}")]
    Execution(#[from] ExecutionServiceError),
    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

#[derive(Clone)]
pub struct ExecutionRunner {
    db: DatabaseConnection,
    engine: Arc<dyn AutomationEngine>,
    playbooks: Arc<PlaybookStore>,
    events: Arc<EventBroadcaster>,
    cancel_flags: Arc<DashMap<Uuid, Arc<AtomicBool>>>,
}

impl ExecutionRunner {
    pub fn new(
        db: DatabaseConnection,
        engine: Arc<dyn AutomationEngine>,
        playbooks: Arc<PlaybookStore>,
        events: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            db,
            engine,
            playbooks,
            events,
            cancel_flags: Arc::new(DashMap::new()),
        }
    }

    /// Dispatches an execution onto its own background task and returns
    /// immediately. The caller gets no handle; progress is observable through
    /// the store and the event channel.
    pub fn spawn_execution(&self, execution_id: Uuid) {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.cancel_flags.insert(execution_id, cancel_flag.clone());

        let runner = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run_execution(execution_id, &cancel_flag).await {
                error!(execution_id = %execution_id, error = %e, "Execution failed unexpectedly.");
                runner.mark_failed(execution_id, &e.to_string()).await;
            }
            runner.cancel_flags.remove(&execution_id);
        });
    }

    /// Flags a dispatched execution so its loop stops before the next
    /// playbook. Returns false when no live task is tracking the id.
    pub fn request_cancel(&self, execution_id: Uuid) -> bool {
        match self.cancel_flags.get(&execution_id) {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    async fn run_execution(
        &self,
        execution_id: Uuid,
        cancel_flag: &AtomicBool,
    ) -> Result<(), RunError> {
        let Some(execution) = execution_service::get_execution(&self.db, execution_id).await?
        else {
            warn!(execution_id = %execution_id, "Execution record disappeared before start.");
            return Ok(());
        };
        if execution.status != ExecutionStatus::Pending {
            warn!(
                execution_id = %execution_id,
                status = %execution.status,
                "Execution is not in a runnable state, skipping."
            );
            return Ok(());
        }

        execution_service::mark_running(&self.db, execution_id).await?;
        self.events.publish_execution_status(
            execution_id,
            ExecutionStatus::Running,
            "Execution started",
        );

        let inventory = builder::build(
            &self.db,
            &execution.target_node_ids(),
            &execution.target_group_ids(),
        )
        .await?;

        let (all_output, all_errors) = run_playbooks(
            self.engine.as_ref(),
            &self.playbooks,
            &self.events,
            execution_id,
            &inventory,
            &execution.playbook_names(),
            cancel_flag,
        )
        .await;

        let (output, error_output, status) = aggregate(&all_output, &all_errors);

        if cancel_flag.load(Ordering::Relaxed) {
            // Cancel already committed the terminal status and completion
            // time; keep whatever partial output the run produced.
            execution_service::update_output(&self.db, execution_id, output, error_output)
                .await?;
            return Ok(());
        }

        execution_service::finish(
            &self.db,
            execution_id,
            status,
            output.clone(),
            error_output.clone(),
        )
        .await?;
        info!(execution_id = %execution_id, status = %status, "Execution finished.");
        self.events.publish_execution_complete(
            execution_id,
            status,
            output.as_deref(),
            error_output.as_deref(),
        );
        Ok(())
    }

    /// Terminal handler for errors escaping the per-playbook guards.
    async fn mark_failed(&self, execution_id: Uuid, message: &str) {
        if let Err(e) = execution_service::finish(
            &self.db,
            execution_id,
            ExecutionStatus::Failed,
            None,
            Some(message.to_string()),
        )
        .await
        {
            error!(execution_id = %execution_id, error = %e, "Failed to persist failed execution state.");
        }
        self.events.publish_execution_complete(
            execution_id,
            ExecutionStatus::Failed,
            None,
            Some(message),
        );
    }

    pub fn spawn_probe(&self, node_id: i32) {
        let runner = self.clone();
        tokio::spawn(async move {
            runner.probe_node(node_id).await;
        });
    }

    /// Single-node reachability check. Any failure on the engine path
    /// degrades to `unreachable`; the check timestamp is always stamped.
    pub async fn probe_node(&self, node_id: i32) -> Option<NodeStatus> {
        let node = match node_service::get_node(&self.db, node_id).await {
            Ok(Some(node)) => node,
            Ok(None) => {
                warn!(node_id, "Probe requested for unknown node.");
                return None;
            }
            Err(e) => {
                error!(node_id, error = %e, "Failed to load node for probe.");
                return None;
            }
        };

        let inventory = ExecutionInventory::for_single_node(&node);
        let reachable = match self.engine.check_host(&inventory, &node.hostname).await {
            Ok(reachable) => reachable,
            Err(e) => {
                warn!(node_id, error = %e, "Connectivity check errored.");
                false
            }
        };
        let status = if reachable {
            NodeStatus::Reachable
        } else {
            NodeStatus::Unreachable
        };

        if let Err(e) = node_service::set_status(&self.db, node_id, status, Utc::now()).await {
            error!(node_id, error = %e, "Failed to persist probe result.");
        }
        self.events.publish_node_ping_result(node_id, status);
        Some(status)
    }
}

/// The sequential per-playbook loop. Each entry either contributes labeled
/// output blocks, an inline error line, or both; no entry aborts the rest.
/// Returns the collected output and error blocks in run order.
async fn run_playbooks(
    engine: &dyn AutomationEngine,
    playbooks: &PlaybookStore,
    events: &EventBroadcaster,
    execution_id: Uuid,
    inventory: &ExecutionInventory,
    names: &[String],
    cancel_flag: &AtomicBool,
) -> (Vec<String>, Vec<String>) {
    let mut all_output: Vec<String> = Vec::new();
    let mut all_errors: Vec<String> = Vec::new();

    for playbook_name in names {
        if cancel_flag.load(Ordering::Relaxed) {
            info!(execution_id = %execution_id, "Cancellation requested, stopping before next playbook.");
            break;
        }

        match playbooks.resolve(playbook_name).await {
            Ok(Some(path)) => {
                events.publish_execution_progress(execution_id, playbook_name);

                match engine.run_playbook(inventory, &path).await {
                    Ok(outcome) => {
                        if !outcome.stdout.is_empty() {
                            all_output
                                .push(format!("=== {playbook_name} ===\n{}", outcome.stdout));
                        }
                        if !outcome.stderr.is_empty() {
                            all_errors.push(format!(
                                "=== {playbook_name} ERRORS ===\n{}",
                                outcome.stderr
                            ));
                        }
                        if !outcome.success {
                            all_errors.push(format!(
                                "Playbook {playbook_name} failed with status: {}",
                                outcome.status_label()
                            ));
                        }
                    }
                    Err(e) => {
                        all_errors.push(format!("Error executing {playbook_name}: {e}"));
                    }
                }
            }
            Ok(None) => {
                all_errors.push(format!("Playbook {playbook_name} not found"));
            }
            Err(e) => {
                all_errors.push(format!("Error resolving playbook {playbook_name}: {e}"));
            }
        }
    }

    (all_output, all_errors)
}

/// Folds the per-playbook blocks into the persisted fields: blocks join with
/// blank lines, the error field collapses to absent when nothing failed, and
/// any recorded error makes the whole run `failed`.
fn aggregate(
    outputs: &[String],
    errors: &[String],
) -> (Option<String>, Option<String>, ExecutionStatus) {
    let output = Some(outputs.join("\n\n"));
    if errors.is_empty() {
        (output, None, ExecutionStatus::Completed)
    } else {
        (output, Some(errors.join("\n\n")), ExecutionStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ansible::engine::{EngineError, EngineOutcome};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use tokio::sync::broadcast;

    /// Records which playbooks it was asked to run and replays a fixed
    /// outcome per playbook name.
    struct MockEngine {
        invoked: Mutex<Vec<String>>,
        outcomes: Vec<(String, Result<EngineOutcome, String>)>,
    }

    impl MockEngine {
        fn new(outcomes: Vec<(String, Result<EngineOutcome, String>)>) -> Self {
            Self {
                invoked: Mutex::new(Vec::new()),
                outcomes,
            }
        }

        fn invoked(&self) -> Vec<String> {
            self.invoked.lock().unwrap().clone()
        }
    }

    fn ok_outcome(stdout: &str) -> EngineOutcome {
        EngineOutcome {
            success: true,
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[async_trait]
    impl AutomationEngine for MockEngine {
        async fn check_host(
            &self,
            _inventory: &ExecutionInventory,
            _host_pattern: &str,
        ) -> Result<bool, EngineError> {
            Ok(true)
        }

        async fn run_playbook(
            &self,
            _inventory: &ExecutionInventory,
            playbook: &Path,
        ) -> Result<EngineOutcome, EngineError> {
            let name = playbook.file_name().unwrap().to_str().unwrap().to_string();
            self.invoked.lock().unwrap().push(name.clone());
            let configured = self
                .outcomes
                .iter()
                .find(|(n, _)| *n == name)
                .unwrap_or_else(|| panic!("unexpected playbook {name}"));
            match &configured.1 {
                Ok(outcome) => Ok(outcome.clone()),
                Err(msg) => Err(EngineError::Staging(msg.clone())),
            }
        }
    }

    fn events() -> EventBroadcaster {
        let (tx, _) = broadcast::channel(16);
        EventBroadcaster::new(tx)
    }

    async fn playbook_store(present: &[&str]) -> (tempfile::TempDir, PlaybookStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PlaybookStore::new(dir.path());
        for name in present {
            store.write(name, "- hosts: all\n").await.unwrap();
        }
        (dir, store)
    }

    #[tokio::test]
    async fn missing_playbook_is_recorded_and_later_playbooks_still_run() {
        let engine = MockEngine::new(vec![("b.yml".to_string(), Ok(ok_outcome("b output")))]);
        let (_dir, store) = playbook_store(&["b.yml"]).await;
        let names = vec!["a.yml".to_string(), "b.yml".to_string()];
        let flag = AtomicBool::new(false);

        let (outputs, errors) = run_playbooks(
            &engine,
            &store,
            &events(),
            Uuid::new_v4(),
            &ExecutionInventory::default(),
            &names,
            &flag,
        )
        .await;

        assert_eq!(engine.invoked(), vec!["b.yml".to_string()]);
        assert_eq!(outputs, vec!["=== b.yml ===\nb output".to_string()]);
        assert_eq!(errors, vec!["Playbook a.yml not found".to_string()]);

        let (_, error_output, status) = aggregate(&outputs, &errors);
        assert_eq!(status, ExecutionStatus::Failed);
        assert!(error_output.unwrap().contains("a.yml"));
    }

    #[tokio::test]
    async fn engine_failure_on_one_playbook_does_not_abort_the_next() {
        let engine = MockEngine::new(vec![
            ("a.yml".to_string(), Err("engine crashed".to_string())),
            ("b.yml".to_string(), Ok(ok_outcome("fine"))),
        ]);
        let (_dir, store) = playbook_store(&["a.yml", "b.yml"]).await;
        let names = vec!["a.yml".to_string(), "b.yml".to_string()];
        let flag = AtomicBool::new(false);

        let (outputs, errors) = run_playbooks(
            &engine,
            &store,
            &events(),
            Uuid::new_v4(),
            &ExecutionInventory::default(),
            &names,
            &flag,
        )
        .await;

        assert_eq!(engine.invoked(), vec!["a.yml".to_string(), "b.yml".to_string()]);
        assert_eq!(outputs, vec!["=== b.yml ===\nfine".to_string()]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Error executing a.yml:"), "{}", errors[0]);
    }

    #[tokio::test]
    async fn non_success_status_records_a_labeled_error_line() {
        let failed = EngineOutcome {
            success: false,
            exit_code: Some(2),
            stdout: "partial".to_string(),
            stderr: "task blew up".to_string(),
        };
        let engine = MockEngine::new(vec![("a.yml".to_string(), Ok(failed))]);
        let (_dir, store) = playbook_store(&["a.yml"]).await;
        let names = vec!["a.yml".to_string()];
        let flag = AtomicBool::new(false);

        let (outputs, errors) = run_playbooks(
            &engine,
            &store,
            &events(),
            Uuid::new_v4(),
            &ExecutionInventory::default(),
            &names,
            &flag,
        )
        .await;

        assert_eq!(outputs, vec!["=== a.yml ===\npartial".to_string()]);
        assert_eq!(
            errors,
            vec![
                "=== a.yml ERRORS ===\ntask blew up".to_string(),
                "Playbook a.yml failed with status: exit code 2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn cancellation_flag_stops_the_loop_before_the_next_playbook() {
        let engine = MockEngine::new(vec![]);
        let (_dir, store) = playbook_store(&["a.yml"]).await;
        let names = vec!["a.yml".to_string()];
        let flag = AtomicBool::new(true);

        let (outputs, errors) = run_playbooks(
            &engine,
            &store,
            &events(),
            Uuid::new_v4(),
            &ExecutionInventory::default(),
            &names,
            &flag,
        )
        .await;

        assert!(engine.invoked().is_empty());
        assert!(outputs.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn aggregate_without_errors_is_completed_with_absent_error_field() {
        let outputs = vec!["=== a.yml ===\nok".to_string()];
        let (output, errors, status) = aggregate(&outputs, &[]);
        assert_eq!(output.as_deref(), Some("=== a.yml ===\nok"));
        assert!(errors.is_none());
        assert_eq!(status, ExecutionStatus::Completed);
    }

    #[test]
    fn aggregate_with_any_error_is_failed_and_blocks_join_with_blank_lines() {
        let outputs = vec![
            "=== a.yml ===\nok".to_string(),
            "=== b.yml ===\nok".to_string(),
        ];
        let errors = vec![
            "Playbook missing.yml not found".to_string(),
            "=== b.yml ERRORS ===\nboom".to_string(),
        ];
        let (output, error_output, status) = aggregate(&outputs, &errors);
        assert_eq!(
            output.as_deref(),
            Some("=== a.yml ===\nok\n\n=== b.yml ===\nok")
        );
        assert_eq!(
            error_output.as_deref(),
            Some("Playbook missing.yml not found\n\n=== b.yml ERRORS ===\nboom")
        );
        assert_eq!(status, ExecutionStatus::Failed);
    }

    #[test]
    fn aggregate_with_no_blocks_keeps_an_empty_output_field() {
        let (output, errors, status) = aggregate(&[], &[]);
        assert_eq!(output.as_deref(), Some(""));
        assert!(errors.is_none());
        assert_eq!(status, ExecutionStatus::Completed);
    }
}
