use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, error};
use uuid::Uuid;

use crate::db::enums::{ExecutionStatus, NodeStatus};

/// JSON-serialized `{type, payload}` messages pushed to websocket clients.
pub type EventMsg = String;

#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    events_tx: broadcast::Sender<EventMsg>,
}

impl EventBroadcaster {
    pub fn new(events_tx: broadcast::Sender<EventMsg>) -> Self {
        Self { events_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventMsg> {
        self.events_tx.subscribe()
    }

    fn send_message(&self, message_type: &str, payload: serde_json::Value) {
        let message_content = json!({
            "type": message_type,
            "payload": payload,
        });
        match serde_json::to_string(&message_content) {
            Ok(json_string) => {
                let receiver_count = self.events_tx.receiver_count();
                if receiver_count > 0 {
                    if let Err(e) = self.events_tx.send(json_string) {
                        error!(
                            message_type = message_type,
                            error = %e,
                            "Failed to broadcast event to {} receivers.",
                            receiver_count
                        );
                    } else {
                        debug!(
                            message_type = message_type,
                            "Broadcasted event to {} receivers.",
                            receiver_count
                        );
                    }
                } else {
                    debug!(
                        message_type = message_type,
                        "No active receivers, skipping broadcast."
                    );
                }
            }
            Err(e) => {
                error!(
                    message_type = message_type,
                    error = %e,
                    "Failed to serialize event message."
                );
            }
        }
    }

    pub fn publish_execution_status(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
        message: &str,
    ) {
        self.send_message(
            "execution_status",
            json!({
                "execution_id": execution_id.to_string(),
                "status": status,
                "message": message,
            }),
        );
    }

    pub fn publish_execution_progress(&self, execution_id: Uuid, current_playbook: &str) {
        self.send_message(
            "execution_progress",
            json!({
                "execution_id": execution_id.to_string(),
                "current_playbook": current_playbook,
                "message": format!("Executing {current_playbook}"),
            }),
        );
    }

    pub fn publish_execution_complete(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
        output: Option<&str>,
        errors: Option<&str>,
    ) {
        self.send_message(
            "execution_complete",
            json!({
                "execution_id": execution_id.to_string(),
                "status": status,
                "output": output,
                "errors": errors,
            }),
        );
    }

    pub fn publish_execution_cancelled(&self, execution_id: Uuid) {
        self.send_message(
            "execution_cancelled",
            json!({
                "execution_id": execution_id.to_string(),
            }),
        );
    }

    pub fn publish_node_ping_result(&self, node_id: i32, status: NodeStatus) {
        self.send_message(
            "node_ping_result",
            json!({
                "node_id": node_id,
                "status": status,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_subscribers_as_typed_json() {
        let (tx, _) = broadcast::channel(16);
        let broadcaster = EventBroadcaster::new(tx);
        let mut rx = broadcaster.subscribe();

        let id = Uuid::new_v4();
        broadcaster.publish_execution_status(id, ExecutionStatus::Running, "Execution started");

        let raw = rx.recv().await.unwrap();
        let msg: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(msg["type"], "execution_status");
        assert_eq!(msg["payload"]["execution_id"], id.to_string());
        assert_eq!(msg["payload"]["status"], "running");
    }

    #[tokio::test]
    async fn ping_results_carry_node_id_and_status() {
        let (tx, _) = broadcast::channel(16);
        let broadcaster = EventBroadcaster::new(tx);
        let mut rx = broadcaster.subscribe();

        broadcaster.publish_node_ping_result(42, NodeStatus::Unreachable);

        let raw = rx.recv().await.unwrap();
        let msg: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(msg["type"], "node_ping_result");
        assert_eq!(msg["payload"]["node_id"], 42);
        assert_eq!(msg["payload"]["status"], "unreachable");
    }
}
