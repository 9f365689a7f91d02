use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use moveflow_core::event::EventBus;
use moveflow_core::traits::ExecutionObserver;
use moveflow_core::types::{ExecutionResult, NodeStatus, RunId, WorkflowEdge, WorkflowEvent};

/// Forwards executor callbacks onto an [`EventBus`].
pub struct EventBusObserver {
    bus: Arc<EventBus>,
}

impl EventBusObserver {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl ExecutionObserver for EventBusObserver {
    fn node_data_updated(&self, node_id: &str, partial: &Map<String, Value>) {
        self.bus.publish(WorkflowEvent::NodeData {
            node_id: node_id.to_string(),
            data: partial.clone(),
        });
    }

    fn node_status_changed(&self, node_id: &str, status: NodeStatus) {
        self.bus.publish(WorkflowEvent::NodeStatus {
            node_id: node_id.to_string(),
            status,
        });
    }

    fn edges_updated(&self, edges: &[WorkflowEdge]) {
        self.bus.publish(WorkflowEvent::Edges(edges.to_vec()));
    }

    fn run_started(&self, run_id: &RunId, node_count: usize) {
        self.bus.publish(WorkflowEvent::RunStarted {
            run_id: run_id.clone(),
            node_count,
        });
    }

    fn run_finished(&self, run_id: &RunId, result: &ExecutionResult) {
        self.bus.publish(WorkflowEvent::RunFinished {
            run_id: run_id.clone(),
            result: result.clone(),
            finished_at: Utc::now(),
        });
    }
}
