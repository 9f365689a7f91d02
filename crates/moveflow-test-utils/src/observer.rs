use std::sync::Mutex;

use serde_json::{Map, Value};

use moveflow_core::traits::ExecutionObserver;
use moveflow_core::types::{ExecutionResult, NodeStatus, RunId, WorkflowEdge};

/// One observer callback, as recorded.
#[derive(Debug, Clone)]
pub enum Recorded {
    RunStarted(usize),
    Status(String, NodeStatus),
    Data(String, Map<String, Value>),
    Edges(Vec<WorkflowEdge>),
    RunFinished(ExecutionResult),
}

type StatusHook = Box<dyn Fn(&str, NodeStatus) + Send + Sync>;

/// Observer that remembers every callback in order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Recorded>>,
    on_status: Option<StatusHook>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` after recording each status change.
    pub fn with_status_hook(
        mut self,
        hook: impl Fn(&str, NodeStatus) + Send + Sync + 'static,
    ) -> Self {
        self.on_status = Some(Box::new(hook));
        self
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    /// Every status `node_id` passed through, in order.
    pub fn statuses_of(&self, node_id: &str) -> Vec<NodeStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Status(id, status) if id == node_id => Some(status),
                _ => None,
            })
            .collect()
    }

    /// Data updates pushed for `node_id`.
    pub fn data_of(&self, node_id: &str) -> Vec<Map<String, Value>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Data(id, data) if id == node_id => Some(data),
                _ => None,
            })
            .collect()
    }

    pub fn edge_snapshots(&self) -> Vec<Vec<WorkflowEdge>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Edges(edges) => Some(edges),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Option<ExecutionResult> {
        self.events().into_iter().rev().find_map(|e| match e {
            Recorded::RunFinished(result) => Some(result),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn push(&self, event: Recorded) {
        self.events.lock().unwrap().push(event);
    }
}

impl ExecutionObserver for RecordingObserver {
    fn node_data_updated(&self, node_id: &str, partial: &Map<String, Value>) {
        self.push(Recorded::Data(node_id.to_string(), partial.clone()));
    }

    fn node_status_changed(&self, node_id: &str, status: NodeStatus) {
        self.push(Recorded::Status(node_id.to_string(), status));
        if let Some(hook) = &self.on_status {
            hook(node_id, status);
        }
    }

    fn edges_updated(&self, edges: &[WorkflowEdge]) {
        self.push(Recorded::Edges(edges.to_vec()));
    }

    fn run_started(&self, _run_id: &RunId, node_count: usize) {
        self.push(Recorded::RunStarted(node_count));
    }

    fn run_finished(&self, _run_id: &RunId, result: &ExecutionResult) {
        self.push(Recorded::RunFinished(result.clone()));
    }
}
