//! The workflow executor: runs a schedule node by node and reports progress.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use moveflow_core::error::MoveflowError;
use moveflow_core::types::{
    EdgeStatus, ExecutionResult, NodeStatus, RunId, Workflow, WorkflowEdge, WorkflowNode,
};

use crate::context::ExecutionContext;
use crate::handlers::HandlerRegistry;
use crate::inputs::NodeInputs;
use crate::order::{build_order, upstream_of};
use crate::stop::{StopFlag, StopHandle, StopSignal};
use crate::store::ExecutionStore;
use crate::summary::build_summary;

pub const STOPPED_MESSAGE: &str = "Execution stopped by user";

/// Lifecycle of the most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Where a node's edges stand relative to it.
#[derive(Clone, Copy)]
enum EdgePhase {
    Running,
    Succeeded,
    Failed,
}

pub struct WorkflowExecutor {
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
    ctx: ExecutionContext,
    handlers: HandlerRegistry,
    store: ExecutionStore,
    statuses: HashMap<String, NodeStatus>,
    stop: Arc<dyn StopSignal>,
    state: RunState,
    last_run: Option<RunId>,
}

impl WorkflowExecutor {
    pub fn new(workflow: Workflow, ctx: ExecutionContext) -> Self {
        let statuses = workflow
            .nodes
            .iter()
            .map(|n| (n.id.clone(), NodeStatus::Idle))
            .collect();
        Self {
            nodes: workflow.nodes,
            edges: workflow.edges,
            ctx,
            handlers: HandlerRegistry::with_defaults(),
            store: ExecutionStore::new(),
            statuses,
            stop: Arc::new(StopFlag::new()),
            state: RunState::Idle,
            last_run: None,
        }
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Swap the cancellation checkpoint (for example a `TokenStop`).
    pub fn with_stop_signal(mut self, signal: Arc<dyn StopSignal>) -> Self {
        self.stop = signal;
        self
    }

    /// Handle that can request a stop from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(self.stop.clone())
    }

    /// Request a stop; honored before the next node starts.
    pub fn stop(&self) {
        self.stop.request_stop();
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn last_run(&self) -> Option<&RunId> {
        self.last_run.as_ref()
    }

    pub fn node_status(&self, node_id: &str) -> Option<NodeStatus> {
        self.statuses.get(node_id).copied()
    }

    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[WorkflowEdge] {
        &self.edges
    }

    /// Outputs recorded by the most recent run, keyed by node id.
    pub fn outputs(&self) -> Map<String, Value> {
        self.store.to_map()
    }

    /// Run the whole workflow.
    ///
    /// Never panics on handler or collaborator failure; every outcome comes
    /// back as an `ExecutionResult`.
    pub async fn execute(&mut self) -> ExecutionResult {
        let run_id = RunId::new();
        self.last_run = Some(run_id.clone());
        self.state = RunState::Running;
        self.prepare_run();

        info!(run_id = %run_id, nodes = self.nodes.len(), edges = self.edges.len(), "Workflow run started");
        self.ctx.observer.run_started(&run_id, self.nodes.len());

        let start = Instant::now();
        let (result, state) = self.run_schedule().await;
        self.state = state;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match state {
            RunState::Completed => info!(run_id = %run_id, elapsed_ms, "Workflow run completed"),
            RunState::Stopped => warn!(run_id = %run_id, elapsed_ms, "Workflow run stopped"),
            _ => error!(run_id = %run_id, elapsed_ms, message = %result.message, "Workflow run failed"),
        }
        self.ctx.observer.run_finished(&run_id, &result);

        result
    }

    /// Clear everything left over from a previous run.
    fn prepare_run(&mut self) {
        self.store.clear();
        self.stop.reset();

        for (node_id, status) in self.statuses.iter_mut() {
            if *status != NodeStatus::Idle {
                *status = NodeStatus::Idle;
                self.ctx.observer.node_status_changed(node_id, NodeStatus::Idle);
            }
        }
        for node in &mut self.nodes {
            node.data.remove("error");
        }

        let dirty = self.edges.iter().any(|e| e.status != EdgeStatus::Idle);
        for edge in &mut self.edges {
            edge.status = EdgeStatus::Idle;
        }
        if dirty {
            self.ctx.observer.edges_updated(&self.edges);
        }
    }

    async fn run_schedule(&mut self) -> (ExecutionResult, RunState) {
        if self.nodes.is_empty() {
            return (
                ExecutionResult::fail(MoveflowError::EmptyWorkflow.to_string()),
                RunState::Failed,
            );
        }

        let order = match build_order(&self.nodes, &self.edges) {
            Ok(order) => order,
            Err(e) => return (ExecutionResult::fail(e.to_string()), RunState::Failed),
        };
        debug!(schedule = ?order, "Execution order built");

        for node_id in &order {
            if self.stop.is_stop_requested() {
                info!(next = %node_id, "Stop requested, abandoning remaining nodes");
                return (ExecutionResult::fail(STOPPED_MESSAGE), RunState::Stopped);
            }

            let Some(node) = self.nodes.iter().find(|n| &n.id == node_id).cloned() else {
                continue;
            };

            if let Err(message) = self.run_node(&node).await {
                self.fail_node(&node, &message);
                return (
                    ExecutionResult::fail(format!("{} failed: {}", node.label(), message)),
                    RunState::Failed,
                );
            }

            if !self.ctx.options.node_delay.is_zero() {
                tokio::time::sleep(self.ctx.options.node_delay).await;
            }
        }

        let summary = build_summary(&self.store, chrono::Utc::now());
        let data = json!({
            "summary": summary,
            "results": Value::Object(self.store.to_map()),
        });
        (ExecutionResult::ok(summary, data), RunState::Completed)
    }

    /// Dispatch one node. `Err` carries the per-node failure message.
    async fn run_node(&mut self, node: &WorkflowNode) -> std::result::Result<(), String> {
        self.set_status(&node.id, NodeStatus::Running);
        self.annotate_edges(&node.id, EdgePhase::Running);

        let Some(handler) = self.handlers.get(node.kind) else {
            return Err(MoveflowError::HandlerNotFound(node.kind.to_string()).to_string());
        };

        let start = Instant::now();
        let upstream = upstream_of(&node.id, &self.edges);
        let inputs = NodeInputs::new(&self.store, upstream, self.ctx.options.input_resolution);
        let outcome = handler.execute(node, &inputs, &self.ctx).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(node_id = %node.id, node_type = %node.kind, error = %e, "Node handler errored");
                ExecutionResult::fail(e.to_string())
            }
        };

        if !result.success {
            warn!(node_id = %node.id, node_type = %node.kind, elapsed_ms, message = %result.message, "Node failed");
            return Err(result.message);
        }

        info!(node_id = %node.id, node_type = %node.kind, elapsed_ms, "Node succeeded");

        let output = result.data.unwrap_or_else(|| Value::Object(Map::new()));
        self.merge_node_data(&node.id, &output);
        self.store.record(&node.id, node.kind, output);
        self.set_status(&node.id, NodeStatus::Success);
        self.annotate_edges(&node.id, EdgePhase::Succeeded);
        Ok(())
    }

    fn fail_node(&mut self, node: &WorkflowNode, message: &str) {
        let mut partial = Map::new();
        partial.insert("error".into(), Value::String(message.to_string()));
        if let Some(n) = self.nodes.iter_mut().find(|n| n.id == node.id) {
            n.data.extend(partial.clone());
        }
        self.ctx.observer.node_data_updated(&node.id, &partial);
        self.set_status(&node.id, NodeStatus::Error);
        self.annotate_edges(&node.id, EdgePhase::Failed);
    }

    /// Write handler output into the node's own payload.
    fn merge_node_data(&mut self, node_id: &str, output: &Value) {
        let partial = match output {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = Map::new();
                map.insert("output".into(), other.clone());
                map
            }
        };
        if let Some(n) = self.nodes.iter_mut().find(|n| n.id == node_id) {
            n.data.extend(partial.clone());
        }
        self.ctx.observer.node_data_updated(node_id, &partial);
    }

    fn set_status(&mut self, node_id: &str, status: NodeStatus) {
        self.statuses.insert(node_id.to_string(), status);
        self.ctx.observer.node_status_changed(node_id, status);
    }

    fn annotate_edges(&mut self, node_id: &str, phase: EdgePhase) {
        let mut touched = false;
        for edge in self.edges.iter_mut().filter(|e| e.touches(node_id)) {
            edge.status = match phase {
                EdgePhase::Running if edge.source == node_id => EdgeStatus::SourceRunning,
                EdgePhase::Running => EdgeStatus::TargetRunning,
                EdgePhase::Succeeded => EdgeStatus::Success,
                EdgePhase::Failed => EdgeStatus::Error,
            };
            touched = true;
        }
        if touched {
            self.ctx.observer.edges_updated(&self.edges);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Idle.to_string(), "idle");
        assert_eq!(RunState::Stopped.to_string(), "stopped");
    }
}
