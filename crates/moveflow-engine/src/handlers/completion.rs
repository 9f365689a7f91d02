use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::json;

use moveflow_core::error::Result;
use moveflow_core::types::{ExecutionResult, NodeKind, WorkflowNode};

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::inputs::NodeInputs;
use crate::summary::build_summary;

/// Summarizes everything the run has produced so far.
pub struct CompletionHandler;

impl NodeHandler for CompletionHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Completion
    }

    fn execute<'a>(
        &'a self,
        _node: &'a WorkflowNode,
        inputs: &'a NodeInputs<'a>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        Box::pin(async move {
            let now = Utc::now();
            let summary = build_summary(inputs.store(), now);
            Ok(ExecutionResult::ok(
                "Workflow summary ready",
                json!({ "summary": summary, "completedAt": now.to_rfc3339() }),
            ))
        })
    }
}
