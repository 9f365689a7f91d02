use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::json;

use moveflow_core::error::Result;
use moveflow_core::types::{ExecutionResult, NodeKind, WorkflowNode};

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::inputs::NodeInputs;

/// Records project metadata. Needs a title.
pub struct ProjectCreateHandler;

impl NodeHandler for ProjectCreateHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::ProjectCreate
    }

    fn execute<'a>(
        &'a self,
        node: &'a WorkflowNode,
        _inputs: &'a NodeInputs<'a>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        Box::pin(async move {
            let Some(title) = node.str_field("title") else {
                return Ok(ExecutionResult::fail("Project title is required"));
            };
            let description = node.str_field("description").unwrap_or_default();

            Ok(ExecutionResult::ok(
                format!("Project '{}' created", title),
                json!({
                    "title": title,
                    "description": description,
                    "timestamp": Utc::now().to_rfc3339(),
                }),
            ))
        })
    }
}
