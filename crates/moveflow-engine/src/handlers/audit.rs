use std::time::Instant;

use futures::future::BoxFuture;
use serde_json::json;
use tracing::{info, warn};

use moveflow_core::error::Result;
use moveflow_core::types::{ExecutionResult, NodeKind, WorkflowNode};

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::inputs::NodeInputs;

pub const DEFAULT_AUDIT_PROMPT: &str = "Review this Move module for security issues. \
Look for missing access control, unchecked arithmetic, resource leaks and unsafe \
capability handling. List each finding with its severity and a suggested fix.";

/// Sends the contract source to the AI analyzer.
///
/// Prompt precedence: the node's own `prompt`, then the configured default,
/// then [`DEFAULT_AUDIT_PROMPT`].
pub struct AiAuditHandler;

impl NodeHandler for AiAuditHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::AiAudit
    }

    fn execute<'a>(
        &'a self,
        node: &'a WorkflowNode,
        inputs: &'a NodeInputs<'a>,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        Box::pin(async move {
            let Some(source) = inputs.str_of(NodeKind::ContractInput, "code") else {
                return Ok(ExecutionResult::fail(
                    "Contract source is required for AI analysis",
                ));
            };

            let prompt = node
                .str_field("prompt")
                .or(ctx.options.default_audit_prompt.as_deref())
                .unwrap_or(DEFAULT_AUDIT_PROMPT);

            let start = Instant::now();
            match ctx.collaborators.analyzer.analyze(source, prompt).await {
                Ok(analysis) if !analysis.trim().is_empty() => {
                    info!(
                        node_id = %node.id,
                        chars = analysis.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "AI analysis complete"
                    );
                    Ok(ExecutionResult::ok(
                        "AI analysis complete",
                        json!({ "analysis": analysis, "prompt": prompt }),
                    ))
                }
                Ok(_) => Ok(ExecutionResult::fail("AI analysis returned an empty response")),
                Err(e) => {
                    warn!(node_id = %node.id, error = %e, "AI analysis failed");
                    Ok(ExecutionResult::fail(e.to_string()))
                }
            }
        })
    }
}
