use futures::future::BoxFuture;
use serde_json::json;
use tracing::{debug, warn};

use moveflow_core::error::Result;
use moveflow_core::types::{ExecutionResult, NodeKind, WorkflowNode};

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::inputs::NodeInputs;
use crate::validation::{derive_module_name, validate_source};

/// Validates contract source and settles the module name.
///
/// When the node has no `name`, it is taken from the `module deployer::<name>`
/// declaration; the executor writes it back into the node with the rest of
/// the output.
pub struct ContractInputHandler;

impl NodeHandler for ContractInputHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::ContractInput
    }

    fn execute<'a>(
        &'a self,
        node: &'a WorkflowNode,
        _inputs: &'a NodeInputs<'a>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        Box::pin(async move {
            let Some(code) = node.str_field("code") else {
                return Ok(ExecutionResult::fail("Contract code is required"));
            };

            if let Err(e) = validate_source(code) {
                return Ok(ExecutionResult::fail(e.to_string()));
            }

            let derived = derive_module_name(code);
            let name = match (node.str_field("name"), derived.as_deref()) {
                (Some(explicit), Some(declared)) => {
                    if explicit != declared {
                        warn!(
                            node_id = %node.id,
                            explicit,
                            declared,
                            "Module name differs from declaration"
                        );
                    }
                    explicit.to_string()
                }
                (Some(explicit), None) => explicit.to_string(),
                (None, Some(declared)) => {
                    debug!(node_id = %node.id, name = declared, "Derived module name");
                    declared.to_string()
                }
                (None, None) => {
                    return Ok(ExecutionResult::fail(
                        "Could not determine the module name; set it on the node",
                    ));
                }
            };

            Ok(ExecutionResult::ok(
                format!("Contract '{}' ready", name),
                json!({ "code": code, "name": name }),
            ))
        })
    }
}
