use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use moveflow_core::error::Result;
use moveflow_core::types::{ExecutionResult, NodeKind, WorkflowNode};

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::inputs::NodeInputs;
use crate::validation::find_bytecode;

/// Republishes the ABI from the upstream compile output.
pub struct GenerateAbiHandler;

impl NodeHandler for GenerateAbiHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::GenerateAbi
    }

    fn execute<'a>(
        &'a self,
        _node: &'a WorkflowNode,
        inputs: &'a NodeInputs<'a>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        Box::pin(async move {
            let Some(compiled) = inputs.output_of(NodeKind::Compile) else {
                return Ok(ExecutionResult::fail(
                    "Compile the contract before generating the ABI",
                ));
            };

            match compiled.get("abi") {
                Some(abi) if !abi.is_null() => Ok(ExecutionResult::ok(
                    "ABI generated",
                    json!({ "abi": abi }),
                )),
                _ => Ok(ExecutionResult::fail("Compile output does not include an ABI")),
            }
        })
    }
}

/// Extracts bytecode (and package metadata, when present) from the upstream
/// compile output.
pub struct GenerateBytecodeHandler;

impl NodeHandler for GenerateBytecodeHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::GenerateBytecode
    }

    fn execute<'a>(
        &'a self,
        _node: &'a WorkflowNode,
        inputs: &'a NodeInputs<'a>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        Box::pin(async move {
            let Some(compiled) = inputs.output_of(NodeKind::Compile) else {
                return Ok(ExecutionResult::fail(
                    "Compile the contract before generating bytecode",
                ));
            };

            let Some(bytecode) = find_bytecode(compiled) else {
                return Ok(ExecutionResult::fail(
                    "Compile output does not include bytecode",
                ));
            };

            let mut out = Map::new();
            out.insert("bytecode".into(), Value::String(bytecode.to_string()));
            if let Some(metadata) = compiled.get("metadataBytes").filter(|m| m.is_string()) {
                out.insert("metadataBytes".into(), metadata.clone());
            }

            Ok(ExecutionResult::ok(
                format!("Bytecode ready ({} hex chars)", bytecode.len()),
                Value::Object(out),
            ))
        })
    }
}
