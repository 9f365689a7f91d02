use std::time::Instant;

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::{info, warn};

use moveflow_core::error::Result;
use moveflow_core::types::{DeployRequest, ExecutionResult, NodeKind, WorkflowNode};

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::inputs::NodeInputs;
use crate::validation::{find_bytecode, parse_constructor_args, validate_bytecode};

/// Publishes the compiled module through the wallet's account.
pub struct DeployHandler;

impl NodeHandler for DeployHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Deploy
    }

    fn execute<'a>(
        &'a self,
        node: &'a WorkflowNode,
        inputs: &'a NodeInputs<'a>,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        Box::pin(async move {
            // Prefer the bytecode node's output, else read the compile output directly.
            let artifacts = inputs
                .output_of(NodeKind::GenerateBytecode)
                .filter(|v| find_bytecode(v).is_some())
                .or_else(|| inputs.output_of(NodeKind::Compile));
            let Some((raw_bytecode, metadata)) = artifacts.and_then(|v| {
                find_bytecode(v).map(|b| (b, v.get("metadataBytes").and_then(Value::as_str)))
            }) else {
                return Ok(ExecutionResult::fail(
                    "Bytecode is required before deploying; compile the contract first",
                ));
            };

            let Some(module_name) = inputs.str_of(NodeKind::ContractInput, "name") else {
                return Ok(ExecutionResult::fail(
                    "Contract module name is required before deploying",
                ));
            };

            let Some(network) = ctx.network else {
                return Ok(ExecutionResult::fail("Select a network before deploying"));
            };

            let account = match ctx.collaborators.wallet.connect().await {
                Ok(account) => account,
                Err(e) => {
                    return Ok(ExecutionResult::fail(format!(
                        "Wallet connection failed: {}",
                        e
                    )));
                }
            };
            ctx.accounts.remember(&account.address).await;

            let constructor_args = match parse_constructor_args(node.data.get("constructorArgs")) {
                Ok(args) => args,
                Err(e) => return Ok(ExecutionResult::fail(e.to_string())),
            };
            let bytecode = match validate_bytecode(raw_bytecode) {
                Ok(b) => b,
                Err(e) => return Ok(ExecutionResult::fail(e.to_string())),
            };

            let request = DeployRequest {
                module_name: module_name.to_string(),
                bytecode,
                metadata: metadata.map(str::to_string),
                constructor_args,
                network,
            };

            let start = Instant::now();
            match ctx.collaborators.chain.deploy(request, &account).await {
                Ok(receipt) => {
                    info!(
                        node_id = %node.id,
                        module = module_name,
                        network = %network,
                        tx = %receipt.transaction_hash,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Module deployed"
                    );
                    Ok(ExecutionResult::ok(
                        format!("Deployed {} to {}", module_name, network),
                        json!({
                            "contractAddress": receipt.contract_address,
                            "transactionHash": receipt.transaction_hash,
                            "network": network.name(),
                            "deployer": account.address,
                        }),
                    ))
                }
                Err(e) => {
                    warn!(node_id = %node.id, module = module_name, error = %e, "Deployment failed");
                    Ok(ExecutionResult::fail(e.to_string()))
                }
            }
        })
    }
}
