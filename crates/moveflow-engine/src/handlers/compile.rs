use std::time::Instant;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use moveflow_core::error::{MoveflowError, Result};
use moveflow_core::types::{is_valid_address, CompileRequest, ExecutionResult, NodeKind, WorkflowNode};

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::inputs::NodeInputs;
use crate::validation::truncate_message;

/// Compiles the upstream contract against the connected account.
pub struct CompileHandler;

impl NodeHandler for CompileHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Compile
    }

    fn execute<'a>(
        &'a self,
        node: &'a WorkflowNode,
        inputs: &'a NodeInputs<'a>,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<ExecutionResult>> {
        Box::pin(async move {
            let (Some(code), Some(name)) = (
                inputs.str_of(NodeKind::ContractInput, "code"),
                inputs.str_of(NodeKind::ContractInput, "name"),
            ) else {
                return Ok(ExecutionResult::fail(
                    "Contract input is required before compiling",
                ));
            };

            let Some(deployer) = resolve_deployer(ctx).await else {
                return Ok(ExecutionResult::fail("Connect a wallet before compiling"));
            };
            if !is_valid_address(&deployer) {
                return Ok(ExecutionResult::fail(format!(
                    "Invalid deployer address '{}'",
                    deployer
                )));
            }

            let request = CompileRequest {
                source: code.to_string(),
                module_name: name.to_string(),
                deployer_address: deployer,
            };

            let start = Instant::now();
            match ctx.collaborators.compiler.compile(request).await {
                Ok(output) => {
                    info!(
                        node_id = %node.id,
                        module = name,
                        warnings = output.warnings.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Module compiled"
                    );
                    Ok(ExecutionResult::ok(
                        format!("Compiled module {}", name),
                        serde_json::to_value(&output)?,
                    ))
                }
                Err(MoveflowError::Compilation { errors, .. }) => {
                    warn!(node_id = %node.id, module = name, errors = errors.len(), "Compilation rejected");
                    Ok(ExecutionResult::fail(compile_failure_message(
                        name,
                        &errors,
                        ctx.options.error_truncate_chars,
                    )))
                }
                Err(e) => Ok(ExecutionResult::fail(format!(
                    "Could not compile module {}: {}",
                    name, e
                ))),
            }
        })
    }
}

/// Live wallet account, else the cached one.
async fn resolve_deployer(ctx: &ExecutionContext) -> Option<String> {
    match ctx.collaborators.wallet.current_account().await {
        Ok(Some(account)) => {
            ctx.accounts.remember(&account.address).await;
            return Some(account.address);
        }
        Ok(None) => debug!("No connected wallet account, trying cached address"),
        Err(e) => warn!(error = %e, "Wallet lookup failed, falling back to cached address"),
    }
    ctx.accounts.last_known().await
}

fn compile_failure_message(module: &str, errors: &[String], max_chars: usize) -> String {
    if errors.is_empty() {
        return format!("Failed to compile module {}: no diagnostics reported", module);
    }
    let details = errors
        .iter()
        .map(|e| truncate_message(e, max_chars))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Failed to compile module {}:\n\n{}", module, details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::TRUNCATION_MARKER;

    #[test]
    fn test_failure_message_joins_with_blank_lines() {
        let msg = compile_failure_message(
            "Foo",
            &["error[E1]: bad type".into(), "error[E2]: unbound".into()],
            500,
        );
        assert_eq!(
            msg,
            "Failed to compile module Foo:\n\nerror[E1]: bad type\n\nerror[E2]: unbound"
        );
    }

    #[test]
    fn test_failure_message_truncates_each_error() {
        let long = "x".repeat(1000);
        let msg = compile_failure_message("Foo", &[long, "short".into()], 500);
        let expected_first = format!("{}{}", "x".repeat(500), TRUNCATION_MARKER);
        assert!(msg.contains(&expected_first));
        assert!(!msg.contains(&"x".repeat(501)));
        assert!(msg.ends_with("\n\nshort"));
    }

    #[test]
    fn test_failure_message_without_diagnostics() {
        let msg = compile_failure_message("Foo", &[], 500);
        assert!(msg.contains("no diagnostics"));
    }
}
