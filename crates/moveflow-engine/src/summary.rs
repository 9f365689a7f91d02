use chrono::{DateTime, Utc};
use serde_json::Value;

use moveflow_core::types::NodeKind;

use crate::store::ExecutionStore;

/// Human-readable report of what a run produced.
///
/// A section appears only when its node type succeeded in this run.
pub fn build_summary(store: &ExecutionStore, completed_at: DateTime<Utc>) -> String {
    let mut lines: Vec<String> = vec!["Workflow completed successfully!".to_string()];
    let field = |v: &Value, key: &str| -> Option<String> {
        v.get(key)
            .and_then(|x| x.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(project) = store.latest_of_kind(NodeKind::ProjectCreate) {
        if let Some(title) = field(project, "title") {
            lines.push(format!("Project: {}", title));
        }
        if let Some(description) = field(project, "description") {
            lines.push(format!("Description: {}", description));
        }
    }

    if let Some(contract) = store.latest_of_kind(NodeKind::ContractInput) {
        if let Some(name) = field(contract, "name") {
            lines.push(format!("Contract: {}", name));
        }
    }

    if store.latest_of_kind(NodeKind::Compile).is_some() {
        lines.push("✓ Compilation successful".to_string());
    }

    if let Some(deploy) = store.latest_of_kind(NodeKind::Deploy) {
        let network = field(deploy, "network");
        match &network {
            Some(n) => lines.push(format!("✓ Deployed to {}", n)),
            None => lines.push("✓ Deployment successful".to_string()),
        }
        if let Some(address) = field(deploy, "contractAddress") {
            lines.push(format!("  Contract address: {}", address));
        }
        if let Some(hash) = field(deploy, "transactionHash") {
            lines.push(format!("  Transaction hash: {}", hash));
        }
        if let Some(n) = network {
            lines.push(format!("  Network: {}", n));
        }
    }

    if store.latest_of_kind(NodeKind::AiAudit).is_some() {
        lines.push("✓ AI analysis complete".to_string());
    }

    lines.push(format!("Completed at: {}", completed_at.to_rfc3339()));
    lines.join("\n")
}
