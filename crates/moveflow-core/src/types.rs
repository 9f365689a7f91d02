use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for one `execute()` call.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of node types a workflow can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    ProjectCreate,
    ContractInput,
    Compile,
    GenerateAbi,
    GenerateBytecode,
    Deploy,
    AiAudit,
    Completion,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::ProjectCreate,
        NodeKind::ContractInput,
        NodeKind::Compile,
        NodeKind::GenerateAbi,
        NodeKind::GenerateBytecode,
        NodeKind::Deploy,
        NodeKind::AiAudit,
        NodeKind::Completion,
    ];

    /// Wire tag, as it appears in workflow files.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::ProjectCreate => "project-create",
            NodeKind::ContractInput => "contract-input",
            NodeKind::Compile => "compile",
            NodeKind::GenerateAbi => "generate-abi",
            NodeKind::GenerateBytecode => "generate-bytecode",
            NodeKind::Deploy => "deploy",
            NodeKind::AiAudit => "ai-audit",
            NodeKind::Completion => "completion",
        }
    }

    /// Label shown when a node carries no `label` of its own.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::ProjectCreate => "Create Project",
            NodeKind::ContractInput => "Contract Input",
            NodeKind::Compile => "Compile",
            NodeKind::GenerateAbi => "Generate ABI",
            NodeKind::GenerateBytecode => "Generate Bytecode",
            NodeKind::Deploy => "Deploy",
            NodeKind::AiAudit => "AI Audit",
            NodeKind::Completion => "Completion",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live status of a node within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Idle => "idle",
            NodeStatus::Running => "running",
            NodeStatus::Success => "success",
            NodeStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// UI annotation on an edge. `SourceRunning` means the edge's source node is
/// executing, `TargetRunning` means its target is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeStatus {
    #[default]
    Idle,
    SourceRunning,
    TargetRunning,
    Success,
    Error,
}

/// A typed unit of work in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            data: Map::new(),
        }
    }

    /// Set a single payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Display label: the `label` field if present, else the type's name.
    pub fn label(&self) -> String {
        self.str_field("label")
            .map(str::to_string)
            .unwrap_or_else(|| self.kind.display_name().to_string())
    }

    /// A string field, trimmed, or `None` when absent or blank.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A directed "produces-before-consumes" dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEdge {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub status: EdgeStatus,
}

impl WorkflowEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
            status: EdgeStatus::Idle,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// A full graph, as stored in workflow files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

impl Workflow {
    pub fn from_json(s: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Outcome of a node handler, or of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ExecutionResult {
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Target network for deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    #[default]
    Devnet,
    Local,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Local => "local",
        }
    }

    /// Public fullnode REST endpoint.
    pub fn default_node_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://fullnode.mainnet.aptoslabs.com/v1",
            Network::Testnet => "https://fullnode.testnet.aptoslabs.com/v1",
            Network::Devnet => "https://fullnode.devnet.aptoslabs.com/v1",
            Network::Local => "http://127.0.0.1:8080/v1",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            "local" | "localnet" => Ok(Network::Local),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

/// A wallet account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            public_key: None,
        }
    }
}

/// `0x` followed by 1–64 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(digits) => {
            !digits.is_empty() && digits.len() <= 64 && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Lowercase an address and add the `0x` prefix tools sometimes omit.
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim().to_lowercase();
    if trimmed.starts_with("0x") {
        trimmed
    } else {
        format!("0x{}", trimmed)
    }
}

/// Wallet lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountChanged(Account),
    Disconnected,
}

/// Input to the compiler service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub source: String,
    pub module_name: String,
    pub deployer_address: String,
}

/// Public surface of a compiled module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAbi {
    pub module_name: String,
    pub account_address: String,
    #[serde(default)]
    pub functions: Vec<String>,
}

/// Successful compiler output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub bytecode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_bytes: Option<String>,
    pub abi: ModuleAbi,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// An entry-function transaction payload handed to the wallet for signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub function: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

/// A transaction accepted by the network but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub hash: String,
}

/// Everything the chain client needs to publish a module.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployRequest {
    pub module_name: String,
    pub bytecode: String,
    pub metadata: Option<String>,
    pub constructor_args: Vec<Value>,
    pub network: Network,
}

/// A confirmed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReceipt {
    pub contract_address: String,
    pub transaction_hash: String,
}

/// A committed transaction as reported by a fullnode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub hash: String,
    pub success: bool,
    #[serde(default)]
    pub vm_status: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// One on-chain resource held by an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub data: Value,
}

/// Events published while a workflow runs.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    RunStarted {
        run_id: RunId,
        node_count: usize,
    },
    NodeStatus {
        node_id: String,
        status: NodeStatus,
    },
    NodeData {
        node_id: String,
        data: Map<String, Value>,
    },
    Edges(Vec<WorkflowEdge>),
    RunFinished {
        run_id: RunId,
        result: ExecutionResult,
        finished_at: DateTime<Utc>,
    },
}
