use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoveflowError {
    // Graph errors
    #[error("No nodes to execute")]
    EmptyWorkflow,

    #[error("Cycle detected in workflow involving: {}", nodes.join(", "))]
    CycleDetected { nodes: Vec<String> },

    #[error("Edge references unknown node '{node_id}'")]
    UnknownNode { node_id: String },

    #[error("Duplicate node id '{0}'")]
    DuplicateNode(String),

    // Handler errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No handler registered for node type '{0}'")]
    HandlerNotFound(String),

    // Collaborator errors
    #[error("Compilation failed with {} error(s)", errors.len())]
    Compilation {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    #[error("Compiler error: {0}")]
    Compiler(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("{0}")]
    ChainRejected(String),

    #[error("Chain request failed: {0}")]
    Chain(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("AI analysis failed: {0}")]
    Analysis(String),

    #[error("Collaborator timeout after {timeout_secs}s: {service}")]
    Timeout { service: String, timeout_secs: u64 },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MoveflowError>;
