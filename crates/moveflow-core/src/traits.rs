use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::*;

/// Compiler service — turns module source into bytecode.
///
/// A rejected source is reported as `MoveflowError::Compilation`; any other
/// error means the service itself could not run.
pub trait Compiler: Send + Sync + 'static {
    fn compile(&self, request: CompileRequest) -> BoxFuture<'_, Result<CompileOutput>>;
}

/// Wallet connector — account access and transaction signing.
pub trait WalletConnector: Send + Sync + 'static {
    /// Connect (or reconnect) and return the active account.
    fn connect(&self) -> BoxFuture<'_, Result<Account>>;

    /// The connected account, if any. Never prompts.
    fn current_account(&self) -> BoxFuture<'_, Result<Option<Account>>>;

    fn disconnect(&self) -> BoxFuture<'_, Result<()>>;

    /// Sign a payload with the connected account and submit it.
    fn sign_and_submit(
        &self,
        payload: TransactionPayload,
    ) -> BoxFuture<'_, Result<SubmittedTransaction>>;

    /// Subscribe to account-change and disconnect notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Chain client — publishing and reads against a fullnode.
pub trait ChainClient: Send + Sync + 'static {
    /// Publish a module from `account`. Rejections come back as
    /// `MoveflowError::ChainRejected` carrying the node's message.
    fn deploy<'a>(
        &'a self,
        request: DeployRequest,
        account: &'a Account,
    ) -> BoxFuture<'a, Result<DeployReceipt>>;

    fn wait_for_transaction<'a>(&'a self, hash: &'a str)
        -> BoxFuture<'a, Result<TransactionReceipt>>;

    fn account_resources<'a>(&'a self, address: &'a str)
        -> BoxFuture<'a, Result<Vec<AccountResource>>>;
}

/// AI analysis service.
pub trait AiAnalyzer: Send + Sync + 'static {
    fn analyze<'a>(&'a self, source: &'a str, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Receives live progress from the executor. Calls happen inline on the
/// executor's task, so implementations must not block.
pub trait ExecutionObserver: Send + Sync + 'static {
    fn node_data_updated(&self, node_id: &str, partial: &Map<String, Value>);

    fn node_status_changed(&self, node_id: &str, status: NodeStatus);

    fn edges_updated(&self, edges: &[WorkflowEdge]);

    fn run_started(&self, run_id: &RunId, node_count: usize) {
        let _ = (run_id, node_count);
    }

    fn run_finished(&self, run_id: &RunId, result: &ExecutionResult) {
        let _ = (run_id, result);
    }
}

/// Observer that ignores every callback.
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {
    fn node_data_updated(&self, _node_id: &str, _partial: &Map<String, Value>) {}

    fn node_status_changed(&self, _node_id: &str, _status: NodeStatus) {}

    fn edges_updated(&self, _edges: &[WorkflowEdge]) {}
}

/// The external systems a workflow run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub compiler: Arc<dyn Compiler>,
    pub wallet: Arc<dyn WalletConnector>,
    pub chain: Arc<dyn ChainClient>,
    pub analyzer: Arc<dyn AiAnalyzer>,
}
