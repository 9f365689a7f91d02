use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future::BoxFuture;
use tokio::sync::broadcast;

use moveflow_core::error::{MoveflowError, Result};
use moveflow_core::traits::{AiAnalyzer, ChainClient, Compiler, WalletConnector};
use moveflow_core::types::*;

use crate::fixtures::{sample_compile_output, TEST_ADDRESS};

/// What a [`MockCompiler`] answers with.
#[derive(Debug, Clone)]
pub enum CompileScript {
    Succeed(CompileOutput),
    Reject(Vec<String>),
    Unavailable(String),
}

pub struct MockCompiler {
    script: CompileScript,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompileRequest>>,
}

impl MockCompiler {
    pub fn new(script: CompileScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Succeeds with a small but valid-looking module.
    pub fn succeeding() -> Self {
        Self::new(CompileScript::Succeed(sample_compile_output(
            "Counter",
            TEST_ADDRESS,
        )))
    }

    pub fn with_output(output: CompileOutput) -> Self {
        Self::new(CompileScript::Succeed(output))
    }

    pub fn rejecting(errors: Vec<String>) -> Self {
        Self::new(CompileScript::Reject(errors))
    }

    pub fn unavailable(message: &str) -> Self {
        Self::new(CompileScript::Unavailable(message.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompileRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

impl Compiler for MockCompiler {
    fn compile(&self, request: CompileRequest) -> BoxFuture<'_, Result<CompileOutput>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            match &self.script {
                CompileScript::Succeed(output) => Ok(output.clone()),
                CompileScript::Reject(errors) => Err(MoveflowError::Compilation {
                    errors: errors.clone(),
                    warnings: Vec::new(),
                }),
                CompileScript::Unavailable(msg) => Err(MoveflowError::Compiler(msg.clone())),
            }
        })
    }
}

pub struct MockWallet {
    account: Mutex<Option<Account>>,
    connect_error: Option<String>,
    lookup_error: Option<String>,
    connects: AtomicUsize,
    submitted: Mutex<Vec<TransactionPayload>>,
    tx: broadcast::Sender<WalletEvent>,
}

impl MockWallet {
    fn with_account(account: Option<Account>) -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            account: Mutex::new(account),
            connect_error: None,
            lookup_error: None,
            connects: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            tx,
        }
    }

    pub fn connected(address: &str) -> Self {
        Self::with_account(Some(Account::new(address)))
    }

    /// No account; `connect` fails with `WalletNotConnected`.
    pub fn disconnected() -> Self {
        Self::with_account(None)
    }

    /// `connect` is rejected with `message`.
    pub fn failing_connect(mut self, message: &str) -> Self {
        self.connect_error = Some(message.to_string());
        self
    }

    /// `current_account` errors instead of answering.
    pub fn failing_lookup(mut self, message: &str) -> Self {
        self.lookup_error = Some(message.to_string());
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Switch the active account and notify subscribers.
    pub fn switch_account(&self, address: &str) {
        let account = Account::new(address);
        *self.account.lock().unwrap() = Some(account.clone());
        let _ = self.tx.send(WalletEvent::AccountChanged(account));
    }
}

impl WalletConnector for MockWallet {
    fn connect(&self) -> BoxFuture<'_, Result<Account>> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(msg) = &self.connect_error {
                return Err(MoveflowError::Wallet(msg.clone()));
            }
            self.account
                .lock()
                .unwrap()
                .clone()
                .ok_or(MoveflowError::WalletNotConnected)
        })
    }

    fn current_account(&self) -> BoxFuture<'_, Result<Option<Account>>> {
        Box::pin(async move {
            if let Some(msg) = &self.lookup_error {
                return Err(MoveflowError::Wallet(msg.clone()));
            }
            Ok(self.account.lock().unwrap().clone())
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            *self.account.lock().unwrap() = None;
            let _ = self.tx.send(WalletEvent::Disconnected);
            Ok(())
        })
    }

    fn sign_and_submit(
        &self,
        payload: TransactionPayload,
    ) -> BoxFuture<'_, Result<SubmittedTransaction>> {
        Box::pin(async move {
            if self.account.lock().unwrap().is_none() {
                return Err(MoveflowError::WalletNotConnected);
            }
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(payload);
            Ok(SubmittedTransaction {
                hash: format!("0x{:064x}", submitted.len()),
            })
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.tx.subscribe()
    }
}

/// What a [`MockChain`] does with a deploy.
#[derive(Debug, Clone)]
pub enum DeployScript {
    Succeed(DeployReceipt),
    Reject(String),
}

pub struct MockChain {
    script: DeployScript,
    requests: Mutex<Vec<DeployRequest>>,
}

impl MockChain {
    pub fn succeeding(contract_address: &str, transaction_hash: &str) -> Self {
        Self {
            script: DeployScript::Succeed(DeployReceipt {
                contract_address: contract_address.to_string(),
                transaction_hash: transaction_hash.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            script: DeployScript::Reject(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn deploys(&self) -> Vec<DeployRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ChainClient for MockChain {
    fn deploy<'a>(
        &'a self,
        request: DeployRequest,
        _account: &'a Account,
    ) -> BoxFuture<'a, Result<DeployReceipt>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request);
            match &self.script {
                DeployScript::Succeed(receipt) => Ok(receipt.clone()),
                DeployScript::Reject(msg) => Err(MoveflowError::ChainRejected(msg.clone())),
            }
        })
    }

    fn wait_for_transaction<'a>(
        &'a self,
        hash: &'a str,
    ) -> BoxFuture<'a, Result<TransactionReceipt>> {
        Box::pin(async move {
            Ok(TransactionReceipt {
                hash: hash.to_string(),
                success: true,
                vm_status: "Executed successfully".to_string(),
                version: Some("1".to_string()),
            })
        })
    }

    fn account_resources<'a>(
        &'a self,
        _address: &'a str,
    ) -> BoxFuture<'a, Result<Vec<AccountResource>>> {
        Box::pin(async move { Ok(Vec::new()) })
    }
}

pub struct MockAnalyzer {
    response: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockAnalyzer {
    pub fn responding(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl AiAnalyzer for MockAnalyzer {
    fn analyze<'a>(&'a self, _source: &'a str, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.response.clone().map_err(MoveflowError::Analysis)
        })
    }
}
