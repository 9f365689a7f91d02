use std::io::Write;

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use moveflow_core::config::WalletConfig;
use moveflow_core::error::{MoveflowError, Result};
use moveflow_core::traits::WalletConnector;
use moveflow_core::types::{
    is_valid_address, normalize_address, Account, SubmittedTransaction, TransactionPayload,
    WalletEvent,
};

use crate::cli::{self, Envelope};

/// Wallet backed by an Aptos CLI profile.
///
/// "Connecting" resolves the profile's account; signing goes through
/// `aptos move run`, so the profile's key never leaves the CLI.
pub struct AptosCliWallet {
    config: WalletConfig,
    account: RwLock<Option<Account>>,
    events: broadcast::Sender<WalletEvent>,
}

impl AptosCliWallet {
    pub fn new(config: WalletConfig) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            config,
            account: RwLock::new(None),
            events,
        }
    }

    async fn resolve_profile(&self) -> Result<Account> {
        let args = vec![
            "config".to_string(),
            "show-profiles".to_string(),
            "--profile".to_string(),
            self.config.profile.clone(),
        ];
        let out = cli::run(
            &self.config.cli_path,
            &args,
            None,
            self.config.timeout_secs,
            "wallet",
        )
        .await?;

        match cli::parse_envelope(&out.stdout) {
            Some(Envelope::Result(profiles)) => profile_account(&profiles, &self.config.profile),
            Some(Envelope::Error(msg)) => Err(MoveflowError::Wallet(msg)),
            None => Err(MoveflowError::Wallet(format!(
                "unreadable profile listing: {}",
                out.stderr.trim()
            ))),
        }
    }

    /// Make `account` the connected one, announcing a change.
    async fn adopt(&self, account: Account) {
        let mut current = self.account.write().await;
        if current.as_ref() != Some(&account) {
            info!(profile = %self.config.profile, address = %account.address, "Wallet connected");
            let _ = self.events.send(WalletEvent::AccountChanged(account.clone()));
        }
        *current = Some(account);
    }
}

impl WalletConnector for AptosCliWallet {
    fn connect(&self) -> BoxFuture<'_, Result<Account>> {
        Box::pin(async move {
            let account = self.resolve_profile().await?;
            self.adopt(account.clone()).await;
            Ok(account)
        })
    }

    /// The cached account, or the profile's account when nothing is cached.
    /// Reading a profile never prompts, so this resolves it on demand.
    fn current_account(&self) -> BoxFuture<'_, Result<Option<Account>>> {
        Box::pin(async move {
            if let Some(account) = self.account.read().await.clone() {
                return Ok(Some(account));
            }
            let account = self.resolve_profile().await?;
            self.adopt(account.clone()).await;
            Ok(Some(account))
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.account.write().await.take().is_some() {
                let _ = self.events.send(WalletEvent::Disconnected);
            }
            Ok(())
        })
    }

    fn sign_and_submit(
        &self,
        payload: TransactionPayload,
    ) -> BoxFuture<'_, Result<SubmittedTransaction>> {
        Box::pin(async move {
            if self.account.read().await.is_none() {
                return Err(MoveflowError::WalletNotConnected);
            }

            let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
            file.write_all(serde_json::to_string(&run_file(&payload))?.as_bytes())?;

            let args = vec![
                "move".to_string(),
                "run".to_string(),
                "--json-file".to_string(),
                file.path().display().to_string(),
                "--profile".to_string(),
                self.config.profile.clone(),
                "--assume-yes".to_string(),
            ];
            let out = cli::run(
                &self.config.cli_path,
                &args,
                None,
                self.config.timeout_secs,
                "wallet",
            )
            .await?;

            match cli::parse_envelope(&out.stdout) {
                Some(Envelope::Result(result)) => {
                    let hash = result
                        .get("transaction_hash")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            MoveflowError::Wallet("submission result has no transaction hash".into())
                        })?;
                    Ok(SubmittedTransaction {
                        hash: hash.to_string(),
                    })
                }
                Some(Envelope::Error(msg)) => {
                    warn!(function = %payload.function, error = %msg, "Transaction rejected");
                    Err(MoveflowError::ChainRejected(msg))
                }
                None => Err(MoveflowError::Wallet(format!(
                    "unreadable submission output: {}",
                    out.stderr.trim()
                ))),
            }
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

/// Pull `profile`'s account out of `aptos config show-profiles` output.
fn profile_account(profiles: &Value, profile: &str) -> Result<Account> {
    let entry = profiles
        .get(profile)
        .ok_or_else(|| MoveflowError::Wallet(format!("profile '{}' not found", profile)))?;
    let raw = entry
        .get("account")
        .and_then(Value::as_str)
        .ok_or_else(|| MoveflowError::Wallet(format!("profile '{}' has no account", profile)))?;

    let address = normalize_address(raw);
    if !is_valid_address(&address) {
        return Err(MoveflowError::Wallet(format!(
            "profile '{}' has an invalid account address '{}'",
            profile, raw
        )));
    }

    Ok(Account {
        address,
        public_key: entry
            .get("public_key")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// The `--json-file` body for `aptos move run`.
fn run_file(payload: &TransactionPayload) -> Value {
    json!({
        "function_id": payload.function,
        "type_args": payload.type_arguments,
        "args": payload.arguments.iter().map(typed_arg).collect::<Vec<_>>(),
    })
}

/// Tag an untyped argument with the CLI's argument type.
fn typed_arg(value: &Value) -> Value {
    let arg_type = match value {
        Value::Array(items) => items.first().map(arg_type).unwrap_or("hex"),
        other => arg_type(other),
    };
    json!({ "type": arg_type, "value": value })
}

fn arg_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::Number(_) => "u64",
        Value::String(s) if s.starts_with("0x") => "hex",
        _ => "string",
    }
}
