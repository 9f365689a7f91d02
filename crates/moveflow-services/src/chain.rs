use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use moveflow_core::config::{ChainConfig, NetworkConfig};
use moveflow_core::error::{MoveflowError, Result};
use moveflow_core::traits::{ChainClient, WalletConnector};
use moveflow_core::types::{
    Account, AccountResource, DeployReceipt, DeployRequest, Network, TransactionPayload,
    TransactionReceipt,
};

const PUBLISH_FUNCTION: &str = "0x1::code::publish_package_txn";

/// Fullnode REST client. Publishing is signed by the wallet connector.
///
/// Deploys go to the network named in the request. Lookups that carry no
/// network (`wait_for_transaction`, `account_resources`) use the client's
/// target network, which starts as the configured default.
pub struct RestChainClient {
    http: Client,
    networks: NetworkConfig,
    network: Network,
    config: ChainConfig,
    wallet: Arc<dyn WalletConnector>,
}

impl RestChainClient {
    pub fn new(networks: NetworkConfig, config: ChainConfig, wallet: Arc<dyn WalletConnector>) -> Self {
        Self {
            http: Client::new(),
            network: networks.default,
            networks,
            config,
            wallet,
        }
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    async fn wait_on(&self, network: Network, hash: &str) -> Result<TransactionReceipt> {
        let url = format!(
            "{}/transactions/by_hash/{}",
            self.networks.node_url(network).trim_end_matches('/'),
            hash
        );
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        for attempt in 1..=self.config.max_poll_attempts {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| MoveflowError::Http(e.to_string()))?;

            match response.status() {
                StatusCode::NOT_FOUND => {}
                status if status.is_success() => {
                    let body: Value = response
                        .json()
                        .await
                        .map_err(|e| MoveflowError::Http(e.to_string()))?;
                    if let Some(receipt) = committed_receipt(&body)? {
                        return Ok(receipt);
                    }
                }
                status => {
                    let body = response.text().await.unwrap_or_else(|_| "unknown".to_string());
                    return Err(MoveflowError::Chain(format!("HTTP {}: {}", status, body)));
                }
            }

            debug!(hash, attempt, "Transaction pending");
            tokio::time::sleep(interval).await;
        }

        Err(MoveflowError::Timeout {
            service: "chain".to_string(),
            timeout_secs: self.config.poll_interval_ms * u64::from(self.config.max_poll_attempts) / 1000,
        })
    }
}

impl ChainClient for RestChainClient {
    fn deploy<'a>(
        &'a self,
        request: DeployRequest,
        account: &'a Account,
    ) -> BoxFuture<'a, Result<DeployReceipt>> {
        Box::pin(async move {
            let start = Instant::now();
            let payload = publish_payload(&request)?;
            if !request.constructor_args.is_empty() {
                warn!(
                    module = %request.module_name,
                    count = request.constructor_args.len(),
                    "Publishing does not take constructor arguments; ignoring them"
                );
            }

            let submitted = self.wallet.sign_and_submit(payload).await?;
            info!(hash = %submitted.hash, network = %request.network, "Publish transaction submitted");

            let receipt = self.wait_on(request.network, &submitted.hash).await?;
            if !receipt.success {
                return Err(MoveflowError::ChainRejected(receipt.vm_status));
            }

            info!(
                module = %request.module_name,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Module published"
            );
            Ok(DeployReceipt {
                contract_address: format!("{}::{}", account.address, request.module_name),
                transaction_hash: receipt.hash,
            })
        })
    }

    fn wait_for_transaction<'a>(
        &'a self,
        hash: &'a str,
    ) -> BoxFuture<'a, Result<TransactionReceipt>> {
        Box::pin(async move { self.wait_on(self.network, hash).await })
    }

    fn account_resources<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<Vec<AccountResource>>> {
        Box::pin(async move {
            let url = format!(
                "{}/accounts/{}/resources",
                self.networks.node_url(self.network).trim_end_matches('/'),
                address
            );
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| MoveflowError::Http(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_else(|_| "unknown".to_string());
                return Err(MoveflowError::Chain(format!("HTTP {}: {}", status, body)));
            }

            response
                .json()
                .await
                .map_err(|e| MoveflowError::Http(e.to_string()))
        })
    }
}

/// `publish_package_txn(metadata, [module])` for one compiled module.
fn publish_payload(request: &DeployRequest) -> Result<TransactionPayload> {
    let metadata = request.metadata.as_deref().ok_or_else(|| {
        MoveflowError::Chain("Package metadata is required to publish a module".into())
    })?;
    Ok(TransactionPayload {
        function: PUBLISH_FUNCTION.to_string(),
        type_arguments: Vec::new(),
        arguments: vec![json!(metadata), json!([request.bytecode])],
    })
}

/// A receipt once the transaction is committed, `None` while pending.
fn committed_receipt(body: &Value) -> Result<Option<TransactionReceipt>> {
    if body.get("type").and_then(Value::as_str) == Some("pending_transaction") {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(body.clone())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(metadata: Option<&str>) -> DeployRequest {
        DeployRequest {
            module_name: "Counter".into(),
            bytecode: "0xa11ceb0b".into(),
            metadata: metadata.map(str::to_string),
            constructor_args: vec![],
            network: Network::Devnet,
        }
    }

    #[test]
    fn test_publish_payload() {
        let payload = publish_payload(&request(Some("0x0102"))).unwrap();
        assert_eq!(payload.function, PUBLISH_FUNCTION);
        assert_eq!(payload.arguments, vec![json!("0x0102"), json!(["0xa11ceb0b"])]);
    }

    #[test]
    fn test_publish_needs_metadata() {
        assert!(publish_payload(&request(None)).is_err());
    }

    struct NoWallet;

    impl WalletConnector for NoWallet {
        fn connect(&self) -> BoxFuture<'_, Result<Account>> {
            Box::pin(async { Err(MoveflowError::WalletNotConnected) })
        }

        fn current_account(&self) -> BoxFuture<'_, Result<Option<Account>>> {
            Box::pin(async { Ok(None) })
        }

        fn disconnect(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn sign_and_submit(
            &self,
            _payload: TransactionPayload,
        ) -> BoxFuture<'_, Result<moveflow_core::types::SubmittedTransaction>> {
            Box::pin(async { Err(MoveflowError::WalletNotConnected) })
        }

        fn subscribe(&self) -> tokio::sync::broadcast::Receiver<moveflow_core::types::WalletEvent> {
            tokio::sync::broadcast::channel(1).1
        }
    }

    #[test]
    fn test_target_network_defaults_to_config() {
        let networks = NetworkConfig {
            default: Network::Testnet,
            ..NetworkConfig::default()
        };
        let client = RestChainClient::new(networks.clone(), ChainConfig::default(), Arc::new(NoWallet));
        assert_eq!(client.network(), Network::Testnet);

        let client = RestChainClient::new(networks, ChainConfig::default(), Arc::new(NoWallet))
            .with_network(Network::Local);
        assert_eq!(client.network(), Network::Local);
    }

    #[test]
    fn test_pending_transaction() {
        let body = json!({"type": "pending_transaction", "hash": "0x1"});
        assert!(committed_receipt(&body).unwrap().is_none());
    }

    #[test]
    fn test_committed_transaction() {
        let body = json!({
            "type": "user_transaction",
            "hash": "0xdef",
            "success": false,
            "vm_status": "Move abort in 0x1::code: EMODULE_MISSING",
            "version": "12345"
        });
        let receipt = committed_receipt(&body).unwrap().unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.hash, "0xdef");
        assert!(receipt.vm_status.contains("EMODULE_MISSING"));
        assert_eq!(receipt.version.as_deref(), Some("12345"));
    }
}
