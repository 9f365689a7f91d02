use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use moveflow_core::config::{AppConfig, InputResolution};
use moveflow_core::traits::{Collaborators, ExecutionObserver, NoopObserver};
use moveflow_core::types::Network;

/// Last wallet address that was verified live.
///
/// Compile falls back to this when the wallet cannot confirm an account,
/// trading freshness for availability. Shared with whatever front end
/// drives the executor.
#[derive(Clone, Default)]
pub struct AccountCache {
    inner: Arc<RwLock<Option<String>>>,
}

impl AccountCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(address.into()))),
        }
    }

    pub async fn remember(&self, address: &str) {
        *self.inner.write().await = Some(address.to_string());
    }

    pub async fn last_known(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    pub async fn forget(&self) {
        *self.inner.write().await = None;
    }
}

/// Knobs that shape a run without changing its graph.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Cosmetic pause after each successful node.
    pub node_delay: Duration,
    pub input_resolution: InputResolution,
    pub error_truncate_chars: usize,
    pub default_audit_prompt: Option<String>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            node_delay: Duration::ZERO,
            input_resolution: InputResolution::default(),
            error_truncate_chars: 500,
            default_audit_prompt: None,
        }
    }
}

impl ExecutorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            node_delay: Duration::from_millis(config.executor.node_delay_ms),
            input_resolution: config.executor.input_resolution,
            error_truncate_chars: config.executor.error_truncate_chars,
            default_audit_prompt: config.ai.as_ref().and_then(|ai| ai.default_prompt.clone()),
        }
    }
}

/// Everything a run needs besides the graph itself.
pub struct ExecutionContext {
    pub collaborators: Collaborators,
    pub observer: Arc<dyn ExecutionObserver>,
    /// Target network; only deploy requires one.
    pub network: Option<Network>,
    pub accounts: AccountCache,
    pub options: ExecutorOptions,
}

impl ExecutionContext {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            observer: Arc::new(NoopObserver),
            network: None,
            accounts: AccountCache::new(),
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_accounts(mut self, accounts: AccountCache) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_account_cache_roundtrip() {
        let cache = AccountCache::new();
        assert!(cache.last_known().await.is_none());

        cache.remember("0xabc").await;
        let shared = cache.clone();
        assert_eq!(shared.last_known().await.as_deref(), Some("0xabc"));

        shared.forget().await;
        assert!(cache.last_known().await.is_none());
    }

    #[test]
    fn test_options_from_config() {
        let config = AppConfig::from_toml(
            r#"
[executor]
node_delay_ms = 250
error_truncate_chars = 80

[ai]
model_id = "gpt-4o-mini"
default_prompt = "Check for reentrancy."
"#,
        )
        .unwrap();
        let options = ExecutorOptions::from_config(&config);
        assert_eq!(options.node_delay, Duration::from_millis(250));
        assert_eq!(options.error_truncate_chars, 80);
        assert_eq!(
            options.default_audit_prompt.as_deref(),
            Some("Check for reentrancy.")
        );
    }
}
