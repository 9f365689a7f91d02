//! Concrete collaborators: the Aptos CLI for compiling and signing, a
//! fullnode REST client for publishing and reads, and an OpenAI-compatible
//! analyzer.

mod cli;

pub mod analyzer;
pub mod chain;
pub mod compiler;
pub mod wallet;

use std::sync::Arc;

use futures::future::BoxFuture;

use moveflow_core::config::AppConfig;
use moveflow_core::error::{MoveflowError, Result};
use moveflow_core::traits::{AiAnalyzer, Collaborators};
use moveflow_core::types::Network;

pub use analyzer::OpenAiAnalyzer;
pub use chain::RestChainClient;
pub use compiler::AptosCliCompiler;
pub use wallet::AptosCliWallet;

/// Analyzer used when no `[ai]` section is configured.
pub struct UnconfiguredAnalyzer;

impl AiAnalyzer for UnconfiguredAnalyzer {
    fn analyze<'a>(&'a self, _source: &'a str, _prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async {
            Err(MoveflowError::Analysis(
                "no AI provider configured; add an [ai] section to the config".into(),
            ))
        })
    }
}

/// Build the production collaborators described by `config`, with chain
/// lookups aimed at `network`.
pub fn collaborators_from_config(config: &AppConfig, network: Network) -> Result<Collaborators> {
    let wallet = Arc::new(AptosCliWallet::new(config.wallet.clone()));
    let chain = RestChainClient::new(config.network.clone(), config.chain.clone(), wallet.clone())
        .with_network(network);
    let analyzer: Arc<dyn AiAnalyzer> = match &config.ai {
        Some(ai) => Arc::new(OpenAiAnalyzer::new(ai.clone())?),
        None => Arc::new(UnconfiguredAnalyzer),
    };

    Ok(Collaborators {
        compiler: Arc::new(AptosCliCompiler::new(config.compiler.clone())),
        wallet,
        chain: Arc::new(chain),
        analyzer,
    })
}
