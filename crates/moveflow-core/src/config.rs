use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MoveflowError, Result};
use crate::types::Network;

/// Top-level moveflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub ai: Option<AiConfig>,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network used when a run does not pick one.
    #[serde(default)]
    pub default: Network,
    /// Fullnode URL overrides, keyed by network name.
    #[serde(default)]
    pub node_urls: HashMap<String, String>,
}

impl NetworkConfig {
    /// Fullnode REST URL for `network`, honoring overrides.
    pub fn node_url(&self, network: Network) -> String {
        self.node_urls
            .get(network.name())
            .cloned()
            .unwrap_or_else(|| network.default_node_url().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
    #[serde(default = "default_compile_timeout")]
    pub timeout_secs: u64,
    /// Upper bound on diagnostics returned for one failed compile.
    #[serde(default = "default_max_errors")]
    pub max_errors: usize,
    /// Git revision of the framework dependency written into Move.toml.
    #[serde(default = "default_framework_rev")]
    pub framework_rev: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            timeout_secs: default_compile_timeout(),
            max_errors: default_max_errors(),
            framework_rev: default_framework_rev(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_submit_timeout")]
    pub timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            profile: default_profile(),
            timeout_secs: default_submit_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Prompt used by audit nodes that do not carry their own.
    #[serde(default)]
    pub default_prompt: Option<String>,
    #[serde(default = "default_ai_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

/// How a handler finds the outputs it consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputResolution {
    /// Walk incoming edges backwards; the nearest upstream node of the
    /// wanted type supplies the data.
    #[default]
    Upstream,
    /// Most recent successful node of the wanted type, wired or not.
    ByKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Pause after each node so a UI can show its status. Zero for headless runs.
    #[serde(default)]
    pub node_delay_ms: u64,
    #[serde(default)]
    pub input_resolution: InputResolution,
    /// Per-diagnostic cap when aggregating compiler errors.
    #[serde(default = "default_error_truncate_chars")]
    pub error_truncate_chars: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            node_delay_ms: 0,
            input_resolution: InputResolution::default(),
            error_truncate_chars: default_error_truncate_chars(),
        }
    }
}

fn default_cli_path() -> String {
    "aptos".to_string()
}
fn default_compile_timeout() -> u64 {
    120
}
fn default_max_errors() -> usize {
    10
}
fn default_framework_rev() -> String {
    "mainnet".to_string()
}
fn default_profile() -> String {
    "default".to_string()
}
fn default_submit_timeout() -> u64 {
    60
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_max_poll_attempts() -> u32 {
    60
}
fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_ai_max_tokens() -> u32 {
    2048
}
fn default_ai_timeout() -> u64 {
    90
}
fn default_error_truncate_chars() -> usize {
    500
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| MoveflowError::ConfigNotFound(path.display().to_string()))?;

        Self::from_toml(&content)
    }

    /// Parse config text, expanding `${ENV_VAR}` references first.
    pub fn from_toml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| MoveflowError::Config(e.to_string()))
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
