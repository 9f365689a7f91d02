use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use futures::future::BoxFuture;
use regex::Regex;
use tracing::{debug, info, warn};

use moveflow_core::config::CompilerConfig;
use moveflow_core::error::{MoveflowError, Result};
use moveflow_core::traits::Compiler;
use moveflow_core::types::{CompileOutput, CompileRequest, ModuleAbi};

use crate::cli::{self, Envelope};

const PACKAGE_NAME: &str = "MoveflowPackage";

/// Compiles a single module with `aptos move compile` in a scratch package.
pub struct AptosCliCompiler {
    config: CompilerConfig,
}

impl AptosCliCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    async fn write_package(&self, dir: &Path, request: &CompileRequest) -> Result<()> {
        let sources = dir.join("sources");
        tokio::fs::create_dir_all(&sources).await?;
        tokio::fs::write(dir.join("Move.toml"), manifest(&self.config.framework_rev)).await?;
        tokio::fs::write(
            sources.join(format!("{}.move", request.module_name)),
            &request.source,
        )
        .await?;
        Ok(())
    }

    async fn read_artifacts(&self, dir: &Path, request: &CompileRequest) -> Result<CompileOutput> {
        let build = dir.join("build").join(PACKAGE_NAME);
        let module_path: PathBuf = build
            .join("bytecode_modules")
            .join(format!("{}.mv", request.module_name));

        let bytecode = tokio::fs::read(&module_path).await.map_err(|e| {
            MoveflowError::Compiler(format!(
                "compiled module not found at {}: {}",
                module_path.display(),
                e
            ))
        })?;
        let metadata = match tokio::fs::read(build.join("package-metadata.bcs")).await {
            Ok(bytes) => Some(to_hex(&bytes)),
            Err(e) => {
                warn!(error = %e, "Package metadata missing from build output");
                None
            }
        };

        Ok(CompileOutput {
            bytecode: to_hex(&bytecode),
            metadata_bytes: metadata,
            abi: ModuleAbi {
                module_name: request.module_name.clone(),
                account_address: request.deployer_address.clone(),
                functions: abi_functions(&request.source),
            },
            warnings: Vec::new(),
        })
    }
}

impl Compiler for AptosCliCompiler {
    fn compile(&self, request: CompileRequest) -> BoxFuture<'_, Result<CompileOutput>> {
        Box::pin(async move {
            let dir = tempfile::tempdir()?;
            self.write_package(dir.path(), &request).await?;

            let args = vec![
                "move".to_string(),
                "compile".to_string(),
                "--save-metadata".to_string(),
                "--package-dir".to_string(),
                dir.path().display().to_string(),
                "--named-addresses".to_string(),
                format!("deployer={}", request.deployer_address),
            ];

            let start = Instant::now();
            let out = cli::run(
                &self.config.cli_path,
                &args,
                Some(dir.path()),
                self.config.timeout_secs,
                "compiler",
            )
            .await?;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            let warnings = diagnostics(&out.stderr, "warning", self.config.max_errors);
            match cli::parse_envelope(&out.stdout) {
                Some(Envelope::Result(_)) if out.success => {
                    let mut output = self.read_artifacts(dir.path(), &request).await?;
                    output.warnings = warnings;
                    info!(module = %request.module_name, elapsed_ms, "Compiled with aptos CLI");
                    Ok(output)
                }
                envelope => {
                    let mut errors = diagnostics(&out.stderr, "error", self.config.max_errors);
                    if errors.is_empty() {
                        errors.push(match envelope {
                            Some(Envelope::Error(msg)) => msg,
                            _ if !out.stderr.trim().is_empty() => out.stderr.trim().to_string(),
                            _ => "Compiler exited without output".to_string(),
                        });
                    }
                    debug!(module = %request.module_name, errors = errors.len(), elapsed_ms, "Compilation failed");
                    Err(MoveflowError::Compilation { errors, warnings })
                }
            }
        })
    }
}

/// Move.toml for the scratch package. `deployer` is bound at compile time.
fn manifest(framework_rev: &str) -> String {
    format!(
        r#"[package]
name = "{PACKAGE_NAME}"
version = "1.0.0"

[addresses]
deployer = "_"

[dependencies.AptosFramework]
git = "https://github.com/aptos-labs/aptos-core.git"
rev = "{framework_rev}"
subdir = "aptos-move/framework/aptos-framework"
"#
    )
}

/// Split compiler stderr into blocks that start with `kind` (`error` or
/// `warning`), keeping at most `max` of them.
fn diagnostics(stderr: &str, kind: &str, max: usize) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in stderr.lines() {
        let starts_block = line.starts_with("error") || line.starts_with("warning");
        if starts_block {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            if line.starts_with(kind) {
                current = Some(line.to_string());
            }
        } else if let Some(block) = current.as_mut() {
            block.push('\n');
            block.push_str(line);
        }
    }
    if let Some(block) = current {
        blocks.push(block);
    }

    blocks
        .into_iter()
        .map(|b| b.trim_end().to_string())
        .take(max)
        .collect()
}

fn public_fun() -> &'static Regex {
    static PUBLIC_FUN: OnceLock<Regex> = OnceLock::new();
    PUBLIC_FUN.get_or_init(|| {
        Regex::new(r"\b(?:public(?:\s*\(\s*\w+\s*\))?\s+(?:entry\s+)?|entry\s+)fun\s+([A-Za-z_][A-Za-z0-9_]*)")
            .expect("function pattern is valid")
    })
}

/// Names of public and entry functions, in declaration order.
fn abi_functions(source: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in public_fun().captures_iter(source) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
