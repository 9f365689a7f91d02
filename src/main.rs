use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use moveflow_core::config::AppConfig;
use moveflow_core::event::EventBus;
use moveflow_core::types::{is_valid_address, normalize_address, Network, Workflow, WorkflowEvent};
use moveflow_engine::{
    build_order, AccountCache, EventBusObserver, ExecutionContext, ExecutorOptions, TokenStop,
    WorkflowExecutor,
};

#[derive(Parser)]
#[command(name = "moveflow", version, about = "Headless runner for Move contract workflows")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "moveflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Workflow JSON ({ "nodes": [...], "edges": [...] })
        workflow: PathBuf,
        /// Target network (mainnet, testnet, devnet, local)
        #[arg(long)]
        network: Option<Network>,
        /// Pause after each node, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Address to compile against when the wallet cannot confirm one
        #[arg(long, env = "MOVEFLOW_DEPLOYER")]
        deployer: Option<String>,
    },
    /// Print the execution order of a workflow file
    Plan {
        workflow: PathBuf,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("moveflow=info,warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "moveflow", &mut std::io::stdout());
        return Ok(());
    }

    let config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "No config file found, using defaults");
        AppConfig::default()
    };

    match cli.command {
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Plan { workflow } => {
            let workflow = load_workflow(&workflow)?;
            let order = build_order(&workflow.nodes, &workflow.edges)?;
            let labels = node_labels(&workflow);
            for (i, id) in order.iter().enumerate() {
                println!("{:>2}. {} ({})", i + 1, id, labels[id]);
            }
        }
        Commands::Run {
            workflow,
            network,
            delay_ms,
            deployer,
        } => {
            let workflow = load_workflow(&workflow)?;
            let network = network.unwrap_or(config.network.default);
            run_workflow(&config, workflow, network, delay_ms, deployer).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn load_workflow(path: &Path) -> anyhow::Result<Workflow> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read workflow {}: {}", path.display(), e))?;
    Ok(Workflow::from_json(&content)?)
}

fn node_labels(workflow: &Workflow) -> HashMap<String, String> {
    workflow
        .nodes
        .iter()
        .map(|n| (n.id.clone(), n.label()))
        .collect()
}

async fn run_workflow(
    config: &AppConfig,
    workflow: Workflow,
    network: Network,
    delay_ms: Option<u64>,
    deployer: Option<String>,
) -> anyhow::Result<()> {
    let accounts = match deployer {
        Some(addr) => {
            let addr = normalize_address(&addr);
            if !is_valid_address(&addr) {
                anyhow::bail!("Invalid deployer address: {}", addr);
            }
            AccountCache::with_address(addr)
        }
        None => AccountCache::new(),
    };

    let mut options = ExecutorOptions::from_config(config);
    if let Some(ms) = delay_ms {
        options.node_delay = Duration::from_millis(ms);
    }

    let event_bus = Arc::new(EventBus::default());
    let collaborators = moveflow_services::collaborators_from_config(config, network)?;
    let ctx = ExecutionContext::new(collaborators)
        .with_observer(Arc::new(EventBusObserver::new(event_bus.clone())))
        .with_network(network)
        .with_accounts(accounts)
        .with_options(options);

    let labels = node_labels(&workflow);
    let mut executor =
        WorkflowExecutor::new(workflow, ctx).with_stop_signal(Arc::new(TokenStop::new()));

    // Ctrl-C stops at the next node boundary
    let stop = executor.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current node");
            stop.stop();
        }
    });

    let printer = tokio::spawn(print_progress(event_bus.subscribe(), labels));

    info!(network = %network, "Starting workflow");
    let result = executor.execute().await;
    printer.await.ok();

    if !result.success {
        anyhow::bail!("{}", result.message);
    }
    println!("{}", result.message);
    Ok(())
}

/// Print node progress to stderr until the run finishes. Returns the number of
/// status lines printed.
async fn print_progress(
    mut rx: broadcast::Receiver<WorkflowEvent>,
    labels: HashMap<String, String>,
) -> usize {
    let mut printed = 0;
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Progress output fell behind, some updates were dropped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        match event {
            WorkflowEvent::RunStarted { node_count, .. } => {
                eprintln!("Running {} node(s)", node_count);
            }
            WorkflowEvent::NodeStatus { node_id, status } => {
                let label = labels.get(&node_id).map(String::as_str).unwrap_or("?");
                eprintln!("[{:>7}] {} ({})", status.to_string(), label, node_id);
                printed += 1;
            }
            WorkflowEvent::RunFinished { .. } => break,
            _ => {}
        }
    }
    printed
}

#[cfg(test)]
mod tests {
    use super::*;
    use moveflow_core::traits::ExecutionObserver;
    use moveflow_core::types::{ExecutionResult, NodeStatus, RunId};

    #[tokio::test]
    async fn test_progress_survives_lagging() {
        let bus = Arc::new(EventBus::new(2));
        let rx = bus.subscribe();
        let observer = EventBusObserver::new(bus.clone());

        observer.node_status_changed("a", NodeStatus::Running);
        observer.node_status_changed("a", NodeStatus::Success);
        observer.node_status_changed("b", NodeStatus::Running);
        observer.run_finished(&RunId::new(), &ExecutionResult::fail("stopped"));

        // The two oldest updates are dropped; the rest still print.
        assert_eq!(print_progress(rx, HashMap::new()).await, 1);
    }
}
