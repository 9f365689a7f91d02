use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use moveflow_core::traits::Collaborators;
use moveflow_core::types::*;

use crate::mocks::{MockAnalyzer, MockChain, MockCompiler, MockWallet};

pub const TEST_ADDRESS: &str = "0x1f2e3d4c5b6a";

/// Bytecode long enough to pass deploy validation.
pub const SAMPLE_BYTECODE: &str = "0xa11ceb0b0600000009010002";

/// A small module declared under the `deployer` named address.
pub fn valid_source(name: &str) -> String {
    format!(
        "module deployer::{name} {{\n    struct Count has key {{ value: u64 }}\n\n    \
         public entry fun init(account: &signer) {{\n        \
         move_to(account, Count {{ value: 0 }});\n    }}\n\n    \
         #[view]\n    public fun get(addr: address): u64 acquires Count {{\n        \
         borrow_global<Count>(addr).value\n    }}\n}}\n"
    )
}

pub fn sample_compile_output(module: &str, address: &str) -> CompileOutput {
    CompileOutput {
        bytecode: SAMPLE_BYTECODE.to_string(),
        metadata_bytes: Some("0x0102".to_string()),
        abi: ModuleAbi {
            module_name: module.to_string(),
            account_address: address.to_string(),
            functions: vec!["init".to_string(), "get".to_string()],
        },
        warnings: Vec::new(),
    }
}

/// One of each mock, kept typed so tests can inspect them afterwards.
pub struct MockSet {
    pub compiler: Arc<MockCompiler>,
    pub wallet: Arc<MockWallet>,
    pub chain: Arc<MockChain>,
    pub analyzer: Arc<MockAnalyzer>,
}

impl MockSet {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            compiler: self.compiler.clone(),
            wallet: self.wallet.clone(),
            chain: self.chain.clone(),
            analyzer: self.analyzer.clone(),
        }
    }

    pub fn with_compiler(mut self, compiler: MockCompiler) -> Self {
        self.compiler = Arc::new(compiler);
        self
    }

    pub fn with_wallet(mut self, wallet: MockWallet) -> Self {
        self.wallet = Arc::new(wallet);
        self
    }

    pub fn with_chain(mut self, chain: MockChain) -> Self {
        self.chain = Arc::new(chain);
        self
    }

    pub fn with_analyzer(mut self, analyzer: MockAnalyzer) -> Self {
        self.analyzer = Arc::new(analyzer);
        self
    }
}

impl Default for MockSet {
    /// Everything succeeds; the wallet is connected as [`TEST_ADDRESS`].
    fn default() -> Self {
        Self {
            compiler: Arc::new(MockCompiler::succeeding()),
            wallet: Arc::new(MockWallet::connected(TEST_ADDRESS)),
            chain: Arc::new(MockChain::succeeding("0xabc", "0xdef")),
            analyzer: Arc::new(MockAnalyzer::responding("No issues found.")),
        }
    }
}

pub fn node(id: &str, kind: NodeKind) -> WorkflowNode {
    WorkflowNode::new(id, kind)
}

pub fn project_node(id: &str, title: &str) -> WorkflowNode {
    WorkflowNode::new(id, NodeKind::ProjectCreate).with("title", title)
}

pub fn contract_node(id: &str, code: &str) -> WorkflowNode {
    WorkflowNode::new(id, NodeKind::ContractInput).with("code", code)
}

pub fn edge(source: &str, target: &str) -> WorkflowEdge {
    WorkflowEdge::new(source, target)
}

/// Nodes wired one after the other in the given order.
pub fn linear_workflow(nodes: Vec<WorkflowNode>) -> Workflow {
    let edges = nodes
        .windows(2)
        .map(|pair| edge(&pair[0].id, &pair[1].id))
        .collect();
    Workflow { nodes, edges }
}

/// Write `content` to a temp file that lives as long as the handle.
pub fn temp_file(content: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("create temp file");
    tmp.write_all(content.as_bytes()).expect("write temp file");
    tmp
}
