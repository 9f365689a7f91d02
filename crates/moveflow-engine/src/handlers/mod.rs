//! Per-type node handlers and the dispatch table that maps node types to them.
//!
//! A handler reports expected failures (missing inputs, invalid data,
//! collaborator rejections) as a failed `ExecutionResult`. An `Err` return is
//! reserved for the unexpected; the executor folds it into the same shape.

pub mod artifacts;
pub mod audit;
pub mod compile;
pub mod completion;
pub mod contract;
pub mod deploy;
pub mod project;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use moveflow_core::error::Result;
use moveflow_core::types::{ExecutionResult, NodeKind, WorkflowNode};

use crate::context::ExecutionContext;
use crate::inputs::NodeInputs;

pub use artifacts::{GenerateAbiHandler, GenerateBytecodeHandler};
pub use audit::{AiAuditHandler, DEFAULT_AUDIT_PROMPT};
pub use compile::CompileHandler;
pub use completion::CompletionHandler;
pub use contract::ContractInputHandler;
pub use deploy::DeployHandler;
pub use project::ProjectCreateHandler;

pub trait NodeHandler: Send + Sync + 'static {
    /// Node type this handler runs.
    fn kind(&self) -> NodeKind;

    fn execute<'a>(
        &'a self,
        node: &'a WorkflowNode,
        inputs: &'a NodeInputs<'a>,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<ExecutionResult>>;
}

/// Registry of node handlers, one per node type.
pub struct HandlerRegistry {
    handlers: HashMap<NodeKind, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous one for the same type.
    pub fn register(&mut self, handler: impl NodeHandler) {
        self.handlers.insert(handler.kind(), Arc::new(handler));
    }

    pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<NodeKind> {
        self.handlers.keys().copied().collect()
    }

    /// Create a registry with a handler for every node type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ProjectCreateHandler);
        registry.register(ContractInputHandler);
        registry.register(CompileHandler);
        registry.register(GenerateAbiHandler);
        registry.register(GenerateBytecodeHandler);
        registry.register(DeployHandler);
        registry.register(AiAuditHandler);
        registry.register(CompletionHandler);
        registry
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_kind() {
        let registry = HandlerRegistry::with_defaults();
        for kind in NodeKind::ALL {
            let handler = registry.get(kind).expect("handler registered");
            assert_eq!(handler.kind(), kind);
        }
        assert_eq!(registry.kinds().len(), NodeKind::ALL.len());
    }

    #[test]
    fn test_empty_registry() {
        let registry = HandlerRegistry::new();
        assert!(registry.get(NodeKind::Deploy).is_none());
    }
}
