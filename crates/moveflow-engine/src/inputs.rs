use serde_json::Value;

use moveflow_core::config::InputResolution;
use moveflow_core::types::NodeKind;

use crate::store::ExecutionStore;

/// Read access to the outputs a handler may consume.
pub struct NodeInputs<'a> {
    store: &'a ExecutionStore,
    upstream: Vec<String>,
    resolution: InputResolution,
}

impl<'a> NodeInputs<'a> {
    /// `upstream` lists the node's ancestors, nearest first.
    pub fn new(store: &'a ExecutionStore, upstream: Vec<String>, resolution: InputResolution) -> Self {
        Self {
            store,
            upstream,
            resolution,
        }
    }

    /// Output of the node of `kind` this node depends on, if one succeeded.
    pub fn output_of(&self, kind: NodeKind) -> Option<&'a Value> {
        match self.resolution {
            InputResolution::Upstream => self
                .upstream
                .iter()
                .find(|id| self.store.kind_of(id) == Some(kind))
                .and_then(|id| self.store.get(id)),
            InputResolution::ByKind => self.store.latest_of_kind(kind),
        }
    }

    /// A string field of the output of `kind`.
    pub fn str_of(&self, kind: NodeKind, field: &str) -> Option<&'a str> {
        self.output_of(kind)
            .and_then(|v| v.get(field))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Everything recorded so far in this run.
    pub fn store(&self) -> &'a ExecutionStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> ExecutionStore {
        let mut store = ExecutionStore::new();
        store.record("wired", NodeKind::ContractInput, json!({"name": "Wired"}));
        store.record("stray", NodeKind::ContractInput, json!({"name": "Stray"}));
        store
    }

    #[test]
    fn test_upstream_ignores_unwired_nodes() {
        let store = store();
        let inputs = NodeInputs::new(&store, vec!["wired".into()], InputResolution::Upstream);
        assert_eq!(inputs.str_of(NodeKind::ContractInput, "name"), Some("Wired"));
    }

    #[test]
    fn test_upstream_without_wiring_finds_nothing() {
        let store = store();
        let inputs = NodeInputs::new(&store, vec![], InputResolution::Upstream);
        assert!(inputs.output_of(NodeKind::ContractInput).is_none());
    }

    #[test]
    fn test_by_kind_takes_latest() {
        let store = store();
        let inputs = NodeInputs::new(&store, vec!["wired".into()], InputResolution::ByKind);
        assert_eq!(inputs.str_of(NodeKind::ContractInput, "name"), Some("Stray"));
    }

    #[test]
    fn test_upstream_skips_ancestors_without_output() {
        let store = store();
        let inputs = NodeInputs::new(
            &store,
            vec!["failed-earlier".into(), "stray".into()],
            InputResolution::Upstream,
        );
        assert_eq!(inputs.str_of(NodeKind::ContractInput, "name"), Some("Stray"));
    }
}
