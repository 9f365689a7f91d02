use std::collections::HashMap;

use serde_json::{Map, Value};

use moveflow_core::types::NodeKind;

struct StoredOutput {
    node_id: String,
    kind: NodeKind,
    data: Value,
}

/// Outputs of nodes that succeeded in the current run, in completion order.
///
/// Owned by one executor and cleared at the start of every run.
#[derive(Default)]
pub struct ExecutionStore {
    entries: Vec<StoredOutput>,
    index: HashMap<String, usize>,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Record a node's output. Re-recording a node replaces its data in place.
    pub fn record(&mut self, node_id: &str, kind: NodeKind, data: Value) {
        match self.index.get(node_id) {
            Some(&i) => self.entries[i].data = data,
            None => {
                self.index.insert(node_id.to_string(), self.entries.len());
                self.entries.push(StoredOutput {
                    node_id: node_id.to_string(),
                    kind,
                    data,
                });
            }
        }
    }

    pub fn get(&self, node_id: &str) -> Option<&Value> {
        self.index.get(node_id).map(|&i| &self.entries[i].data)
    }

    pub fn kind_of(&self, node_id: &str) -> Option<NodeKind> {
        self.index.get(node_id).map(|&i| self.entries[i].kind)
    }

    /// Output of the most recently completed node of `kind`.
    pub fn latest_of_kind(&self, kind: NodeKind) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.kind == kind)
            .map(|e| &e.data)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain `node id -> output` mapping.
    pub fn to_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|e| (e.node_id.clone(), e.data.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_of_kind_prefers_most_recent() {
        let mut store = ExecutionStore::new();
        store.record("c1", NodeKind::ContractInput, json!({"name": "First"}));
        store.record("p", NodeKind::ProjectCreate, json!({"title": "Demo"}));
        store.record("c2", NodeKind::ContractInput, json!({"name": "Second"}));

        let latest = store.latest_of_kind(NodeKind::ContractInput).unwrap();
        assert_eq!(latest["name"], "Second");
        assert!(store.latest_of_kind(NodeKind::Deploy).is_none());
    }

    #[test]
    fn test_record_replaces_existing_entry() {
        let mut store = ExecutionStore::new();
        store.record("n", NodeKind::Compile, json!({"bytecode": "0x01"}));
        store.record("n", NodeKind::Compile, json!({"bytecode": "0x02"}));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("n").unwrap()["bytecode"], "0x02");
        assert_eq!(store.kind_of("n"), Some(NodeKind::Compile));
    }

    #[test]
    fn test_clear_and_to_map() {
        let mut store = ExecutionStore::new();
        store.record("a", NodeKind::Completion, json!(1));
        store.record("b", NodeKind::Completion, json!(2));

        let map = store.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["b"], json!(2));

        store.clear();
        assert!(store.is_empty());
        assert!(store.get("a").is_none());
    }
}
