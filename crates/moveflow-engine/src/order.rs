//! Execution order: Kahn's topological sort over the workflow graph.

use std::collections::{HashMap, HashSet, VecDeque};

use moveflow_core::error::{MoveflowError, Result};
use moveflow_core::types::{WorkflowEdge, WorkflowNode};

/// Build a linear schedule in which every edge's source precedes its target.
///
/// Ties are broken by discovery order: roots in the order the nodes were
/// supplied, then successors in edge order as their in-degree reaches zero.
/// Dangling edges, duplicate ids and cycles are rejected.
pub fn build_order(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> Result<Vec<String>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::with_capacity(nodes.len());

    for node in nodes {
        if in_degree.insert(node.id.as_str(), 0).is_some() {
            return Err(MoveflowError::DuplicateNode(node.id.clone()));
        }
        successors.insert(node.id.as_str(), Vec::new());
    }

    for edge in edges {
        for end in [&edge.source, &edge.target] {
            if !in_degree.contains_key(end.as_str()) {
                return Err(MoveflowError::UnknownNode {
                    node_id: end.clone(),
                });
            }
        }
        if let Some(next) = successors.get_mut(edge.source.as_str()) {
            next.push(edge.target.as_str());
        }
        if let Some(deg) = in_degree.get_mut(edge.target.as_str()) {
            *deg += 1;
        }
    }

    let mut queue: VecDeque<&str> = nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.to_string());
        for &next in successors.get(id).map(Vec::as_slice).unwrap_or_default() {
            if let Some(deg) = in_degree.get_mut(next) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    if order.len() < nodes.len() {
        let scheduled: HashSet<&str> = order.iter().map(String::as_str).collect();
        let stuck = nodes
            .iter()
            .filter(|n| !scheduled.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect();
        return Err(MoveflowError::CycleDetected { nodes: stuck });
    }

    Ok(order)
}

/// Nodes upstream of `node_id`, nearest first.
///
/// Walks incoming edges breadth-first: direct predecessors (in edge order),
/// then their predecessors, and so on. Each node appears once.
pub fn upstream_of(node_id: &str, edges: &[WorkflowEdge]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut out = Vec::new();

    seen.insert(node_id);
    queue.push_back(node_id);

    while let Some(current) = queue.pop_front() {
        for edge in edges.iter().filter(|e| e.target == current) {
            if seen.insert(edge.source.as_str()) {
                out.push(edge.source.clone());
                queue.push_back(edge.source.as_str());
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use moveflow_core::types::NodeKind;

    fn nodes(ids: &[&str]) -> Vec<WorkflowNode> {
        ids.iter()
            .map(|id| WorkflowNode::new(*id, NodeKind::Completion))
            .collect()
    }

    fn edges(pairs: &[(&str, &str)]) -> Vec<WorkflowEdge> {
        pairs.iter().map(|(s, t)| WorkflowEdge::new(*s, *t)).collect()
    }

    fn assert_respects_edges(order: &[String], edges: &[WorkflowEdge]) {
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
        for e in edges {
            assert!(
                pos(&e.source) < pos(&e.target),
                "{} should precede {}",
                e.source,
                e.target
            );
        }
    }

    #[test]
    fn test_linear_chain() {
        let n = nodes(&["c", "b", "a"]);
        let e = edges(&[("a", "b"), ("b", "c")]);
        let order = build_order(&n, &e).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_no_edges_keeps_supplied_order() {
        let n = nodes(&["z", "m", "a"]);
        let order = build_order(&n, &[]).unwrap();
        assert_eq!(order, vec!["z", "m", "a"]);
    }

    #[test]
    fn test_multi_root_discovery_order() {
        // Two independent roots; successors queue behind the second root.
        let n = nodes(&["r1", "r2", "x", "y"]);
        let e = edges(&[("r1", "y"), ("r2", "x")]);
        let order = build_order(&n, &e).unwrap();
        assert_eq!(order, vec!["r1", "r2", "y", "x"]);
    }

    #[test]
    fn test_fan_out_follows_edge_order() {
        let n = nodes(&["compile", "abi", "bytecode"]);
        let e = edges(&[("compile", "bytecode"), ("compile", "abi")]);
        let order = build_order(&n, &e).unwrap();
        assert_eq!(order, vec!["compile", "bytecode", "abi"]);
    }

    #[test]
    fn test_diamond_respects_all_edges() {
        let n = nodes(&["d", "c", "b", "a"]);
        let e = edges(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let order = build_order(&n, &e).unwrap();
        assert_eq!(order.len(), 4);
        assert_respects_edges(&order, &e);
    }

    /// Random DAG over `n` nodes: edges only run from lower to higher rank,
    /// and nodes are supplied in a scrambled order.
    fn generated_dag(n: usize, seed: u64) -> (Vec<WorkflowNode>, Vec<WorkflowEdge>) {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            state >> 33
        };

        let ids: Vec<String> = (0..n).map(|i| format!("n{}", i)).collect();
        let mut e = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if next() % 3 == 0 {
                    e.push(WorkflowEdge::new(ids[i].as_str(), ids[j].as_str()));
                }
            }
        }

        let mut supplied: Vec<&str> = ids.iter().map(String::as_str).collect();
        for i in (1..supplied.len()).rev() {
            let j = (next() as usize) % (i + 1);
            supplied.swap(i, j);
        }
        (nodes(&supplied), e)
    }

    #[test]
    fn test_generated_dags_respect_every_edge() {
        for seed in 1..=25u64 {
            let size = 2 + (seed as usize % 12);
            let (n, e) = generated_dag(size, seed);
            let order = build_order(&n, &e).unwrap();
            assert_eq!(order.len(), n.len(), "seed {}", seed);
            assert_respects_edges(&order, &e);
            assert_eq!(order, build_order(&n, &e).unwrap(), "seed {}", seed);
        }
    }

    #[test]
    fn test_cycle_detected() {
        let n = nodes(&["root", "a", "b"]);
        let e = edges(&[("root", "a"), ("a", "b"), ("b", "a")]);
        match build_order(&n, &e) {
            Err(MoveflowError::CycleDetected { nodes }) => {
                assert_eq!(nodes, vec!["a", "b"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let n = nodes(&["a"]);
        let e = edges(&[("a", "a")]);
        assert!(matches!(
            build_order(&n, &e),
            Err(MoveflowError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let n = nodes(&["a"]);
        let e = edges(&[("a", "ghost")]);
        match build_order(&n, &e) {
            Err(MoveflowError::UnknownNode { node_id }) => assert_eq!(node_id, "ghost"),
            other => panic!("expected unknown node, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let n = nodes(&["a", "a"]);
        assert!(matches!(
            build_order(&n, &[]),
            Err(MoveflowError::DuplicateNode(id)) if id == "a"
        ));
    }

    #[test]
    fn test_empty_graph_is_empty_order() {
        assert!(build_order(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_upstream_nearest_first() {
        let e = edges(&[
            ("input", "compile"),
            ("compile", "bytecode"),
            ("bytecode", "deploy"),
            ("project", "input"),
        ]);
        assert_eq!(
            upstream_of("deploy", &e),
            vec!["bytecode", "compile", "input", "project"]
        );
        assert!(upstream_of("project", &e).is_empty());
    }

    #[test]
    fn test_upstream_visits_shared_ancestor_once() {
        let e = edges(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert_eq!(upstream_of("d", &e), vec!["b", "c", "a"]);
    }
}
