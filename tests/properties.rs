//! Property tests for graph invariants, the synchronizer and the layout.

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use stage_graph_kernel::graph::validate::search_path;
use stage_graph_kernel::{
    induced_edges, Graph, GraphKind, LayoutConfig, NodeId, NodePayload, Trigger,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Connect(usize, usize),
    Disconnect(usize, usize),
    SetTrigger(usize, Option<u32>),
    Destroy(usize),
}

fn op_strategy(n: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..n, 0..n).prop_map(|(a, b)| Op::Connect(a, b)),
        2 => (0..n, 0..n).prop_map(|(a, b)| Op::Disconnect(a, b)),
        2 => (0..n, proptest::option::of(0..100u32)).prop_map(|(a, t)| Op::SetTrigger(a, t)),
        1 => (0..n).prop_map(Op::Destroy),
    ]
}

fn trigger(offset: Option<u32>) -> Trigger {
    match offset {
        Some(seconds) => Trigger::delta_seconds(seconds),
        None => Trigger::http_listener(),
    }
}

fn stage_graph(triggers: &[Option<u32>]) -> (Graph, Vec<NodeId>) {
    let mut graph = Graph::new(GraphKind::Stage);
    let ids = triggers
        .iter()
        .enumerate()
        .map(|(i, &t)| graph.add_node(format!("s{i}"), NodePayload::stage(trigger(t))).unwrap())
        .collect();
    (graph, ids)
}

/// Apply an operation, ignoring rejections.
fn apply(graph: &mut Graph, ids: &[NodeId], op: &Op) {
    match *op {
        Op::Connect(a, b) => {
            let _ = graph.connect(ids[a], ids[b]);
        }
        Op::Disconnect(a, b) => {
            if let Some(edge) = graph.edge_between(ids[a], ids[b]) {
                graph.destroy_edge(edge).unwrap();
            }
        }
        Op::SetTrigger(a, t) => {
            let _ = graph.set_trigger(ids[a], trigger(t));
        }
        Op::Destroy(a) => {
            let _ = graph.destroy_node(ids[a]);
        }
    }
}

fn assert_acyclic(graph: &Graph) {
    for (_, edge) in graph.edges() {
        assert!(
            !graph.reaches(edge.child, edge.parent),
            "cycle through {} -> {}",
            edge.parent,
            edge.child
        );
    }
}

/// Delta stages reachable from `delta` along paths whose interior stages
/// are all listeners, computed forward from the ancestor's side.
fn forward_reach(graph: &Graph, delta: NodeId) -> BTreeSet<NodeId> {
    let mut found = BTreeSet::new();
    let mut seen = HashSet::from([delta]);
    let mut stack = graph.children(delta);
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        if graph.is_delta(node) {
            found.insert(node);
        } else {
            stack.extend(graph.children(node));
        }
    }
    found
}

fn random_dag(n: usize, links: &[(usize, usize)]) -> (Graph, Vec<NodeId>) {
    let mut graph = Graph::new(GraphKind::Step);
    let ids: Vec<NodeId> = (0..n)
        .map(|i| graph.add_node(format!("n{i}"), NodePayload::step("m")).unwrap())
        .collect();
    for &(a, b) in links {
        let (a, b) = (a % n, b % n);
        if a != b {
            let _ = graph.connect(ids[a.min(b)], ids[a.max(b)]);
        }
    }
    (graph, ids)
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_step_graph_stays_acyclic(
        node_count in 1..12usize,
        edges in proptest::collection::vec((0..12usize, 0..12usize), 0..60)
    ) {
        let mut graph = Graph::new(GraphKind::Step);
        let ids: Vec<NodeId> = (0..node_count)
            .map(|i| graph.add_node(format!("n{i}"), NodePayload::step("m")).unwrap())
            .collect();
        for (a, b) in edges {
            if a < node_count && b < node_count {
                let _ = graph.connect(ids[a], ids[b]);
            }
        }
        assert_acyclic(&graph);
        prop_assert_eq!(graph.errors().is_empty(), graph.is_valid());
    }

    #[test]
    fn prop_timeline_matches_full_recomputation(
        triggers in proptest::collection::vec(proptest::option::of(0..100u32), 2..9),
        ops in proptest::collection::vec(op_strategy(9), 0..40)
    ) {
        let (mut graph, ids) = stage_graph(&triggers);
        for op in ops.iter().filter(|op| match **op {
            Op::Connect(a, b) | Op::Disconnect(a, b) => a < ids.len() && b < ids.len(),
            Op::SetTrigger(a, _) | Op::Destroy(a) => a < ids.len(),
        }) {
            apply(&mut graph, &ids, op);
            prop_assert!(graph.timeline_is_consistent(), "drift after {:?}", op);
            prop_assert_eq!(graph.timeline().unwrap().edges(), &induced_edges(&graph));
            prop_assert_eq!(graph.errors().is_empty(), graph.is_valid());
        }
        assert_acyclic(&graph);
    }

    #[test]
    fn prop_nearest_delta_ancestors_are_exact(
        triggers in proptest::collection::vec(proptest::option::of(0..100u32), 2..10),
        links in proptest::collection::vec((0..10usize, 0..10usize), 0..30)
    ) {
        let (mut graph, ids) = stage_graph(&triggers);
        for (a, b) in links {
            if a < ids.len() && b < ids.len() {
                let _ = graph.connect(ids[a], ids[b]);
            }
        }

        for &n in ids.iter().filter(|&&n| graph.is_delta(n)) {
            let expected: BTreeSet<NodeId> = ids
                .iter()
                .copied()
                .filter(|&d| d != n && graph.is_delta(d) && forward_reach(&graph, d).contains(&n))
                .collect();
            prop_assert_eq!(graph.nearest_delta_ancestors(n), expected);
        }
    }

    #[test]
    fn prop_trees_never_overlap(
        n in 2..16usize,
        links in proptest::collection::vec((0..16usize, 0..16usize), 0..20)
    ) {
        let (mut graph, ids) = random_dag(n, &links);
        let config = LayoutConfig::compact();
        let result = graph.layout_structure(&config);

        for (i, a) in result.trees.iter().enumerate() {
            for b in &result.trees[i + 1..] {
                prop_assert!(!a.bounds.intersects(&b.bounds), "trees {} and {} overlap", a.root, b.root);
            }
        }
        for (i, &a) in ids.iter().enumerate() {
            let box_a = result.node_box(a, &config).unwrap();
            for &b in &ids[i + 1..] {
                let box_b = result.node_box(b, &config).unwrap();
                prop_assert!(!box_a.intersects(&box_b), "nodes {} and {} overlap", a, b);
            }
        }
        prop_assert_eq!(result.positions.len(), graph.len());
    }

    #[test]
    fn prop_timeline_trees_never_overlap(
        triggers in proptest::collection::vec(proptest::option::of(0..120u32), 2..12),
        links in proptest::collection::vec((0..12usize, 0..12usize), 0..20)
    ) {
        let (mut graph, ids) = stage_graph(&triggers);
        for (a, b) in links {
            if a < ids.len() && b < ids.len() {
                let _ = graph.connect(ids[a], ids[b]);
            }
        }

        let result = graph.layout_timeline(&LayoutConfig::timeline()).unwrap();
        for (i, a) in result.trees.iter().enumerate() {
            for b in &result.trees[i + 1..] {
                prop_assert!(!a.bounds.intersects(&b.bounds), "trees {} and {} overlap", a.root, b.root);
            }
        }
        let deltas = ids.iter().filter(|&&n| graph.is_delta(n)).count();
        prop_assert_eq!(result.positions.len(), deltas);
    }

    #[test]
    fn prop_cycle_search_is_visit_bounded(
        n in 2..20usize,
        links in proptest::collection::vec((0..20usize, 0..20usize), 0..80),
        from in 0..20usize,
        to in 0..20usize
    ) {
        let (graph, ids) = random_dag(n, &links);
        let search = search_path(&graph, ids[from % n], ids[to % n]);
        prop_assert!(search.visited <= graph.len());
        prop_assert_eq!(search.found, graph.reaches(ids[from % n], ids[to % n]));
    }
}
