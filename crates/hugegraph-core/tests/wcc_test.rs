//! Weakly connected components over loaded graphs

use hugegraph_core::algorithms::{ComponentIds, DisjointSetStruct, Wcc, WccConfig, compute_components};
use hugegraph_core::generator::RandomGraphGenerator;
use hugegraph_core::graph::Graph;
use hugegraph_core::loader::{InMemorySource, LoadConfig, load_graph};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};

fn groups(components: &ComponentIds) -> HashMap<u64, HashSet<u64>> {
    let mut groups: HashMap<u64, HashSet<u64>> = HashMap::new();
    for (node, id) in components.iter() {
        groups.entry(id).or_default().insert(node);
    }
    groups
}

/// Component label per node from an undirected BFS
fn reference_components(node_count: u64, edges: &[(u64, u64)]) -> Vec<u64> {
    let mut neighbours = vec![Vec::new(); node_count as usize];
    for &(a, b) in edges {
        neighbours[a as usize].push(b);
        neighbours[b as usize].push(a);
    }

    let mut label = vec![u64::MAX; node_count as usize];
    for start in 0..node_count {
        if label[start as usize] != u64::MAX {
            continue;
        }
        label[start as usize] = start;
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &next in &neighbours[node as usize] {
                if label[next as usize] == u64::MAX {
                    label[next as usize] = start;
                    queue.push_back(next);
                }
            }
        }
    }
    label
}

fn source_from_edges(node_count: u64, edges: &[(u64, u64)]) -> InMemorySource {
    let mut source = InMemorySource::new(node_count);
    for &(a, b) in edges {
        source.add_relationship(a, b);
    }
    source
}

#[test]
fn test_three_components_scenario() {
    // 0..6 connected along a path in mixed directions, 7-8, 9 isolated
    let edges = [(0, 1), (2, 1), (2, 3), (4, 3), (4, 5), (6, 5), (8, 7)];
    let graph = load_graph(&source_from_edges(10, &edges), LoadConfig::default()).unwrap();

    let components = compute_components(&graph, 4).unwrap();
    assert_eq!(components.component_count(), 3);

    let groups = groups(&components);
    assert_eq!(groups[&0], (0..=6).collect::<HashSet<_>>());
    assert_eq!(groups[&7], HashSet::from([7, 8]));
    assert_eq!(groups[&9], HashSet::from([9]));
}

#[test]
fn test_direction_is_ignored() {
    let forward = load_graph(&source_from_edges(4, &[(0, 1), (1, 2), (2, 3)]), LoadConfig::default()).unwrap();
    let backward = load_graph(&source_from_edges(4, &[(1, 0), (2, 1), (3, 2)]), LoadConfig::default()).unwrap();

    let a: Vec<_> = compute_components(&forward, 2).unwrap().iter().collect();
    let b: Vec<_> = compute_components(&backward, 2).unwrap().iter().collect();
    assert_eq!(a, b);
    assert!(a.iter().all(|&(_, id)| id == 0));
}

#[test]
fn test_concurrency_does_not_change_components() {
    let source = RandomGraphGenerator::new(5_000, 1).with_seed(99).generate().unwrap();
    let graph = load_graph(&source, LoadConfig::default().with_batch_size(256)).unwrap();

    let single: Vec<_> = compute_components(&graph, 1).unwrap().iter().collect();
    for concurrency in [2, 4, 8] {
        let parallel: Vec<_> = compute_components(&graph, concurrency).unwrap().iter().collect();
        assert_eq!(single, parallel, "concurrency {}", concurrency);
    }
}

#[test]
fn test_consecutive_ids_cover_range() {
    let source = RandomGraphGenerator::new(1_000, 1).with_seed(3).generate().unwrap();
    let graph = load_graph(&source, LoadConfig::default()).unwrap();

    let result = Wcc::new(&graph, WccConfig::default().with_consecutive_ids(true))
        .unwrap()
        .compute()
        .unwrap();
    let count = result.components.component_count() as u64;
    assert!(result.components.iter().all(|(_, id)| id < count));
    assert_eq!(result.stats().component_count, count);
}

#[test]
fn test_set_ids_are_stable_after_quiescence() {
    let dss = DisjointSetStruct::new(100).unwrap();
    for node in (10..100).step_by(3) {
        dss.union(node, node - 7).unwrap();
    }
    let first: Vec<_> = (0..100).map(|n| dss.set_id_of(n).unwrap()).collect();
    for _ in 0..3 {
        let again: Vec<_> = (0..100).map(|n| dss.set_id_of(n).unwrap()).collect();
        assert_eq!(first, again);
    }
}

proptest! {
    #[test]
    fn prop_components_match_bfs(
        node_count in 1u64..60,
        raw_edges in prop::collection::vec((0u64..1_000, 0u64..1_000), 0..120),
        concurrency in 1usize..6,
    ) {
        let edges: Vec<(u64, u64)> = raw_edges
            .into_iter()
            .map(|(a, b)| (a % node_count, b % node_count))
            .collect();
        let graph = load_graph(
            &source_from_edges(node_count, &edges),
            LoadConfig::default().with_batch_size(7),
        )
        .unwrap();
        prop_assert_eq!(graph.relationship_count(), edges.len() as u64);

        let components = compute_components(&graph, concurrency).unwrap();
        let expected = reference_components(node_count, &edges);
        for a in 0..node_count {
            // BFS labels by smallest start, which is the component minimum
            prop_assert_eq!(components.component_id(a).unwrap(), expected[a as usize]);
        }
    }
}
