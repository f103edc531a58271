// src/core/analyzers/dependencies/graph.rs
//! File-level dependency graph and circular dependency classification.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::core::analyzers::Severity;
use crate::core::view::{normalize_path, RepoMapView};

/// Upper bound on reported cycles; dense components have exponentially many
pub const MAX_CYCLES: usize = 50;

/// Path fragments mapped to coarse layers, first match wins
const LAYER_RULES: &[(&str, &str)] = &[
    ("ui/", "ui"),
    ("renderer/", "ui"),
    ("components/", "ui"),
    ("orchestration/", "orchestration"),
    ("planning/", "planning"),
    ("execution/", "execution"),
    ("llm/", "llm"),
    ("persistence/", "persistence"),
    ("database/", "persistence"),
    ("infrastructure/", "infrastructure"),
    ("adapters/", "infrastructure"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularDependencyDoc {
    /// Files in cycle order; the last one imports the first
    pub files: Vec<String>,
    pub layers: Vec<String>,
    pub severity: Severity,
    pub suggestion: String,
}

/// Directed graph of internal files
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    adjacency: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Internal edges only, deduplicated by (from, to), self-imports dropped
    pub fn from_view(view: &RepoMapView) -> Self {
        let mut graph = Self::default();
        let mut known: HashSet<String> = HashSet::new();
        let mut seen_edges: HashSet<(String, String)> = HashSet::new();

        for path in view.file_paths() {
            if known.insert(path.clone()) {
                graph.nodes.push(path);
            }
        }

        for edge in view.dependencies() {
            let from = normalize_path(&edge.from);
            let to = normalize_path(&edge.to);
            if from == to || !known.contains(&from) || !known.contains(&to) {
                continue;
            }
            if seen_edges.insert((from.clone(), to.clone())) {
                graph.adjacency.entry(from).or_default().push(to);
            }
        }

        graph
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn adjacency(&self) -> &HashMap<String, Vec<String>> {
        &self.adjacency
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    pub fn cycles(&self) -> Vec<Vec<String>> {
        find_elementary_cycles(&self.nodes, &self.adjacency, MAX_CYCLES)
    }
}

/// Enumerate elementary cycles of length >= 2.
///
/// Each cycle is reported once, rotated to start at its lowest-index node.
/// Only non-trivial strongly connected components are searched, with
/// Johnson's blocked-set circuit walk per start node.
pub fn find_elementary_cycles<N>(
    nodes: &[N],
    adjacency: &HashMap<N, Vec<N>>,
    limit: usize,
) -> Vec<Vec<N>>
where
    N: Clone + Eq + Hash,
{
    let index: HashMap<&N, usize> = nodes.iter().enumerate().map(|(i, n)| (n, i)).collect();
    let successors: Vec<Vec<usize>> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let mut out: Vec<usize> = Vec::new();
            for next in adjacency.get(node).into_iter().flatten() {
                if let Some(&j) = index.get(next) {
                    if j != i && !out.contains(&j) {
                        out.push(j);
                    }
                }
            }
            out
        })
        .collect();

    let all: Vec<usize> = (0..nodes.len()).collect();
    let mut component_of: Vec<Option<usize>> = vec![None; nodes.len()];
    let components: Vec<Vec<usize>> = strongly_connected(&all, &successors)
        .into_iter()
        .filter(|c| c.len() >= 2)
        .collect();
    for (c, members) in components.iter().enumerate() {
        for &v in members {
            component_of[v] = Some(c);
        }
    }

    let mut search = CircuitSearch::new(&successors, limit);
    for start in 0..nodes.len() {
        if search.cycles.len() >= limit {
            break;
        }
        let Some(c) = component_of[start] else {
            continue;
        };
        let mut candidates: Vec<usize> = components[c].iter().copied().filter(|&v| v >= start).collect();
        candidates.sort_unstable();

        let Some(members) = strongly_connected(&candidates, &successors)
            .into_iter()
            .find(|scc| scc.contains(&start))
        else {
            continue;
        };
        if members.len() < 2 {
            continue;
        }
        search.run(start, &members);
    }

    search
        .cycles
        .into_iter()
        .map(|cycle| cycle.into_iter().map(|i| nodes[i].clone()).collect())
        .collect()
}

/// Strongly connected components of the subgraph induced by `members`
fn strongly_connected(members: &[usize], successors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(members.len(), 0);
    let local: HashMap<usize, NodeIndex> = members.iter().map(|&v| (v, graph.add_node(v))).collect();

    for &v in members {
        let Some(&from) = local.get(&v) else {
            continue;
        };
        for next in &successors[v] {
            if let Some(&to) = local.get(next) {
                graph.add_edge(from, to, ());
            }
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .map(|scc| scc.into_iter().map(|n| graph[n]).collect())
        .collect()
}

/// Johnson's circuit enumeration state, reused across start nodes
struct CircuitSearch<'a> {
    successors: &'a [Vec<usize>],
    allowed: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<HashSet<usize>>,
    stack: Vec<usize>,
    cycles: Vec<Vec<usize>>,
    limit: usize,
}

impl<'a> CircuitSearch<'a> {
    fn new(successors: &'a [Vec<usize>], limit: usize) -> Self {
        let n = successors.len();
        Self {
            successors,
            allowed: vec![false; n],
            blocked: vec![false; n],
            blocked_by: vec![HashSet::new(); n],
            stack: Vec::new(),
            cycles: Vec::new(),
            limit,
        }
    }

    fn run(&mut self, start: usize, members: &[usize]) {
        for &v in members {
            self.allowed[v] = true;
            self.blocked[v] = false;
            self.blocked_by[v].clear();
        }
        self.circuit(start, start);
        for &v in members {
            self.allowed[v] = false;
        }
    }

    fn circuit(&mut self, v: usize, start: usize) -> bool {
        let successors = self.successors;
        let mut closed = false;
        self.stack.push(v);
        self.blocked[v] = true;

        for &w in &successors[v] {
            if self.cycles.len() >= self.limit {
                break;
            }
            if !self.allowed[w] {
                continue;
            }
            if w == start {
                self.cycles.push(self.stack.clone());
                closed = true;
            } else if !self.blocked[w] && self.circuit(w, start) {
                closed = true;
            }
        }

        if closed {
            self.unblock(v);
        } else {
            for &w in &successors[v] {
                if self.allowed[w] {
                    self.blocked_by[w].insert(v);
                }
            }
        }
        self.stack.pop();
        closed
    }

    fn unblock(&mut self, v: usize) {
        let mut pending = vec![v];
        while let Some(u) = pending.pop() {
            if !self.blocked[u] {
                continue;
            }
            self.blocked[u] = false;
            pending.extend(self.blocked_by[u].drain());
        }
    }
}

pub fn layer_of(path: &str) -> Option<&'static str> {
    LAYER_RULES
        .iter()
        .find(|(fragment, _)| path.contains(fragment))
        .map(|(_, layer)| *layer)
}

/// Distinct layers in first-appearance order, layer-agnostic files skipped
pub fn cycle_layers(files: &[String]) -> Vec<String> {
    let mut layers: Vec<String> = Vec::new();
    for layer in files.iter().filter_map(|f| layer_of(f)) {
        if !layers.iter().any(|l| l == layer) {
            layers.push(layer.to_string());
        }
    }
    layers
}

pub fn severity_for(layer_count: usize) -> Severity {
    match layer_count {
        0 | 1 => Severity::Low,
        2 => Severity::Medium,
        _ => Severity::High,
    }
}

pub fn suggestion_for(files: &[String], layers: &[String]) -> String {
    if files.len() == 2 {
        format!(
            "Extract the shared code into a new module used by both {} and {}",
            files[0], files[1]
        )
    } else if layers.len() <= 1 {
        "Use dependency injection or event-based decoupling to break the cycle".to_string()
    } else {
        format!(
            "Introduce an abstraction layer between the {} layers and apply dependency inversion",
            layers.join(", ")
        )
    }
}

pub fn classify_cycle(files: Vec<String>) -> CircularDependencyDoc {
    let layers = cycle_layers(&files);
    CircularDependencyDoc {
        severity: severity_for(layers.len()),
        suggestion: suggestion_for(&files, &layers),
        files,
        layers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerOptions;
    use crate::core::fixtures::{edge, file, map};
    use std::time::{Duration, Instant};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_elementary_cycles_reported_once() {
        let nodes = vec!["a", "b", "c", "d"];
        let adjacency = HashMap::from([
            ("a", vec!["b"]),
            ("b", vec!["a", "c"]),
            ("c", vec!["a"]),
            ("d", vec!["d"]),
        ]);

        let cycles = find_elementary_cycles(&nodes, &adjacency, 10);
        assert_eq!(cycles, vec![vec!["a", "b"], vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_cycle_limit() {
        let nodes = vec![1, 2, 3];
        let adjacency = HashMap::from([(1, vec![2, 3]), (2, vec![1, 3]), (3, vec![1, 2])]);
        assert_eq!(find_elementary_cycles(&nodes, &adjacency, 2).len(), 2);
    }

    /// Node i imports i+1..=i+3: acyclic, but with exponentially many paths
    fn layered_chain(n: usize) -> (Vec<usize>, HashMap<usize, Vec<usize>>) {
        let nodes: Vec<usize> = (0..n).collect();
        let adjacency: HashMap<usize, Vec<usize>> = nodes
            .iter()
            .map(|&i| (i, (i + 1..=i + 3).filter(|&j| j < n).collect::<Vec<_>>()))
            .collect();
        (nodes, adjacency)
    }

    #[test]
    fn test_dense_acyclic_graph_finishes_without_cycles() {
        let (nodes, adjacency) = layered_chain(80);

        let started = Instant::now();
        let cycles = find_elementary_cycles(&nodes, &adjacency, MAX_CYCLES);
        assert!(cycles.is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_back_edge_over_dense_graph_hits_limit() {
        let (nodes, mut adjacency) = layered_chain(80);
        adjacency.entry(79).or_default().push(0);

        let started = Instant::now();
        let cycles = find_elementary_cycles(&nodes, &adjacency, MAX_CYCLES);
        assert_eq!(cycles.len(), MAX_CYCLES);
        assert!(cycles.iter().all(|c| c[0] == 0 && c.last() == Some(&79)));
        assert!(started.elapsed() < Duration::from_secs(5));

        let unique: HashSet<&Vec<usize>> = cycles.iter().collect();
        assert_eq!(unique.len(), cycles.len());
    }

    #[test]
    fn test_cycles_ordered_by_lowest_node_across_components() {
        let nodes = vec![0, 1, 2, 3, 4, 5];
        let adjacency = HashMap::from([
            (0, vec![1]),
            (1, vec![0, 2]),
            (2, vec![3]),
            (3, vec![4]),
            (4, vec![3, 5]),
        ]);

        let cycles = find_elementary_cycles(&nodes, &adjacency, 10);
        assert_eq!(cycles, vec![vec![0, 1], vec![3, 4]]);
    }

    #[test]
    fn test_nested_cycles_in_one_component() {
        let nodes = vec!["a", "b", "c"];
        let adjacency = HashMap::from([("a", vec!["b"]), ("b", vec!["c"]), ("c", vec!["a", "b"])]);

        let cycles = find_elementary_cycles(&nodes, &adjacency, 10);
        assert_eq!(cycles, vec![vec!["a", "b", "c"], vec!["b", "c"]]);
    }

    #[test]
    fn test_graph_dedupes_and_skips_external() {
        let repo = map(
            vec![file("a.ts"), file("b.ts")],
            vec![],
            vec![edge("a.ts", "b.ts"), edge("./a.ts", "b.ts"), edge("a.ts", "react"), edge("a.ts", "a.ts")],
        );
        let options = AnalyzerOptions::default();
        let graph = DependencyGraph::from_view(&RepoMapView::new(&repo, &options));

        assert_eq!(graph.edge_count(), 1);
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_two_file_cycle_within_one_layer_is_low() {
        let doc = classify_cycle(strings(&["src/ui/a.tsx", "src/ui/b.tsx"]));
        assert_eq!(doc.severity, Severity::Low);
        assert!(doc.suggestion.starts_with("Extract the shared code"));
    }

    #[test]
    fn test_two_layer_cycle_is_medium() {
        let doc = classify_cycle(strings(&["src/ui/a.tsx", "src/ui/b.tsx", "src/persistence/c.ts"]));
        assert_eq!(doc.layers, strings(&["ui", "persistence"]));
        assert_eq!(doc.severity, Severity::Medium);
        assert!(doc.suggestion.contains("dependency inversion"));
    }

    #[test]
    fn test_three_layer_cycle_is_high() {
        let doc = classify_cycle(strings(&[
            "src/ui/a.tsx",
            "src/orchestration/b.ts",
            "src/persistence/c.ts",
        ]));
        assert_eq!(doc.severity, Severity::High);
    }

    #[test]
    fn test_same_layer_multi_file_cycle_suggests_injection() {
        let doc = classify_cycle(strings(&["src/llm/a.ts", "src/llm/b.ts", "src/shared/c.ts"]));
        assert_eq!(doc.layers, strings(&["llm"]));
        assert_eq!(doc.severity, Severity::Low);
        assert!(doc.suggestion.contains("dependency injection"));
    }
}
