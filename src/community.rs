//! Community detection: multi-level Louvain over the undirected projection.
//!
//! Each level runs local moves until modularity stops improving, then
//! collapses communities into super-nodes and repeats on the induced graph.
//! The node visiting order is shuffled from a seeded `StdRng`, and equal-gain
//! moves are resolved by neighbour order, so a given seed always yields the
//! same partition.

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::UnGraph;
use petgraph::visit::NodeIndexable;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::CommunityConfig;
use crate::graph::UndirectedGraph;

/// Node → community assignment.
///
/// Ids are contiguous from 0, numbered by the first member in row order.
/// They are only comparable between runs with the same seed and input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    assignment: BTreeMap<String, usize>,
    community_count: usize,
    modularity: f64,
    levels: usize,
}

impl Partition {
    /// Wrap an externally produced assignment. Modularity is left at 0.
    pub fn from_assignment(assignment: BTreeMap<String, usize>) -> Self {
        let community_count = assignment
            .values()
            .copied()
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        Self {
            assignment,
            community_count,
            modularity: 0.0,
            levels: 0,
        }
    }

    pub fn community_of(&self, node: &str) -> Option<usize> {
        self.assignment.get(node).copied()
    }

    pub fn assignment(&self) -> &BTreeMap<String, usize> {
        &self.assignment
    }

    pub fn community_count(&self) -> usize {
        self.community_count
    }

    pub fn modularity(&self) -> f64 {
        self.modularity
    }

    /// Number of aggregation levels the detector went through.
    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// Members of each community, sorted by id.
    pub fn members(&self) -> BTreeMap<usize, Vec<String>> {
        let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (node, &c) in &self.assignment {
            groups.entry(c).or_default().push(node.clone());
        }
        groups
    }
}

/// A community collapsed to one node of the community graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityNode {
    pub id: usize,
    pub member_count: usize,
    /// Total weight of edges with both endpoints inside the community
    pub internal_weight: f64,
}

/// Communities as nodes; edge weight = aggregate weight of the edges between two communities.
///
/// Node index `i` holds community id `i`.
pub type CommunityGraph = UnGraph<CommunityNode, f64>;

#[derive(Debug, Clone)]
pub struct CommunityDetection {
    pub partition: Partition,
    pub community_graph: CommunityGraph,
}

pub struct CommunityDetector<'a> {
    config: &'a CommunityConfig,
}

impl<'a> CommunityDetector<'a> {
    pub fn new(config: &'a CommunityConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, graph: &UndirectedGraph) -> CommunityDetection {
        let (ids, base) = LevelGraph::from_projection(graph, self.config.weighted);
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        // community of every original node, refined level by level
        let mut membership: Vec<usize> = (0..ids.len()).collect();
        let mut levels = 0;
        let mut current = base.clone();
        let mut best_modularity = f64::NEG_INFINITY;

        while !current.is_empty() {
            let mut status = Status::new(&current);
            self.one_level(&current, &mut status, &mut rng);
            let level_modularity = status.modularity(self.config.resolution, current.total);

            if levels > 0 && level_modularity - best_modularity < self.config.min_improvement {
                break;
            }
            best_modularity = level_modularity;
            levels += 1;

            let level_assignment = renumber(&status.node2com);
            let community_count = level_assignment.iter().max().map_or(0, |m| m + 1);
            for c in membership.iter_mut() {
                *c = level_assignment[*c];
            }
            if community_count == current.len() {
                // nothing merged; another level would be identical
                break;
            }
            current = current.induced(&level_assignment, community_count);
        }

        let membership = renumber(&membership);
        let modularity = base.modularity_of(&membership, self.config.resolution);
        let community_graph = base.community_graph(&membership);

        let assignment: BTreeMap<String, usize> = ids.into_iter().zip(membership).collect();
        let partition = Partition {
            community_count: community_graph.node_count(),
            assignment,
            modularity,
            levels,
        };
        tracing::info!(
            "Detected {} communities over {} nodes (modularity {:.4}, {} levels)",
            partition.community_count,
            partition.assignment.len(),
            partition.modularity,
            partition.levels
        );
        CommunityDetection {
            partition,
            community_graph,
        }
    }

    /// Local-move phase: move nodes to the neighbouring community with the
    /// largest modularity gain until a pass no longer improves modularity.
    fn one_level(&self, graph: &LevelGraph, status: &mut Status, rng: &mut StdRng) {
        if graph.total == 0.0 {
            return;
        }
        let resolution = self.config.resolution;
        let m2 = 2.0 * graph.total;
        let n = graph.len();
        let mut order: Vec<usize> = (0..n).collect();
        let mut weight_to: Vec<f64> = vec![0.0; n];
        let mut touched: Vec<usize> = Vec::new();

        let mut modularity = status.modularity(resolution, graph.total);
        for _ in 0..self.config.max_passes {
            order.shuffle(rng);
            let mut moved = false;

            for &node in &order {
                let com = status.node2com[node];
                let k = graph.strength[node];
                let degc_totw = k / m2;

                for &(nb, w) in &graph.adj[node] {
                    let c = status.node2com[nb];
                    if weight_to[c] == 0.0 {
                        touched.push(c);
                    }
                    weight_to[c] += w;
                }

                // take the node out of its community
                status.tot[com] -= k;
                status.internal[com] -= weight_to[com] + graph.loops[node];

                let remove_cost = -weight_to[com] + resolution * status.tot[com] * degc_totw;
                let mut best = com;
                let mut best_gain = 0.0;
                for &c in &touched {
                    let gain = remove_cost + weight_to[c] - resolution * status.tot[c] * degc_totw;
                    if gain > best_gain {
                        best_gain = gain;
                        best = c;
                    }
                }

                status.tot[best] += k;
                status.internal[best] += weight_to[best] + graph.loops[node];
                status.node2com[node] = best;
                if best != com {
                    moved = true;
                }

                for &c in &touched {
                    weight_to[c] = 0.0;
                }
                touched.clear();
            }

            let next = status.modularity(resolution, graph.total);
            if !moved || next - modularity < self.config.min_improvement {
                break;
            }
            modularity = next;
        }
    }
}

/// Modularity of an arbitrary partition of the projection.
///
/// Nodes missing from the partition are treated as singletons.
pub fn modularity(
    graph: &UndirectedGraph,
    partition: &Partition,
    resolution: f64,
    weighted: bool,
) -> f64 {
    let (ids, level) = LevelGraph::from_projection(graph, weighted);
    let mut next_free = partition.assignment.values().max().map_or(0, |m| m + 1);
    let membership: Vec<usize> = ids
        .iter()
        .map(|id| {
            partition.community_of(id).unwrap_or_else(|| {
                next_free += 1;
                next_free - 1
            })
        })
        .collect();
    level.modularity_of(&renumber(&membership), resolution)
}

/// Renumber labels to 0.. in order of first appearance.
fn renumber(labels: &[usize]) -> Vec<usize> {
    let mut remap: HashMap<usize, usize> = HashMap::new();
    labels
        .iter()
        .map(|&c| {
            let next = remap.len();
            *remap.entry(c).or_insert(next)
        })
        .collect()
}

/// Weighted undirected graph in compact form for one Louvain level.
#[derive(Debug, Clone)]
struct LevelGraph {
    /// Neighbour lists without self-loops; each undirected edge appears at both ends
    adj: Vec<Vec<(usize, f64)>>,
    loops: Vec<f64>,
    /// Weighted degree; a self-loop counts twice
    strength: Vec<f64>,
    /// Sum of edge weights, each edge once
    total: f64,
}

impl LevelGraph {
    fn with_len(n: usize) -> Self {
        Self {
            adj: vec![Vec::new(); n],
            loops: vec![0.0; n],
            strength: vec![0.0; n],
            total: 0.0,
        }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    fn add_edge(&mut self, a: usize, b: usize, w: f64) {
        if a == b {
            self.loops[a] += w;
            self.strength[a] += 2.0 * w;
        } else {
            self.adj[a].push((b, w));
            self.adj[b].push((a, w));
            self.strength[a] += w;
            self.strength[b] += w;
        }
        self.total += w;
    }

    fn from_projection(graph: &UndirectedGraph, weighted: bool) -> (Vec<String>, Self) {
        let g = graph.inner();
        let ids: Vec<_> = g.node_indices().collect();
        let mut position = vec![usize::MAX; g.node_bound()];
        for (i, idx) in ids.iter().enumerate() {
            position[idx.index()] = i;
        }

        let mut level = Self::with_len(ids.len());
        for e in g.edge_indices() {
            if let Some((a, b)) = g.edge_endpoints(e) {
                let w = if weighted { f64::from(g[e]) } else { 1.0 };
                level.add_edge(position[a.index()], position[b.index()], w);
            }
        }
        let names = ids.iter().map(|&idx| g[idx].clone()).collect();
        (names, level)
    }

    /// Graph whose nodes are the communities of `assignment`.
    fn induced(&self, assignment: &[usize], count: usize) -> Self {
        let mut merged: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut induced = Self::with_len(count);
        for (i, neighbors) in self.adj.iter().enumerate() {
            let ci = assignment[i];
            if self.loops[i] > 0.0 {
                *merged.entry((ci, ci)).or_default() += self.loops[i];
            }
            for &(j, w) in neighbors {
                if i < j {
                    let cj = assignment[j];
                    *merged.entry((ci.min(cj), ci.max(cj))).or_default() += w;
                }
            }
        }
        for ((a, b), w) in merged {
            induced.add_edge(a, b, w);
        }
        induced
    }

    fn modularity_of(&self, assignment: &[usize], resolution: f64) -> f64 {
        if self.total == 0.0 {
            return 0.0;
        }
        let count = assignment.iter().max().map_or(0, |m| m + 1);
        let mut status = Status {
            node2com: assignment.to_vec(),
            tot: vec![0.0; count],
            internal: vec![0.0; count],
        };
        for (i, neighbors) in self.adj.iter().enumerate() {
            let c = assignment[i];
            status.tot[c] += self.strength[i];
            status.internal[c] += self.loops[i];
            for &(j, w) in neighbors {
                if i < j && assignment[j] == c {
                    status.internal[c] += w;
                }
            }
        }
        status.modularity(resolution, self.total)
    }

    fn community_graph(&self, assignment: &[usize]) -> CommunityGraph {
        let count = assignment.iter().max().map_or(0, |m| m + 1);
        let mut graph = CommunityGraph::with_capacity(count, 0);
        let mut member_count = vec![0usize; count];
        for &c in assignment {
            member_count[c] += 1;
        }

        let collapsed = self.induced(assignment, count);
        for (id, &members) in member_count.iter().enumerate() {
            graph.add_node(CommunityNode {
                id,
                member_count: members,
                internal_weight: collapsed.loops[id],
            });
        }
        for (a, neighbors) in collapsed.adj.iter().enumerate() {
            for &(b, w) in neighbors {
                if a < b {
                    graph.add_edge(
                        petgraph::graph::NodeIndex::new(a),
                        petgraph::graph::NodeIndex::new(b),
                        w,
                    );
                }
            }
        }
        graph
    }
}

/// Per-community bookkeeping for the local-move phase.
struct Status {
    node2com: Vec<usize>,
    /// Sum of member strengths
    tot: Vec<f64>,
    /// Weight of edges inside the community
    internal: Vec<f64>,
}

impl Status {
    fn new(graph: &LevelGraph) -> Self {
        Self {
            node2com: (0..graph.len()).collect(),
            tot: graph.strength.clone(),
            internal: graph.loops.clone(),
        }
    }

    fn modularity(&self, resolution: f64, total: f64) -> f64 {
        if total == 0.0 {
            return 0.0;
        }
        let m2 = 2.0 * total;
        self.tot
            .iter()
            .zip(&self.internal)
            .map(|(&tot, &internal)| internal / total - resolution * (tot / m2).powi(2))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DirectedGraph, Interaction};

    fn projection(pairs: &[(String, String)]) -> UndirectedGraph {
        let edges: Vec<Interaction> = pairs
            .iter()
            .map(|(a, b)| Interaction::new(a.clone(), b.clone()))
            .collect();
        DirectedGraph::build(&edges).unwrap().undirected_projection()
    }

    fn two_cliques(size: usize) -> UndirectedGraph {
        let mut pairs = Vec::new();
        for prefix in ["a", "b"] {
            for i in 0..size {
                for j in 0..size {
                    if i != j {
                        pairs.push((format!("{prefix}_{i}"), format!("{prefix}_{j}")));
                    }
                }
            }
        }
        pairs.push(("a_0".to_string(), "b_0".to_string()));
        projection(&pairs)
    }

    #[test]
    fn test_two_cliques_split() {
        let g = two_cliques(4);
        let config = CommunityConfig::default();
        let detection = CommunityDetector::new(&config).detect(&g);
        let partition = &detection.partition;

        assert_eq!(partition.assignment().len(), 8);
        assert_eq!(partition.community_count(), 2);
        assert!(partition.modularity() > 0.3);

        let a = partition.community_of("a_0").unwrap();
        let b = partition.community_of("b_0").unwrap();
        assert_ne!(a, b);
        for i in 1..4 {
            assert_eq!(partition.community_of(&format!("a_{i}")), Some(a));
            assert_eq!(partition.community_of(&format!("b_{i}")), Some(b));
        }
        // first row (a_0) owns community 0
        assert_eq!(a, 0);
    }

    #[test]
    fn test_same_seed_same_partition() {
        let mut pairs = Vec::new();
        for i in 0..60 {
            pairs.push((format!("u{i}"), format!("u{}", (i * 7 + 3) % 60)));
            pairs.push((format!("u{i}"), format!("u{}", (i + 1) % 60)));
        }
        let g = projection(&pairs);
        let config = CommunityConfig {
            seed: 1234,
            ..Default::default()
        };
        let first = CommunityDetector::new(&config).detect(&g).partition;
        let second = CommunityDetector::new(&config).detect(&g).partition;
        assert_eq!(first, second);
    }

    #[test]
    fn test_isolated_node_is_singleton() {
        let mut g = two_cliques(3);
        g.add_node("hermit");
        let config = CommunityConfig::default();
        let partition = CommunityDetector::new(&config).detect(&g).partition;

        let hermit = partition.community_of("hermit").unwrap();
        let peers = partition
            .assignment()
            .values()
            .filter(|&&c| c == hermit)
            .count();
        assert_eq!(peers, 1);
    }

    #[test]
    fn test_no_edges_all_singletons() {
        let mut g = UndirectedGraph::new();
        for id in ["x", "y", "z"] {
            g.add_node(id);
        }
        let config = CommunityConfig::default();
        let partition = CommunityDetector::new(&config).detect(&g).partition;
        assert_eq!(partition.community_count(), 3);
        assert_eq!(partition.modularity(), 0.0);
        assert_eq!(partition.community_of("x"), Some(0));
        assert_eq!(partition.community_of("z"), Some(2));
    }

    #[test]
    fn test_empty_graph() {
        let config = CommunityConfig::default();
        let detection = CommunityDetector::new(&config).detect(&UndirectedGraph::new());
        assert!(detection.partition.is_empty());
        assert_eq!(detection.community_graph.node_count(), 0);
    }

    #[test]
    fn test_community_graph_weights() {
        let g = two_cliques(4);
        let config = CommunityConfig::default();
        let detection = CommunityDetector::new(&config).detect(&g);
        let cg = &detection.community_graph;

        assert_eq!(cg.node_count(), 2);
        assert_eq!(cg.edge_count(), 1);
        for node in cg.raw_nodes().iter().map(|n| &n.weight) {
            assert_eq!(node.member_count, 4);
            // K4 has 6 undirected edges
            assert!((node.internal_weight - 6.0).abs() < 1e-9);
        }
        let bridge = cg.raw_edges()[0].weight;
        assert!((bridge - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_modularity_matches_detection() {
        let g = two_cliques(5);
        let config = CommunityConfig::default();
        let partition = CommunityDetector::new(&config).detect(&g).partition;
        let q = modularity(&g, &partition, 1.0, false);
        assert!((q - partition.modularity()).abs() < 1e-9);

        let all_in_one: BTreeMap<String, usize> = partition
            .assignment()
            .keys()
            .map(|k| (k.clone(), 0))
            .collect();
        let single = Partition::from_assignment(all_in_one);
        assert!(modularity(&g, &single, 1.0, false).abs() < 1e-9);
        assert!(q > 0.0);
    }

    #[test]
    fn test_members_grouping() {
        let assignment: BTreeMap<String, usize> = [("a", 1), ("b", 0), ("c", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let partition = Partition::from_assignment(assignment);
        assert_eq!(partition.community_count(), 2);
        let members = partition.members();
        assert_eq!(members[&1], vec!["a".to_string(), "c".to_string()]);
    }
}
