//! Interaction graph store.
//!
//! [`InteractionGraph`] wraps a petgraph `StableGraph` with an actor id ↔
//! `NodeIndex` map. Parallel interactions between the same ordered pair
//! collapse onto a single edge whose weight is the interaction count.
//! `StableGraph` keeps indices valid across [`InteractionGraph::remove_node`],
//! which the disruption simulator relies on.
//!
//! Node iteration follows index order, which is the order in which actors
//! first appeared in the interaction stream. Every table the engine emits
//! uses that order for its rows.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::NodeIndexable;
use petgraph::{Directed, Direction, EdgeType, Undirected};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// One normalized sender → recipient interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Interaction {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

pub type DirectedGraph = InteractionGraph<Directed>;
pub type UndirectedGraph = InteractionGraph<Undirected>;

#[derive(Debug, Clone)]
pub struct InteractionGraph<Ty: EdgeType = Directed> {
    graph: StableGraph<String, u32, Ty>,
    index: HashMap<String, NodeIndex>,
}

impl<Ty: EdgeType> InteractionGraph<Ty> {
    pub fn new() -> Self {
        Self {
            graph: StableGraph::default(),
            index: HashMap::new(),
        }
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: StableGraph::with_capacity(nodes, edges),
            index: HashMap::with_capacity(nodes),
        }
    }

    /// Add an actor. Returns the existing index if the actor is already present.
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Record `count` interactions between two actors, adding them if needed.
    pub fn add_interaction(&mut self, source: &str, target: &str, count: u32) {
        let a = self.add_node(source);
        let b = self.add_node(target);
        if let Some(edge) = self.graph.find_edge(a, b) {
            self.graph[edge] += count;
        } else {
            self.graph.add_edge(a, b, count);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node_id(&self, idx: NodeIndex) -> Option<&str> {
        self.graph.node_weight(idx).map(String::as_str)
    }

    /// Actor ids in row order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph
            .node_indices()
            .map(move |idx| self.graph[idx].as_str())
    }

    /// Interaction count on the edge between two actors, if any.
    pub fn edge_weight(&self, source: &str, target: &str) -> Option<u32> {
        let a = self.index_of(source)?;
        let b = self.index_of(target)?;
        let edge = self.graph.find_edge(a, b)?;
        self.graph.edge_weight(edge).copied()
    }

    /// Edges as `(source, target, interaction count)` in edge index order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, u32)> + '_ {
        self.graph.edge_indices().filter_map(move |e| {
            let (a, b) = self.graph.edge_endpoints(e)?;
            Some((
                self.graph[a].as_str(),
                self.graph[b].as_str(),
                self.graph[e],
            ))
        })
    }

    /// Remove an actor and every incident edge.
    ///
    /// Absent actors are a no-op; the return value tells the two cases apart.
    pub fn remove_node(&mut self, id: &str) -> bool {
        match self.index.remove(id) {
            Some(idx) => {
                self.graph.remove_node(idx);
                true
            }
            None => false,
        }
    }

    /// Sizes of the connected components, largest first.
    ///
    /// Edge direction is ignored, so a directed graph reports its weakly
    /// connected components.
    pub fn component_sizes(&self) -> Vec<usize> {
        let bound = self.graph.node_bound();
        let mut sets = UnionFind::<usize>::new(bound);
        for e in self.graph.edge_indices() {
            if let Some((a, b)) = self.graph.edge_endpoints(e) {
                sets.union(a.index(), b.index());
            }
        }

        let mut sizes: HashMap<usize, usize> = HashMap::new();
        for idx in self.graph.node_indices() {
            *sizes.entry(sets.find(idx.index())).or_default() += 1;
        }
        let mut sizes: Vec<usize> = sizes.into_values().collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }

    /// Size of the largest connected component; 0 for an empty graph.
    pub fn largest_component_size(&self) -> usize {
        self.component_sizes().first().copied().unwrap_or(0)
    }

    /// Subgraph with exactly the given actors and the edges among them.
    ///
    /// Ids that are not in the graph are ignored. Row order is preserved.
    pub fn induced_subgraph<'a, I>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keep: HashSet<NodeIndex> = ids
            .into_iter()
            .filter_map(|id| self.index_of(id))
            .collect();

        let mut sub = Self::with_capacity(keep.len(), 0);
        for idx in self.graph.node_indices().filter(|idx| keep.contains(idx)) {
            sub.add_node(&self.graph[idx]);
        }
        for e in self.graph.edge_indices() {
            if let Some((a, b)) = self.graph.edge_endpoints(e) {
                if keep.contains(&a) && keep.contains(&b) {
                    sub.add_interaction(&self.graph[a], &self.graph[b], self.graph[e]);
                }
            }
        }
        sub
    }

    pub fn inner(&self) -> &StableGraph<String, u32, Ty> {
        &self.graph
    }

    /// Compact adjacency lists for the traversal-heavy algorithms.
    pub(crate) fn adjacency(&self) -> Adjacency {
        let ids: Vec<NodeIndex> = self.graph.node_indices().collect();
        let mut position = vec![usize::MAX; self.graph.node_bound()];
        for (i, idx) in ids.iter().enumerate() {
            position[idx.index()] = i;
        }

        let n = ids.len();
        let mut out = vec![Vec::new(); n];
        let mut inc = vec![Vec::new(); n];
        for e in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(e) else {
                continue;
            };
            let (s, t) = (position[a.index()], position[b.index()]);
            if s == t {
                continue;
            }
            out[s].push(t);
            inc[t].push(s);
            if !Ty::is_directed() {
                out[t].push(s);
                inc[s].push(t);
            }
        }
        Adjacency { ids, out, inc }
    }
}

impl<Ty: EdgeType> Default for InteractionGraph<Ty> {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectedGraph {
    /// Build the directed interaction graph from a normalized edge list.
    ///
    /// Fails on the first interaction whose sender or recipient is empty.
    pub fn build<'a, I>(interactions: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Interaction>,
    {
        let mut graph = Self::new();
        for (index, interaction) in interactions.into_iter().enumerate() {
            if interaction.source.trim().is_empty() || interaction.target.trim().is_empty() {
                return Err(AnalysisError::InvalidEdge {
                    index,
                    sender: interaction.source.clone(),
                    recipient: interaction.target.clone(),
                });
            }
            graph.add_interaction(&interaction.source, &interaction.target, 1);
        }
        tracing::debug!(
            "Built interaction graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Undirected view: each directed edge becomes an adjacency, reciprocal
    /// edges merge into one whose weight is the total interaction count.
    pub fn undirected_projection(&self) -> UndirectedGraph {
        let mut projection = UndirectedGraph::with_capacity(self.node_count(), self.edge_count());
        for id in self.nodes() {
            projection.add_node(id);
        }
        for (a, b, w) in self.edges() {
            projection.add_interaction(a, b, w);
        }
        projection
    }

    /// Number of distinct senders writing to the actor.
    pub fn in_degree(&self, id: &str) -> usize {
        self.degree(id, Direction::Incoming)
    }

    /// Number of distinct recipients the actor writes to.
    pub fn out_degree(&self, id: &str) -> usize {
        self.degree(id, Direction::Outgoing)
    }

    fn degree(&self, id: &str, dir: Direction) -> usize {
        self.index_of(id)
            .map(|idx| self.graph.edges_directed(idx, dir).count())
            .unwrap_or(0)
    }

    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, dir: Direction) -> Vec<&str> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        found.sort_unstable();
        found.dedup();
        found.into_iter().map(|n| self.graph[n].as_str()).collect()
    }

    /// Ego network of an actor: predecessors ∪ successors ∪ the actor itself.
    ///
    /// Empty when the actor is not in the graph.
    pub fn neighborhood(&self, id: &str) -> DirectedGraph {
        if !self.contains(id) {
            return DirectedGraph::new();
        }
        let mut members: Vec<&str> = self.predecessors(id);
        members.extend(self.successors(id));
        members.push(id);
        self.induced_subgraph(members)
    }
}

/// Node-compacted adjacency lists; self-loops are dropped.
///
/// For undirected graphs `out` and `inc` hold the same neighbours.
pub(crate) struct Adjacency {
    pub ids: Vec<NodeIndex>,
    pub out: Vec<Vec<usize>>,
    pub inc: Vec<Vec<usize>>,
}

impl Adjacency {
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
