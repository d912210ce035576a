//! Targeted-removal simulation.
//!
//! A run removes actors in the order given by an [`AttackStrategy`] and
//! tracks the size of the largest connected component of the undirected
//! projection as a percentage of its size before any removal.
//!
//! Presence is checked on the directed copy while connectivity is measured
//! on the undirected copy; both copies are owned by the run, so the caller's
//! graph is never touched and runs can proceed in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::centrality::{CentralityTable, Metric};
use crate::graph::{DirectedGraph, UndirectedGraph};

/// An ordered removal list and the label its curve is reported under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackStrategy {
    pub label: String,
    pub targets: Vec<String>,
}

impl AttackStrategy {
    pub fn manual(label: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            label: label.into(),
            targets,
        }
    }

    /// Target the `k` top-ranked actors for `metric`, highest first.
    pub fn by_metric(table: &CentralityTable, metric: Metric, k: usize) -> Self {
        Self {
            label: format!("top{k}_{metric}"),
            targets: table.ranked_nodes(metric, k),
        }
    }
}

/// Outcome of one removal step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalStep {
    pub target: String,
    /// False when the target was not in the graph (any more)
    pub removed: bool,
    pub largest_component: usize,
    pub integrity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityCurve {
    pub strategy: String,
    /// Largest component size before any removal
    pub baseline: usize,
    /// `values[0] == 100.0`; `values[i]` follows the first `i` targets
    pub values: Vec<f64>,
    pub steps: Vec<RemovalStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Initial,
    Removing(usize),
    Done,
}

/// One strategy run over private copies of the graph.
///
/// Iterating yields one [`RemovalStep`] per target.
pub struct DisruptionRun<'t> {
    directed: DirectedGraph,
    undirected: UndirectedGraph,
    targets: &'t [String],
    baseline: usize,
    current: usize,
    last_integrity: f64,
    state: SimulationState,
}

impl<'t> DisruptionRun<'t> {
    pub fn new(directed: DirectedGraph, undirected: UndirectedGraph, targets: &'t [String]) -> Self {
        let baseline = undirected.largest_component_size();
        Self {
            directed,
            undirected,
            targets,
            baseline,
            current: baseline,
            last_integrity: 100.0,
            state: SimulationState::Initial,
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn baseline(&self) -> usize {
        self.baseline
    }

    fn integrity(&self, size: usize) -> f64 {
        if self.baseline == 0 {
            0.0
        } else {
            100.0 * size as f64 / self.baseline as f64
        }
    }

    fn remove(&mut self, target: &str) -> RemovalStep {
        if !self.directed.contains(target) {
            tracing::warn!("Target {} not found in graph", target);
            let integrity = if self.baseline == 0 {
                0.0
            } else {
                self.last_integrity
            };
            return RemovalStep {
                target: target.to_string(),
                removed: false,
                largest_component: self.current,
                integrity,
            };
        }

        self.directed.remove_node(target);
        self.undirected.remove_node(target);
        self.current = self.undirected.largest_component_size();
        let integrity = self.integrity(self.current);
        tracing::debug!("Removed {}: {:.2}% remaining", target, integrity);
        RemovalStep {
            target: target.to_string(),
            removed: true,
            largest_component: self.current,
            integrity,
        }
    }
}

impl Iterator for DisruptionRun<'_> {
    type Item = RemovalStep;

    fn next(&mut self) -> Option<RemovalStep> {
        let i = match self.state {
            SimulationState::Initial => 0,
            SimulationState::Removing(i) => i,
            SimulationState::Done => return None,
        };
        let targets = self.targets;
        let Some(target) = targets.get(i) else {
            self.state = SimulationState::Done;
            return None;
        };
        self.state = SimulationState::Removing(i + 1);
        let step = self.remove(target);
        self.last_integrity = step.integrity;
        Some(step)
    }
}

pub struct DisruptionSimulator<'g> {
    graph: &'g DirectedGraph,
    projection: UndirectedGraph,
}

impl<'g> DisruptionSimulator<'g> {
    pub fn new(graph: &'g DirectedGraph) -> Self {
        Self {
            graph,
            projection: graph.undirected_projection(),
        }
    }

    /// Start a run over fresh copies of the graph.
    pub fn run<'t>(&self, targets: &'t [String]) -> DisruptionRun<'t> {
        DisruptionRun::new(self.graph.clone(), self.projection.clone(), targets)
    }

    pub fn simulate(&self, strategy: &AttackStrategy) -> IntegrityCurve {
        let mut run = self.run(&strategy.targets);
        let baseline = run.baseline();
        tracing::info!(
            "Simulating {}: {} targets, initial largest component {} nodes",
            strategy.label,
            strategy.targets.len(),
            baseline
        );

        let steps: Vec<RemovalStep> = run.by_ref().collect();
        let mut values = Vec::with_capacity(steps.len() + 1);
        values.push(100.0);
        values.extend(steps.iter().map(|s| s.integrity));

        IntegrityCurve {
            strategy: strategy.label.clone(),
            baseline,
            values,
            steps,
        }
    }

    /// Run every strategy on its own copies; curves come back in input order.
    pub fn simulate_all(&self, strategies: &[AttackStrategy]) -> Vec<IntegrityCurve> {
        strategies.par_iter().map(|s| self.simulate(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Interaction;

    fn build(pairs: &[(&str, &str)]) -> DirectedGraph {
        let edges: Vec<Interaction> = pairs.iter().map(|(a, b)| Interaction::new(*a, *b)).collect();
        DirectedGraph::build(&edges).unwrap()
    }

    fn targets(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_triangle_removal() {
        let g = build(&[("A", "B"), ("B", "C"), ("A", "C")]);
        let sim = DisruptionSimulator::new(&g);
        let curve = sim.simulate(&AttackStrategy::manual("bridge", targets(&["B"])));

        assert_eq!(curve.baseline, 3);
        assert_eq!(curve.values.len(), 2);
        assert_eq!(curve.values[0], 100.0);
        assert!((curve.values[1] - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(curve.steps[0].largest_component, 2);
        // the caller's graph is untouched
        assert!(g.contains("B"));
    }

    #[test]
    fn test_empty_target_list() {
        let g = build(&[("A", "B")]);
        let curve = DisruptionSimulator::new(&g).simulate(&AttackStrategy::manual("none", vec![]));
        assert_eq!(curve.values, vec![100.0]);
    }

    #[test]
    fn test_missing_target_repeats_previous_value() {
        let g = build(&[("a", "b"), ("b", "c"), ("c", "d"), ("x", "y")]);
        let sim = DisruptionSimulator::new(&g);
        let curve = sim.simulate(&AttackStrategy::manual(
            "mixed",
            targets(&["ghost", "b", "ghost", "b"]),
        ));

        assert_eq!(curve.values.len(), 5);
        assert_eq!(curve.values[1], 100.0);
        assert_eq!(curve.values[2], 50.0);
        assert_eq!(curve.values[3].to_bits(), curve.values[2].to_bits());
        // a second removal of the same actor is a no-op as well
        assert_eq!(curve.values[4].to_bits(), curve.values[2].to_bits());
        assert!(!curve.steps[0].removed);
        assert!(curve.steps[1].removed);
        assert!(!curve.steps[3].removed);
    }

    #[test]
    fn test_empty_graph_emits_zero() {
        let g = DirectedGraph::new();
        let curve =
            DisruptionSimulator::new(&g).simulate(&AttackStrategy::manual("x", targets(&["X"])));
        assert_eq!(curve.baseline, 0);
        assert_eq!(curve.values, vec![100.0, 0.0]);
    }

    #[test]
    fn test_removing_everything_reaches_zero() {
        let g = build(&[("a", "b")]);
        let curve = DisruptionSimulator::new(&g)
            .simulate(&AttackStrategy::manual("all", targets(&["a", "b"])));
        assert_eq!(curve.values, vec![100.0, 50.0, 0.0]);
    }

    #[test]
    fn test_state_machine() {
        let g = build(&[("a", "b")]);
        let sim = DisruptionSimulator::new(&g);
        let list = targets(&["a"]);
        let mut run = sim.run(&list);
        assert_eq!(run.state(), SimulationState::Initial);
        assert!(run.next().is_some());
        assert_eq!(run.state(), SimulationState::Removing(1));
        assert!(run.next().is_none());
        assert_eq!(run.state(), SimulationState::Done);
        assert!(run.next().is_none());
    }

    #[test]
    fn test_runs_are_deterministic_and_isolated() {
        let g = build(&[
            ("hub", "a"),
            ("hub", "b"),
            ("hub", "c"),
            ("a", "b"),
            ("c", "d"),
            ("d", "e"),
        ]);
        let sim = DisruptionSimulator::new(&g);
        let strategies = vec![
            AttackStrategy::manual("first", targets(&["hub", "d"])),
            AttackStrategy::manual("second", targets(&["d", "hub"])),
            AttackStrategy::manual("first-again", targets(&["hub", "d"])),
        ];
        let curves = sim.simulate_all(&strategies);

        assert_eq!(curves.len(), 3);
        assert_eq!(curves[0].strategy, "first");
        assert_eq!(curves[1].strategy, "second");
        let bits = |c: &IntegrityCurve| c.values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&curves[0]), bits(&curves[2]));
        assert_eq!(curves[0].values, sim.simulate(&strategies[0]).values);
        assert_eq!(g.node_count(), 6);
    }

    #[test]
    fn test_strategy_from_centrality() {
        let g = build(&[("a", "hub"), ("hub", "b"), ("c", "hub"), ("hub", "d")]);
        let config = crate::config::CentralityConfig::default();
        let table = crate::centrality::CentralityEngine::new(&config).compute(&g);
        let strategy = AttackStrategy::by_metric(&table, Metric::Betweenness, 1);
        assert_eq!(strategy.targets, vec!["hub".to_string()]);
        assert_eq!(strategy.label, "top1_betweenness");

        let curve = DisruptionSimulator::new(&g).simulate(&strategy);
        assert_eq!(curve.values[1], 20.0);
    }
}
