//! Time-windowed betweenness.
//!
//! The interaction stream is cut into fixed, non-overlapping windows. Each
//! window with at least one interaction gets its own graph and betweenness
//! scores; windows without interactions produce no row, so consecutive rows
//! of a [`TemporalMatrix`] are not necessarily adjacent windows.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::centrality::CentralityEngine;
use crate::config::{CentralityConfig, TemporalConfig, WindowSpec};
use crate::error::Result;
use crate::graph::{DirectedGraph, Interaction};

/// Window × actor betweenness scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemporalMatrix {
    windows: Vec<DateTime<Utc>>,
    interactions: Vec<usize>,
    nodes: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl TemporalMatrix {
    /// Window start of each row, oldest first.
    pub fn windows(&self) -> &[DateTime<Utc>] {
        &self.windows
    }

    /// Number of interactions that fell into each row's window.
    pub fn interaction_counts(&self) -> &[usize] {
        &self.interactions
    }

    /// Column ids, sorted.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn rows(&self) -> impl Iterator<Item = (&DateTime<Utc>, &[f64])> + '_ {
        self.windows.iter().zip(self.values.iter().map(Vec::as_slice))
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn get(&self, window: &DateTime<Utc>, node: &str) -> Option<f64> {
        let row = self.windows.binary_search(window).ok()?;
        let col = self.column(node)?;
        Some(self.values[row][col])
    }

    /// One actor's score in every row.
    pub fn series(&self, node: &str) -> Option<Vec<(DateTime<Utc>, f64)>> {
        let col = self.column(node)?;
        Some(
            self.windows
                .iter()
                .zip(&self.values)
                .map(|(w, row)| (*w, row[col]))
                .collect(),
        )
    }

    fn column(&self, node: &str) -> Option<usize> {
        self.nodes
            .binary_search_by(|probe| probe.as_str().cmp(node))
            .ok()
    }
}

type WindowScores = (DateTime<Utc>, usize, Vec<(String, f64)>);

pub struct TemporalAnalyzer<'a> {
    temporal: &'a TemporalConfig,
    centrality: CentralityConfig,
}

impl<'a> TemporalAnalyzer<'a> {
    pub fn new(temporal: &'a TemporalConfig, centrality: &CentralityConfig) -> Self {
        Self {
            temporal,
            centrality: CentralityConfig {
                betweenness_directed: temporal.directed,
                ..centrality.clone()
            },
        }
    }

    pub fn analyze(&self, interactions: &[Interaction]) -> Result<TemporalMatrix> {
        let timed: Vec<(DateTime<Utc>, &Interaction)> = interactions
            .iter()
            .filter_map(|i| i.timestamp.map(|ts| (ts, i)))
            .collect();
        let skipped = interactions.len() - timed.len();
        if skipped > 0 {
            tracing::warn!("Skipping {} interactions without a timestamp", skipped);
        }

        let Some(origin) = timed.iter().map(|(ts, _)| *ts).min() else {
            return Ok(TemporalMatrix::default());
        };

        let mut buckets: BTreeMap<DateTime<Utc>, Vec<&Interaction>> = BTreeMap::new();
        for (ts, interaction) in &timed {
            if let Some(start) = window_start(self.temporal.window, origin, *ts) {
                buckets.entry(start).or_default().push(*interaction);
            }
        }

        let engine = CentralityEngine::new(&self.centrality);
        let mut scored: Vec<WindowScores> = buckets
            .into_par_iter()
            .map(|(start, edges)| -> Result<WindowScores> {
                let graph = DirectedGraph::build(edges.iter().copied())?;
                tracing::debug!(
                    "Window {}: {} interactions, {} nodes",
                    start.format("%Y-%m-%d"),
                    edges.len(),
                    graph.node_count()
                );
                Ok((start, edges.len(), engine.betweenness(&graph)))
            })
            .collect::<Result<_>>()?;
        scored.sort_by_key(|(start, _, _)| *start);

        let nodes: Vec<String> = scored
            .iter()
            .flat_map(|(_, _, scores)| scores.iter().map(|(id, _)| id.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let column: BTreeMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut matrix = TemporalMatrix {
            windows: Vec::with_capacity(scored.len()),
            interactions: Vec::with_capacity(scored.len()),
            values: Vec::with_capacity(scored.len()),
            nodes: Vec::new(),
        };
        for (start, count, scores) in &scored {
            let mut row = vec![0.0; nodes.len()];
            for (id, score) in scores {
                row[column[id.as_str()]] = *score;
            }
            matrix.windows.push(*start);
            matrix.interactions.push(*count);
            matrix.values.push(row);
        }
        matrix.nodes = nodes;

        tracing::info!(
            "Temporal analysis: {} windows, {} actors",
            matrix.windows.len(),
            matrix.nodes.len()
        );
        Ok(matrix)
    }
}

/// Start of the window containing `ts`.
///
/// Calendar windows are aligned to month boundaries counted from year 0, so
/// three-month windows start in January, April, July and October. Fixed
/// windows are anchored at `origin`.
pub fn window_start(
    spec: WindowSpec,
    origin: DateTime<Utc>,
    ts: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match spec {
        WindowSpec::CalendarMonths { months } => {
            let months = i64::from(months.max(1));
            let index = i64::from(ts.year()) * 12 + i64::from(ts.month0());
            let bucket = index - index.rem_euclid(months);
            let year = i32::try_from(bucket.div_euclid(12)).ok()?;
            let month = u32::try_from(bucket.rem_euclid(12)).ok()? + 1;
            let midnight = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
            Some(Utc.from_utc_datetime(&midnight))
        }
        WindowSpec::FixedDays { days } => {
            let width = Duration::days(i64::from(days.max(1))).num_seconds();
            let offset = (ts - origin).num_seconds();
            Some(origin + Duration::seconds(offset.div_euclid(width) * width))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn sent(a: &str, b: &str, ts: DateTime<Utc>) -> Interaction {
        Interaction::new(a, b).at(ts)
    }

    fn analyze(interactions: &[Interaction], window: WindowSpec) -> TemporalMatrix {
        let temporal = TemporalConfig {
            window,
            directed: true,
        };
        TemporalAnalyzer::new(&temporal, &CentralityConfig::default())
            .analyze(interactions)
            .unwrap()
    }

    #[test]
    fn test_quarter_alignment() {
        let q = WindowSpec::quarterly();
        let origin = at(2000, 1, 1);
        let month_start = |y, m| Utc.with_ymd_and_hms(y, m, 1, 0, 0, 0).single();
        assert_eq!(window_start(q, origin, at(2001, 5, 14)), month_start(2001, 4));
        assert_eq!(window_start(q, origin, at(2001, 12, 31)), month_start(2001, 10));
        assert_eq!(window_start(q, origin, at(2001, 1, 1)), month_start(2001, 1));
    }

    #[test]
    fn test_fixed_days_anchor_at_origin() {
        let spec = WindowSpec::FixedDays { days: 7 };
        let origin = at(2001, 3, 1);
        assert_eq!(window_start(spec, origin, at(2001, 3, 7)), Some(origin));
        assert_eq!(window_start(spec, origin, at(2001, 3, 8)), Some(at(2001, 3, 8)));
    }

    #[test]
    fn test_empty_windows_are_skipped() {
        let interactions = vec![
            // Q1: a chain through b
            sent("a", "b", at(2001, 1, 10)),
            sent("b", "c", at(2001, 2, 10)),
            // nothing in Q2
            sent("c", "d", at(2001, 8, 1)),
        ];
        let matrix = analyze(&interactions, WindowSpec::quarterly());

        let starts: Vec<(i32, u32)> = matrix
            .windows()
            .iter()
            .map(|w| (w.year(), w.month()))
            .collect();
        assert_eq!(starts, vec![(2001, 1), (2001, 7)]);
        assert_eq!(matrix.interaction_counts(), &[2, 1]);
        assert_eq!(matrix.nodes(), &["a", "b", "c", "d"]);

        let q1 = matrix.windows()[0];
        let q3 = matrix.windows()[1];
        assert!((matrix.get(&q1, "b").unwrap() - 0.5).abs() < 1e-9);
        // d only appears in Q3; its Q1 cell is filled with 0
        assert_eq!(matrix.get(&q1, "d"), Some(0.0));
        assert_eq!(matrix.get(&q3, "a"), Some(0.0));
        assert_eq!(matrix.get(&q1, "nobody"), None);
    }

    #[test]
    fn test_rows_are_chronological() {
        let interactions = vec![
            sent("x", "y", at(2002, 11, 1)),
            sent("y", "z", at(2000, 2, 1)),
            sent("z", "x", at(2001, 6, 1)),
        ];
        let matrix = analyze(&interactions, WindowSpec::monthly());
        let windows = matrix.windows();
        assert_eq!(windows.len(), 3);
        assert!(windows.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_columns_are_union_of_window_nodes() {
        let interactions = vec![
            sent("a", "b", at(2001, 1, 1)),
            sent("c", "d", at(2001, 5, 1)),
            Interaction::new("ghost", "phantom"),
        ];
        let matrix = analyze(&interactions, WindowSpec::quarterly());
        assert_eq!(matrix.nodes(), &["a", "b", "c", "d"]);
        let series = matrix.series("c").unwrap();
        assert_eq!(series.len(), 2);
        assert!(matrix.series("ghost").is_none());
    }

    #[test]
    fn test_no_timestamps_gives_empty_matrix() {
        let interactions = vec![Interaction::new("a", "b")];
        let matrix = analyze(&interactions, WindowSpec::quarterly());
        assert!(matrix.is_empty());
        assert!(matrix.nodes().is_empty());
        assert!(analyze(&[], WindowSpec::quarterly()).is_empty());
    }

    #[test]
    fn test_invalid_edge_aborts() {
        let temporal = TemporalConfig::default();
        let interactions = vec![sent("a", "", at(2001, 1, 1))];
        let result =
            TemporalAnalyzer::new(&temporal, &CentralityConfig::default()).analyze(&interactions);
        assert!(result.is_err());
    }
}
