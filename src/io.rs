//! Flat tabular input and output.
//!
//! Input is a normalized interaction CSV with a `source,target,timestamp`
//! header (`sender`, `recipient` and `date` are accepted as aliases). Every
//! analysis result is written as CSV, except the partition which is a JSON
//! object mapping actor id to community id.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::process::Command;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::{Reader, Writer};
use petgraph::EdgeType;
use petgraph::dot::{Config, Dot};
use serde::Deserialize;

use crate::analyzer::CommunitySummary;
use crate::centrality::{CentralityTable, Metric};
use crate::community::Partition;
use crate::disruption::IntegrityCurve;
use crate::error::{AnalysisError, Result};
use crate::graph::{DirectedGraph, Interaction, InteractionGraph};
use crate::temporal::TemporalMatrix;

#[derive(Debug, Deserialize)]
struct InteractionRow {
    #[serde(alias = "sender")]
    source: String,
    #[serde(alias = "recipient")]
    target: String,
    #[serde(default, alias = "date")]
    timestamp: Option<String>,
}

pub fn read_interactions(path: &Path) -> Result<Vec<Interaction>> {
    let interactions = read_interactions_from(File::open(path)?)?;
    tracing::info!(
        "Loaded {} interactions from {}",
        interactions.len(),
        path.display()
    );
    Ok(interactions)
}

pub fn read_interactions_from<R: Read>(reader: R) -> Result<Vec<Interaction>> {
    let mut rows = Reader::from_reader(reader);
    let mut interactions = Vec::new();
    for (row, record) in rows.deserialize::<InteractionRow>().enumerate() {
        let record = record?;
        let timestamp = match record.timestamp.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                AnalysisError::InvalidTimestamp {
                    row,
                    value: raw.to_string(),
                }
            })?),
        };
        interactions.push(Interaction {
            source: record.source,
            target: record.target,
            timestamp,
        });
    }
    Ok(interactions)
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS±HH:MM`, naive `YYYY-MM-DD HH:MM:SS`
/// or a bare date. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Actor ids from the first column of a CSV with a header row.
///
/// Ranked lists written by [`write_ranking`] can be fed back as attack targets.
pub fn read_targets(path: &Path) -> Result<Vec<String>> {
    let mut rows = Reader::from_path(path)?;
    let mut targets = Vec::new();
    for record in rows.records() {
        let record = record?;
        if let Some(id) = record.get(0).map(str::trim).filter(|id| !id.is_empty()) {
            targets.push(id.to_string());
        }
    }
    Ok(targets)
}

pub fn write_interactions(path: &Path, interactions: &[Interaction]) -> Result<()> {
    let mut out = Writer::from_path(path)?;
    for interaction in interactions {
        out.serialize(interaction)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_centrality(path: &Path, table: &CentralityTable) -> Result<()> {
    let mut out = Writer::from_path(path)?;
    for row in table.rows() {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

/// Top `k` actors for `metric` with their degrees and the metric score.
pub fn write_ranking(path: &Path, table: &CentralityTable, metric: Metric, k: usize) -> Result<()> {
    let mut out = Writer::from_path(path)?;
    out.write_record(["node", "in_degree", "out_degree", &metric.to_string()])?;
    for row in table.top_by(metric, k) {
        out.write_record([
            row.node.clone(),
            row.in_degree.to_string(),
            row.out_degree.to_string(),
            metric.value(row).to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_partition(path: &Path, partition: &Partition) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, partition.assignment())?;
    out.flush()?;
    Ok(())
}

pub fn write_summaries(path: &Path, summaries: &[CommunitySummary]) -> Result<()> {
    let mut out = Writer::from_path(path)?;
    for summary in summaries {
        out.serialize(summary)?;
    }
    out.flush()?;
    Ok(())
}

/// One `step` column plus one column per strategy. Shorter curves leave
/// their trailing cells empty.
pub fn write_curves(path: &Path, curves: &[IntegrityCurve]) -> Result<()> {
    let mut out = Writer::from_path(path)?;
    let mut header = vec!["step".to_string()];
    header.extend(curves.iter().map(|c| c.strategy.clone()));
    out.write_record(&header)?;

    let steps = curves.iter().map(|c| c.values.len()).max().unwrap_or(0);
    for step in 0..steps {
        let mut record = vec![step.to_string()];
        record.extend(
            curves
                .iter()
                .map(|c| c.values.get(step).map(f64::to_string).unwrap_or_default()),
        );
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_temporal(path: &Path, matrix: &TemporalMatrix) -> Result<()> {
    let mut out = Writer::from_path(path)?;
    let mut header = vec!["window_start".to_string()];
    header.extend(matrix.nodes().iter().cloned());
    out.write_record(&header)?;

    for (start, values) in matrix.rows() {
        let mut record = vec![start.format("%Y-%m-%d").to_string()];
        record.extend(values.iter().map(f64::to_string));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Weighted edge list of a graph, `source,target,weight`.
pub fn write_edges(path: &Path, graph: &DirectedGraph) -> Result<()> {
    let mut out = Writer::from_path(path)?;
    out.write_record(["source", "target", "weight"])?;
    for (source, target, weight) in graph.edges() {
        out.write_record([source, target, &weight.to_string()])?;
    }
    out.flush()?;
    Ok(())
}

/// Graphviz export. Edges carry their weight as label; nodes are filled
/// with a colour per community, white when unassigned. The `focus` actor,
/// if any, is drawn larger with a red outline.
pub fn write_dot<Ty: EdgeType>(
    path: &Path,
    graph: &InteractionGraph<Ty>,
    partition: Option<&Partition>,
    focus: Option<&str>,
) -> Result<()> {
    let dot = format!(
        "{:?}",
        Dot::with_attr_getters(
            graph.inner(),
            &[Config::EdgeNoLabel, Config::NodeNoLabel],
            &|_, edge| format!("label=\"{}\"", edge.weight()),
            &|_, (_, id)| node_attributes(id, partition, focus),
        )
    );
    std::fs::write(path, dot)?;
    Ok(())
}

fn node_attributes(id: &str, partition: Option<&Partition>, focus: Option<&str>) -> String {
    let fill = match partition.and_then(|p| p.community_of(id)) {
        Some(community) => {
            let hue = (community * 60 + community / 6 * 23) % 360;
            format!("{:.3} 0.5 0.9", hue as f32 / 360.0)
        }
        None => "0.000 0.0 1.0".to_string(),
    };
    let mut attrs = format!("label=\"{id}\", style=filled, fillcolor=\"{fill}\"");
    if focus == Some(id) {
        attrs.push_str(", color=red, penwidth=3, fontsize=18, width=1.2");
    }
    attrs
}

/// Render a DOT file to PNG with the Graphviz `dot` binary.
pub fn render_dot(dot: &Path, image: &Path) -> Result<()> {
    let status = Command::new("dot")
        .arg("-Tpng")
        .arg(dot)
        .arg("-o")
        .arg(image)
        .status()?;
    if !status.success() {
        return Err(AnalysisError::Io(std::io::Error::other(format!(
            "dot exited with {status}"
        ))));
    }
    Ok(())
}
