//! Per-community aggregation of centrality rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::centrality::CentralityTable;
use crate::community::Partition;
use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub community_id: usize,
    pub member_count: usize,
    /// Member with the highest betweenness inside the community
    pub leader: String,
    pub leader_betweenness: f64,
}

/// Summarize every community that has at least one row in `table`.
///
/// The leader is the member with maximal betweenness; among equal scores
/// the member that comes first in table row order wins. Summaries are
/// sorted by member count, largest first, ties by ascending community id.
///
/// Rows without a community and communities without rows are skipped.
pub fn summarize(table: &CentralityTable, partition: &Partition) -> Result<Vec<CommunitySummary>> {
    let mut groups: BTreeMap<usize, CommunitySummary> = BTreeMap::new();

    for row in table.rows() {
        let Some(community_id) = partition.community_of(&row.node) else {
            continue;
        };
        groups
            .entry(community_id)
            .and_modify(|summary| {
                summary.member_count += 1;
                if row.betweenness > summary.leader_betweenness {
                    summary.leader = row.node.clone();
                    summary.leader_betweenness = row.betweenness;
                }
            })
            .or_insert_with(|| CommunitySummary {
                community_id,
                member_count: 1,
                leader: row.node.clone(),
                leader_betweenness: row.betweenness,
            });
    }

    if groups.is_empty() {
        return Err(AnalysisError::EmptyPartition);
    }

    let mut summaries: Vec<CommunitySummary> = groups.into_values().collect();
    // stable sort keeps ascending id among equal sizes
    summaries.sort_by(|a, b| b.member_count.cmp(&a.member_count));
    tracing::debug!("Summarized {} communities", summaries.len());
    Ok(summaries)
}

/// The `k` largest communities.
pub fn top_communities(summaries: &[CommunitySummary], k: usize) -> &[CommunitySummary] {
    &summaries[..k.min(summaries.len())]
}
