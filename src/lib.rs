//! Communication-network analytics over sender → recipient interaction streams.
//!
//! Build a directed [`DirectedGraph`] from [`Interaction`]s, then rank actors
//! with the [`CentralityEngine`], partition them with the Louvain
//! [`CommunityDetector`], summarize communities, simulate targeted removals
//! with the [`DisruptionSimulator`] and follow betweenness over time with the
//! [`TemporalAnalyzer`].

pub mod analyzer;
pub mod centrality;
pub mod community;
pub mod config;
pub mod disruption;
pub mod error;
pub mod graph;
pub mod io;
pub mod synthetic;
pub mod temporal;

pub use analyzer::{CommunitySummary, summarize, top_communities};
pub use centrality::{CentralityEngine, CentralityRecord, CentralityTable, Metric};
pub use community::{CommunityDetection, CommunityDetector, CommunityGraph, Partition};
pub use config::{AnalysisConfig, WindowSpec};
pub use disruption::{AttackStrategy, DisruptionSimulator, IntegrityCurve};
pub use error::{AnalysisError, Result};
pub use graph::{DirectedGraph, Interaction, InteractionGraph, UndirectedGraph};
pub use synthetic::{SyntheticSpec, generate_interactions};
pub use temporal::{TemporalAnalyzer, TemporalMatrix};
