//! Analysis configuration.
//!
//! Every tunable the engine uses lives here and is passed explicitly into
//! each component. Values are loaded from an optional YAML file and then
//! overridden by environment variables.
//!
//! Priority: env var > YAML > default

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

pub const ENV_SEED: &str = "ACTOR_NETWORK_SEED";
pub const ENV_DAMPING: &str = "ACTOR_NETWORK_DAMPING";
pub const ENV_BETWEENNESS_SAMPLES: &str = "ACTOR_NETWORK_BETWEENNESS_SAMPLES";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub centrality: CentralityConfig,
    pub community: CommunityConfig,
    pub temporal: TemporalConfig,
    pub report: ReportConfig,
}

/// Which shortest-path distances closeness is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosenessDirection {
    /// Distance from every other actor to the node (who can reach it).
    #[default]
    Incoming,
    /// Distance from the node to every other actor (whom it can reach).
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityConfig {
    /// PageRank damping factor (default: 0.85)
    pub pagerank_damping: f64,
    /// Per-node PageRank tolerance; iteration stops once the L1 change is below `n * tolerance`
    pub pagerank_tolerance: f64,
    /// PageRank iteration cap (default: 100)
    pub pagerank_max_iterations: usize,
    /// Follow edge direction when counting shortest paths
    pub betweenness_directed: bool,
    pub betweenness_normalized: bool,
    /// Number of sampled source nodes; `None` computes exact betweenness
    pub betweenness_samples: Option<usize>,
    pub closeness_direction: ClosenessDirection,
    /// Seed for sampled betweenness
    pub seed: u64,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            pagerank_damping: 0.85,
            pagerank_tolerance: 1e-6,
            pagerank_max_iterations: 100,
            betweenness_directed: true,
            betweenness_normalized: true,
            betweenness_samples: None,
            closeness_direction: ClosenessDirection::Incoming,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    /// Louvain resolution (higher = smaller communities)
    pub resolution: f64,
    /// Seed for the node visiting order
    pub seed: u64,
    /// A level or pass must improve modularity by more than this to continue
    pub min_improvement: f64,
    /// Local-move passes per level
    pub max_passes: usize,
    /// Use interaction multiplicity as edge weight instead of 1 per adjacency
    pub weighted: bool,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            seed: 42,
            min_improvement: 1e-7,
            max_passes: 100,
            weighted: false,
        }
    }
}

/// Time window rule for the temporal analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowSpec {
    /// Calendar-aligned buckets of `months` months (3 = quarters starting Jan/Apr/Jul/Oct).
    CalendarMonths { months: u32 },
    /// Buckets of `days` days anchored at the earliest timestamp.
    FixedDays { days: u32 },
}

impl WindowSpec {
    pub fn quarterly() -> Self {
        Self::CalendarMonths { months: 3 }
    }

    pub fn monthly() -> Self {
        Self::CalendarMonths { months: 1 }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Self::CalendarMonths { months: 0 } | Self::FixedDays { days: 0 } => Err(
                AnalysisError::Config("time window width must be positive".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self::quarterly()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    pub window: WindowSpec,
    pub directed: bool,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            window: WindowSpec::default(),
            directed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Length of ranked actor lists (and of the derived attack target lists)
    pub top_k: usize,
    pub top_communities: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            top_communities: 5,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from an optional YAML file, then apply env overrides.
    ///
    /// A missing file falls back to defaults; a file that exists but does not
    /// parse is an error.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let mut config = match yaml_path {
            Some(path) => Self::load_yaml(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn load_yaml(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config = Self::from_yaml_str(&contents)?;
                tracing::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: Self =
            serde_yaml::from_str(yaml).map_err(|e| AnalysisError::Config(e.to_string()))?;
        // 0 samples means exact, same as the env override
        if config.centrality.betweenness_samples == Some(0) {
            config.centrality.betweenness_samples = None;
        }
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_SEED) {
            let seed = parse_override::<u64>(ENV_SEED, &raw)?;
            self.centrality.seed = seed;
            self.community.seed = seed;
        }
        if let Some(raw) = lookup(ENV_DAMPING) {
            self.centrality.pagerank_damping = parse_override(ENV_DAMPING, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BETWEENNESS_SAMPLES) {
            let samples: usize = parse_override(ENV_BETWEENNESS_SAMPLES, &raw)?;
            // 0 restores the exact computation
            self.centrality.betweenness_samples = (samples > 0).then_some(samples);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let damping = self.centrality.pagerank_damping;
        if !(0.0..=1.0).contains(&damping) {
            return Err(AnalysisError::Config(format!(
                "pagerank_damping must be within [0, 1], got {damping}"
            )));
        }
        if self.centrality.pagerank_tolerance <= 0.0 {
            return Err(AnalysisError::Config(
                "pagerank_tolerance must be positive".to_string(),
            ));
        }
        if self.community.resolution <= 0.0 {
            return Err(AnalysisError::Config(
                "community resolution must be positive".to_string(),
            ));
        }
        self.temporal.window.validate()
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AnalysisError::Config(format!("{key}: cannot parse {raw:?}")))
}
