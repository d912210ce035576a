//! actor-network command line.
//!
//! Every subcommand reads a normalized interaction CSV and writes its
//! results as CSV/JSON files under `--output-dir`.

use std::path::{Path, PathBuf};

use actor_network::analyzer::{summarize, top_communities};
use actor_network::centrality::CentralityTable;
use actor_network::config::WindowSpec;
use actor_network::{
    AnalysisConfig, AttackStrategy, CentralityEngine, CommunityDetector, DirectedGraph,
    DisruptionSimulator, Metric, SyntheticSpec, TemporalAnalyzer, io, synthetic,
};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "actor-network")]
#[command(about = "Centrality, community and disruption analysis of communication networks")]
struct Cli {
    /// YAML configuration file (missing file means defaults)
    #[arg(
        short,
        long,
        global = true,
        env = "ACTOR_NETWORK_CONFIG",
        default_value = "config.yaml"
    )]
    config: PathBuf,

    /// Directory for result files
    #[arg(
        short,
        long,
        global = true,
        env = "ACTOR_NETWORK_OUTPUT_DIR",
        default_value = "output"
    )]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic interaction CSV with planted groups
    Generate {
        #[arg(long, default_value = "interactions.csv")]
        output: PathBuf,
        #[arg(long, default_value_t = 140)]
        actors: usize,
        #[arg(long, default_value_t = 7)]
        groups: usize,
        #[arg(long, default_value_t = 2000)]
        interactions: usize,
        #[arg(long, default_value_t = 0.1)]
        cross_group_ratio: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Centrality table, ranked lists, communities and their leaders
    Static {
        /// Interaction CSV (source,target,timestamp)
        input: PathBuf,
    },

    /// Remove top-ranked actors and track the largest component
    Disrupt {
        input: PathBuf,
        /// Extra removal list: first column of a CSV with a header row
        #[arg(long)]
        targets: Option<PathBuf>,
        /// Targets per derived strategy (overrides report.top_k)
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Betweenness per time window
    Temporal {
        input: PathBuf,
        /// Calendar-aligned windows of this many months
        #[arg(long, conflicts_with = "days")]
        months: Option<u32>,
        /// Fixed windows of this many days, anchored at the first interaction
        #[arg(long)]
        days: Option<u32>,
    },

    /// Ego network of one actor
    Neighborhood {
        input: PathBuf,
        #[arg(short, long)]
        node: String,
        /// Also render the DOT file to PNG (requires Graphviz)
        #[arg(long)]
        render: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actor_network=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AnalysisConfig::from_yaml_and_env(Some(&cli.config))
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let out = cli.output_dir.as_path();

    match cli.command {
        Commands::Generate {
            output,
            actors,
            groups,
            interactions,
            cross_group_ratio,
            seed,
        } => {
            let spec = SyntheticSpec {
                actors,
                groups,
                interactions,
                cross_group_ratio,
                ..SyntheticSpec::default()
            };
            run_generate(&spec, seed, &output)
        }
        Commands::Static { input } => run_static(&config, &input, out),
        Commands::Disrupt {
            input,
            targets,
            top_k,
        } => {
            if let Some(k) = top_k {
                config.report.top_k = k;
            }
            run_disrupt(&config, &input, targets.as_deref(), out)
        }
        Commands::Temporal {
            input,
            months,
            days,
        } => {
            if let Some(months) = months {
                config.temporal.window = WindowSpec::CalendarMonths { months };
            } else if let Some(days) = days {
                config.temporal.window = WindowSpec::FixedDays { days };
            }
            config.validate()?;
            run_temporal(&config, &input, out)
        }
        Commands::Neighborhood {
            input,
            node,
            render,
        } => run_neighborhood(&config, &input, &node, render, out),
    }
}

fn run_generate(spec: &SyntheticSpec, seed: u64, output: &Path) -> Result<()> {
    let interactions = synthetic::generate_interactions(spec, seed)?;
    io::write_interactions(output, &interactions)
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!("Wrote {} interactions to {}", interactions.len(), output.display());
    Ok(())
}

fn load_graph(input: &Path) -> Result<DirectedGraph> {
    let interactions = io::read_interactions(input)
        .with_context(|| format!("reading interactions from {}", input.display()))?;
    let graph = DirectedGraph::build(&interactions)?;
    tracing::info!(
        "Graph: {} actors, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn prepare_output(out: &Path) -> Result<()> {
    std::fs::create_dir_all(out)
        .with_context(|| format!("creating output directory {}", out.display()))
}

fn run_static(config: &AnalysisConfig, input: &Path, out: &Path) -> Result<()> {
    let graph = load_graph(input)?;
    prepare_output(out)?;

    let table = CentralityEngine::new(&config.centrality).compute(&graph);
    io::write_centrality(&out.join("centrality.csv"), &table)?;

    let k = config.report.top_k;
    for metric in [Metric::Betweenness, Metric::PageRank, Metric::Closeness] {
        io::write_ranking(&out.join(format!("top{k}_{metric}.csv")), &table, metric, k)?;
    }

    let detection = CommunityDetector::new(&config.community).detect(&graph.undirected_projection());
    io::write_partition(&out.join("partition.json"), &detection.partition)?;

    let summaries = summarize(&table, &detection.partition)?;
    io::write_summaries(&out.join("communities.csv"), &summaries)?;

    let top = top_communities(&summaries, config.report.top_communities);
    let top_path = out.join(format!("top{}_communities.csv", config.report.top_communities));
    io::write_summaries(&top_path, top)?;
    for summary in top {
        tracing::info!(
            "Community {}: {} members, leader {} (betweenness {:.4})",
            summary.community_id,
            summary.member_count,
            summary.leader,
            summary.leader_betweenness
        );
    }
    tracing::info!("Static analysis written to {}", out.display());
    Ok(())
}

fn run_disrupt(
    config: &AnalysisConfig,
    input: &Path,
    targets: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let graph = load_graph(input)?;
    prepare_output(out)?;

    let table: CentralityTable = CentralityEngine::new(&config.centrality).compute(&graph);
    let k = config.report.top_k;
    let mut strategies = vec![
        AttackStrategy::by_metric(&table, Metric::Betweenness, k),
        AttackStrategy::by_metric(&table, Metric::PageRank, k),
    ];
    if let Some(path) = targets {
        let list = io::read_targets(path)
            .with_context(|| format!("reading targets from {}", path.display()))?;
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "manual".to_string());
        strategies.push(AttackStrategy::manual(label, list));
    }

    let curves = DisruptionSimulator::new(&graph).simulate_all(&strategies);
    io::write_curves(&out.join("integrity_curves.csv"), &curves)?;

    for curve in &curves {
        let last = curve.values.last().copied().unwrap_or(100.0);
        tracing::info!(
            "{}: {:.2}% of the largest component left after {} removals",
            curve.strategy,
            last,
            curve.steps.len()
        );
    }
    Ok(())
}

fn run_temporal(config: &AnalysisConfig, input: &Path, out: &Path) -> Result<()> {
    let interactions = io::read_interactions(input)
        .with_context(|| format!("reading interactions from {}", input.display()))?;
    prepare_output(out)?;

    let matrix = TemporalAnalyzer::new(&config.temporal, &config.centrality).analyze(&interactions)?;
    if matrix.is_empty() {
        tracing::warn!("No timestamped interactions, temporal matrix is empty");
    }
    io::write_temporal(&out.join("temporal_betweenness.csv"), &matrix)?;
    Ok(())
}

fn run_neighborhood(
    config: &AnalysisConfig,
    input: &Path,
    node: &str,
    render: bool,
    out: &Path,
) -> Result<()> {
    let graph = load_graph(input)?;
    if !graph.contains(node) {
        bail!("actor {node} is not in the graph");
    }
    prepare_output(out)?;

    let ego = graph.neighborhood(node);
    tracing::info!(
        "Ego network of {}: {} predecessors, {} successors, {} actors",
        node,
        graph.predecessors(node).len(),
        graph.successors(node).len(),
        ego.node_count()
    );

    let detection = CommunityDetector::new(&config.community).detect(&graph.undirected_projection());
    let stem = format!("ego_{}", file_safe(node));
    io::write_edges(&out.join(format!("{stem}.csv")), &ego)?;

    let dot = out.join(format!("{stem}.dot"));
    io::write_dot(&dot, &ego, Some(&detection.partition), Some(node))?;
    if render {
        let image = out.join(format!("{stem}.png"));
        io::render_dot(&dot, &image).context("rendering with graphviz")?;
        tracing::info!("Rendered {}", image.display());
    }
    Ok(())
}

fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
