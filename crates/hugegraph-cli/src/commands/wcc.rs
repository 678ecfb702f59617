use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use hugegraph_core::algorithms::{Wcc, WccConfig, WccStats};
use hugegraph_core::generator::RandomGraphGenerator;
use hugegraph_core::loader::{InMemorySource, LoadConfig, PropertyMapping, load_graph};
use hugegraph_core::{Graph, HugeGraph};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use super::OutputContext;
use crate::config::Config;
use crate::edge_list::read_edge_list_file;

/// Property key used for generated weights and unnamed value columns
pub const DEFAULT_WEIGHT_PROPERTY: &str = "weight";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// One `nodeId,componentId` row per node
    #[default]
    Stream,
    /// Component counts and timings
    Stats,
}

#[derive(Debug, Clone, Args)]
pub struct WccArgs {
    /// Edge list CSV (`source,target[,value]`)
    #[arg(short, long, conflicts_with = "generate")]
    pub input: Option<PathBuf>,
    /// Generate a random graph with this many nodes
    #[arg(short, long)]
    pub generate: Option<u64>,
    /// Average out-degree of a generated graph
    #[arg(long, default_value = "4")]
    pub degree: u64,
    /// Seed of a generated graph
    #[arg(long, default_value = "42")]
    pub seed: u64,
    /// Output mode
    #[arg(short, long, value_enum, default_value_t = Mode::Stream)]
    pub mode: Mode,
    /// Load this relationship property
    #[arg(long)]
    pub weight_property: Option<String>,
    /// Value for relationships without the property
    #[arg(long)]
    pub default_weight: Option<f64>,
    /// Only join relationships whose property is greater than this
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Worker threads for loading and computation
    #[arg(short, long)]
    pub concurrency: Option<usize>,
    /// Nodes per load batch
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Renumber components to 0..count
    #[arg(long)]
    pub consecutive_ids: bool,
}

/// Merge file configuration with command-line overrides
pub fn resolve_configs(args: &WccArgs, cfg: &Config) -> Result<(LoadConfig, WccConfig)> {
    let mut load = cfg.load.clone();
    let mut wcc = cfg.wcc.clone();

    if let Some(concurrency) = args.concurrency {
        load.concurrency = concurrency;
        wcc.concurrency = concurrency;
    }
    if let Some(batch_size) = args.batch_size {
        load.batch_size = batch_size;
    }
    if let Some(name) = &args.weight_property {
        let default_value = args
            .default_weight
            .or(load.relationship_property.as_ref().map(|m| m.default_value))
            .unwrap_or(0.0);
        load.relationship_property = Some(PropertyMapping::new(name.clone(), default_value));
    } else if let Some(default_value) = args.default_weight {
        match load.relationship_property.as_mut() {
            Some(mapping) => mapping.default_value = default_value,
            None => bail!("--default-weight requires --weight-property or a mapped property"),
        }
    }
    if let Some(threshold) = args.threshold {
        wcc.threshold = Some(threshold);
    }
    if args.consecutive_ids {
        wcc.consecutive_ids = true;
    }
    Ok((load, wcc))
}

/// Stats mode report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub relationship_count: u64,
    pub load_millis: u64,
    #[serde(flatten)]
    pub stats: WccStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamRow {
    node_id: u64,
    component_id: u64,
}

fn build_source(args: &WccArgs, load: &LoadConfig) -> Result<InMemorySource> {
    let property_key = load
        .relationship_property
        .as_ref()
        .map_or(DEFAULT_WEIGHT_PROPERTY, |m| m.name.as_str());

    match (&args.input, args.generate) {
        (Some(path), _) => read_edge_list_file(path, property_key),
        (None, Some(node_count)) => {
            let mut generator = RandomGraphGenerator::new(node_count, args.degree).with_seed(args.seed);
            if load.relationship_property.is_some() {
                generator = generator.with_property(property_key, 0.0..1.0);
            }
            Ok(generator.generate()?)
        }
        (None, None) => bail!("either --input or --generate is required"),
    }
}

fn load(args: &WccArgs, load_config: LoadConfig) -> Result<(HugeGraph, u64)> {
    let source = build_source(args, &load_config)?;
    let start = Instant::now();
    let graph = load_graph(&source, load_config).context("failed to load graph")?;
    Ok((graph, start.elapsed().as_millis() as u64))
}

pub fn execute(args: WccArgs, cfg: &Config, output: &OutputContext) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&args, cfg, output, &mut out)
}

/// Load, compute and print to `out`
pub fn run(args: &WccArgs, cfg: &Config, output: &OutputContext, out: &mut impl Write) -> Result<()> {
    let (load_config, wcc_config) = resolve_configs(args, cfg)?;
    let (graph, load_millis) = load(args, load_config)?;
    if output.verbose {
        tracing::info!(
            node_count = graph.node_count(),
            relationship_count = graph.relationship_count(),
            load_millis,
            "Loaded graph"
        );
    }

    let result = Wcc::new(&graph, wcc_config)
        .context("invalid wcc configuration")?
        .compute()
        .context("failed to compute components")?;

    match args.mode {
        Mode::Stream => {
            if output.json {
                let rows: Vec<StreamRow> = result
                    .components
                    .iter()
                    .map(|(node_id, component_id)| StreamRow {
                        node_id,
                        component_id,
                    })
                    .collect();
                writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
            } else {
                writeln!(out, "nodeId,componentId")?;
                for (node_id, component_id) in result.components.iter() {
                    writeln!(out, "{},{}", node_id, component_id)?;
                }
            }
        }
        Mode::Stats => {
            let report = StatsReport {
                relationship_count: graph.relationship_count(),
                load_millis,
                stats: result.stats(),
            };
            if output.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                writeln!(out, "Nodes:              {}", report.stats.node_count)?;
                writeln!(out, "Relationships:      {}", report.relationship_count)?;
                writeln!(out, "Components:         {}", report.stats.component_count)?;
                writeln!(out, "Largest component:  {}", report.stats.largest_component)?;
                writeln!(out, "Smallest component: {}", report.stats.smallest_component)?;
                writeln!(out, "Load time:          {} ms", report.load_millis)?;
                writeln!(out, "Compute time:       {} ms", report.stats.compute_millis)?;
            }
        }
    }
    Ok(())
}
