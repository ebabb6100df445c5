//! End-to-end extraction run
//!
//! Stages run strictly in order: price tables, pool document, resolution,
//! aggregation, output. The price tables are loaded first so a missing table
//! fails the run before any network access.

use crate::aggregate::{CostAggregator, GpuNormalizer, PoolPricing};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{PoolFetcher, PoolSource};
use crate::pools::{resolve_pools, PoolsDocument};
use crate::price_table::{CustomMachinePricer, PriceTables};
use crate::utils::ensure_parent_dir;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Per-run overrides of the configured sources
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cpu_costs: Option<PathBuf>,
    pub gpu_costs: Option<PathBuf>,
    pub pools: Option<String>,
    pub output: Option<PathBuf>,
    pub token: Option<String>,
}

/// Counts reported after a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub pools: usize,
    pub resolved_pairs: usize,
    pub entries: usize,
    pub unpriced: usize,
    pub output: PathBuf,
}

pub async fn run(config: &Config, opts: &RunOptions) -> Result<RunSummary> {
    let sources = &config.sources;
    let cpu_path = opts.cpu_costs.as_ref().unwrap_or(&sources.cpu_costs);
    let gpu_path = opts.gpu_costs.as_ref().unwrap_or(&sources.gpu_costs);
    let output = opts.output.clone().unwrap_or_else(|| sources.output.clone());
    let source = PoolSource::parse(opts.pools.as_deref().unwrap_or(&sources.pools));

    let tables = PriceTables::load(cpu_path, gpu_path)?;

    let fetcher = PoolFetcher::new(
        Duration::from_secs(config.http.timeout_secs),
        opts.token.clone(),
    )?;
    let doc = fetcher.fetch(&source).await?;

    let (pricing, resolved_pairs) = price_document(config, &tables, &doc);
    write_pricing(&output, &pricing)?;

    let summary = RunSummary {
        pools: doc.pools.len(),
        resolved_pairs,
        entries: pricing.len(),
        unpriced: pricing.iter().filter(|(_, e)| e.is_unpriced()).count(),
        output,
    };
    info!(
        "Priced {} pool keys ({} without an hourly rate) from {} pools",
        summary.entries, summary.unpriced, summary.pools
    );
    Ok(summary)
}

/// Resolve and price a parsed document; returns the mapping and the number
/// of (pool key, instance type) pairs considered.
pub fn price_document(
    config: &Config,
    tables: &PriceTables,
    doc: &PoolsDocument,
) -> (PoolPricing, usize) {
    let aggregator = CostAggregator::new(
        tables,
        CustomMachinePricer::new(config.custom_pricing),
        GpuNormalizer::from(&config.gpu),
    );
    let pairs = resolve_pools(doc);
    let pricing = aggregator.aggregate(&pairs, PoolPricing::new());
    (pricing, pairs.len())
}

pub fn render_pricing(pricing: &PoolPricing) -> Result<String> {
    Ok(serde_json::to_string_pretty(pricing)?)
}

pub fn write_pricing(path: &Path, pricing: &PoolPricing) -> Result<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, render_pricing(pricing)?)?;
    Ok(())
}
