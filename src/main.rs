use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use poolcost::aggregate::{CostAggregator, GpuNormalizer};
use poolcost::config::{self, Config};
use poolcost::exit_codes::exit_code_for_anyhow;
use poolcost::pipeline::{self, RunOptions};
use poolcost::pools::{GuestAccelerator, InstanceTypeDescriptor};
use poolcost::price_table::{CustomMachinePricer, PriceTables};
use poolcost::utils::format_usd;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "poolcost")]
#[command(
    about = "Estimate hourly cost per CI worker pool",
    long_about = "poolcost downloads the worker-pool configuration, resolves every pool \
definition into concrete pool keys, and prices each pool's machine type (plus any \
attached GPUs) against local CPU and GPU price tables.\n\nThe result is written as a \
JSON mapping from pool key to hourly cost."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the pool pricing mapping (default)
    Extract {
        /// CPU machine-type price table (JSON)
        #[arg(long)]
        cpu_costs: Option<PathBuf>,
        /// GPU accelerator price table (JSON)
        #[arg(long)]
        gpu_costs: Option<PathBuf>,
        /// Worker-pool YAML location (URL or local path)
        #[arg(long)]
        url: Option<String>,
        /// Output path for the JSON mapping
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Bearer token for the pool document request
        #[arg(long, env = "POOLCOST_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Price a single machine type
    Price {
        machine_type: String,
        /// Accelerator type, e.g. nvidia-tesla-v100
        #[arg(long)]
        gpu: Option<String>,
        /// Number of attached accelerators
        #[arg(long, default_value_t = 1)]
        gpu_count: i64,
    },
    /// Write a default configuration file
    Init {
        #[arg(short, long, default_value = ".poolcost.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(exit_code_for_anyhow(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Extract {
        cpu_costs: None,
        gpu_costs: None,
        url: None,
        output: None,
        token: std::env::var("POOLCOST_TOKEN").ok(),
    });

    match command {
        Commands::Init { output } => {
            config::init_config(&output)?;
        }
        Commands::Extract {
            cpu_costs,
            gpu_costs,
            url,
            output,
            token,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let opts = RunOptions {
                cpu_costs,
                gpu_costs,
                pools: url,
                output,
                token,
            };
            let summary = pipeline::run(&config, &opts).await?;
            println!(
                "{} {} pool keys from {} pools ({} without an hourly rate)",
                style("Priced").green().bold(),
                summary.entries,
                summary.pools,
                summary.unpriced
            );
            println!("Saved mapping to {}", summary.output.display());
        }
        Commands::Price {
            machine_type,
            gpu,
            gpu_count,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let tables =
                PriceTables::load(&config.sources.cpu_costs, &config.sources.gpu_costs)?;
            let aggregator = CostAggregator::new(
                &tables,
                CustomMachinePricer::new(config.custom_pricing),
                GpuNormalizer::from(&config.gpu),
            );
            let desc = InstanceTypeDescriptor {
                machine_type: Some(machine_type.clone()),
                guest_accelerators: gpu.map(|accelerator_type| {
                    vec![GuestAccelerator {
                        accelerator_type: Some(accelerator_type),
                        accelerator_count: Some(gpu_count),
                    }]
                }),
            };
            let entry = aggregator.price_instance(&machine_type, &desc);
            println!("{}", serde_json::to_string_pretty(&entry)?);
            eprintln!("{}: {}", machine_type, format_usd(entry.usd_per_hour));
        }
    }

    Ok(())
}
