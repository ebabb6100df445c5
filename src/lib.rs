//! poolcost library
//!
//! Builds a pool-key → estimated hourly cost mapping from a worker-pool YAML
//! document and static CPU/GPU price tables.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fetch;
pub mod pipeline;
pub mod pools;
pub mod price_table;
pub mod utils;

// Re-export commonly used types
pub use aggregate::{CostAggregator, GpuInfo, GpuNormalizer, PoolPricing, ResolvedPoolEntry};
pub use error::{PoolCostError, Result};
pub use price_table::{CostRecord, CustomMachinePricer, CustomMachineRates, PriceTables};
