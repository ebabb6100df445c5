//! Static CPU and GPU price tables
//!
//! Both tables are JSON objects keyed by type name:
//!
//! ```json
//! // cpu_costs.json
//! { "n2-standard-4": { "vcpus": 4, "memory_gb": 16.0, "usd_per_hour": 0.194236 } }
//! // gpu_costs.json
//! { "nvidia-v100": 2.48 }
//! ```
//!
//! Values scraped from the provider's price sheet may be `null`; they are
//! carried through as unknown rather than rejected.

use crate::error::{PoolCostError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Hourly cost of a machine shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostRecord {
    pub vcpus: Option<u32>,
    pub memory_gb: Option<f64>,
    pub usd_per_hour: Option<f64>,
}

/// Read-only lookups over the CPU and GPU catalogs
#[derive(Debug, Clone, Default)]
pub struct PriceTables {
    cpu: HashMap<String, CostRecord>,
    gpu: HashMap<String, Option<f64>>,
}

impl PriceTables {
    pub fn new(cpu: HashMap<String, CostRecord>, gpu: HashMap<String, Option<f64>>) -> Self {
        Self { cpu, gpu }
    }

    /// Load both tables. Any failure here is fatal for the run.
    pub fn load(cpu_path: &Path, gpu_path: &Path) -> Result<Self> {
        let cpu = read_table(cpu_path)?;
        let gpu = read_table(gpu_path)?;
        let tables = Self::new(cpu, gpu);
        debug!(
            "Loaded {} CPU machine types and {} GPU types",
            tables.cpu.len(),
            tables.gpu.len()
        );
        Ok(tables)
    }

    pub fn from_json_strs(cpu: &str, gpu: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(cpu)?, serde_json::from_str(gpu)?))
    }

    pub fn lookup_cpu(&self, machine_type: &str) -> Option<&CostRecord> {
        self.cpu.get(machine_type)
    }

    /// A `null` price counts as absent.
    pub fn lookup_gpu(&self, accelerator_type: &str) -> Option<f64> {
        self.gpu.get(accelerator_type).copied().flatten()
    }
}

fn read_table<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| PoolCostError::PriceTable {
        path: path.to_path_buf(),
        reason: e.to_string(),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&content).map_err(|e| PoolCostError::PriceTable {
        path: path.to_path_buf(),
        reason: format!("invalid JSON: {}", e),
        source: Some(Box::new(e)),
    })
}

/// Per-unit rates for custom machine types.
///
/// Update from https://cloud.google.com/compute/vm-instance-pricing#custommachinetypepricing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomMachineRates {
    /// USD per vCPU per hour
    pub cpu_per_vcpu_hour: f64,
    /// USD per GiB of memory per hour
    pub mem_per_gib_hour: f64,
}

impl Default for CustomMachineRates {
    fn default() -> Self {
        Self {
            cpu_per_vcpu_hour: 0.03319155,
            mem_per_gib_hour: 0.004446,
        }
    }
}

fn custom_machine_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^n1-custom-(\d+)-(\d+)$").ok())
        .as_ref()
}

/// Prices `n1-custom-<vcpus>-<memory_mib>` machine types from per-unit rates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomMachinePricer {
    rates: CustomMachineRates,
}

impl CustomMachinePricer {
    pub fn new(rates: CustomMachineRates) -> Self {
        Self { rates }
    }

    /// Returns `None` for anything that is not a custom machine type.
    pub fn price(&self, machine_type: &str) -> Option<CostRecord> {
        let caps = custom_machine_regex()?.captures(machine_type)?;
        let vcpus: u32 = caps[1].parse().ok()?;
        let mem_mib: u64 = caps[2].parse().ok()?;
        let memory_gb = mem_mib as f64 / 1024.0;

        let total = vcpus as f64 * self.rates.cpu_per_vcpu_hour
            + memory_gb * self.rates.mem_per_gib_hour;
        Some(CostRecord {
            vcpus: Some(vcpus),
            memory_gb: Some(memory_gb),
            usd_per_hour: Some(round6(total)),
        })
    }
}

/// Round to 6 decimal digits.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
