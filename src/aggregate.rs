//! Per-pool cost aggregation
//!
//! Each (pool key, instance descriptor) pair is priced into a
//! `ResolvedPoolEntry` and written into a `PoolPricing` map under its key.
//! Later entries replace earlier ones for the same key.
//!
//! Missing price data never fails a run. The affected fields are written as
//! `null`, and a GPU-bearing entry only reports a combined hourly rate when
//! both the machine and accelerator prices are known.

use crate::config::GpuConfig;
use crate::pools::InstanceTypeDescriptor;
use crate::price_table::{round6, CostRecord, CustomMachinePricer, PriceTables};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use tracing::debug;

/// Priced accelerator attached to an instance type
#[derive(Debug, Clone, PartialEq)]
pub struct GpuInfo {
    pub gpu_type: String,
    pub gpu_count: i64,
    pub gpu_cost_per_hour: Option<f64>,
    pub total_gpu_cost: Option<f64>,
}

/// Output record for one pool key
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPoolEntry {
    pub machine_type: String,
    /// Catalog or custom pricing for the machine, if any was found
    pub base: Option<CostRecord>,
    pub gpu: Option<GpuInfo>,
    /// Combined hourly rate (machine plus accelerators)
    pub usd_per_hour: Option<f64>,
}

impl ResolvedPoolEntry {
    /// True when the entry has no usable hourly rate.
    pub fn is_unpriced(&self) -> bool {
        self.usd_per_hour.is_none()
    }
}

impl Serialize for ResolvedPoolEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("machine_type", &self.machine_type)?;
        if let Some(base) = &self.base {
            map.serialize_entry("vcpus", &base.vcpus)?;
            map.serialize_entry("memory_gb", &base.memory_gb)?;
            map.serialize_entry("usd_per_hour", &self.usd_per_hour)?;
        }
        if let Some(gpu) = &self.gpu {
            map.serialize_entry("gpu_type", &gpu.gpu_type)?;
            map.serialize_entry("gpu_count", &gpu.gpu_count)?;
            map.serialize_entry("gpu_cost_per_hour", &gpu.gpu_cost_per_hour)?;
            map.serialize_entry("total_gpu_cost", &gpu.total_gpu_cost)?;
            // Without base pricing the combined rate has not been written yet
            if self.base.is_none() {
                map.serialize_entry("usd_per_hour", &self.usd_per_hour)?;
            }
        }
        map.end()
    }
}

/// Pool key → entry, in first-insertion order.
///
/// Re-inserting a key replaces its entry but keeps its position, so output
/// order follows the first time each pool key was seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolPricing {
    entries: Vec<(String, ResolvedPoolEntry)>,
    index: HashMap<String, usize>,
}

impl PoolPricing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the replaced entry.
    pub fn insert(&mut self, key: String, entry: ResolvedPoolEntry) -> Option<ResolvedPoolEntry> {
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, entry)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, entry));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ResolvedPoolEntry> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedPoolEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for PoolPricing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

/// Rewrites accelerator names to the GPU table's key convention
#[derive(Debug, Clone)]
pub struct GpuNormalizer {
    vendor_prefix: String,
    replacement: String,
}

impl Default for GpuNormalizer {
    fn default() -> Self {
        Self::from(&GpuConfig::default())
    }
}

impl From<&GpuConfig> for GpuNormalizer {
    fn from(config: &GpuConfig) -> Self {
        Self {
            vendor_prefix: config.vendor_prefix.to_lowercase(),
            replacement: config.replacement.clone(),
        }
    }
}

impl GpuNormalizer {
    /// `NVIDIA-TESLA-V100` → `nvidia-v100`
    pub fn normalize(&self, accelerator_type: &str) -> String {
        accelerator_type
            .to_lowercase()
            .replace(&self.vendor_prefix, &self.replacement)
    }
}

/// Prices instance descriptors against the loaded tables
pub struct CostAggregator<'a> {
    tables: &'a PriceTables,
    pricer: CustomMachinePricer,
    normalizer: GpuNormalizer,
}

impl<'a> CostAggregator<'a> {
    pub fn new(
        tables: &'a PriceTables,
        pricer: CustomMachinePricer,
        normalizer: GpuNormalizer,
    ) -> Self {
        Self {
            tables,
            pricer,
            normalizer,
        }
    }

    /// Catalog price, else custom machine pricing, else unknown.
    pub fn base_cost(&self, machine_type: &str) -> Option<CostRecord> {
        self.tables
            .lookup_cpu(machine_type)
            .cloned()
            .or_else(|| self.pricer.price(machine_type))
    }

    /// Price the first accelerator with a type and a positive count.
    ///
    /// Further accelerators on the same instance type are not priced.
    pub fn extract_gpu_info(&self, desc: &InstanceTypeDescriptor) -> Option<GpuInfo> {
        let (accelerator_type, count) = desc.accelerators().iter().find_map(|acc| {
            let acc_type = acc.accelerator_type.as_deref().filter(|t| !t.is_empty())?;
            let count = acc.accelerator_count.filter(|&c| c > 0)?;
            Some((acc_type, count))
        })?;

        let gpu_type = self.normalizer.normalize(accelerator_type);
        let gpu_cost_per_hour = self.tables.lookup_gpu(&gpu_type);
        if gpu_cost_per_hour.is_none() {
            debug!("No GPU price for {}", gpu_type);
        }
        Some(GpuInfo {
            total_gpu_cost: gpu_cost_per_hour.map(|rate| rate * count as f64),
            gpu_type,
            gpu_count: count,
            gpu_cost_per_hour,
        })
    }

    pub fn price_instance(
        &self,
        machine_type: &str,
        desc: &InstanceTypeDescriptor,
    ) -> ResolvedPoolEntry {
        let base = self.base_cost(machine_type);
        if base.is_none() {
            debug!("No price data for machine type {}", machine_type);
        }
        let gpu = self.extract_gpu_info(desc);

        let base_rate = base.as_ref().and_then(|b| b.usd_per_hour);
        let usd_per_hour = match &gpu {
            // A known machine price with an unknown GPU price is not a
            // partial total: the combined rate is unknown.
            Some(gpu) => match (base_rate, gpu.total_gpu_cost) {
                (Some(machine), Some(accel)) => Some(round6(machine + accel)),
                _ => None,
            },
            None => base_rate,
        };

        ResolvedPoolEntry {
            machine_type: machine_type.to_string(),
            base,
            gpu,
            usd_per_hour,
        }
    }

    /// Price every pair into `pricing`, replacing earlier entries per key.
    pub fn aggregate(
        &self,
        pairs: &[(String, InstanceTypeDescriptor)],
        mut pricing: PoolPricing,
    ) -> PoolPricing {
        for (key, desc) in pairs {
            let Some(machine_type) = desc.machine_type.as_deref().filter(|m| !m.is_empty()) else {
                continue;
            };
            let entry = self.price_instance(machine_type, desc);
            if pricing.insert(key.clone(), entry).is_some() {
                debug!("Pool {} priced again, keeping the latest instance type", key);
            }
        }
        pricing
    }
}
