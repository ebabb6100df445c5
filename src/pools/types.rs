//! Type definitions for the worker-pool document
//!
//! Only the fields needed for pricing are modelled; everything else in a pool
//! definition is ignored. `instance_types` and `variants` stay as raw YAML
//! values because their shape varies between pools.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Top-level document: `{ pools: [...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct PoolsDocument {
    pub pools: Vec<PoolDefinition>,
}

/// One entry of the `pools` list
#[derive(Debug, Clone, Deserialize)]
pub struct PoolDefinition {
    /// Identifier template, e.g. `gecko-t/t-linux-{suffix}`
    pub pool_id: String,
    #[serde(default)]
    pub variants: Option<Vec<Value>>,
    #[serde(default)]
    pub attributes: Option<Mapping>,
    #[serde(default)]
    pub config: Option<PoolConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolConfig {
    /// Flat list of descriptors or an arbitrarily nested mapping of them
    #[serde(default)]
    pub instance_types: Value,
}

/// A concrete machine shape offered to a pool
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstanceTypeDescriptor {
    #[serde(default)]
    pub machine_type: Option<String>,
    #[serde(default, rename = "guestAccelerators")]
    pub guest_accelerators: Option<Vec<GuestAccelerator>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GuestAccelerator {
    #[serde(default, rename = "acceleratorType")]
    pub accelerator_type: Option<String>,
    #[serde(default, rename = "acceleratorCount")]
    pub accelerator_count: Option<i64>,
}

impl InstanceTypeDescriptor {
    pub fn accelerators(&self) -> &[GuestAccelerator] {
        self.guest_accelerators.as_deref().unwrap_or(&[])
    }
}

/// How a pool's identifier template is expanded into pool keys.
///
/// Exactly one strategy applies to a pool, chosen in declaration order.
#[derive(Debug, Clone, Copy)]
pub enum ResolutionStrategy<'a> {
    /// One pool key per variant
    Variants(&'a [Value]),
    /// A single key substituted from an attributes block with a `suffix`
    Attributes(&'a Mapping),
    /// The template as-is
    Plain,
}

impl PoolDefinition {
    pub fn strategy(&self) -> ResolutionStrategy<'_> {
        if let Some(variants) = &self.variants {
            return ResolutionStrategy::Variants(variants);
        }
        match &self.attributes {
            Some(attrs) if attrs.contains_key("suffix") => ResolutionStrategy::Attributes(attrs),
            _ => ResolutionStrategy::Plain,
        }
    }

    pub fn instance_types(&self) -> &Value {
        static NONE: Value = Value::Null;
        self.config
            .as_ref()
            .map(|c| &c.instance_types)
            .unwrap_or(&NONE)
    }
}
