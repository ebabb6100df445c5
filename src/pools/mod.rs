//! Worker-pool document model and resolution into pool keys
//!
//! A pool definition expands into one or more pool keys (via `variants` or an
//! `attributes.suffix`) and carries a possibly nested set of instance types.
//! `resolve_pools` turns a whole document into a flat list of
//! (pool key, instance descriptor) pairs for pricing.

pub mod resolve;
pub mod types;

pub use resolve::{flatten_instance_configs, pool_keys, resolve_pool_id, resolve_pools};
pub use types::{
    GuestAccelerator, InstanceTypeDescriptor, PoolConfig, PoolDefinition, PoolsDocument,
    ResolutionStrategy,
};
