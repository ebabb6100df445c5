//! Expansion of pool definitions into (pool key, instance descriptor) pairs

use super::types::{InstanceTypeDescriptor, PoolDefinition, PoolsDocument, ResolutionStrategy};
use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Flatten a pool's `instance_types` into a single list.
///
/// A sequence is returned as-is; a mapping contributes the flattened contents
/// of each of its values in mapping order. Any other shape yields nothing.
pub fn flatten_instance_configs(instances: &Value) -> Vec<Value> {
    match instances {
        Value::Sequence(seq) => seq.clone(),
        Value::Mapping(map) => map.values().flat_map(flatten_instance_configs).collect(),
        Value::Tagged(tagged) => flatten_instance_configs(&tagged.value),
        _ => Vec::new(),
    }
}

/// Substitute `{key}` placeholders from each mapping in turn and return the
/// last `/`-delimited segment. Placeholders with no value are left in place.
///
/// Booleans and null render as `True`, `False` and `None`, matching the pool
/// names the fleet configuration tooling generates.
pub fn resolve_pool_id(template: &str, substitutions: &[&Mapping]) -> String {
    let mut resolved = template.to_string();
    for map in substitutions {
        for (key, value) in map.iter() {
            let placeholder = format!("{{{}}}", render_scalar(key));
            resolved = resolved.replace(&placeholder, &render_scalar(value));
        }
    }
    match resolved.rsplit_once('/') {
        Some((_, last)) => last.to_string(),
        None => resolved,
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Pool keys produced by one definition, in order.
pub fn pool_keys(pool: &PoolDefinition) -> Vec<String> {
    match pool.strategy() {
        ResolutionStrategy::Variants(variants) => variants
            .iter()
            .map(|variant| match variant.as_mapping() {
                Some(map) => resolve_pool_id(&pool.pool_id, &[map]),
                None => resolve_pool_id(&pool.pool_id, &[]),
            })
            .collect(),
        ResolutionStrategy::Attributes(attrs) => vec![resolve_pool_id(&pool.pool_id, &[attrs])],
        ResolutionStrategy::Plain => vec![resolve_pool_id(&pool.pool_id, &[])],
    }
}

/// Instance descriptors of a pool that name a machine type.
pub fn pool_instances(pool: &PoolDefinition) -> Vec<InstanceTypeDescriptor> {
    flatten_instance_configs(pool.instance_types())
        .into_iter()
        .filter_map(|raw| match serde_yaml::from_value::<InstanceTypeDescriptor>(raw) {
            Ok(desc) if desc.machine_type.as_deref().is_some_and(|m| !m.is_empty()) => Some(desc),
            Ok(_) => {
                debug!("Skipping instance type without machine_type in {}", pool.pool_id);
                None
            }
            Err(e) => {
                debug!("Skipping unreadable instance type in {}: {}", pool.pool_id, e);
                None
            }
        })
        .collect()
}

/// Expand every pool into (pool key, descriptor) pairs.
///
/// Every key of a fanned-out pool receives the full instance list.
pub fn resolve_pools(doc: &PoolsDocument) -> Vec<(String, InstanceTypeDescriptor)> {
    let mut pairs = Vec::new();
    for pool in &doc.pools {
        let instances = pool_instances(pool);
        for key in pool_keys(pool) {
            for desc in &instances {
                pairs.push((key.clone(), desc.clone()));
            }
        }
    }
    debug!("Resolved {} pools into {} pool/instance pairs", doc.pools.len(), pairs.len());
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_flatten_sequence_unchanged() {
        let value = yaml("[{machine_type: a}, {machine_type: b}]");
        assert_eq!(flatten_instance_configs(&value).len(), 2);
    }

    #[test]
    fn test_flatten_nested_mapping_in_order() {
        let value = yaml(
            r#"
us-central1:
  zone-a: [{machine_type: a}]
  zone-b:
    deep: [{machine_type: b}, {machine_type: c}]
us-west1: [{machine_type: d}]
"#,
        );
        let machines: Vec<_> = flatten_instance_configs(&value)
            .iter()
            .map(|v| v["machine_type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(machines, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_flatten_scalar_is_empty() {
        assert!(flatten_instance_configs(&yaml("42")).is_empty());
        assert!(flatten_instance_configs(&Value::Null).is_empty());
        assert!(flatten_instance_configs(&yaml("{a: 1, b: [{machine_type: x}]}")).len() == 1);
    }

    #[test]
    fn test_resolve_pool_id_takes_last_segment() {
        let vars = yaml("{level: 3, suffix: gpu}");
        let map = vars.as_mapping().unwrap();
        assert_eq!(resolve_pool_id("gecko-{level}/b-linux-{suffix}", &[map]), "b-linux-gpu");
        assert_eq!(resolve_pool_id("proj/pool-{level}", &[map]), "pool-3");
    }

    #[test]
    fn test_resolve_pool_id_renders_bool_and_null() {
        let vars = yaml("{gpu: true, spot: false, zone: ~}");
        let map = vars.as_mapping().unwrap();
        assert_eq!(resolve_pool_id("p/pool-{gpu}", &[map]), "pool-True");
        assert_eq!(resolve_pool_id("p/pool-{spot}-{zone}", &[map]), "pool-False-None");
    }

    #[test]
    fn test_resolve_pool_id_leaves_unresolved() {
        let vars = yaml("{level: a}");
        assert_eq!(
            resolve_pool_id("p/pool-{level}-{missing}", &[vars.as_mapping().unwrap()]),
            "pool-a-{missing}"
        );
        assert_eq!(resolve_pool_id("no-slashes", &[]), "no-slashes");
    }

    #[test]
    fn test_strategy_priority() {
        let doc: PoolsDocument = serde_yaml::from_str(
            r#"
pools:
  - pool_id: "p/v-{level}"
    variants: [{level: a}]
    attributes: {suffix: ignored}
  - pool_id: "p/attr-{suffix}"
    attributes: {suffix: x}
  - pool_id: "p/noattr-{suffix}"
    attributes: {other: y}
  - pool_id: "p/plain"
"#,
        )
        .unwrap();
        let keys: Vec<_> = doc.pools.iter().flat_map(pool_keys).collect();
        assert_eq!(keys, vec!["v-a", "attr-x", "noattr-{suffix}", "plain"]);
    }

    #[test]
    fn test_instances_without_machine_type_are_skipped() {
        let doc: PoolsDocument = serde_yaml::from_str(
            r#"
pools:
  - pool_id: "p/pool"
    config:
      instance_types:
        - {machine_type: n2-standard-4}
        - {disk: 100}
        - {machine_type: ""}
        - just-a-string
"#,
        )
        .unwrap();
        let pairs = resolve_pools(&doc);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1.machine_type.as_deref(), Some("n2-standard-4"));
    }
}
