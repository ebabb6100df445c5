//! Retrieval of the worker-pool YAML document
//!
//! The document is fetched once per run. A non-success status or a body that
//! does not parse aborts the run; there is no retry.

use crate::error::{PoolCostError, Result};
use crate::pools::PoolsDocument;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Where the pool document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolSource {
    Url(String),
    File(PathBuf),
}

impl PoolSource {
    /// `http://` and `https://` locations are fetched, anything else is a path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            PoolSource::Url(location.to_string())
        } else {
            PoolSource::File(PathBuf::from(location))
        }
    }
}

impl std::fmt::Display for PoolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolSource::Url(url) => write!(f, "{}", url),
            PoolSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches pool documents over HTTP
pub struct PoolFetcher {
    client: reqwest::Client,
    token: Option<String>,
}

impl PoolFetcher {
    pub fn new(timeout: Duration, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("poolcost/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, token })
    }

    pub async fn fetch(&self, source: &PoolSource) -> Result<PoolsDocument> {
        let body = match source {
            PoolSource::Url(url) => self.fetch_text(url).await?,
            PoolSource::File(path) => tokio::fs::read_to_string(path).await?,
        };
        let doc = parse_pools(&body)?;
        info!("Loaded {} pool definitions from {}", doc.pools.len(), source);
        Ok(doc)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PoolCostError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Parse a `{pools: [...]}` YAML document, expanding `<<` merge keys.
pub fn parse_pools(text: &str) -> Result<PoolsDocument> {
    let mut value: serde_yaml::Value = serde_yaml::from_str(text)?;
    value.apply_merge()?;
    Ok(serde_yaml::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_source_parse() {
        assert_eq!(
            PoolSource::parse("https://example.com/worker-pools.yml"),
            PoolSource::Url("https://example.com/worker-pools.yml".to_string())
        );
        assert_eq!(
            PoolSource::parse("fixtures/worker-pools.yml"),
            PoolSource::File(PathBuf::from("fixtures/worker-pools.yml"))
        );
    }

    #[test]
    fn test_parse_pools_requires_pools_key() {
        assert!(matches!(parse_pools("other: []"), Err(PoolCostError::Parse(_))));
        assert!(matches!(parse_pools("pools: [unterminated"), Err(PoolCostError::Parse(_))));
    }

    #[test]
    fn test_parse_pools_applies_merge_keys() {
        let doc = parse_pools(
            r#"
base: &base
  machine_type: n2-standard-4
pools:
  - pool_id: p/merged
    config:
      instance_types:
        - <<: *base
          disks: []
"#,
        )
        .unwrap();
        let pairs = crate::pools::resolve_pools(&doc);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1.machine_type.as_deref(), Some("n2-standard-4"));
    }

    #[test]
    fn test_parse_pools_requires_pool_id() {
        assert!(parse_pools("pools:\n  - config: {}\n").is_err());
        let doc = parse_pools("pools:\n  - pool_id: a/b\n").unwrap();
        assert_eq!(doc.pools.len(), 1);
    }
}
