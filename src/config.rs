use crate::error::{ConfigError, Result};
use crate::price_table::CustomMachineRates;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upstream worker-pool definitions for the Firefox CI fleet.
pub const DEFAULT_POOLS_URL: &str =
    "https://raw.githubusercontent.com/mozilla-releng/fxci-config/refs/heads/main/worker-pools.yml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub custom_pricing: CustomMachineRates,
    #[serde(default)]
    pub gpu: GpuConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub cpu_costs: PathBuf,
    pub gpu_costs: PathBuf,
    /// HTTP(S) URL or local path of the worker-pool YAML
    pub pools: String,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    /// Accelerator name fragment rewritten before the GPU table lookup
    pub vendor_prefix: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            vendor_prefix: "nvidia-tesla-".to_string(),
            replacement: "nvidia-".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig {
                cpu_costs: PathBuf::from("cpu_costs.json"),
                gpu_costs: PathBuf::from("gpu_costs.json"),
                pools: DEFAULT_POOLS_URL.to_string(),
                output: PathBuf::from("machine_pricing.json"),
            },
            custom_pricing: CustomMachineRates::default(),
            gpu: GpuConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`, else `./.poolcost.toml`, else
    /// `~/.config/poolcost/config.toml`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            let local = PathBuf::from(".poolcost.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("poolcost").join("config.toml"))
                    .unwrap_or(local)
            }
        };

        if !config_path.exists() {
            if path.is_some() {
                tracing::warn!(
                    "Config file not found: {}, using defaults",
                    config_path.display()
                );
            }
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", config_path.display(), e))
        })?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let rates = &self.custom_pricing;
        for (field, value) in [
            ("custom_pricing.cpu_per_vcpu_hour", rates.cpu_per_vcpu_hour),
            ("custom_pricing.mem_per_gib_hour", rates.mem_per_gib_hour),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("rate must be a non-negative number, got {}", value),
                }
                .into());
            }
        }
        if self.gpu.vendor_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "gpu.vendor_prefix".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("serialize: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.sources.pools, DEFAULT_POOLS_URL);
        assert_eq!(config.sources.output, PathBuf::from("machine_pricing.json"));
        assert_eq!(config.custom_pricing.cpu_per_vcpu_hour, 0.03319155);
        assert_eq!(config.custom_pricing.mem_per_gib_hour, 0.004446);
        assert_eq!(config.gpu.vendor_prefix, "nvidia-tesla-");
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("poolcost.toml");

        let mut config = Config::default();
        config.custom_pricing.cpu_per_vcpu_hour = 0.05;
        config.save(&config_path).unwrap();

        let loaded = Config::load(Some(&config_path)).unwrap();
        assert_eq!(loaded.custom_pricing.cpu_per_vcpu_hour, 0.05);
        assert_eq!(loaded.sources.cpu_costs, config.sources.cpu_costs);
    }

    #[test]
    fn test_config_sections_are_optional() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("minimal.toml");
        std::fs::write(
            &config_path,
            r#"
[sources]
cpu_costs = "tables/cpu.json"
gpu_costs = "tables/gpu.json"
pools = "pools.yml"
output = "out/pricing.json"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.sources.pools, "pools.yml");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.gpu.replacement, "nvidia-");
    }

    #[test]
    fn test_config_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let fake_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load(Some(&fake_path)).unwrap();
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "invalid toml content {").unwrap();

        assert!(Config::load(Some(&config_path)).is_err());
    }

    #[test]
    fn test_config_rejects_negative_rate() {
        let mut config = Config::default();
        config.custom_pricing.mem_per_gib_hour = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_init_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("init_test.toml");

        init_config(&config_path).unwrap();
        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.sources.gpu_costs, PathBuf::from("gpu_costs.json"));
    }
}
