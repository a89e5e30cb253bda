use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trellis_client::EngineConfig;

pub const DEFAULT_CONFIG_NAME: &str = "trellis.config.json";

/// Trellis configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Engine settings used by `replay`
    #[serde(default)]
    pub engine: EngineConfig,

    /// Location the replayed page pretends to be served from
    #[serde(default = "default_location")]
    pub location: String,
}

fn default_location() -> String {
    "http://localhost/".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        Self::load_file(&cwd.join(DEFAULT_CONFIG_NAME))
    }

    /// Load an explicit config file, or defaults if it does not exist
    pub fn load_file(config_path: &Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn resolve(cwd: &Path, explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) if !path.exists() => {
                anyhow::bail!("Config file does not exist: {}", path.display())
            }
            Some(path) => Self::load_file(&path),
            None => Self::load(cwd),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            location: default_location(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "engine": { "coalesceDelayMs": 250, "clientSideDebugging": true },
            "location": "https://app.example/page"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.engine.coalesce_delay_ms, 250);
        assert!(config.engine.client_side_debugging);
        assert_eq!(config.engine.max_inflight, 1);
        assert_eq!(config.location, "https://app.example/page");
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = std::env::temp_dir().join("trellis-cli-no-config");
        let config = Config::load(&dir).unwrap();
        assert_eq!(config.location, "http://localhost/");
        assert_eq!(config.engine.coalesce_delay_ms, 1000);
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = std::env::temp_dir();
        let missing = dir.join("trellis-cli-missing.config.json");
        assert!(Config::resolve(&dir, Some(missing)).is_err());
    }
}
