use serde::{Deserialize, Serialize};
use std::time::Duration;
use trellis_segments::MarkerConfig;

/// Per-session engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Outbound blocks allowed without acknowledgment
    pub max_inflight: u32,

    /// How long coalesced events wait for a newer value
    pub coalesce_delay_ms: u64,

    /// Raise an alert when an event cannot be traced to a segment
    pub client_side_debugging: bool,

    pub markers: MarkerConfig,
}

impl EngineConfig {
    pub fn coalesce_delay(&self) -> Duration {
        Duration::from_millis(self.coalesce_delay_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_inflight: 1,
            coalesce_delay_ms: 1000,
            client_side_debugging: false,
            markers: MarkerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "maxInflight": 2,
            "clientSideDebugging": true,
            "markers": { "placeholderClass": "__lch_seg_placeholder" }
        }"#;

        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_inflight, 2);
        assert_eq!(config.coalesce_delay(), Duration::from_secs(1));
        assert!(config.client_side_debugging);
        assert_eq!(config.markers.placeholder_class, "__lch_seg_placeholder");
        assert_eq!(config.markers.begin_class, "begin");
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_inflight, 1);
        assert_eq!(config.coalesce_delay_ms, 1000);
        assert!(!config.client_side_debugging);
    }
}
