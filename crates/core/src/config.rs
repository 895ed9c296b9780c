use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub auto_play_first_add: bool,
    pub restart_threshold_ms: u64,
    /// Length assumed by the headless player when a track's duration is unknown.
    pub default_track_secs: u64,
    pub poll_interval_ms: u64,
    /// Startup volume in percent, used until a session sets its own.
    pub volume: u8,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            auto_play_first_add: false,
            restart_threshold_ms: 3_000,
            default_track_secs: 210,
            poll_interval_ms: 350,
            volume: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub enabled: bool,
    pub resolvers: Vec<String>,
    pub request_timeout_ms: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resolvers: vec!["youtube".to_string(), "noembed".to_string()],
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
    pub playback: PlaybackConfig,
    pub metadata: MetadataConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: "info".to_string(),
            state_dir: None,
            playback: PlaybackConfig::default(),
            metadata: MetadataConfig::default(),
        }
    }
}
