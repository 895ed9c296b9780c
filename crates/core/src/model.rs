use serde::{Deserialize, Serialize};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

fn default_snapshot_schema() -> u32 {
    SNAPSHOT_SCHEMA_VERSION
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop once the last track has finished.
    #[default]
    Off,
    /// Wrap around to the first track.
    All,
    /// Replay the current track when it ends.
    One,
}

impl RepeatMode {
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }
}

impl std::str::FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(RepeatMode::Off),
            "all" => Ok(RepeatMode::All),
            "one" | "single" => Ok(RepeatMode::One),
            other => Err(format!("unknown repeat mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing,
    Paused,
    /// A track is selected but the backend has nothing loaded.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub stopped: bool,
}

impl PlaybackState {
    pub fn phase(&self) -> Phase {
        match (self.current_index, self.is_playing) {
            (None, _) => Phase::Idle,
            (Some(_), true) => Phase::Playing,
            (Some(_), false) if self.stopped => Phase::Stopped,
            (Some(_), false) => Phase::Paused,
        }
    }
}

/// Display fields produced by a metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl Track {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            artist: None,
            thumbnail_url: None,
            duration_secs: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Title if resolved, otherwise the identifier.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    /// A title equal to the identifier is a placeholder, not a resolved one.
    pub fn needs_metadata(&self) -> bool {
        match self.title.as_deref() {
            None => true,
            Some(t) => t.trim().is_empty() || t == self.id,
        }
    }

    /// Copies any non-empty fields of `meta` over the display fields.
    pub fn apply_metadata(&mut self, meta: TrackMetadata) {
        if let Some(title) = meta.title.filter(|t| !t.trim().is_empty()) {
            self.title = Some(title);
        }
        if let Some(artist) = meta.artist.filter(|a| !a.trim().is_empty()) {
            self.artist = Some(artist);
        }
        if let Some(thumb) = meta.thumbnail_url.filter(|u| !u.trim().is_empty()) {
            self.thumbnail_url = Some(thumb);
        }
    }
}

/// Everything needed to restore a session after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default = "default_snapshot_schema")]
    pub schema_version: u32,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub current_index: Option<usize>,
    #[serde(default)]
    pub shuffle_enabled: bool,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub up_next: Vec<String>,
    /// Percent; `None` falls back to the configured volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u8>,
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            tracks: Vec::new(),
            current_index: None,
            shuffle_enabled: false,
            repeat_mode: RepeatMode::Off,
            up_next: Vec::new(),
            volume: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPlaylist {
    pub tracks: Vec<Track>,
    /// Unix seconds.
    pub saved_at: u64,
}
