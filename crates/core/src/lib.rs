pub mod config;
pub mod model;
pub mod refs;
pub mod store;

pub use config::{AppConfig, MetadataConfig, PlaybackConfig};
pub use model::{
    Phase, PlaybackState, QueueSnapshot, RepeatMode, SavedPlaylist, Track, TrackMetadata,
    SNAPSHOT_SCHEMA_VERSION,
};
pub use store::{Playlists, StateStore, StoreError};
