use anyhow::{Context, Result};
use glassbeats_backends::{MediaBackend, NullBackend};
use glassbeats_core::{AppConfig, StateStore};
use glassbeats_engine::{EngineConfig, PlaybackQueueEngine};
use glassbeats_metadata::MetadataOutcome;
use tracing::debug;

/// An engine hydrated from the state store, written back with [`Session::save`].
pub(crate) struct Session<B: MediaBackend = NullBackend> {
    store: StateStore,
    pub(crate) engine: PlaybackQueueEngine<B>,
}

impl Session<NullBackend> {
    /// Session for one-shot edits: nothing is actually played.
    pub(crate) fn open(cfg: &AppConfig, store: &StateStore) -> Result<Self> {
        Self::open_with(cfg, store, NullBackend)
    }
}

impl<B: MediaBackend> Session<B> {
    pub(crate) fn open_with(cfg: &AppConfig, store: &StateStore, backend: B) -> Result<Self> {
        let snapshot = store
            .load_session()
            .with_context(|| format!("failed to load session from {}", store.dir().display()))?;
        let engine =
            PlaybackQueueEngine::from_snapshot(EngineConfig::from_app_config(cfg), backend, snapshot);
        debug!(backend = engine.backend().name(), tracks = engine.len(), "session opened");
        Ok(Self {
            store: store.clone(),
            engine,
        })
    }

    pub(crate) fn save(&self) -> Result<()> {
        self.store
            .save_session(&self.engine.snapshot())
            .with_context(|| format!("failed to save session to {}", self.store.dir().display()))
    }

    /// Returns `true` when a track's display fields changed.
    pub(crate) fn apply_outcome(&mut self, outcome: MetadataOutcome) -> bool {
        match outcome.result {
            Ok(meta) => self.engine.apply_metadata(outcome.key, meta),
            Err(err) => {
                debug!(track_id = %outcome.track_id, error = %err, "metadata unavailable; keeping id as title");
                false
            }
        }
    }
}
