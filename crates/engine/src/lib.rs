mod error;
mod reorder;

pub use error::EngineError;

use error::check_index;
use glassbeats_backends::{BackendEvent, MediaBackend};
use glassbeats_core::{
    AppConfig, PlaybackState, QueueSnapshot, RepeatMode, Track, TrackMetadata,
    SNAPSHOT_SCHEMA_VERSION,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reorder::{index_after_move, index_after_remove};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound per [`PlaybackQueueEngine::poll_backend`] call.
const MAX_EVENTS_PER_POLL: usize = 64;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub auto_play_first_add: bool,
    pub restart_threshold: Duration,
    pub volume: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_play_first_add: false,
            restart_threshold: Duration::from_secs(3),
            volume: 100,
        }
    }
}

impl EngineConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            auto_play_first_add: cfg.playback.auto_play_first_add,
            restart_threshold: Duration::from_millis(cfg.playback.restart_threshold_ms),
            volume: cfg.playback.volume,
        }
    }
}

/// Identity of a queue slot. Survives reorders; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    key: EntryKey,
    track: Track,
}

impl QueueEntry {
    pub fn key(&self) -> EntryKey {
        self.key
    }

    pub fn track(&self) -> &Track {
        &self.track
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    pub key: EntryKey,
    pub track_id: String,
}

pub struct PlaybackQueueEngine<B> {
    cfg: EngineConfig,
    backend: B,
    entries: Vec<QueueEntry>,
    up_next: VecDeque<String>,
    state: PlaybackState,
    next_key: u64,
    pending_metadata: Vec<MetadataRequest>,
    rng: StdRng,
    volume: u8,
}

impl<B: MediaBackend> PlaybackQueueEngine<B> {
    pub fn new(cfg: EngineConfig, mut backend: B) -> Self {
        let volume = cfg.volume.min(100);
        backend.set_volume(volume);
        Self {
            cfg,
            backend,
            entries: Vec::new(),
            up_next: VecDeque::new(),
            state: PlaybackState::default(),
            next_key: 0,
            pending_metadata: Vec::new(),
            rng: StdRng::from_entropy(),
            volume,
        }
    }

    /// Restores a persisted session. Playback is never resumed automatically.
    pub fn from_snapshot(cfg: EngineConfig, backend: B, snapshot: QueueSnapshot) -> Self {
        let mut engine = Self::new(cfg, backend);
        let mut entries = Vec::with_capacity(snapshot.tracks.len());
        for track in snapshot.tracks {
            entries.push(engine.make_entry(track));
        }
        engine.entries = entries;
        engine.up_next = snapshot.up_next.into();
        engine.state = PlaybackState {
            current_index: snapshot
                .current_index
                .filter(|&i| i < engine.entries.len()),
            is_playing: false,
            shuffle_enabled: snapshot.shuffle_enabled,
            repeat_mode: snapshot.repeat_mode,
            stopped: true,
        };
        if let Some(volume) = snapshot.volume {
            engine.set_volume(volume);
        }
        debug!(
            tracks = engine.entries.len(),
            current = ?engine.state.current_index,
            "engine restored from snapshot"
        );
        engine
    }

    /// Replaces the shuffle RNG with a seeded one for reproducible picks.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            tracks: self.tracks().cloned().collect(),
            current_index: self.state.current_index,
            shuffle_enabled: self.state.shuffle_enabled,
            repeat_mode: self.state.repeat_mode,
            up_next: self.up_next.iter().cloned().collect(),
            volume: Some(self.volume),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> + '_ {
        self.entries.iter().map(|e| &e.track)
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.entries.get(index).map(|e| &e.track)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.state.current_index.and_then(|i| self.track(i))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn add_track(&mut self, track: Track) -> usize {
        let was_empty = self.entries.is_empty();
        let entry = self.make_entry(track);
        debug!(id = %entry.track.id, "track added");
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        if was_empty && self.cfg.auto_play_first_add {
            self.start(index);
        }
        index
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Track, EngineError> {
        check_index(index, self.entries.len())?;
        let entry = self.entries.remove(index);
        if self.state.current_index == Some(index) {
            self.backend.stop();
            self.state.current_index = None;
            self.state.is_playing = false;
            self.state.stopped = false;
            info!(id = %entry.track.id, "removed the playing track; playback stopped");
        } else {
            self.state.current_index = index_after_remove(self.state.current_index, index);
        }
        self.pending_metadata.retain(|r| r.key != entry.key);
        Ok(entry.track)
    }

    pub fn move_track(&mut self, from: usize, to: usize) -> Result<(), EngineError> {
        let len = self.entries.len();
        check_index(from, len)?;
        check_index(to, len)?;
        if from == to {
            return Ok(());
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        self.state.current_index = index_after_move(self.state.current_index, from, to);
        debug!(from, to, current = ?self.state.current_index, "track moved");
        Ok(())
    }

    pub fn play_at(&mut self, index: usize) -> Result<(), EngineError> {
        if self.entries.is_empty() {
            return Err(EngineError::EmptyQueue);
        }
        check_index(index, self.entries.len())?;
        self.start(index);
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) {
        let Some(current) = self.state.current_index else {
            if !self.entries.is_empty() {
                self.start(0);
            }
            return;
        };

        if self.backend.is_currently_playing() {
            self.backend.pause();
            self.state.is_playing = false;
        } else if self.state.stopped {
            self.start(current);
        } else {
            self.backend.resume();
            self.state.is_playing = true;
        }
    }

    pub fn play_next(&mut self) {
        if let Some(id) = self.up_next.pop_front() {
            let index = self.locate_or_append(id);
            self.start(index);
            return;
        }

        let len = self.entries.len();
        if self.state.repeat_mode == RepeatMode::One {
            if let Some(current) = self.state.current_index {
                self.start(current);
                return;
            }
        }

        // The current index is deliberately not excluded from the draw.
        if self.state.shuffle_enabled && len > 1 {
            let index = self.rng.gen_range(0..len);
            self.start(index);
            return;
        }

        let next = self.state.current_index.map_or(0, |i| i + 1);
        if next < len {
            self.start(next);
        } else if self.state.repeat_mode == RepeatMode::All && len > 0 {
            self.start(0);
        } else {
            self.backend.stop();
            self.state.is_playing = false;
            self.state.stopped = true;
            info!(current = ?self.state.current_index, "end of queue reached");
        }
    }

    pub fn play_previous(&mut self) {
        let current = self.state.current_index;
        if current.is_some() && self.backend.current_time() > self.cfg.restart_threshold {
            self.backend.seek_to(Duration::ZERO);
            return;
        }

        match current {
            Some(cur) if cur > 0 => self.start(cur - 1),
            _ if self.state.repeat_mode == RepeatMode::All && !self.entries.is_empty() => {
                self.start(self.entries.len() - 1)
            }
            Some(_) => self.backend.seek_to(Duration::ZERO),
            None => {}
        }
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.state.shuffle_enabled = enabled;
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.state.shuffle_enabled = !self.state.shuffle_enabled;
        self.state.shuffle_enabled
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.state.repeat_mode = mode;
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.state.repeat_mode = self.state.repeat_mode.cycle();
        self.state.repeat_mode
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Clamped to 100.
    pub fn set_volume(&mut self, percent: u8) {
        self.volume = percent.min(100);
        self.backend.set_volume(self.volume);
    }

    pub fn on_backend_track_ended(&mut self) {
        self.play_next();
    }

    pub fn on_backend_playing_changed(&mut self, playing: bool) {
        self.state.is_playing = playing && self.state.current_index.is_some();
        if self.state.is_playing {
            self.state.stopped = false;
        }
    }

    pub fn on_backend_duration(&mut self, duration: Duration) {
        if let Some(i) = self.state.current_index {
            self.entries[i].track.duration_secs = Some(duration.as_secs());
        }
    }

    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Ended => self.on_backend_track_ended(),
            BackendEvent::PlayingChanged(playing) => self.on_backend_playing_changed(playing),
            BackendEvent::DurationKnown(duration) => self.on_backend_duration(duration),
        }
    }

    pub fn poll_backend(&mut self) -> usize {
        let mut handled = 0;
        while handled < MAX_EVENTS_PER_POLL {
            let Some(event) = self.backend.poll_event() else {
                break;
            };
            self.handle_backend_event(event);
            handled += 1;
        }
        handled
    }

    pub fn progress(&self) -> Option<(Duration, Option<Duration>)> {
        self.state.current_index?;
        Some((self.backend.current_time(), self.backend.duration()))
    }

    /// Ignored while the duration is unknown.
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        if self.state.current_index.is_none() || !fraction.is_finite() {
            return;
        }
        if let Some(duration) = self.backend.duration() {
            self.backend
                .seek_to(duration.mul_f64(fraction.clamp(0.0, 1.0)));
        }
    }

    pub fn take_metadata_requests(&mut self) -> Vec<MetadataRequest> {
        std::mem::take(&mut self.pending_metadata)
    }

    pub fn request_missing_metadata(&mut self) -> usize {
        let missing: Vec<usize> = (0..self.entries.len())
            .filter(|&i| self.entries[i].track.needs_metadata())
            .collect();
        for &i in &missing {
            self.request_metadata(i);
        }
        missing.len()
    }

    /// Returns `false` when the slot has been removed in the meantime.
    pub fn apply_metadata(&mut self, key: EntryKey, meta: TrackMetadata) -> bool {
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.track.apply_metadata(meta);
                debug!(id = %entry.track.id, title = entry.track.display_title(), "metadata applied");
                true
            }
            None => {
                debug!(?key, "metadata for a removed track dropped");
                false
            }
        }
    }

    pub fn up_next(&self) -> impl Iterator<Item = &str> + '_ {
        self.up_next.iter().map(String::as_str)
    }

    pub fn enqueue(&mut self, track_id: impl Into<String>) {
        self.up_next.push_back(track_id.into());
    }

    pub fn remove_up_next(&mut self, index: usize) -> Result<String, EngineError> {
        let len = self.up_next.len();
        self.up_next
            .remove(index)
            .ok_or(EngineError::IndexOutOfRange { index, len })
    }

    pub fn clear_up_next(&mut self) {
        self.up_next.clear();
    }

    /// Returns the queue index the entry was played at.
    pub fn play_up_next(&mut self, index: usize) -> Result<usize, EngineError> {
        let id = self.remove_up_next(index)?;
        let queue_index = self.locate_or_append(id);
        self.start(queue_index);
        Ok(queue_index)
    }

    pub fn replace_tracks(&mut self, tracks: Vec<Track>) {
        self.backend.stop();
        let mut entries = Vec::with_capacity(tracks.len());
        for track in tracks {
            entries.push(self.make_entry(track));
        }
        self.entries = entries;
        self.up_next.clear();
        self.pending_metadata.clear();
        self.state.current_index = None;
        self.state.is_playing = false;
        self.state.stopped = false;
        info!(tracks = self.entries.len(), "track list replaced");
    }

    fn make_entry(&mut self, track: Track) -> QueueEntry {
        let key = EntryKey(self.next_key);
        self.next_key += 1;
        QueueEntry { key, track }
    }

    fn locate_or_append(&mut self, id: String) -> usize {
        match self.entries.iter().position(|e| e.track.id == id) {
            Some(index) => index,
            None => {
                let entry = self.make_entry(Track::new(id));
                self.entries.push(entry);
                self.entries.len() - 1
            }
        }
    }

    fn start(&mut self, index: usize) {
        self.state.current_index = Some(index);
        let id = self.entries[index].track.id.clone();
        self.backend.load_and_play(&id);
        self.state.is_playing = true;
        self.state.stopped = false;
        info!(index, id = %id, "playing");
        if self.entries[index].track.needs_metadata() {
            self.request_metadata(index);
        }
    }

    fn request_metadata(&mut self, index: usize) {
        let entry = &self.entries[index];
        if self.pending_metadata.iter().any(|r| r.key == entry.key) {
            return;
        }
        self.pending_metadata.push(MetadataRequest {
            key: entry.key,
            track_id: entry.track.id.clone(),
        });
    }
}
