use crate::media::{BackendEvent, MediaBackend};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

/// Headless player that only keeps time. Every track lasts `track_length`.
#[derive(Debug)]
pub struct ClockBackend {
    track_length: Duration,
    loaded: Option<String>,
    playing: bool,
    started_at: Option<Instant>,
    accumulated: Duration,
    volume: u8,
    events: VecDeque<BackendEvent>,
}

impl ClockBackend {
    pub fn new(track_length: Duration) -> Self {
        Self {
            track_length,
            loaded: None,
            playing: false,
            started_at: None,
            accumulated: Duration::ZERO,
            volume: 100,
            events: VecDeque::new(),
        }
    }

    pub fn loaded(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn position_at(&self, now: Instant) -> Duration {
        let running = match (self.playing, self.started_at) {
            (true, Some(at)) => now.saturating_duration_since(at),
            _ => Duration::ZERO,
        };
        (self.accumulated + running).min(self.track_length)
    }

    /// Same as [`MediaBackend::poll_event`] with an explicit clock reading.
    pub fn poll_event_at(&mut self, now: Instant) -> Option<BackendEvent> {
        if let Some(ev) = self.events.pop_front() {
            return Some(ev);
        }
        if self.playing && self.position_at(now) >= self.track_length {
            debug!(track = ?self.loaded, "clock backend reached end of track");
            self.playing = false;
            self.started_at = None;
            self.accumulated = self.track_length;
            return Some(BackendEvent::Ended);
        }
        None
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.events.push_back(BackendEvent::PlayingChanged(playing));
        }
    }
}

impl MediaBackend for ClockBackend {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn load_and_play(&mut self, track_id: &str) {
        self.loaded = Some(track_id.to_string());
        self.accumulated = Duration::ZERO;
        self.started_at = Some(Instant::now());
        self.set_playing(true);
        self.events
            .push_back(BackendEvent::DurationKnown(self.track_length));
    }

    fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.accumulated = self.position_at(Instant::now());
        self.started_at = None;
        self.set_playing(false);
    }

    fn resume(&mut self) {
        if self.loaded.is_none() || self.playing {
            return;
        }
        if self.accumulated >= self.track_length {
            self.accumulated = Duration::ZERO;
        }
        self.started_at = Some(Instant::now());
        self.set_playing(true);
    }

    fn stop(&mut self) {
        self.loaded = None;
        self.accumulated = Duration::ZERO;
        self.started_at = None;
        self.set_playing(false);
    }

    fn seek_to(&mut self, position: Duration) {
        if self.loaded.is_none() {
            return;
        }
        self.accumulated = position.min(self.track_length);
        if self.playing {
            self.started_at = Some(Instant::now());
        }
    }

    fn current_time(&self) -> Duration {
        self.position_at(Instant::now())
    }

    fn duration(&self) -> Option<Duration> {
        self.loaded.as_ref().map(|_| self.track_length)
    }

    fn is_currently_playing(&self) -> bool {
        self.playing
    }

    fn set_volume(&mut self, percent: u8) {
        self.volume = percent.min(100);
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.poll_event_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::ClockBackend;
    use crate::media::{BackendEvent, MediaBackend};
    use std::time::{Duration, Instant};

    fn drain(backend: &mut ClockBackend, now: Instant) -> Vec<BackendEvent> {
        std::iter::from_fn(|| backend.poll_event_at(now)).collect()
    }

    #[test]
    fn reports_start_then_end_of_track() {
        let mut backend = ClockBackend::new(Duration::from_secs(30));
        backend.load_and_play("aaaaaa");

        let now = Instant::now();
        assert_eq!(
            drain(&mut backend, now),
            vec![
                BackendEvent::PlayingChanged(true),
                BackendEvent::DurationKnown(Duration::from_secs(30)),
            ]
        );

        let later = now + Duration::from_secs(31);
        assert_eq!(backend.poll_event_at(later), Some(BackendEvent::Ended));
        assert!(!backend.is_currently_playing());
        assert_eq!(backend.poll_event_at(later), None);
    }

    #[test]
    fn pause_freezes_position_and_seek_moves_it() {
        let mut backend = ClockBackend::new(Duration::from_secs(30));
        backend.load_and_play("aaaaaa");
        backend.seek_to(Duration::from_secs(12));
        backend.pause();

        let pos = backend.current_time();
        assert!(pos >= Duration::from_secs(12) && pos < Duration::from_secs(13));
        let far = Instant::now() + Duration::from_secs(600);
        assert_eq!(backend.position_at(far), pos);
        assert!(!drain(&mut backend, far).contains(&BackendEvent::Ended));

        backend.seek_to(Duration::from_secs(99));
        assert_eq!(backend.current_time(), Duration::from_secs(30));
    }

    #[test]
    fn stop_unloads_and_ignores_seek_and_resume() {
        let mut backend = ClockBackend::new(Duration::from_secs(30));
        backend.load_and_play("aaaaaa");
        backend.stop();
        backend.seek_to(Duration::from_secs(5));
        backend.resume();

        assert_eq!(backend.loaded(), None);
        assert_eq!(backend.duration(), None);
        assert!(!backend.is_currently_playing());
        assert_eq!(backend.current_time(), Duration::ZERO);
    }
}
