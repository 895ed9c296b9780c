use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    Ended,
    PlayingChanged(bool),
    DurationKnown(Duration),
}

/// Commands are requests; what actually happens comes back through
/// [`MediaBackend::poll_event`].
pub trait MediaBackend {
    fn name(&self) -> &'static str;
    fn load_and_play(&mut self, track_id: &str);
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    fn seek_to(&mut self, position: Duration);
    fn current_time(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
    fn is_currently_playing(&self) -> bool;

    fn set_volume(&mut self, _percent: u8) {}

    fn poll_event(&mut self) -> Option<BackendEvent> {
        None
    }
}

impl<B: MediaBackend + ?Sized> MediaBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn load_and_play(&mut self, track_id: &str) {
        (**self).load_and_play(track_id)
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn seek_to(&mut self, position: Duration) {
        (**self).seek_to(position)
    }

    fn current_time(&self) -> Duration {
        (**self).current_time()
    }

    fn duration(&self) -> Option<Duration> {
        (**self).duration()
    }

    fn is_currently_playing(&self) -> bool {
        (**self).is_currently_playing()
    }

    fn set_volume(&mut self, percent: u8) {
        (**self).set_volume(percent)
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        (**self).poll_event()
    }
}

#[derive(Debug, Default)]
pub struct NullBackend;

impl MediaBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn load_and_play(&mut self, _track_id: &str) {}

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn stop(&mut self) {}

    fn seek_to(&mut self, _position: Duration) {}

    fn current_time(&self) -> Duration {
        Duration::ZERO
    }

    fn duration(&self) -> Option<Duration> {
        None
    }

    fn is_currently_playing(&self) -> bool {
        false
    }
}
