use crate::describe;
use crate::session::Session;
use anyhow::Result;
use glassbeats_backends::{ClockBackend, MediaBackend, MetadataResolver};
use glassbeats_core::{AppConfig, Phase, StateStore};
use glassbeats_engine::PlaybackQueueEngine;
use glassbeats_metadata::{build_resolver_chain, spawn_resolution, MetadataOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

const MAX_EVENTS_PER_TICK: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Quiet,
    Changed,
    Finished,
}

/// Plays the persisted queue on the headless clock backend until the queue
/// runs out or ctrl-c. State is written back after every change.
pub(crate) async fn run(cfg: &AppConfig, store: &StateStore) -> Result<()> {
    let track_length = Duration::from_secs(cfg.playback.default_track_secs.max(1));
    let mut session = Session::open_with(cfg, store, ClockBackend::new(track_length))?;
    if session.engine.is_empty() {
        println!("Queue is empty; add tracks with `glassbeats add <url>`");
        return Ok(());
    }

    let chain = build_resolver_chain(&cfg.metadata);
    let resolver: Option<Arc<dyn MetadataResolver>> = if chain.is_empty() {
        None
    } else {
        Some(Arc::new(chain) as Arc<dyn MetadataResolver>)
    };
    let (meta_tx, mut meta_rx) = mpsc::channel::<MetadataOutcome>(16);

    session.engine.toggle_play_pause();
    let mut last_index = session.engine.state().current_index;
    announce(&session.engine);
    dispatch_metadata(&mut session.engine, resolver.as_ref(), &meta_tx);
    session.save()?;

    let poll = Duration::from_millis(cfg.playback.poll_interval_ms.max(50));
    let mut ticker = tokio::time::interval(poll);
    info!(backend = session.engine.backend().name(), ?poll, "player started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let step = tick(&mut session, Instant::now());
                if step == Tick::Quiet {
                    continue;
                }
                announce_if_changed(&session.engine, &mut last_index);
                dispatch_metadata(&mut session.engine, resolver.as_ref(), &meta_tx);
                if step == Tick::Finished {
                    info!("end of queue reached; stopping");
                    break;
                }
            }
            Some(outcome) = meta_rx.recv() => {
                if let Err(err) = apply_outcome(&mut session, outcome) {
                    warn!(error = %err, "failed to persist session");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c; shutting down");
                break;
            }
        }
    }

    session.engine.backend_mut().stop();
    session.save()
}

/// Feeds the clock's notifications at `now` to the engine and saves if any
/// arrived.
fn tick(session: &mut Session<ClockBackend>, now: Instant) -> Tick {
    let mut handled = 0;
    while handled < MAX_EVENTS_PER_TICK {
        let Some(event) = session.engine.backend_mut().poll_event_at(now) else {
            break;
        };
        session.engine.handle_backend_event(event);
        handled += 1;
    }
    if handled == 0 {
        return Tick::Quiet;
    }
    if let Err(err) = session.save() {
        warn!(error = %err, "failed to persist session");
    }
    if session.engine.state().phase() == Phase::Playing {
        Tick::Changed
    } else {
        Tick::Finished
    }
}

fn apply_outcome<B: MediaBackend>(session: &mut Session<B>, outcome: MetadataOutcome) -> Result<bool> {
    if !session.apply_outcome(outcome) {
        return Ok(false);
    }
    session.save()?;
    Ok(true)
}

fn dispatch_metadata<B: MediaBackend>(
    engine: &mut PlaybackQueueEngine<B>,
    resolver: Option<&Arc<dyn MetadataResolver>>,
    tx: &mpsc::Sender<MetadataOutcome>,
) {
    let requests = engine.take_metadata_requests();
    let Some(resolver) = resolver else {
        return;
    };
    for request in requests {
        spawn_resolution(Arc::clone(resolver), request, tx.clone());
    }
}

fn announce_if_changed<B: MediaBackend>(engine: &PlaybackQueueEngine<B>, last: &mut Option<usize>) {
    let index = engine.state().current_index;
    if index != *last {
        *last = index;
        announce(engine);
    }
}

fn announce<B: MediaBackend>(engine: &PlaybackQueueEngine<B>) {
    if let (Some(i), Some(track)) = (engine.state().current_index, engine.current_track()) {
        info!(position = i + 1, of = engine.len(), track = %describe(track), "now playing");
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_outcome, tick, Tick};
    use crate::session::Session;
    use glassbeats_backends::ClockBackend;
    use glassbeats_core::{AppConfig, Phase, StateStore, Track, TrackMetadata};
    use glassbeats_metadata::MetadataOutcome;
    use std::time::{Duration, Instant};

    const TRACK: Duration = Duration::from_secs(30);

    fn clock_session(store: &StateStore, ids: &[&str]) -> Session<ClockBackend> {
        let mut session =
            Session::open_with(&AppConfig::default(), store, ClockBackend::new(TRACK)).unwrap();
        for id in ids {
            session.engine.add_track(Track::new(*id));
        }
        session
    }

    #[test]
    fn two_tracks_play_through_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let mut session = clock_session(&store, &["aaaaaa", "bbbbbb"]);
        session.engine.toggle_play_pause();

        let start = Instant::now();
        assert_eq!(tick(&mut session, start), Tick::Changed);
        assert_eq!(session.engine.state().current_index, Some(0));
        assert_eq!(tick(&mut session, start), Tick::Quiet);

        // The second track is stamped with the real clock, so it also ends by `far`.
        let far = Instant::now() + TRACK * 3;
        assert_eq!(tick(&mut session, far), Tick::Finished);
        assert_eq!(session.engine.state().current_index, Some(1));
        assert_eq!(session.engine.state().phase(), Phase::Stopped);
        assert_eq!(session.engine.backend().loaded(), None);

        let saved = store.load_session().unwrap();
        assert_eq!(saved.current_index, Some(1));
        assert_eq!(saved.tracks.len(), 2);
    }

    #[test]
    fn outcome_for_a_removed_track_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let mut session = clock_session(&store, &["aaaaaa", "bbbbbb"]);
        let stale_key = session.engine.entries()[1].key();
        session.engine.remove_at(1).unwrap();

        let outcome = MetadataOutcome {
            key: stale_key,
            track_id: "bbbbbb".to_string(),
            result: Ok(TrackMetadata {
                title: Some("Gone".to_string()),
                ..TrackMetadata::default()
            }),
        };

        assert!(!apply_outcome(&mut session, outcome).unwrap());
        assert!(!dir.path().join("session.json").exists());
    }

    #[test]
    fn applied_outcome_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let mut session = clock_session(&store, &["aaaaaa"]);
        let key = session.engine.entries()[0].key();

        let outcome = MetadataOutcome {
            key,
            track_id: "aaaaaa".to_string(),
            result: Ok(TrackMetadata {
                title: Some("Song".to_string()),
                ..TrackMetadata::default()
            }),
        };

        assert!(apply_outcome(&mut session, outcome).unwrap());
        let saved = store.load_session().unwrap();
        assert_eq!(saved.tracks[0].display_title(), "Song");
    }
}
