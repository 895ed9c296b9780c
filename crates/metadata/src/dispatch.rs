use glassbeats_backends::{MetadataError, MetadataResolver};
use glassbeats_core::TrackMetadata;
use glassbeats_engine::{EntryKey, MetadataRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug)]
pub struct MetadataOutcome {
    pub key: EntryKey,
    pub track_id: String,
    pub result: Result<TrackMetadata, MetadataError>,
}

/// Runs one lookup in the background and reports it on `tx`.
///
/// A closed channel means the host has gone away; the result is dropped.
pub fn spawn_resolution(
    resolver: Arc<dyn MetadataResolver>,
    request: MetadataRequest,
    tx: mpsc::Sender<MetadataOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = resolve_one(resolver.as_ref(), request).await;
        if tx.send(outcome).await.is_err() {
            debug!("metadata receiver closed; outcome dropped");
        }
    })
}

/// Resolves `requests` one after another, for callers that want to wait.
pub async fn resolve_all(
    resolver: &dyn MetadataResolver,
    requests: Vec<MetadataRequest>,
) -> Vec<MetadataOutcome> {
    let mut outcomes = Vec::with_capacity(requests.len());
    for request in requests {
        outcomes.push(resolve_one(resolver, request).await);
    }
    outcomes
}

async fn resolve_one(resolver: &dyn MetadataResolver, request: MetadataRequest) -> MetadataOutcome {
    let result = resolver.resolve(&request.track_id).await;
    MetadataOutcome {
        key: request.key,
        track_id: request.track_id,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_all, spawn_resolution};
    use async_trait::async_trait;
    use glassbeats_backends::{MetadataError, MetadataResolver, NullBackend};
    use glassbeats_core::{Track, TrackMetadata};
    use glassbeats_engine::{EngineConfig, PlaybackQueueEngine};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct EchoResolver;

    #[async_trait]
    impl MetadataResolver for EchoResolver {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn resolve(&self, track_id: &str) -> Result<TrackMetadata, MetadataError> {
            if track_id.starts_with("bad") {
                return Err(MetadataError::Unavailable(track_id.to_string()));
            }
            Ok(TrackMetadata {
                title: Some(format!("Title of {track_id}")),
                ..TrackMetadata::default()
            })
        }
    }

    fn engine() -> PlaybackQueueEngine<NullBackend> {
        PlaybackQueueEngine::new(EngineConfig::default(), NullBackend)
    }

    #[tokio::test]
    async fn background_result_lands_on_the_right_track() {
        let mut engine = engine();
        engine.add_track(Track::new("first1"));
        engine.add_track(Track::new("second"));
        engine.play_at(1).unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        for request in engine.take_metadata_requests() {
            spawn_resolution(Arc::new(EchoResolver), request, tx.clone());
        }
        drop(tx);

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.track_id, "second");
        engine.move_track(1, 0).unwrap();
        assert!(engine.apply_metadata(outcome.key, outcome.result.unwrap()));
        assert_eq!(engine.track(0).unwrap().display_title(), "Title of second");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_receiver_is_harmless() {
        let mut engine = engine();
        engine.add_track(Track::new("first1"));
        engine.play_at(0).unwrap();

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let request = engine.take_metadata_requests().remove(0);
        spawn_resolution(Arc::new(EchoResolver), request, tx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn resolve_all_keeps_failures_per_request() {
        let mut engine = engine();
        engine.add_track(Track::new("good01"));
        engine.add_track(Track::new("bad001"));
        assert_eq!(engine.request_missing_metadata(), 2);

        let outcomes = resolve_all(&EchoResolver, engine.take_metadata_requests()).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        assert_eq!(
            outcomes[1].result,
            Err(MetadataError::Unavailable("bad001".to_string()))
        );
    }
}
