use async_trait::async_trait;
use glassbeats_core::TrackMetadata;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata unavailable: {0}")]
    Unavailable(String),
    #[error("metadata request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait MetadataResolver: Send + Sync {
    fn name(&self) -> &'static str;
    async fn resolve(&self, track_id: &str) -> Result<TrackMetadata, MetadataError>;
}

/// Tries each resolver in priority order; the first success wins.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn MetadataResolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn MetadataResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn resolver_names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

#[async_trait]
impl MetadataResolver for ResolverChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn resolve(&self, track_id: &str) -> Result<TrackMetadata, MetadataError> {
        let mut last_err = MetadataError::Unavailable("no resolvers configured".to_string());
        for resolver in &self.resolvers {
            match resolver.resolve(track_id).await {
                Ok(meta) => return Ok(meta),
                Err(err) => {
                    debug!(resolver = resolver.name(), track_id, error = %err, "resolver failed");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}
