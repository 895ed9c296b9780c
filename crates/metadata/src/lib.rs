mod dispatch;
mod oembed;

pub use dispatch::{resolve_all, spawn_resolution, MetadataOutcome};
pub use oembed::OembedResolver;

use glassbeats_backends::{MetadataResolver, ResolverChain};
use glassbeats_core::MetadataConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

const USER_AGENT: &str = concat!("glassbeats/", env!("CARGO_PKG_VERSION"));

/// Builds the resolver chain named by `cfg.resolvers`, in that order.
/// Unknown names are skipped with a warning.
pub fn build_resolver_chain(cfg: &MetadataConfig) -> ResolverChain {
    let client = Client::builder()
        .timeout(Duration::from_millis(cfg.request_timeout_ms))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|err| {
            warn!(error = %err, "failed to build http client; using defaults");
            Client::new()
        });

    let mut resolvers: Vec<Box<dyn MetadataResolver>> = Vec::new();
    if !cfg.enabled {
        return ResolverChain::new(resolvers);
    }

    for name in &cfg.resolvers {
        match name.as_str() {
            "youtube" => resolvers.push(Box::new(OembedResolver::youtube(client.clone()))),
            "noembed" => resolvers.push(Box::new(OembedResolver::noembed(client.clone()))),
            other => warn!(resolver = other, "unknown metadata resolver; skipping"),
        }
    }

    ResolverChain::new(resolvers)
}

#[cfg(test)]
mod tests {
    use super::build_resolver_chain;
    use glassbeats_core::MetadataConfig;

    #[test]
    fn chain_follows_configured_order() {
        let cfg = MetadataConfig {
            resolvers: vec!["noembed".to_string(), "bogus".to_string(), "youtube".to_string()],
            ..MetadataConfig::default()
        };
        assert_eq!(build_resolver_chain(&cfg).resolver_names(), vec!["noembed", "youtube"]);
    }

    #[test]
    fn disabled_metadata_builds_an_empty_chain() {
        let cfg = MetadataConfig {
            enabled: false,
            ..MetadataConfig::default()
        };
        assert!(build_resolver_chain(&cfg).is_empty());
    }
}
