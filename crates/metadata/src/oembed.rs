use async_trait::async_trait;
use glassbeats_backends::{MetadataError, MetadataResolver};
use glassbeats_core::{refs, TrackMetadata};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
    /// noembed answers 200 with an `error` field for unknown ids.
    error: Option<String>,
}

/// Resolves display metadata through an oEmbed endpoint.
pub struct OembedResolver {
    name: &'static str,
    client: Client,
    endpoint: fn(&str) -> String,
}

impl OembedResolver {
    pub fn youtube(client: Client) -> Self {
        Self {
            name: "youtube",
            client,
            endpoint: refs::oembed_url,
        }
    }

    pub fn noembed(client: Client) -> Self {
        Self {
            name: "noembed",
            client,
            endpoint: refs::noembed_url,
        }
    }
}

#[async_trait]
impl MetadataResolver for OembedResolver {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn resolve(&self, track_id: &str) -> Result<TrackMetadata, MetadataError> {
        let url = (self.endpoint)(track_id);
        debug!(resolver = self.name, %url, "requesting oembed metadata");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| MetadataError::Request(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MetadataError::Unavailable(format!(
                "{} answered {status}",
                self.name
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|err| MetadataError::Request(err.to_string()))?;
        parse_oembed(&body)
    }
}

pub(crate) fn parse_oembed(body: &[u8]) -> Result<TrackMetadata, MetadataError> {
    let parsed: OembedResponse = serde_json::from_slice(body)
        .map_err(|err| MetadataError::Unavailable(format!("malformed oembed body: {err}")))?;

    if let Some(err) = parsed.error {
        return Err(MetadataError::Unavailable(err));
    }

    let title = parsed
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MetadataError::Unavailable("oembed body has no title".to_string()))?;

    Ok(TrackMetadata {
        title: Some(title),
        artist: parsed.author_name,
        thumbnail_url: parsed.thumbnail_url,
    })
}
