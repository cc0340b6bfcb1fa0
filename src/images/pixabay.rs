use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{instrument, warn};

use super::services::{ImageHit, ImageSearch};
use crate::config::PixabayConfig;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
    #[serde(rename = "webformatURL")]
    webformat_url: Option<String>,
    #[serde(rename = "previewURL")]
    preview_url: Option<String>,
}

impl From<Hit> for ImageHit {
    fn from(h: Hit) -> Self {
        Self {
            large: h.large_image_url,
            web_format: h.webformat_url,
            preview: h.preview_url,
        }
    }
}

pub struct PixabaySearch {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PixabaySearch {
    /// Returns `None` when no key is configured.
    pub fn from_config(cfg: &PixabayConfig) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = cfg.api_key.clone() else {
            return Ok(None);
        };
        let client = Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Some(Self {
            client,
            api_key,
            base_url: cfg.base_url.clone(),
        }))
    }

    async fn try_search(&self, query: &str) -> Result<Vec<ImageHit>, reqwest::Error> {
        let response: SearchResponse = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query),
                ("image_type", "photo"),
                ("per_page", "3"),
                ("safesearch", "true"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.hits.into_iter().map(ImageHit::from).collect())
    }
}

#[async_trait]
impl ImageSearch for PixabaySearch {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Vec<ImageHit> {
        match self.try_search(query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "pixabay search failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::services::ImageResolver;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn search_for(base_url: String) -> PixabaySearch {
        PixabaySearch::from_config(&PixabayConfig {
            api_key: Some("pk".into()),
            base_url,
        })
        .unwrap()
        .unwrap()
    }

    #[tokio::test]
    async fn maps_hits_from_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("key", "pk"))
            .and(query_param("q", "food ramen"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "hits": [{"largeImageURL": "https://px/large.jpg", "previewURL": "https://px/p.jpg"}]
            })))
            .mount(&server)
            .await;

        let resolver = ImageResolver::new(Arc::new(search_for(server.uri())));
        assert_eq!(
            resolver.resolve(Some("ramen"), None).await,
            "https://px/large.jpg"
        );
    }

    #[tokio::test]
    async fn provider_errors_degrade_to_no_hits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let search = search_for(server.uri());
        assert!(search.search("food toast").await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_provider_still_resolves() {
        let resolver = ImageResolver::new(Arc::new(search_for("http://127.0.0.1:9".into())));
        assert_eq!(
            resolver.resolve(Some("toast"), None).await,
            "https://source.unsplash.com/800x600/?food,toast"
        );
    }

    #[test]
    fn missing_key_disables_search() {
        let cfg = PixabayConfig {
            api_key: None,
            base_url: "http://unused".into(),
        };
        assert!(PixabaySearch::from_config(&cfg).unwrap().is_none());
    }
}
