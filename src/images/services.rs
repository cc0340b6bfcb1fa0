use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

/// One search hit; any of the URLs may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageHit {
    pub large: Option<String>,
    pub web_format: Option<String>,
    pub preview: Option<String>,
}

impl ImageHit {
    /// Best available URL: large, then web format, then preview.
    pub fn best_url(&self) -> Option<&str> {
        [&self.large, &self.web_format, &self.preview]
            .into_iter()
            .filter_map(|u| u.as_deref())
            .find(|u| !u.trim().is_empty())
    }
}

/// Keyed image search. Implementations degrade every failure to "no hits".
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search(&self, query: &str) -> Vec<ImageHit>;
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn placeholder_url(dish: &str) -> String {
    format!("https://source.unsplash.com/800x600/?food,{}", dish.replace(' ', "+"))
}

/// Picks an image URL for a dish: existing URL, then search, then a placeholder.
#[derive(Clone, Default)]
pub struct ImageResolver {
    search: Option<Arc<dyn ImageSearch>>,
}

impl ImageResolver {
    pub fn new(search: Arc<dyn ImageSearch>) -> Self {
        Self {
            search: Some(search),
        }
    }

    pub fn disabled() -> Self {
        Self { search: None }
    }

    pub async fn resolve(&self, dish_name: Option<&str>, existing: Option<&str>) -> String {
        // Returned as given; only the scheme is checked.
        if let Some(url) = existing.filter(|u| is_http_url(u)) {
            return url.to_string();
        }
        let dish = dish_name
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or("meal");

        if let Some(search) = &self.search {
            let hits = search.search(&format!("food {dish}")).await;
            if let Some(url) = hits
                .first()
                .and_then(ImageHit::best_url)
                .filter(|u| is_http_url(u))
            {
                return url.to_string();
            }
            debug!(%dish, "no usable image hit; using placeholder");
        }
        placeholder_url(dish)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FixedSearch {
        hits: Vec<ImageHit>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageSearch for FixedSearch {
        async fn search(&self, _query: &str) -> Vec<ImageHit> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.hits.clone()
        }
    }

    fn resolver_with(hits: Vec<ImageHit>) -> (ImageResolver, Arc<FixedSearch>) {
        let search = Arc::new(FixedSearch {
            hits,
            calls: AtomicUsize::new(0),
        });
        (ImageResolver::new(search.clone()), search)
    }

    #[tokio::test]
    async fn existing_url_short_circuits() {
        let (resolver, search) = resolver_with(vec![]);
        for dish in [Some("Pad thai"), None] {
            assert_eq!(resolver.resolve(dish, Some("http://x")).await, "http://x");
        }
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn existing_url_is_returned_verbatim() {
        let resolver = ImageResolver::disabled();
        assert_eq!(
            resolver.resolve(Some("tea"), Some("https://img/tea.jpg ")).await,
            "https://img/tea.jpg "
        );
        assert_eq!(
            resolver.resolve(Some("tea"), Some(" https://img/tea.jpg")).await,
            "https://source.unsplash.com/800x600/?food,tea"
        );
    }

    #[tokio::test]
    async fn prefers_large_then_web_then_preview() {
        let hit = ImageHit {
            large: None,
            web_format: Some("https://cdn/web.jpg".into()),
            preview: Some("https://cdn/preview.jpg".into()),
        };
        let (resolver, _) = resolver_with(vec![hit]);
        assert_eq!(
            resolver.resolve(Some("soup"), Some("not a url")).await,
            "https://cdn/web.jpg"
        );
    }

    #[tokio::test]
    async fn empty_results_fall_back_to_placeholder() {
        let (resolver, _) = resolver_with(vec![ImageHit::default()]);
        assert_eq!(
            resolver.resolve(Some("green curry"), None).await,
            "https://source.unsplash.com/800x600/?food,green+curry"
        );
    }

    #[tokio::test]
    async fn disabled_search_never_returns_empty() {
        let resolver = ImageResolver::disabled();
        for (dish, existing) in [(None, None), (Some(""), Some("")), (Some("  "), Some("ftp://x"))] {
            let url = resolver.resolve(dish, existing).await;
            assert!(!url.is_empty());
            assert_eq!(url, "https://source.unsplash.com/800x600/?food,meal");
        }
    }
}
