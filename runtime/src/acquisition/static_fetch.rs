//! Single-request fetch parsed through the cascading extractor.

use super::extractor;
use super::http_client::HttpClient;
use super::{FetchKind, ListingFetcher};
use crate::catalog::SourceProfile;
use crate::errors::FetchError;
use crate::listing::RawRecord;
use async_trait::async_trait;

/// Fetches a search page over plain HTTP and parses it in-process.
#[derive(Clone)]
pub struct StaticFetcher {
    http: HttpClient,
}

impl StaticFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ListingFetcher for StaticFetcher {
    fn kind(&self) -> FetchKind {
        FetchKind::Static
    }

    async fn fetch(
        &self,
        source: &SourceProfile,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let url = source.search_url(query);
        tracing::debug!("{}: static GET {url}", source.id);

        let resp = self.http.get(&url).await?;
        let records = extractor::extract_records(&resp.body, source, max_results);

        tracing::debug!(
            "{}: static fetch parsed {} records from {}",
            source.id,
            records.len(),
            resp.final_url
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceCatalog;
    use crate::config::HttpConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
        <div class="product-tile">
            <h3 class="product-title">Deep Groove Ball Bearing</h3>
            <span class="mfr-number">6203-2RS</span>
            <span class="product-price">$4.10</span>
            <span class="availability">Ships today</span>
        </div>
    </body></html>"#;

    fn fetcher() -> StaticFetcher {
        StaticFetcher::new(HttpClient::new(&HttpConfig::default()).unwrap())
    }

    fn zoro_at(base: &str) -> SourceProfile {
        let mut profile = SourceCatalog::builtin().unwrap().get("zoro").unwrap().clone();
        profile.base_url = base.to_string();
        profile
    }

    #[tokio::test]
    async fn test_static_fetch_parses_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "6203 bearing"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let records = fetcher()
            .fetch(&zoro_at(&server.uri()), "6203 bearing", 10)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].part_number, "6203-2RS");
        assert_eq!(records[0].availability_text, "Ships today");
        assert_eq!(records[0].source_id, "zoro");
    }

    #[tokio::test]
    async fn test_zero_matches_is_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>No results</p>"))
            .mount(&server)
            .await;

        let records = fetcher()
            .fetch(&zoro_at(&server.uri()), "unobtainium", 10)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_http_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&zoro_at(&server.uri()), "6203", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
