use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{MovieDetail, MovieSummary};

/// Read-only access to the movie catalog. No retries happen at this layer.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_popular(&self, page: u32) -> Result<Vec<MovieSummary>>;
    async fn fetch_detail(&self, id: i32) -> Result<MovieDetail>;
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct PopularResponse {
    results: Vec<MovieSummary>,
}

impl CatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let user_agent = format!("cinefav/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::CatalogUnavailable(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language: language.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.language.clone(),
            config.request_timeout,
        )
    }

    fn url(&self, path: &str, extra: &str) -> String {
        format!(
            "{}{path}?api_key={}&language={}{extra}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.language),
        )
    }

    async fn send(&self, url: &str) -> Result<Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("request failed: {}", e.without_url())))
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(&self, what: &str, res: Response) -> Result<T> {
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| Error::CatalogUnavailable(format!("reading {what} body failed: {e}")))?;
        if !status.is_success() {
            return Err(Error::CatalogUnavailable(format!(
                "{what} -> {status}: {}",
                truncate(&text, 200)
            )));
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::CatalogUnavailable(format!("{what} JSON parse failed: {e}")))
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn fetch_popular(&self, page: u32) -> Result<Vec<MovieSummary>> {
        if page == 0 {
            return Err(Error::InvalidPage(page));
        }
        let url = self.url("/movie/popular", &format!("&page={page}"));
        debug!(page, "Fetching popular movies");
        let res = self.send(&url).await?;
        let data: PopularResponse = self.read_json("popular listing", res).await?;
        Ok(data.results)
    }

    async fn fetch_detail(&self, id: i32) -> Result<MovieDetail> {
        let url = self.url(&format!("/movie/{id}"), "");
        debug!(id, "Fetching movie detail");
        let res = self.send(&url).await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(id));
        }
        self.read_json(&format!("movie {id}"), res).await
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> CatalogClient {
        CatalogClient::new(server.url(), "test-key", "pt-BR", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn fetches_popular_page_with_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/movie/popular")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("api_key".into(), "test-key".into()),
                mockito::Matcher::UrlEncoded("language".into(), "pt-BR".into()),
                mockito::Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"page":2,"results":[{"id":1,"title":"Duna","poster_path":"/d.jpg"},{"id":2,"title":"Wicked","poster_path":null}]}"#,
            )
            .create_async()
            .await;

        let movies = client_for(&server).fetch_popular(2).await.unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].title, "Duna");
        assert!(movies[1].poster_path.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn page_zero_is_rejected_without_a_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = client_for(&server).fetch_popular(0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPage(0)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_movie_maps_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/movie/404")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body(r#"{"success":false,"status_code":34}"#)
            .create_async()
            .await;

        let err = client_for(&server).fetch_detail(404).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(404)));
    }

    #[tokio::test]
    async fn server_error_maps_to_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/movie/7")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = client_for(&server).fetch_detail(7).await.unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn malformed_payload_maps_to_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/movie/popular")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client_for(&server).fetch_popular(1).await.unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable(_)));
    }
}
