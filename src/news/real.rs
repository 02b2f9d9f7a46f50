use crate::news::{Article, NewsClientTrait, NewsQuery};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// NewsAPI client (`/everything` endpoint).
pub struct RealNewsClient {
    http: reqwest::Client,
    api_key: String,
    everything_url: Url,
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

impl From<RawArticle> for Article {
    fn from(raw: RawArticle) -> Self {
        Article {
            title: raw.title,
            description: raw.description,
            url: raw.url,
            published_at: raw.published_at,
            source: raw.source.and_then(|s| s.name),
        }
    }
}

impl RealNewsClient {
    pub fn new(api_key: String, api_base: &str) -> Result<Self> {
        let base = Url::parse(api_base)
            .with_context(|| format!("Invalid news API base URL {}", api_base))?;
        let everything_url = Url::parse(&format!(
            "{}/everything",
            base.as_str().trim_end_matches('/')
        ))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_key,
            everything_url,
        })
    }
}

/// Builds a client when an API key is configured; without one the news
/// integration stays off.
pub fn maybe_create_news_client(
    api_key: Option<String>,
    api_base: &str,
) -> Result<Arc<dyn NewsClientTrait>> {
    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("News API key not configured"))?;
    Ok(Arc::new(RealNewsClient::new(api_key, api_base)?))
}

#[async_trait]
impl NewsClientTrait for RealNewsClient {
    #[instrument(skip(self), err)]
    async fn search_news(&self, query: &NewsQuery) -> Result<Vec<Article>> {
        let from_date = (chrono::Utc::now()
            - chrono::Duration::days(query.days_back))
        .format("%Y-%m-%d")
        .to_string();
        let page_size = query.max_results.to_string();

        let response = self
            .http
            .get(self.everything_url.clone())
            .query(&[
                ("q", query.query.as_str()),
                ("language", query.language.as_str()),
                ("from", from_date.as_str()),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("NewsAPI error: {}", status);
            return Err(anyhow::anyhow!("NewsAPI returned status {}", status));
        }

        let body: EverythingResponse = response.json().await?;
        Ok(body.articles.into_iter().map(Article::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v2", addr)
    }

    #[test]
    fn requires_api_key_and_valid_base() {
        assert!(maybe_create_news_client(None, "https://newsapi.org/v2").is_err());
        assert!(
            maybe_create_news_client(Some("k".to_string()), "not a url").is_err()
        );
        assert!(maybe_create_news_client(
            Some("k".to_string()),
            "https://newsapi.org/v2/"
        )
        .is_ok());
    }

    #[tokio::test]
    async fn search_news_sends_query_and_maps_articles() {
        let router = Router::new().route(
            "/v2/everything",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("q").map(String::as_str), Some("pokemon"));
                assert_eq!(params.get("language").map(String::as_str), Some("es"));
                assert_eq!(params.get("pageSize").map(String::as_str), Some("2"));
                assert_eq!(params.get("apiKey").map(String::as_str), Some("secret"));
                assert_eq!(
                    params.get("sortBy").map(String::as_str),
                    Some("publishedAt")
                );
                Json::<Value>(json!({
                    "status": "ok",
                    "articles": [{
                        "title": "Nuevo juego",
                        "description": "Sale en marzo",
                        "url": "https://example.com/a",
                        "publishedAt": "2025-01-01T10:00:00Z",
                        "source": {"id": null, "name": "Meristation"}
                    }]
                }))
            }),
        );
        let base = serve(router).await;

        let client = RealNewsClient::new("secret".to_string(), &base).unwrap();
        let articles = client
            .search_news(&NewsQuery::new("pokemon").max_results(2))
            .await
            .unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title.as_deref(), Some("Nuevo juego"));
        assert_eq!(articles[0].source.as_deref(), Some("Meristation"));
        assert_eq!(
            articles[0].published_at.as_deref(),
            Some("2025-01-01T10:00:00Z")
        );
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let router = Router::new().route(
            "/v2/everything",
            get(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let base = serve(router).await;

        let client = RealNewsClient::new("wrong".to_string(), &base).unwrap();
        assert!(client.search_news(&NewsQuery::new("x")).await.is_err());
    }
}
