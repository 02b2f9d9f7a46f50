use crate::news::{Article, NewsClientTrait, NewsQuery};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

/// News client returning canned articles; records every query.
#[derive(Default)]
pub struct FakeNewsClient {
    articles: Vec<Article>,
    fail: bool,
    pub queries: Mutex<Vec<NewsQuery>>,
}

impl FakeNewsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(mut self, title: &str, description: &str) -> Self {
        self.articles.push(Article {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            url: Some(format!("https://news.example/{}", self.articles.len())),
            published_at: None,
            source: Some("Fake News".to_string()),
        });
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl NewsClientTrait for FakeNewsClient {
    async fn search_news(&self, query: &NewsQuery) -> Result<Vec<Article>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(anyhow::anyhow!("news service unavailable"));
        }
        Ok(self
            .articles
            .iter()
            .take(query.max_results as usize)
            .cloned()
            .collect())
    }
}
