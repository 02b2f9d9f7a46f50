pub mod fake;
pub mod real;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NEWS_API_BASE: &str = "https://newsapi.org/v2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<String>,
}

/// Parameters of a news search.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsQuery {
    pub query: String,
    pub language: String,
    pub days_back: i64,
    pub max_results: u32,
}

impl NewsQuery {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            language: "es".to_string(),
            days_back: 7,
            max_results: 3,
        }
    }

    pub fn days_back(mut self, days_back: i64) -> Self {
        self.days_back = days_back;
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
pub trait NewsClientTrait: Send + Sync {
    /// Recent articles matching the query, newest first.
    async fn search_news(&self, query: &NewsQuery) -> Result<Vec<Article>>;
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Numbered article list for inclusion in a prompt.
pub fn format_news_for_prompt(articles: &[Article]) -> String {
    if articles.is_empty() {
        return "No se encontraron noticias recientes.".to_string();
    }

    articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            let description = article
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| excerpt(d, 200))
                .unwrap_or_else(|| "Sin descripción".to_string());
            format!(
                "{}. {}\n   Fuente: {}\n   {}...",
                i + 1,
                article.title.as_deref().unwrap_or("Sin título"),
                article.source.as_deref().unwrap_or("Desconocida"),
                description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Bulleted title and short excerpt per article, for conversation openers.
pub fn format_news_brief(articles: &[Article]) -> String {
    articles
        .iter()
        .map(|article| {
            format!(
                "- {}\n  {}...",
                article.title.as_deref().unwrap_or_default(),
                excerpt(article.description.as_deref().unwrap_or_default(), 150)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
