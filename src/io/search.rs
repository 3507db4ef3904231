use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{SearchResult, truncate};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Web search collaborator used by the search stage
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Up to `max_results` hits for `query`, best first
    ///
    /// Returned results need not carry source ids; the stage numbers them.
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchResult>, SearchError>;
}

/// Number `results` as SRC-001.. and cap their content, dropping repeat URLs
pub fn number_results(results: Vec<SearchResult>, content_limit: usize) -> Vec<SearchResult> {
    let mut seen_urls: Vec<String> = Vec::new();
    let mut numbered = Vec::with_capacity(results.len());

    for mut result in results {
        if !result.url.is_empty() {
            if seen_urls.contains(&result.url) {
                continue;
            }
            seen_urls.push(result.url.clone());
        }
        result.source_id = format!("SRC-{:03}", numbered.len() + 1);
        result.content = truncate(&result.content, content_limit);
        numbered.push(result);
    }

    numbered
}

/// Configuration for the Tavily search API
#[derive(Debug, Clone)]
pub struct TavilyConfig {
    /// API key (from TAVILY_API_KEY env var)
    pub api_key: String,
    /// "basic" or "advanced"
    pub search_depth: String,
    /// Restrict hits to these domains; empty means unrestricted
    pub include_domains: Vec<String>,
}

impl TavilyConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;

        let api_key = std::env::var("TAVILY_API_KEY")
            .context("TAVILY_API_KEY environment variable not set")?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            search_depth: "advanced".to_string(),
            include_domains: Vec::new(),
        }
    }
}

pub struct TavilyClient {
    client: Client,
    config: TavilyConfig,
}

impl TavilyClient {
    pub fn new(config: TavilyConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let request = TavilyRequest {
            api_key: &self.config.api_key,
            query,
            max_results,
            search_depth: &self.config.search_depth,
            include_domains: &self.config.include_domains,
        };

        let response = self
            .client
            .post("https://api.tavily.com/search")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api { status, body });
        }

        let response: TavilyResponse = response.json().await?;
        Ok(response
            .results
            .into_iter()
            .map(|hit| SearchResult {
                source_id: String::new(),
                title: hit.title,
                url: hit.url,
                content: hit.content,
                score: hit.score,
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    include_domains: &'a [String],
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str, content: &str) -> SearchResult {
        SearchResult {
            url: url.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_number_results_dedups_urls() {
        let numbered = number_results(
            vec![
                hit("https://a", "x"),
                hit("https://b", "y"),
                hit("https://a", "z"),
                hit("", "no url"),
            ],
            300,
        );
        let ids: Vec<&str> = numbered.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["SRC-001", "SRC-002", "SRC-003"]);
        assert_eq!(numbered[2].content, "no url");
    }

    #[test]
    fn test_number_results_truncates_content() {
        let numbered = number_results(vec![hit("https://a", &"x".repeat(500))], 300);
        assert_eq!(numbered[0].content.chars().count(), 300);
    }

    #[test]
    fn test_tavily_response_tolerates_missing_fields() {
        let response: TavilyResponse =
            serde_json::from_str(r#"{"results":[{"url":"https://a"}],"answer":"x"}"#).unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].score, 0.0);
    }
}
