use tracing::{info, warn};

use crate::error::PipelineError;
use crate::graph::StageId;
use crate::io::{SearchProvider, number_results};
use crate::models::{Diagnostic, PipelineState, StageDelta, StageOutput};

/// Configuration for the search stage
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_results: usize,
    /// Appended to the keywords to steer results towards regulations
    pub query_suffix: String,
    /// Characters of content kept per result
    pub content_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            query_suffix: "manufacturing regulation law safety certification".to_string(),
            content_limit: 300,
        }
    }
}

pub fn build_query(keywords: &[String], config: &SearchConfig) -> String {
    let mut query = keywords.join(" ");
    if !config.query_suffix.is_empty() {
        if !query.is_empty() {
            query.push(' ');
        }
        query.push_str(&config.query_suffix);
    }
    query
}

pub async fn execute_search(
    provider: Option<&dyn SearchProvider>,
    config: &SearchConfig,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError> {
    let Some(provider) = provider else {
        warn!("No search provider configured; classifying without sources");
        return Ok(StageOutput::with_diagnostics(
            StageDelta::SearchResults(Vec::new()),
            vec![Diagnostic::new(
                StageId::Search,
                "no search provider configured",
            )],
        ));
    };

    let query = build_query(&state.keywords, config);
    info!("Searching: {}", query);

    let results = provider.search(&query, config.max_results).await?;
    let results = number_results(results, config.content_limit);

    for result in results.iter().take(3) {
        info!("  {} {}", result.source_id, result.title);
    }
    info!("Found {} documents", results.len());

    let diagnostics = if results.is_empty() {
        vec![Diagnostic::new(StageId::Search, "search returned no results")]
    } else {
        Vec::new()
    };

    Ok(StageOutput::with_diagnostics(
        StageDelta::SearchResults(results),
        diagnostics,
    ))
}
