use tracing::info;

use super::{StageContext, complete_with_parse_retry};
use crate::error::PipelineError;
use crate::graph::StageId;
use crate::llm::build_keywords_prompt;
use crate::models::{BusinessInfo, Diagnostic, PipelineState, StageDelta, StageOutput};
use crate::normalize::{normalize_object, string_list};

pub const MAX_KEYWORDS: usize = 7;

/// Keywords parsed from a response, and whether the comma fallback was used
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedKeywords {
    pub keywords: Vec<String>,
    pub from_fallback: bool,
}

/// Read `{"keywords": [...]}`, else split the raw text on commas and newlines
pub fn parse_keywords(text: &str) -> Option<ParsedKeywords> {
    if let Some(record) = normalize_object(text) {
        let keywords = string_list(&record, &["keywords"]);
        if !keywords.is_empty() {
            return Some(ParsedKeywords {
                keywords: dedup_limit(keywords),
                from_fallback: false,
            });
        }
    }

    let keywords: Vec<String> = text
        .split([',', '\n'])
        .map(|part| {
            strip_list_marker(part.trim())
                .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
                .to_string()
        })
        .filter(|part| !part.is_empty() && !part.contains(['{', '}', '[', ']']))
        .collect();

    (!keywords.is_empty()).then(|| ParsedKeywords {
        keywords: dedup_limit(keywords),
        from_fallback: true,
    })
}

/// Drop a leading "-", "*" or "1." style list marker
fn strip_list_marker(part: &str) -> &str {
    let part = part.trim_start_matches(['-', '*']).trim_start();
    let digits = part.len() - part.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    match part[digits..].strip_prefix(['.', ')']) {
        Some(rest) if digits > 0 => rest.trim_start(),
        _ => part,
    }
}

fn dedup_limit(keywords: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for keyword in keywords {
        if !unique.iter().any(|k| k.eq_ignore_ascii_case(&keyword)) {
            unique.push(keyword);
        }
    }
    unique.truncate(MAX_KEYWORDS);
    unique
}

/// Keywords from the business description itself
fn fallback_keywords(info: &BusinessInfo) -> Vec<String> {
    [&info.industry, &info.product_name]
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn execute_keywords(
    ctx: &StageContext<'_>,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError> {
    let prompt = build_keywords_prompt(&state.business_info);
    let parsed = complete_with_parse_retry(
        ctx.client,
        StageId::Keywords,
        &prompt,
        ctx.config.items.parse_retries,
        parse_keywords,
    )
    .await?;

    let mut diagnostics = Vec::new();
    let keywords = match parsed {
        Some(parsed) => {
            if parsed.from_fallback {
                diagnostics.push(Diagnostic::new(
                    StageId::Keywords,
                    "response was not JSON; split keywords on commas",
                ));
            }
            parsed.keywords
        }
        None => {
            diagnostics.push(Diagnostic::new(
                StageId::Keywords,
                "no keywords extracted; using industry and product name",
            ));
            fallback_keywords(&state.business_info)
        }
    };

    info!("Extracted {} keywords: {}", keywords.len(), keywords.join(", "));
    Ok(StageOutput::with_diagnostics(
        StageDelta::Keywords(keywords),
        diagnostics,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_keywords() {
        let parsed =
            parse_keywords("```json\n{\"keywords\": [\"battery\", \"Battery\", \"lithium\"]}\n```")
                .unwrap();
        assert_eq!(parsed.keywords, vec!["battery", "lithium"]);
        assert!(!parsed.from_fallback);
    }

    #[test]
    fn test_parse_comma_fallback() {
        let parsed =
            parse_keywords("battery safety, \"KC certification\",\n- chemical control").unwrap();
        assert_eq!(
            parsed.keywords,
            vec!["battery safety", "KC certification", "chemical control"]
        );
        assert!(parsed.from_fallback);
    }

    #[test]
    fn test_parse_limits_count() {
        let parsed = parse_keywords("a, b, c, d, e, f, g, h, i").unwrap();
        assert_eq!(parsed.keywords.len(), MAX_KEYWORDS);

        let parsed = parse_keywords("1. RoHS\n2) 5G radio certification").unwrap();
        assert_eq!(parsed.keywords, vec!["RoHS", "5G radio certification"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_keywords("   ").is_none());
        assert!(parse_keywords("{\"keywords\": []}").is_none());
    }
}
