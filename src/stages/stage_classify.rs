use tracing::{info, warn};

use super::{StageContext, complete_with_parse_retry};
use crate::error::PipelineError;
use crate::evidence::{SourceLookup, normalize_evidence};
use crate::graph::StageId;
use crate::llm::build_classify_prompt;
use crate::models::{
    Category, Diagnostic, EvidenceRecord, PipelineState, Priority, Regulation, StageDelta,
    StageOutput, regulation_id,
};
use crate::normalize::{Record, normalize, str_field, str_or, string_list};

/// Non-empty record list, or `None` so the call is retried
pub(crate) fn parse_records(text: &str) -> Option<Vec<Record>> {
    let records = normalize(text);
    (!records.is_empty()).then_some(records)
}

/// Map one classifier record to a regulation with the given id
///
/// Returns `None` for a record without a name.
pub fn regulation_from_record(
    record: &Record,
    id: String,
    lookup: &SourceLookup,
) -> Option<Regulation> {
    let name = str_field(record, &["name", "regulation_name", "title"])?;

    let category = str_field(record, &["category"])
        .and_then(|c| Category::parse(&c))
        .unwrap_or_default();

    let mut evidence = normalize_evidence(
        record.get("sources").or_else(|| record.get("evidence")),
        lookup,
    );
    let reference_url = str_field(record, &["reference_url", "url"])
        .or_else(|| evidence.iter().find(|e| !e.url.is_empty()).map(|e| e.url.clone()));

    if evidence.is_empty() {
        if let Some(url) = &reference_url {
            evidence.push(match lookup.by_url(url) {
                Some(source) => source.clone(),
                None => EvidenceRecord {
                    url: url.clone(),
                    ..Default::default()
                },
            });
        }
    }

    Some(Regulation {
        id,
        name,
        category,
        why_applicable: str_or(record, &["why_applicable", "reason"], ""),
        authority: str_or(record, &["authority"], "Unspecified"),
        priority: Priority::default(),
        requirements: string_list(record, &["key_requirements", "requirements"]),
        reference_url,
        evidence,
    })
}

pub async fn execute_classify(
    ctx: &StageContext<'_>,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError> {
    let prompt = build_classify_prompt(&state.business_info, &state.search_results);
    let records = complete_with_parse_retry(
        ctx.client,
        StageId::Classify,
        &prompt,
        ctx.config.items.parse_retries,
        parse_records,
    )
    .await?;

    let mut diagnostics = Vec::new();
    let Some(records) = records else {
        warn!("Classifier response could not be normalized; no regulations identified");
        diagnostics.push(Diagnostic::new(
            StageId::Classify,
            "classifier response could not be normalized",
        ));
        return Ok(StageOutput::with_diagnostics(
            StageDelta::Regulations(Vec::new()),
            diagnostics,
        ));
    };

    let lookup = SourceLookup::from_search_results(&state.search_results);
    let mut regulations: Vec<Regulation> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let id = regulation_id(regulations.len() + 1);
        match regulation_from_record(record, id, &lookup) {
            Some(regulation) => regulations.push(regulation),
            None => {
                warn!("Discarding classifier record {}: no name", index + 1);
                diagnostics.push(Diagnostic::new(
                    StageId::Classify,
                    format!("discarded record {}: missing name", index + 1),
                ));
            }
        }
    }

    info!("Classified {} regulations", regulations.len());
    for category in Category::ALL {
        let count = regulations.iter().filter(|r| r.category == category).count();
        if count > 0 {
            info!("  {}: {}", category, count);
        }
    }

    Ok(StageOutput::with_diagnostics(
        StageDelta::Regulations(regulations),
        diagnostics,
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::SearchResult;

    fn lookup() -> SourceLookup {
        SourceLookup::from_search_results(&[SearchResult {
            source_id: "SRC-002".to_string(),
            title: "Enforcement decree".to_string(),
            url: "https://law.example.org/decree".to_string(),
            content: "Decree text".to_string(),
            score: 0.7,
        }])
    }

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_full_record() {
        let reg = regulation_from_record(
            &record(json!({
                "name": "Occupational Safety and Health Act",
                "category": "안전/환경",
                "authority": "Ministry of Employment and Labor",
                "key_requirements": ["Appoint a safety manager", "Run risk assessments"],
                "sources": [{"source_id": "SRC-002", "excerpt": "Applies to 5+ employees"}]
            })),
            "REG-001".to_string(),
            &lookup(),
        )
        .unwrap();

        assert_eq!(reg.category, Category::SafetyEnvironment);
        assert_eq!(reg.priority, Priority::Medium);
        assert_eq!(reg.requirements.len(), 2);
        assert_eq!(reg.evidence[0].title, "Enforcement decree");
        assert_eq!(
            reg.reference_url.as_deref(),
            Some("https://law.example.org/decree")
        );
    }

    #[test]
    fn test_reference_url_becomes_evidence() {
        let reg = regulation_from_record(
            &record(json!({
                "name": "Decree",
                "category": "product certification",
                "reference_url": "https://law.example.org/decree"
            })),
            "REG-002".to_string(),
            &lookup(),
        )
        .unwrap();
        assert_eq!(reg.category, Category::ProductCertification);
        assert_eq!(reg.evidence.len(), 1);
        assert_eq!(reg.evidence[0].source_id, "SRC-002");
        assert_eq!(reg.authority, "Unspecified");
    }

    #[test]
    fn test_record_without_name_is_discarded() {
        assert!(
            regulation_from_record(
                &record(json!({"name": "  ", "category": "factory_operations"})),
                "REG-001".to_string(),
                &lookup()
            )
            .is_none()
        );
    }
}
