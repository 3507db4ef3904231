use tracing::{info, warn};

use super::{StageContext, complete_with_parse_retry, map_items_ordered};
use crate::error::PipelineError;
use crate::evidence::{SourceLookup, normalize_evidence};
use crate::graph::StageId;
use crate::llm::build_risk_prompt;
use crate::models::{
    BusinessInfo, Diagnostic, PipelineState, Priority, Regulation, RiskAssessment, RiskItem,
    StageDelta, StageOutput,
};
use crate::normalize::{Record, f64_or, normalize_object, str_or, string_list};

/// Score used when the response carries none
pub const DEFAULT_RISK_SCORE: f64 = 5.0;

/// Map one risk record to an item, clamping the score into 0..=10
pub fn risk_item_from_record(
    record: &Record,
    regulation: &Regulation,
    lookup: &SourceLookup,
) -> RiskItem {
    let risk_score = f64_or(record, &["risk_score", "score"], DEFAULT_RISK_SCORE).clamp(0.0, 10.0);

    let mut evidence = normalize_evidence(record.get("evidence"), lookup);
    if evidence.is_empty() {
        evidence = regulation.evidence.clone();
    }

    RiskItem {
        regulation_id: regulation.id.clone(),
        regulation_name: regulation.name.clone(),
        penalty_amount: str_or(record, &["penalty_amount", "penalty"], "Unknown"),
        penalty_type: str_or(record, &["penalty_type"], ""),
        business_impact: str_or(record, &["business_impact", "impact"], ""),
        risk_score,
        past_cases: string_list(record, &["past_cases", "cases"]),
        mitigation: str_or(record, &["mitigation"], ""),
        evidence,
    }
}

async fn assess_regulation(
    ctx: &StageContext<'_>,
    info: &BusinessInfo,
    regulation: &Regulation,
) -> Result<Result<RiskItem, Diagnostic>, PipelineError> {
    let prompt = build_risk_prompt(info, regulation);
    let record = complete_with_parse_retry(
        ctx.client,
        StageId::Risk,
        &prompt,
        ctx.config.items.parse_retries,
        normalize_object,
    )
    .await?;

    Ok(match record {
        Some(record) => {
            let lookup = SourceLookup::from_evidence(&regulation.evidence);
            let item = risk_item_from_record(&record, regulation, &lookup);
            info!("{}: risk {:.1}/10", regulation.id, item.risk_score);
            Ok(item)
        }
        None => {
            warn!("{}: risk response could not be normalized, skipping", regulation.id);
            Err(Diagnostic::for_item(
                StageId::Risk,
                &regulation.id,
                "risk response could not be normalized",
            ))
        }
    })
}

pub async fn execute_risk(
    ctx: &StageContext<'_>,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError> {
    let info = &state.business_info;
    let regulations = &state.regulations;

    let results = map_items_ordered(0..regulations.len(), ctx.config.items.concurrency, |i| {
        async move { assess_regulation(ctx, info, &regulations[i]).await }
    })
    .await?;

    let mut items = Vec::new();
    let mut diagnostics = Vec::new();
    for result in results {
        match result {
            Ok(item) => items.push(item),
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    let high_priority = regulations
        .iter()
        .filter(|r| r.priority == Priority::High)
        .count();
    let assessment = RiskAssessment::from_items(items, &ctx.config.risk, high_priority);

    info!(
        "Overall risk {:.2}/10: {} high, {} medium, {} low",
        assessment.overall_score,
        assessment.matrix.high.len(),
        assessment.matrix.medium.len(),
        assessment.matrix.low.len()
    );
    Ok(StageOutput::with_diagnostics(
        StageDelta::Risk(assessment),
        diagnostics,
    ))
}
