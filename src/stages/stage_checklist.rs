use tracing::{info, warn};

use super::stage_classify::parse_records;
use super::{StageContext, complete_with_parse_retry, map_items_ordered};
use crate::error::PipelineError;
use crate::evidence::{SourceLookup, normalize_evidence};
use crate::graph::StageId;
use crate::llm::build_checklist_prompt;
use crate::models::{
    ChecklistTask, Diagnostic, PipelineState, Regulation, StageDelta, StageOutput, TaskStatus,
};
use crate::normalize::{Record, str_field, str_or, string_list};

pub const DEFAULT_RESPONSIBLE_PARTY: &str = "Compliance team";

/// Map one checklist record to a task, or `None` without a task name
pub fn task_from_record(
    record: &Record,
    regulation: &Regulation,
    lookup: &SourceLookup,
) -> Option<ChecklistTask> {
    let name = str_field(record, &["task_name", "name", "title"])?;

    Some(ChecklistTask {
        regulation_id: regulation.id.clone(),
        regulation_name: regulation.name.clone(),
        name,
        responsible_party: str_or(
            record,
            &["responsible_dept", "responsible_party", "owner"],
            DEFAULT_RESPONSIBLE_PARTY,
        ),
        deadline: str_or(record, &["deadline", "due_date"], "TBD"),
        steps: string_list(record, &["method", "steps"]),
        estimated_time: str_or(record, &["estimated_time", "duration"], "TBD"),
        priority: regulation.priority,
        status: TaskStatus::Pending,
        evidence: normalize_evidence(record.get("evidence"), lookup),
    })
}

/// Tasks for one regulation plus what went wrong producing them
async fn tasks_for_regulation(
    ctx: &StageContext<'_>,
    regulation: &Regulation,
    today: &str,
) -> Result<(Vec<ChecklistTask>, Vec<Diagnostic>), PipelineError> {
    let prompt = build_checklist_prompt(regulation, today);
    let records = complete_with_parse_retry(
        ctx.client,
        StageId::Checklist,
        &prompt,
        ctx.config.items.parse_retries,
        parse_records,
    )
    .await?;

    let Some(records) = records else {
        warn!("{}: checklist response could not be normalized, skipping", regulation.id);
        return Ok((
            Vec::new(),
            vec![Diagnostic::for_item(
                StageId::Checklist,
                &regulation.id,
                "checklist response could not be normalized",
            )],
        ));
    };

    let lookup = SourceLookup::from_evidence(&regulation.evidence);
    let mut tasks = Vec::new();
    let mut diagnostics = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match task_from_record(record, regulation, &lookup) {
            Some(task) => tasks.push(task),
            None => diagnostics.push(Diagnostic::for_item(
                StageId::Checklist,
                &regulation.id,
                format!("discarded task record {}: missing task name", index + 1),
            )),
        }
    }

    info!("{}: {} tasks", regulation.id, tasks.len());
    Ok((tasks, diagnostics))
}

pub async fn execute_checklist(
    ctx: &StageContext<'_>,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError> {
    let today = state.started_at.format("%Y-%m-%d").to_string();
    let today = today.as_str();
    let regulations = &state.regulations;

    let per_regulation = map_items_ordered(0..regulations.len(), ctx.config.items.concurrency, |i| {
        async move { tasks_for_regulation(ctx, &regulations[i], today).await }
    })
    .await?;

    let mut tasks = Vec::new();
    let mut diagnostics = Vec::new();
    for (item_tasks, item_diagnostics) in per_regulation {
        tasks.extend(item_tasks);
        diagnostics.extend(item_diagnostics);
    }

    info!(
        "Generated {} checklist tasks for {} regulations",
        tasks.len(),
        regulations.len()
    );
    Ok(StageOutput::with_diagnostics(
        StageDelta::Tasks(tasks),
        diagnostics,
    ))
}
