use tracing::{debug, info, warn};

use super::StageContext;
use crate::error::PipelineError;
use crate::graph::StageId;
use crate::io::Renderer;
use crate::llm::build_summary_prompt;
use crate::models::{Diagnostic, PipelineState, StageDelta, StageOutput};
use crate::report::ReportAssembler;

/// Assemble the report around a generated summary, then render it
///
/// A failed summary call aborts the run; a failed render only leaves
/// `pdf_path` unset.
pub async fn execute_report(
    ctx: &StageContext<'_>,
    renderer: Option<&dyn Renderer>,
    state: &PipelineState,
) -> Result<StageOutput, PipelineError> {
    let prompt = build_summary_prompt(
        &state.business_info,
        &state.regulations,
        state.tasks.len(),
        state.risk.as_ref(),
    );
    let summary = ctx
        .client
        .complete(&prompt)
        .await
        .map_err(|e| PipelineError::client(StageId::Report, e))?;
    debug!("Executive summary: {}", summary);

    let today = state.started_at.format("%Y-%m-%d").to_string();
    let mut report = ReportAssembler::new(&ctx.config.report).assemble(state, &summary, &today);
    info!(
        "Assembled report: {} sections, {} citations",
        report.full_document.len(),
        report.citations.len()
    );

    let mut diagnostics = Vec::new();
    match renderer {
        Some(renderer) => match renderer.render(&report.to_markdown(), &state.artifact_stem()) {
            Ok(path) => {
                info!("Report written to {:?}", path);
                report.pdf_path = Some(path);
            }
            Err(e) => {
                warn!("Rendering failed: {}", e);
                diagnostics.push(Diagnostic::new(
                    StageId::Report,
                    format!("rendering failed: {}", e),
                ));
            }
        },
        None => debug!("No renderer configured"),
    }

    Ok(StageOutput::with_diagnostics(
        StageDelta::Report(report),
        diagnostics,
    ))
}
